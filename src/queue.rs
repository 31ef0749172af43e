// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The queue engine.
//!
//! Four operations over three flat files realize FIFO semantics with no
//! index and no in-memory state:
//!
//! - [`push`](Queue::push) appends records to the write log
//! - [`promote`](Queue::promote) copies a batch from the write log into the
//!   read buffer and advances the persisted rotate cursor
//! - [`pop`](Queue::pop) serves records from the read buffer's tail,
//!   promoting on shortfall
//! - [`recycle`](Queue::recycle) discards the already-promoted prefix of
//!   the write log
//!
//! ## Read buffer invariant
//!
//! The read buffer is written in promotion-reversed order and consumed
//! strictly from its physical tail: the tail-most record is always the
//! oldest promoted, unconsumed record, so a backward scan yields arrival
//! order without any index.
//!
//! ## Locking
//!
//! Every operation takes blocking, advisory, whole-file locks for its full
//! duration and releases them before returning. push holds the write log
//! exclusively; promote holds the cursor exclusively, the write log shared
//! (so a concurrent push can never expose a partial line to the scan) and
//! the read buffer exclusively for the append; pop holds the read buffer
//! exclusively; recycle holds the cursor then the write log exclusively.
//!
//! Callers must not run `recycle` concurrently with `promote` or `pop` on
//! the same queue: recycle shifts file contents and invalidates any offset
//! a concurrent promote read. This mutual exclusion is a caller contract,
//! not enforced here.

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Read, Seek, SeekFrom, Write},
    mem,
    path::Path,
};

use snafu::{ResultExt, ensure};
use tracing::{debug, trace};

use crate::{
    Environment,
    error::{IoFaultSnafu, Result, TerminatorInRecordSnafu},
    lock::FileGuard,
};

/// Records are terminated by a single newline and must not contain one.
const LINE_TERMINATOR: u8 = b'\n';

/// Chunk size for the in-place compacting copy in [`Queue::recycle`].
const RECYCLE_CHUNK: usize = 8 * 1024;

/// A durable file-backed FIFO queue.
///
/// Operates exclusively through the paths and batch size supplied by its
/// [`Environment`]; never creates or deletes files. Provision the
/// environment first via [`Environment::create`].
pub struct Queue {
    env: Environment,
}

impl Queue {
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// The environment this queue operates in.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Append records to the write log, in the given order.
    ///
    /// No-op for an empty batch. The whole batch is written with a single
    /// `write_all` against an append-mode handle while the write log is
    /// held exclusively; concurrent pushers serialize in lock-acquisition
    /// order.
    ///
    /// # Errors
    ///
    /// Fails if a record contains the line terminator, or with an I/O fault
    /// if the write log cannot be opened, locked or written.
    pub fn push<I, S>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = Vec::new();
        let mut count = 0usize;
        for record in records {
            let record = record.as_ref();
            ensure!(
                !record.as_bytes().contains(&LINE_TERMINATOR),
                TerminatorInRecordSnafu
            );
            batch.extend_from_slice(record.as_bytes());
            batch.push(LINE_TERMINATOR);
            count += 1;
        }
        if count == 0 {
            return Ok(());
        }

        let path = self.env.write_file();
        let log = OpenOptions::new()
            .append(true)
            .open(&path)
            .context(IoFaultSnafu { op: "open", path: &path })?;
        let _log_lock =
            FileGuard::exclusive(&log).context(IoFaultSnafu { op: "lock", path: &path })?;
        (&log)
            .write_all(&batch)
            .context(IoFaultSnafu { op: "append to", path: &path })?;

        trace!(records = count, bytes = batch.len(), "pushed records");
        Ok(())
    }

    /// Move up to `count` not-yet-promoted records from the write log into
    /// the read buffer.
    ///
    /// The batch is appended to the read buffer in reverse order, so the
    /// oldest record of the batch lands physically last and pop's tail scan
    /// yields oldest-first. Promotion is a logical move: nothing is removed
    /// from the write log; the rotate cursor advances past the consumed
    /// bytes. `count = 0`, or a cursor already at end of log, changes
    /// nothing on disk.
    ///
    /// A trailing line without terminator (torn write of a crashed
    /// producer) is never promoted; the cursor stops in front of it.
    pub fn promote(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let cursor_path = self.env.rotate_cursor_file();
        let cursor = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&cursor_path)
            .context(IoFaultSnafu { op: "open", path: &cursor_path })?;
        let _cursor_lock = FileGuard::exclusive(&cursor)
            .context(IoFaultSnafu { op: "lock", path: &cursor_path })?;
        let offset = read_cursor(&cursor, &cursor_path)?.unwrap_or(0);

        let log_path = self.env.write_file();
        let log =
            File::open(&log_path).context(IoFaultSnafu { op: "open", path: &log_path })?;
        let _log_lock =
            FileGuard::shared(&log).context(IoFaultSnafu { op: "lock", path: &log_path })?;

        let mut reader = BufReader::new(&log);
        reader
            .seek(SeekFrom::Start(offset))
            .context(IoFaultSnafu { op: "seek", path: &log_path })?;

        let mut lines: Vec<Vec<u8>> = Vec::new();
        let mut next_offset = offset;
        for _ in 0..count {
            let mut line = Vec::new();
            let n = reader
                .read_until(LINE_TERMINATOR, &mut line)
                .context(IoFaultSnafu { op: "read", path: &log_path })?;
            if n == 0 {
                break;
            }
            if line.last() != Some(&LINE_TERMINATOR) {
                break;
            }
            next_offset += n as u64;
            lines.push(line);
        }

        if lines.is_empty() {
            return Ok(());
        }

        let buffer_path = self.env.read_file();
        {
            let buffer = OpenOptions::new()
                .append(true)
                .open(&buffer_path)
                .context(IoFaultSnafu { op: "open", path: &buffer_path })?;
            let _buffer_lock = FileGuard::exclusive(&buffer)
                .context(IoFaultSnafu { op: "lock", path: &buffer_path })?;

            let mut batch = Vec::with_capacity(lines.iter().map(Vec::len).sum());
            for line in lines.iter().rev() {
                batch.extend_from_slice(line);
            }
            (&buffer)
                .write_all(&batch)
                .context(IoFaultSnafu { op: "append to", path: &buffer_path })?;
        }

        write_cursor(&cursor, &cursor_path, next_offset)?;

        debug!(
            promoted = lines.len(),
            cursor = next_offset,
            "promoted records into read buffer"
        );
        Ok(())
    }

    /// Remove and return up to `count` records, oldest first.
    ///
    /// Serves from the read buffer; on shortfall, promotes
    /// `max(shortfall, rotate_batch_size)` records and drains once more.
    /// Small shortfalls thus trigger a full default-size promotion,
    /// amortizing lock and seek cost over future pops.
    pub fn pop(&self, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut served = self.drain(count)?;
        let shortfall = count - served.len();
        if shortfall > 0 {
            self.promote(shortfall.max(self.env.rotate_batch_size()))?;
            served.append(&mut self.drain(shortfall)?);
        }
        Ok(served)
    }

    /// Reclaim write log space consumed by already-promoted records.
    ///
    /// Copies the not-yet-promoted suffix down to offset zero within the
    /// same file, truncates the log to the copied length and resets the
    /// rotate cursor to unset. No-op when the cursor is unset. Must not run
    /// concurrently with `promote` or `pop` on the same queue.
    pub fn recycle(&self) -> Result<()> {
        let cursor_path = self.env.rotate_cursor_file();
        let cursor = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&cursor_path)
            .context(IoFaultSnafu { op: "open", path: &cursor_path })?;
        let _cursor_lock = FileGuard::exclusive(&cursor)
            .context(IoFaultSnafu { op: "lock", path: &cursor_path })?;

        let Some(offset) = read_cursor(&cursor, &cursor_path)? else {
            return Ok(());
        };

        let log_path = self.env.write_file();
        let log = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&log_path)
            .context(IoFaultSnafu { op: "open", path: &log_path })?;
        let _log_lock =
            FileGuard::exclusive(&log).context(IoFaultSnafu { op: "lock", path: &log_path })?;

        // Forward in-place copy; the write position never overtakes the
        // read position, so each chunk lands on bytes already consumed.
        let mut chunk = [0u8; RECYCLE_CHUNK];
        let mut read_pos = offset;
        let mut write_pos = 0u64;
        loop {
            (&log)
                .seek(SeekFrom::Start(read_pos))
                .context(IoFaultSnafu { op: "seek", path: &log_path })?;
            let n = (&log)
                .read(&mut chunk)
                .context(IoFaultSnafu { op: "read", path: &log_path })?;
            if n == 0 {
                break;
            }
            read_pos += n as u64;
            (&log)
                .seek(SeekFrom::Start(write_pos))
                .context(IoFaultSnafu { op: "seek", path: &log_path })?;
            (&log)
                .write_all(&chunk[..n])
                .context(IoFaultSnafu { op: "write", path: &log_path })?;
            write_pos += n as u64;
        }
        log.set_len(write_pos)
            .context(IoFaultSnafu { op: "truncate", path: &log_path })?;

        cursor
            .set_len(0)
            .context(IoFaultSnafu { op: "truncate", path: &cursor_path })?;

        debug!(
            reclaimed = offset,
            remaining = write_pos,
            "compacted write log"
        );
        Ok(())
    }

    /// Serve up to `count` records off the read buffer's tail.
    ///
    /// Scans backward from end of file one byte at a time; a terminator
    /// with a non-empty accumulator completes one record (its bytes arrive
    /// reversed and are un-reversed before returning). A partial record at
    /// start of file is flushed. The buffer is then truncated at the
    /// position the scan reached, permanently destroying the served
    /// records.
    fn drain(&self, count: usize) -> Result<Vec<String>> {
        let path = self.env.read_file();
        let buffer = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .context(IoFaultSnafu { op: "open", path: &path })?;
        let _buffer_lock =
            FileGuard::exclusive(&buffer).context(IoFaultSnafu { op: "lock", path: &path })?;

        let end = buffer
            .metadata()
            .context(IoFaultSnafu { op: "read", path: &path })?
            .len();

        let mut pos = end;
        let mut found: Vec<Vec<u8>> = Vec::new();
        let mut current: Vec<u8> = Vec::new();
        let mut reached_start = false;
        let mut byte = [0u8; 1];

        while found.len() < count {
            if pos == 0 {
                reached_start = true;
                if !current.is_empty() {
                    found.push(mem::take(&mut current));
                }
                break;
            }
            pos -= 1;
            (&buffer)
                .seek(SeekFrom::Start(pos))
                .context(IoFaultSnafu { op: "seek", path: &path })?;
            (&buffer)
                .read_exact(&mut byte)
                .context(IoFaultSnafu { op: "read", path: &path })?;

            if byte[0] == LINE_TERMINATOR {
                // An empty accumulator here is the terminator of the record
                // at the original end of file; skip it.
                if !current.is_empty() {
                    found.push(mem::take(&mut current));
                }
            } else {
                current.push(byte[0]);
            }
        }

        let keep = if reached_start { 0 } else { pos + 1 };
        buffer
            .set_len(keep)
            .context(IoFaultSnafu { op: "truncate", path: &path })?;

        trace!(served = found.len(), truncated_to = keep, "drained read buffer");

        Ok(found
            .into_iter()
            .map(|mut record| {
                record.reverse();
                String::from_utf8_lossy(&record).into_owned()
            })
            .collect())
    }
}

/// Read the persisted promotion offset.
///
/// `None` means the cursor is unset (empty file); anything unparsable
/// counts as offset zero.
fn read_cursor(mut cursor: &File, path: &Path) -> Result<Option<u64>> {
    let mut raw = Vec::new();
    cursor
        .read_to_end(&mut raw)
        .context(IoFaultSnafu { op: "read", path })?;
    let text = String::from_utf8_lossy(&raw);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(text.parse().unwrap_or(0)))
}

/// Persist the promotion offset as a decimal string.
fn write_cursor(cursor: &File, path: &Path, offset: u64) -> Result<()> {
    let digits = offset.to_string();
    (&*cursor)
        .seek(SeekFrom::Start(0))
        .context(IoFaultSnafu { op: "seek", path })?;
    (&*cursor)
        .write_all(digits.as_bytes())
        .context(IoFaultSnafu { op: "write", path })?;
    cursor
        .set_len(digits.len() as u64)
        .context(IoFaultSnafu { op: "truncate", path })?;
    Ok(())
}
