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

use std::path::PathBuf;

/// Default name of the read buffer file.
pub const DEFAULT_READ_FILENAME: &str = "read.txt";
/// Default name of the rotate cursor file.
pub const DEFAULT_ROTATE_CURSOR_FILENAME: &str = "rotate_pointer.txt";
/// Default name of the write log file.
pub const DEFAULT_WRITE_FILENAME: &str = "write.txt";
/// Default number of records moved per promotion.
pub const DEFAULT_ROTATE_BATCH_SIZE: usize = 100;

/// Configuration for a single queue.
///
/// `root_dir` and `queue_name` are required; everything else defaults to
/// the conventional layout `<root_dir>/<queue_name>/{write.txt, read.txt,
/// rotate_pointer.txt}` with a promotion batch of 100 records.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub root_dir: PathBuf,
    pub queue_name: String,
    pub read_filename: String,
    pub rotate_cursor_filename: String,
    pub write_filename: String,
    pub rotate_batch_size: usize,
}

impl QueueConfig {
    /// Create a configuration with default filenames and batch size.
    pub fn new<P: Into<PathBuf>, S: Into<String>>(root_dir: P, queue_name: S) -> Self {
        Self {
            root_dir: root_dir.into(),
            queue_name: queue_name.into(),
            read_filename: DEFAULT_READ_FILENAME.to_string(),
            rotate_cursor_filename: DEFAULT_ROTATE_CURSOR_FILENAME.to_string(),
            write_filename: DEFAULT_WRITE_FILENAME.to_string(),
            rotate_batch_size: DEFAULT_ROTATE_BATCH_SIZE,
        }
    }
}
