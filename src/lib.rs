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

//! Durable, single-directory, file-backed FIFO message queue.
//!
//! Producers append messages, consumers pop them in arrival order, with no
//! broker process, no index structure and no in-memory state. The entire
//! queue is three flat files in one directory, manipulated with append,
//! seek, truncate and advisory whole-file locks:
//!
//! - `write.txt` — append-only log of newline-terminated records
//! - `read.txt` — promoted-but-unconsumed records, newest physically first,
//!   consumed strictly from the file's tail
//! - `rotate_pointer.txt` — decimal byte offset marking how much of the
//!   write log has already been promoted (empty means never promoted)
//!
//! ## Usage
//!
//! ```ignore
//! let queue = QueueBuilder::new("/var/queues", "events").build();
//! queue.environment().create()?;
//!
//! queue.push(["first", "second"])?;
//! let records = queue.pop(2)?;
//! assert_eq!(records, vec!["first", "second"]);
//!
//! // periodic maintenance, scheduled by the caller
//! queue.recycle()?;
//! ```

pub mod builder;
pub mod config;
pub mod environment;
pub mod error;
mod lock;
pub mod queue;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use environment::Environment;
pub use error::{Artifact, QueueError, Result};
pub use queue::Queue;
