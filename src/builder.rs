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

use crate::{Environment, Queue, QueueConfig};

/// Fluent builder over [`QueueConfig`].
pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    /// Start building a queue rooted at `root_dir/queue_name`.
    pub fn new<P: Into<PathBuf>, S: Into<String>>(root_dir: P, queue_name: S) -> Self {
        Self {
            config: QueueConfig::new(root_dir, queue_name),
        }
    }

    #[must_use]
    pub fn read_filename<S: Into<String>>(mut self, name: S) -> Self {
        self.config.read_filename = name.into();
        self
    }

    #[must_use]
    pub fn rotate_cursor_filename<S: Into<String>>(mut self, name: S) -> Self {
        self.config.rotate_cursor_filename = name.into();
        self
    }

    #[must_use]
    pub fn write_filename<S: Into<String>>(mut self, name: S) -> Self {
        self.config.write_filename = name.into();
        self
    }

    #[must_use]
    pub fn rotate_batch_size(mut self, size: usize) -> Self {
        self.config.rotate_batch_size = size;
        self
    }

    /// Build the queue. Performs no I/O; call
    /// [`Environment::create`](crate::Environment::create) before the first
    /// operation.
    #[must_use]
    pub fn build(self) -> Queue {
        Queue::new(Environment::new(self.config))
    }
}
