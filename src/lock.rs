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

//! RAII guard over an advisory whole-file lock.
//!
//! Locks are blocking, scoped to one file, and released on drop. The OS
//! releases them on process exit, so a crashed holder never wedges the
//! queue.

use std::{fs::File, io};

use fs2::FileExt;

pub(crate) struct FileGuard<'a> {
    file: &'a File,
}

impl<'a> FileGuard<'a> {
    /// Block until an exclusive lock on `file` is held.
    pub(crate) fn exclusive(file: &'a File) -> io::Result<Self> {
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    /// Block until a shared lock on `file` is held.
    pub(crate) fn shared(file: &'a File) -> io::Result<Self> {
        FileExt::lock_shared(file)?;
        Ok(Self { file })
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}
