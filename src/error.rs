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

use std::{fmt, io, path::PathBuf};

use snafu::Snafu;

/// An on-disk artifact the queue depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// The per-queue directory holding the three files.
    QueueDir,
    /// The append-only write log.
    WriteLog,
    /// The promoted-but-unconsumed read buffer.
    ReadBuffer,
    /// The persisted promotion offset.
    RotateCursor,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::QueueDir => "queue directory",
            Artifact::WriteLog => "write log",
            Artifact::ReadBuffer => "read buffer",
            Artifact::RotateCursor => "rotate cursor file",
        };
        f.write_str(name)
    }
}

/// Queue operation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum QueueError {
    /// A required artifact is missing or unusable. Raised only by
    /// [`Environment::validate`](crate::Environment::validate); never
    /// retried by the engine.
    #[snafu(display("{artifact} {problem}"))]
    Provisioning {
        artifact: Artifact,
        problem:  &'static str,
    },

    /// Filesystem failure while provisioning an artifact.
    #[snafu(display("failed to provision {artifact}: {source}"))]
    Provision {
        artifact: Artifact,
        source:   io::Error,
    },

    /// Filesystem failure during a queue operation. Surfaced immediately,
    /// no internal retry, no partial-state rollback.
    #[snafu(display("IO fault: failed to {op} {}: {source}", path.display()))]
    IoFault {
        op:     &'static str,
        path:   PathBuf,
        source: io::Error,
    },

    /// A pushed record contained the line terminator byte.
    #[snafu(display("record must not contain the line terminator"))]
    TerminatorInRecord,
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_error_names_artifact() {
        let err = QueueError::Provisioning {
            artifact: Artifact::RotateCursor,
            problem:  "not created",
        };
        assert_eq!(err.to_string(), "rotate cursor file not created");
    }

    #[test]
    fn test_io_fault_names_operation_and_path() {
        let err = QueueError::IoFault {
            op:     "open",
            path:   PathBuf::from("/q/events/write.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        let text = err.to_string();
        assert!(text.contains("open"));
        assert!(text.contains("/q/events/write.txt"));
    }
}
