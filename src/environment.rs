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

//! Environment in which a queue operates.
//!
//! The [`Environment`] resolves the on-disk layout and owns provisioning:
//! creating, validating, resetting and removing the queue directory and its
//! three files. The engine itself never creates or deletes files; it
//! operates only through the paths and batch size exposed here.
//!
//! Lifecycle operations are for deployment and test tooling, not for the
//! engine's hot path.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::{
    QueueConfig,
    error::{Artifact, ProvisionSnafu, ProvisioningSnafu, Result},
};

/// Resolves queue paths and provisions the artifacts behind them.
#[derive(Debug, Clone)]
pub struct Environment {
    config: QueueConfig,
}

impl Environment {
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Directory in which all files of this queue live.
    #[must_use]
    pub fn queue_dir(&self) -> PathBuf {
        self.config.root_dir.join(&self.config.queue_name)
    }

    /// Path to the append-only write log.
    #[must_use]
    pub fn write_file(&self) -> PathBuf {
        self.queue_dir().join(&self.config.write_filename)
    }

    /// Path to the read buffer of promoted records.
    #[must_use]
    pub fn read_file(&self) -> PathBuf {
        self.queue_dir().join(&self.config.read_filename)
    }

    /// Path to the persisted promotion offset.
    #[must_use]
    pub fn rotate_cursor_file(&self) -> PathBuf {
        self.queue_dir().join(&self.config.rotate_cursor_filename)
    }

    /// Number of records moved per promotion.
    #[must_use]
    pub fn rotate_batch_size(&self) -> usize {
        self.config.rotate_batch_size
    }

    /// Idempotently create the queue directory and the three files.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(self.queue_dir()).context(ProvisionSnafu {
            artifact: Artifact::QueueDir,
        })?;

        for (artifact, path) in self.artifacts() {
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .context(ProvisionSnafu { artifact })?;
        }

        debug!(dir = ?self.queue_dir(), "queue environment created");
        Ok(())
    }

    /// Verify that every artifact exists and is writable.
    ///
    /// Fails with a provisioning error naming the first offending artifact;
    /// problems are never merged into a generic error.
    pub fn validate(&self) -> Result<()> {
        let dir = self.queue_dir();
        ensure!(
            dir.is_dir(),
            ProvisioningSnafu {
                artifact: Artifact::QueueDir,
                problem:  "not created",
            }
        );
        let metadata = fs::metadata(&dir).context(ProvisionSnafu {
            artifact: Artifact::QueueDir,
        })?;
        ensure!(
            !metadata.permissions().readonly(),
            ProvisioningSnafu {
                artifact: Artifact::QueueDir,
                problem:  "not writable",
            }
        );

        for (artifact, path) in self.artifacts() {
            ensure!(
                path.is_file(),
                ProvisioningSnafu {
                    artifact,
                    problem: "not created",
                }
            );
            ensure!(
                Self::writable(&path),
                ProvisioningSnafu {
                    artifact,
                    problem: "not writable",
                }
            );
        }
        Ok(())
    }

    /// Truncate all three files to empty, discarding every record.
    pub fn reset(&self) -> Result<()> {
        for (artifact, path) in self.artifacts() {
            let file = OpenOptions::new()
                .write(true)
                .open(&path)
                .context(ProvisionSnafu { artifact })?;
            file.set_len(0).context(ProvisionSnafu { artifact })?;
        }
        debug!(dir = ?self.queue_dir(), "queue environment reset");
        Ok(())
    }

    /// Idempotently delete the three files and the queue directory.
    ///
    /// The root directory is left in place.
    pub fn remove(&self) -> Result<()> {
        for (artifact, path) in self.artifacts() {
            if path.is_file() {
                fs::remove_file(&path).context(ProvisionSnafu { artifact })?;
            }
        }
        let dir = self.queue_dir();
        if dir.is_dir() {
            fs::remove_dir(&dir).context(ProvisionSnafu {
                artifact: Artifact::QueueDir,
            })?;
        }
        debug!(dir = ?dir, "queue environment removed");
        Ok(())
    }

    /// The three files, in the order provisioning touches them.
    fn artifacts(&self) -> [(Artifact, PathBuf); 3] {
        [
            (Artifact::ReadBuffer, self.read_file()),
            (Artifact::RotateCursor, self.rotate_cursor_file()),
            (Artifact::WriteLog, self.write_file()),
        ]
    }

    fn writable(path: &Path) -> bool {
        OpenOptions::new().append(true).open(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::QueueError;

    fn environment(temp_dir: &TempDir) -> Environment {
        Environment::new(QueueConfig::new(temp_dir.path(), "events"))
    }

    #[test]
    fn test_paths_follow_layout() {
        let env = Environment::new(QueueConfig::new("/data", "events"));
        assert_eq!(env.queue_dir(), PathBuf::from("/data/events"));
        assert_eq!(env.write_file(), PathBuf::from("/data/events/write.txt"));
        assert_eq!(env.read_file(), PathBuf::from("/data/events/read.txt"));
        assert_eq!(
            env.rotate_cursor_file(),
            PathBuf::from("/data/events/rotate_pointer.txt")
        );
    }

    #[test]
    fn test_create_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let env = environment(&temp_dir);

        env.create().unwrap();
        env.create().unwrap();

        assert!(env.write_file().is_file());
        assert!(env.read_file().is_file());
        assert!(env.rotate_cursor_file().is_file());
    }

    #[test]
    fn test_validate_passes_after_create() {
        let temp_dir = TempDir::new().unwrap();
        let env = environment(&temp_dir);
        env.create().unwrap();
        env.validate().unwrap();
    }

    #[test]
    fn test_validate_names_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let env = environment(&temp_dir);

        let err = env.validate().unwrap_err();
        match err {
            QueueError::Provisioning { artifact, problem } => {
                assert_eq!(artifact, Artifact::QueueDir);
                assert_eq!(problem, "not created");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_names_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let env = environment(&temp_dir);
        env.create().unwrap();
        fs::remove_file(env.rotate_cursor_file()).unwrap();

        let err = env.validate().unwrap_err();
        match err {
            QueueError::Provisioning { artifact, .. } => {
                assert_eq!(artifact, Artifact::RotateCursor);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reset_truncates_all_files() {
        let temp_dir = TempDir::new().unwrap();
        let env = environment(&temp_dir);
        env.create().unwrap();

        fs::write(env.write_file(), "a\nb\n").unwrap();
        fs::write(env.read_file(), "c\n").unwrap();
        fs::write(env.rotate_cursor_file(), "4").unwrap();

        env.reset().unwrap();

        assert_eq!(fs::read(env.write_file()).unwrap(), b"");
        assert_eq!(fs::read(env.read_file()).unwrap(), b"");
        assert_eq!(fs::read(env.rotate_cursor_file()).unwrap(), b"");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let env = environment(&temp_dir);
        env.create().unwrap();

        env.remove().unwrap();
        env.remove().unwrap();

        assert!(!env.queue_dir().exists());
        assert!(temp_dir.path().is_dir());
    }
}
