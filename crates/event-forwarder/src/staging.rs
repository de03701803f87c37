// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::RunError;

/// Local working directory holding in-flight downloads.
///
/// A leftover entry means a previous run died mid-artifact; the run is refused
/// until an operator clears the directory.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the directory if absent and fails if it holds any entry.
    pub fn ensure_empty(&self) -> Result<(), RunError> {
        fs::create_dir_all(&self.dir)?;
        if fs::read_dir(&self.dir)?.next().is_some() {
            return Err(RunError::Precondition(self.dir.clone()));
        }
        Ok(())
    }

    /// Flat local path for an artifact: every `/` of the key becomes `_`.
    #[must_use]
    pub fn local_path(&self, key: &str) -> PathBuf {
        self.dir.join(key.replace('/', "_"))
    }
}
