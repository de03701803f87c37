// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cross-process mutual exclusion through an advisory lock on the PID file.
//!
//! The lock is a non-blocking exclusive `flock(2)`. It is held for as long as
//! the [`ProcessLock`] guard lives and is released by the kernel when the
//! process exits, including after a crash. The file itself is never removed.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{flock, FlockArg};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ProcessLock {
    file: File,
    path: PathBuf,
}

impl ProcessLock {
    /// Tries to take the lock without blocking.
    ///
    /// Returns `Ok(None)` when another process holds it. On success the file
    /// is truncated and our PID written to it.
    pub fn try_acquire(path: impl AsRef<Path>) -> io::Result<Option<ProcessLock>> {
        let path = path.as_ref();
        // No truncate on open: the running instance's PID stays readable until we own the lock.
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => {}
            Err(Errno::EWOULDBLOCK) => {
                debug!("Lock on {} is held by another process", path.display());
                return Ok(None);
            }
            Err(errno) => return Err(io::Error::from(errno)),
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Some(ProcessLock {
            file,
            path: path.to_path_buf(),
        }))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if let Err(errno) = flock(self.file.as_raw_fd(), FlockArg::Unlock) {
            warn!("Failed to release lock on {}: {}", self.path.display(), errno);
        }
    }
}
