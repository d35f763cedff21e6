// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exclusive lock over one job snapshot.
//!
//! ```text
//! jobs.json       snapshot
//! jobs.json.lock  flock'd for load -> decide -> commit -> save
//! ```
//!
//! Every process that reads a snapshot in order to rewrite it holds this
//! lock for the whole sequence. The lock is released when dropped.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{StoreError, StoreResult};

const LOCK_SUFFIX: &str = ".lock";

/// Exclusive hold on the snapshot at a given path.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Lock file guarding the snapshot at `store`.
    #[must_use]
    pub fn path_for(store: &Path) -> PathBuf {
        let mut name = store.as_os_str().to_os_string();
        name.push(LOCK_SUFFIX);
        PathBuf::from(name)
    }

    /// Blocks until no other holder has the lock on `store`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the lock file cannot be opened or locked.
    pub fn acquire(store: &Path) -> StoreResult<Self> {
        let (file, path) = open(store)?;
        FileExt::lock_exclusive(&file).map_err(|source| io_error(&path, source))?;
        tracing::debug!(path = %path.display(), "Store lock acquired");
        Ok(Self { _file: file, path })
    }

    /// Takes the lock on `store` if it is free, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the lock file cannot be opened or locking
    /// fails for a reason other than contention.
    pub fn try_acquire(store: &Path) -> StoreResult<Option<Self>> {
        let (file, path) = open(store)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self { _file: file, path })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(source) => Err(io_error(&path, source)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open(store: &Path) -> StoreResult<(File, PathBuf)> {
    let path = StoreLock::path_for(store);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|source| io_error(&path, source))?;
    Ok((file, path))
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
