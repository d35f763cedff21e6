// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! CLI args --> cmd::run_* handlers
//!   config: options, inis, check-rule
//!   job:    submit, alter, state, expand, finish, jobs
//!   usage:  usage
//!
//! Session::open(config)
//!   StoreLock::acquire(store.path)     (held until the session drops)
//!   MemoryJobStore::load(store.path)   (restart path, every invocation)
//!   LimitStore <- config.install_limits
//!   AdmissionEngine
//! ```

pub mod config;
pub mod job;
pub mod usage;

use std::path::PathBuf;
use std::sync::Arc;

use crate::admission::AdmissionEngine;
use crate::config::Config;
use crate::error::EntlimResult;
use crate::limits::LimitStore;
use crate::store::{MemoryJobStore, StoreLock};

/// How a command ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The request was refused; carries the message for the user.
    Rejected(String),
}

/// Live state of one invocation: configuration, rules and job store.
///
/// A session owns the store lock, so two sessions on one snapshot never
/// overlap between load and save.
pub struct Session {
    config: Config,
    store_path: PathBuf,
    engine: AdmissionEngine<MemoryJobStore>,
    _lock: StoreLock,
}

impl Session {
    /// Locks and loads the job store, then installs the configured limits.
    ///
    /// Blocks while another session holds the same store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be locked or read, or a rule is
    /// malformed.
    pub fn open(config: Config) -> EntlimResult<Self> {
        let store_path = config.store.path.clone();
        let lock = StoreLock::acquire(&store_path)?;
        let store = MemoryJobStore::load(&store_path)?;
        tracing::debug!(path = %store_path.display(), jobs = store.len(), "Job store loaded");

        let limits = LimitStore::new();
        config.install_limits(&limits)?;

        let engine = AdmissionEngine::new(Arc::new(limits), Arc::new(store), config.resolver());
        Ok(Self {
            config,
            store_path,
            engine,
            _lock: lock,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn engine(&self) -> &AdmissionEngine<MemoryJobStore> {
        &self.engine
    }

    #[must_use]
    pub fn store(&self) -> &MemoryJobStore {
        self.engine.store()
    }

    /// Persists the job store.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn save(&self) -> EntlimResult<()> {
        self.store().save(&self.store_path)?;
        tracing::debug!(path = %self.store_path.display(), "Job store saved");
        Ok(())
    }
}
