// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!            EntlimError (~16 bytes)
//!                     |
//!         +-----------+-----------+
//!         |           |           |
//!         v           v           v
//!       Rule        Store       Config
//!       Box         Box         Box
//!
//! Sub-errors (unboxed internally):
//!   Rule    MalformedRule, UnknownAttribute
//!   Store   Io, Serialize, UnknownJob, DuplicateJob, InvalidTransition
//!   Config  MissingKey, InvalidValue
//!
//! A rejected admission is not an error: it is a `Decision::Reject`.
//! Only store faults abort an admission check.
//! ```

use thiserror::Error;

use crate::job::JobId;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`EntlimError`].
pub type EntlimResult<T> = std::result::Result<T, EntlimError>;

/// Result type for limit rule parsing and lookup.
pub type RuleResult<T> = std::result::Result<T, RuleError>;

/// Result type for job store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Top-level application error type.
///
/// All sub-errors are boxed to keep this enum at ~16 bytes on the stack.
#[derive(Debug, Error)]
pub enum EntlimError {
    /// Limit rule configuration error.
    #[error("limit error: {0}")]
    Rule(#[from] Box<RuleError>),

    /// Job store fault.
    #[error("store error: {0}")]
    Store(#[from] Box<StoreError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for EntlimError {
                fn from(err: $error) -> Self {
                    EntlimError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    RuleError => Rule,
    StoreError => Store,
    ConfigError => Config,
}

// --- Rule Errors ---

/// Limit rule errors, raised at configuration time only.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A clause of the rule text is syntactically invalid.
    #[error("malformed limit clause '{clause}': {message}")]
    MalformedRule { clause: String, message: String },

    /// The attribute name does not name a limit family.
    #[error("unknown limit attribute '{0}'")]
    UnknownAttribute(String),
}

impl RuleError {
    pub(crate) fn malformed(clause: &str, message: impl Into<String>) -> Self {
        Self::MalformedRule {
            clause: clause.to_string(),
            message: message.into(),
        }
    }
}

// --- Store Errors ---

/// Job store faults. These are the only errors an admission check propagates.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the job snapshot failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The job snapshot could not be encoded or decoded.
    #[error("invalid job snapshot '{path}': {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// No live job has this id.
    #[error("unknown job {0}")]
    UnknownJob(JobId),

    /// A job with this id is already live.
    #[error("job {0} already exists")]
    DuplicateJob(JobId),

    /// The requested transition does not apply to this job.
    #[error("job {id}: {message}")]
    InvalidTransition { id: JobId, message: String },
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required configuration key.
    #[error("missing required config key '{key}' in section '[{section}]'")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}
