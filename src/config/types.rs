// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration types for entlim.
//!
//! # Config Structure
//!
//! ```text
//! Config: GlobalConfig, ServerConfig, StoreConfig,
//!         LimitsConfig (server scope), queue name -> LimitsConfig
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::limits::Family;
use crate::logging::LogLevel;

/// Global configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log level for console output (0-6).
    pub output_log_level: LogLevel,
    /// Log level for file output (0-6).
    pub file_log_level: LogLevel,
    /// Path to log file.
    pub log_file: PathBuf,
    /// Write the log file as JSON lines.
    pub json_log: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::TRACE,
            log_file: PathBuf::from("entlim.log"),
            json_log: false,
        }
    }
}

/// Server identity and defaults applied to submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Server name, used as the job id suffix.
    pub name: String,
    /// Queue for submissions that name none.
    pub default_queue: String,
    /// Project assigned to jobs submitted without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "server".to_string(),
            default_queue: "workq".to_string(),
            default_project: None,
        }
    }
}

/// Job store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// JSON snapshot of the live job population.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("jobs.json"),
        }
    }
}

/// Limit attributes of one scope, as rule text.
///
/// ```toml
/// queued_jobs_threshold = "[u:PBS_GENERIC=10]"
/// max_queued = "[o:PBS_ALL=100]"
///
/// [max_queued_res]
/// ncpus = "[u:bob=4]"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_jobs_threshold: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queued: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub queued_jobs_threshold_res: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub max_queued_res: BTreeMap<String, String>,
}

impl LimitsConfig {
    /// Every configured (family, rule text) pair in evaluation order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Family, &str)> {
        let mut entries = Vec::new();
        if let Some(text) = &self.queued_jobs_threshold {
            entries.push((Family::JobCountQueuedOnly, text.as_str()));
        }
        if let Some(text) = &self.max_queued {
            entries.push((Family::JobCountAny, text.as_str()));
        }
        for (resource, text) in &self.queued_jobs_threshold_res {
            entries.push((Family::ResourceQueuedOnly(resource.clone()), text.as_str()));
        }
        for (resource, text) in &self.max_queued_res {
            entries.push((Family::ResourceAny(resource.clone()), text.as_str()));
        }
        entries
    }
}
