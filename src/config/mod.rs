// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for entlim.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. entlim.toml (cwd, optional)
//! 3. --config FILE (repeatable)
//! 4. ENTLIM_* env vars
//! 5. --set KEY=VALUE and dedicated CLI flags
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! ENTLIM_SERVER__NAME=pbs1                       → server.name = "pbs1"
//! ENTLIM_GLOBAL__OUTPUT_LOG_LEVEL=4              → global.output_log_level = 4
//! ENTLIM_LIMITS__MAX_QUEUED="[u:PBS_GENERIC=5]"  → limits.max_queued
//! ```
//!
//! # Limit Scopes
//!
//! ```toml
//! [limits]                 # server ("complex") scope
//! queued_jobs_threshold = "[u:PBS_GENERIC=10]"
//!
//! [limits.max_queued_res]
//! ncpus = "[o:PBS_ALL=64]"
//!
//! [queues.workq]           # queue scope
//! queued_jobs_threshold = "[u:PBS_GENERIC=5]"
//! ```

pub mod loader;
pub mod types;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, EntlimResult, Result};
use crate::limits::{LimitStore, Scope};
use crate::resolve::EntityResolver;

use loader::ConfigLoader;
use types::{GlobalConfig, LimitsConfig, ServerConfig, StoreConfig};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Global options.
    pub global: GlobalConfig,
    /// Server identity and submission defaults.
    pub server: ServerConfig,
    /// Job store location.
    pub store: StoreConfig,
    /// Server-scope limits.
    pub limits: LimitsConfig,
    /// Queue-scope limits by queue name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub queues: BTreeMap<String, LimitsConfig>,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use entlim::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("entlim.toml")
    ///     .with_env_prefix("ENTLIM")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// does not match the `Config` structure, or holds malformed rules.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML, does not match the
    /// `Config` structure, or holds malformed rules.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Every configured limit section with its scope, server first.
    #[must_use]
    pub fn scoped_limits(&self) -> Vec<(Scope, &LimitsConfig)> {
        std::iter::once((Scope::Server, &self.limits))
            .chain(
                self.queues
                    .iter()
                    .map(|(name, limits)| (Scope::queue(name.as_str()), limits)),
            )
            .collect()
    }

    /// Validate server settings and parse every rule text.
    ///
    /// Malformed rules fail here, before any of them can affect admission.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` for empty required settings and
    /// `ConfigError::InvalidValue` naming the attribute of a malformed rule.
    pub fn resolve_and_validate(&mut self) -> Result<()> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                section: "server".to_string(),
                key: "name".to_string(),
            }
            .into());
        }
        if self.server.default_queue.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                section: "server".to_string(),
                key: "default_queue".to_string(),
            }
            .into());
        }
        if self
            .server
            .default_project
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            self.server.default_project = None;
        }

        for (scope, limits) in self.scoped_limits() {
            for (family, text) in limits.entries() {
                if let Err(e) = crate::limits::RuleSet::parse(text) {
                    return Err(ConfigError::InvalidValue {
                        section: section_name(&scope),
                        key: family.attribute_name(),
                        message: e.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Load every configured rule set into `store`.
    ///
    /// # Errors
    ///
    /// Returns `EntlimError::Rule` if a rule text is malformed.
    pub fn install_limits(&self, store: &LimitStore) -> EntlimResult<()> {
        for (scope, limits) in self.scoped_limits() {
            for (family, text) in limits.entries() {
                store.set(scope.clone(), family, text)?;
            }
        }
        Ok(())
    }

    /// Entity resolver honouring `server.default_project`.
    #[must_use]
    pub fn resolver(&self) -> EntityResolver {
        EntityResolver::new().with_default_project(self.server.default_project.clone())
    }

    /// Format configuration options for display.
    ///
    /// Output is deterministically ordered using `BTreeMap`.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_global_options(&mut options);
        self.format_server_options(&mut options);
        self.format_limit_options(&mut options);

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_global_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "global.output_log_level".into(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".into(),
            self.global.file_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.log_file".into(),
            self.global.log_file.display().to_string(),
        );
        options.insert("global.json_log".into(), self.global.json_log.to_string());
    }

    fn format_server_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("server.name".into(), self.server.name.clone());
        options.insert(
            "server.default_queue".into(),
            self.server.default_queue.clone(),
        );
        if let Some(project) = &self.server.default_project {
            options.insert("server.default_project".into(), project.clone());
        }
        options.insert("store.path".into(), self.store.path.display().to_string());
    }

    fn format_limit_options(&self, options: &mut BTreeMap<String, String>) {
        for (scope, limits) in self.scoped_limits() {
            let section = section_name(&scope);
            for (family, text) in limits.entries() {
                options.insert(format!("{section}.{family}"), text.to_string());
            }
        }
    }
}

fn section_name(scope: &Scope) -> String {
    match scope {
        Scope::Server => "limits".to_string(),
        Scope::Queue(name) => format!("queues.{name}"),
    }
}
