// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Limit rules: scopes, families, entity types and selectors.
//!
//! # Rule Model
//!
//! ```text
//! (scope, family) --set "[u:PBS_GENERIC=10],[u:bob=5]"--> RuleSet
//!
//! scope     Server ("complex") | Queue(name)
//! family    queued_jobs_threshold          count,    'Q' only
//!           max_queued                     count,    any live state
//!           queued_jobs_threshold_res.<r>  resource, 'Q' only
//!           max_queued_res.<r>             resource, any live state
//! entity    u | g | p | o
//! selector  <id> | PBS_GENERIC | PBS_ALL (o only)
//! ```
//!
//! At most one bound exists per (scope, family, entity type, selector);
//! a `set` replaces the whole rule set of its (scope, family).

pub mod parse;
pub mod store;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};
use crate::job::{Job, StateSet};

pub use parse::RuleSet;
pub use store::{LimitStore, LimitTable};

/// Selector id matching any entity of a type that has no specific rule.
pub const GENERIC_ID: &str = "PBS_GENERIC";

/// Selector id of the overall ("everyone") aggregate.
pub const ALL_ID: &str = "PBS_ALL";

const QUEUED_COUNT_ATTR: &str = "queued_jobs_threshold";
const ANY_COUNT_ATTR: &str = "max_queued";
const QUEUED_RES_ATTR: &str = "queued_jobs_threshold_res";
const ANY_RES_ATTR: &str = "max_queued_res";

/// Level at which a rule is enforced. Server orders before any queue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Scope {
    /// The whole server, reported to users as "complex".
    Server,
    /// A single named queue.
    Queue(String),
}

impl Scope {
    #[must_use]
    pub fn queue(name: impl Into<String>) -> Self {
        Self::Queue(name.into())
    }

    /// Returns whether `job` belongs to this scope.
    #[must_use]
    pub fn contains(&self, job: &Job) -> bool {
        match self {
            Self::Server => true,
            Self::Queue(name) => job.queue() == name,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Queue(name) => write!(f, "queue {name}"),
        }
    }
}

/// The four limit kinds. Resource families carry the resource name.
///
/// Variant order is the evaluation order within a scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "resource", rename_all = "snake_case")]
pub enum Family {
    JobCountQueuedOnly,
    JobCountAny,
    ResourceQueuedOnly(String),
    ResourceAny(String),
}

impl Family {
    /// Parses a configuration attribute name such as `max_queued_res.ncpus`.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::UnknownAttribute` for names that are not limit
    /// attributes or resource attributes without a resource name.
    pub fn from_attribute(name: &str) -> RuleResult<Self> {
        let unknown = || RuleError::UnknownAttribute(name.to_string());
        match name.split_once('.') {
            None => match name {
                QUEUED_COUNT_ATTR => Ok(Self::JobCountQueuedOnly),
                ANY_COUNT_ATTR => Ok(Self::JobCountAny),
                _ => Err(unknown()),
            },
            Some((_, "")) => Err(unknown()),
            Some((QUEUED_RES_ATTR, resource)) => Ok(Self::ResourceQueuedOnly(resource.to_string())),
            Some((ANY_RES_ATTR, resource)) => Ok(Self::ResourceAny(resource.to_string())),
            Some(_) => Err(unknown()),
        }
    }

    /// Returns the configuration attribute name of this family.
    #[must_use]
    pub fn attribute_name(&self) -> String {
        match self {
            Self::JobCountQueuedOnly => QUEUED_COUNT_ATTR.to_string(),
            Self::JobCountAny => ANY_COUNT_ATTR.to_string(),
            Self::ResourceQueuedOnly(resource) => format!("{QUEUED_RES_ATTR}.{resource}"),
            Self::ResourceAny(resource) => format!("{ANY_RES_ATTR}.{resource}"),
        }
    }

    /// Job states counted by this family.
    #[must_use]
    pub const fn states(&self) -> StateSet {
        if self.is_queued_only() {
            StateSet::QUEUED
        } else {
            StateSet::LIVE
        }
    }

    #[must_use]
    pub const fn is_queued_only(&self) -> bool {
        matches!(self, Self::JobCountQueuedOnly | Self::ResourceQueuedOnly(_))
    }

    /// Resource name for resource families, `None` for count families.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::ResourceQueuedOnly(resource) | Self::ResourceAny(resource) => Some(resource),
            Self::JobCountQueuedOnly | Self::JobCountAny => None,
        }
    }

    /// Contribution of `job` to this family's usage.
    #[must_use]
    pub fn contribution(&self, job: &Job) -> u64 {
        match self.resource() {
            Some(resource) => job.resource_usage(resource, self.states()),
            None => job.units(self.states()),
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.attribute_name())
    }
}

/// Kind of entity a rule constrains. Variant order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Group,
    Project,
    Overall,
}

impl EntityType {
    /// All entity types in evaluation order.
    pub const ALL: [Self; 4] = [Self::User, Self::Group, Self::Project, Self::Overall];

    /// Returns the rule-syntax letter.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::User => 'u',
            Self::Group => 'g',
            Self::Project => 'p',
            Self::Overall => 'o',
        }
    }

    #[must_use]
    pub const fn from_code(code: &str) -> Option<Self> {
        match code.as_bytes() {
            b"u" => Some(Self::User),
            b"g" => Some(Self::Group),
            b"p" => Some(Self::Project),
            b"o" => Some(Self::Overall),
            _ => None,
        }
    }

    /// Returns the noun used in messages.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Project => "project",
            Self::Overall => "overall",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.noun())
    }
}

/// Which entities of a type a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Selector {
    /// Exactly one entity id.
    Specific(String),
    /// Any entity of the type without a specific rule.
    Generic,
    /// The overall aggregate; always paired with `EntityType::Overall`.
    All,
}

impl Selector {
    #[must_use]
    pub const fn is_specific(&self) -> bool {
        matches!(self, Self::Specific(_))
    }

    /// Returns the id as written in rule text.
    #[must_use]
    pub fn rule_id(&self) -> &str {
        match self {
            Self::Specific(id) => id,
            Self::Generic => GENERIC_ID,
            Self::All => ALL_ID,
        }
    }
}

/// One configured bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRule {
    pub scope: Scope,
    pub family: Family,
    pub entity_type: EntityType,
    pub selector: Selector,
    pub bound: u64,
}

impl std::fmt::Display for LimitRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: [{}:{}={}]",
            self.scope,
            self.family,
            self.entity_type.code(),
            self.selector.rule_id(),
            self.bound
        )
    }
}
