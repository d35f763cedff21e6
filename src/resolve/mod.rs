// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entity resolution: which rule constrains a job for a given entity type.
//!
//! ```text
//! job --entity_of(type)--> EntityKey
//!                             |
//!         rule set of (scope, family)
//!                             |
//!   type = o:  [o:PBS_ALL]                      --> All
//!   otherwise: [t:<id>]       present           --> Specific   (shadows generic)
//!              [t:PBS_GENERIC] present          --> Generic
//!              neither                          --> unconstrained
//!
//! project: job's own, else the configured default, else none
//!          (no project => no project rule ever applies)
//! ```

use serde::{Deserialize, Serialize};

use crate::job::Job;
use crate::limits::{EntityType, Family, LimitRule, LimitTable, Scope, Selector};

#[cfg(test)]
mod tests;

/// One concrete entity a job is accounted against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityKey {
    User(String),
    Group(String),
    Project(String),
    Overall,
}

impl EntityKey {
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::User(_) => EntityType::User,
            Self::Group(_) => EntityType::Group,
            Self::Project(_) => EntityType::Project,
            Self::Overall => EntityType::Overall,
        }
    }

    /// Entity id, `None` for the overall aggregate.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::User(id) | Self::Group(id) | Self::Project(id) => Some(id),
            Self::Overall => None,
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}:{id}", self.entity_type().code()),
            None => f.write_str("o:PBS_ALL"),
        }
    }
}

/// Derives entity identities from jobs and picks the rule that applies.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    default_project: Option<String>,
}

impl EntityResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs submitted without a project are accounted to `project` instead.
    #[must_use]
    pub fn with_default_project(mut self, project: Option<String>) -> Self {
        self.default_project = project;
        self
    }

    #[must_use]
    pub fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref()
    }

    /// Effective project of `job`.
    #[must_use]
    pub fn project_of<'a>(&'a self, job: &'a Job) -> Option<&'a str> {
        job.owner()
            .project
            .as_deref()
            .or(self.default_project.as_deref())
    }

    /// Entity of `job` for `entity_type`, or `None` if the job has none.
    #[must_use]
    pub fn entity_of(&self, job: &Job, entity_type: EntityType) -> Option<EntityKey> {
        match entity_type {
            EntityType::User => Some(EntityKey::User(job.owner().user.clone())),
            EntityType::Group => Some(EntityKey::Group(job.owner().group.clone())),
            EntityType::Project => self
                .project_of(job)
                .map(|project| EntityKey::Project(project.to_string())),
            EntityType::Overall => Some(EntityKey::Overall),
        }
    }

    /// Every entity `job` is accounted against, in evaluation order.
    #[must_use]
    pub fn entities_of(&self, job: &Job) -> Vec<EntityKey> {
        EntityType::ALL
            .into_iter()
            .filter_map(|entity_type| self.entity_of(job, entity_type))
            .collect()
    }

    /// Rule of (scope, family) constraining `job` as `entity_type`.
    ///
    /// A specific rule for the job's id always wins over the generic rule,
    /// whichever bound is looser.
    #[must_use]
    pub fn applicable_rule(
        &self,
        table: &LimitTable,
        scope: &Scope,
        family: &Family,
        entity_type: EntityType,
        job: &Job,
    ) -> Option<LimitRule> {
        let entity = self.entity_of(job, entity_type)?;
        Self::rule_for(table, scope, family, &entity)
    }

    /// Rule of (scope, family) constraining `entity`.
    #[must_use]
    pub fn rule_for(
        table: &LimitTable,
        scope: &Scope,
        family: &Family,
        entity: &EntityKey,
    ) -> Option<LimitRule> {
        let set = table.rule_set(scope, family)?;
        let entity_type = entity.entity_type();

        let (selector, bound) = match entity.id() {
            None => (Selector::All, set.get(EntityType::Overall, &Selector::All)?),
            Some(id) => {
                let specific = Selector::Specific(id.to_string());
                match set.get(entity_type, &specific) {
                    Some(bound) => (specific, bound),
                    None => (
                        Selector::Generic,
                        set.get(entity_type, &Selector::Generic)?,
                    ),
                }
            }
        };

        Some(LimitRule {
            scope: scope.clone(),
            family: family.clone(),
            entity_type,
            selector,
            bound,
        })
    }
}
