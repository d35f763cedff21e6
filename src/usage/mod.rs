// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Usage accounting over the live job population.
//!
//! ```text
//! live_jobs(scope) ----+
//!                      |  one pass, jobs outside scope / not live skipped
//!                      v
//!   UsageIndex: EntityKey -> Tally
//!                              queued jobs     (Q units)
//!                              live jobs       (all live units)
//!                              queued res[r]   (Q units x qty)
//!                              live res[r]     (live units x qty)
//!
//! usage(family, entity) = lookup
//! ```
//!
//! Nothing here survives a call: every admission check builds a fresh index
//! from the store, so a restarted process needs no counter rebuild.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::StoreResult;
use crate::job::{Job, JobId, StateSet};
use crate::limits::{Family, Scope};
use crate::resolve::{EntityKey, EntityResolver};
use crate::store::JobStore;


/// (scope, family, entity) whose usage is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsagePredicate {
    pub scope: Scope,
    pub family: Family,
    pub entity: EntityKey,
}

impl UsagePredicate {
    #[must_use]
    pub const fn new(scope: Scope, family: Family, entity: EntityKey) -> Self {
        Self {
            scope,
            family,
            entity,
        }
    }

    /// Returns whether `job` is accounted under this predicate at all.
    #[must_use]
    pub fn selects(&self, job: &Job, resolver: &EntityResolver) -> bool {
        job.is_live()
            && self.scope.contains(job)
            && resolver.entity_of(job, self.entity.entity_type()).as_ref() == Some(&self.entity)
    }

    /// Usage of a single job under this predicate.
    #[must_use]
    pub fn contribution(&self, job: &Job, resolver: &EntityResolver) -> u64 {
        if self.selects(job, resolver) {
            self.family.contribution(job)
        } else {
            0
        }
    }
}

/// Usage of one predicate by a direct scan of `jobs`.
#[must_use]
pub fn usage(jobs: &[Job], predicate: &UsagePredicate, resolver: &EntityResolver) -> u64 {
    jobs.iter()
        .map(|job| predicate.contribution(job, resolver))
        .fold(0, u64::saturating_add)
}

/// Usage totals of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub queued_jobs: u64,
    pub live_jobs: u64,
    pub queued_resources: BTreeMap<String, u64>,
    pub live_resources: BTreeMap<String, u64>,
}

impl Tally {
    fn add(&mut self, job: &Job) {
        let queued = job.units(StateSet::QUEUED);
        let live = job.units(StateSet::LIVE);
        self.queued_jobs = self.queued_jobs.saturating_add(queued);
        self.live_jobs = self.live_jobs.saturating_add(live);

        for (name, quantity) in job.resources() {
            let queued_total = self.queued_resources.entry(name.clone()).or_default();
            *queued_total = queued_total.saturating_add(queued.saturating_mul(*quantity));
            let live_total = self.live_resources.entry(name.clone()).or_default();
            *live_total = live_total.saturating_add(live.saturating_mul(*quantity));
        }
    }

    /// Usage under `family`.
    #[must_use]
    pub fn get(&self, family: &Family) -> u64 {
        let from = |map: &BTreeMap<String, u64>, resource: &str| map.get(resource).copied().unwrap_or(0);
        match family {
            Family::JobCountQueuedOnly => self.queued_jobs,
            Family::JobCountAny => self.live_jobs,
            Family::ResourceQueuedOnly(resource) => from(&self.queued_resources, resource),
            Family::ResourceAny(resource) => from(&self.live_resources, resource),
        }
    }
}

/// Per-entity usage of one scope, built in a single pass.
#[derive(Debug, Clone)]
pub struct UsageIndex {
    scope: Scope,
    tallies: HashMap<EntityKey, Tally>,
}

impl UsageIndex {
    /// Indexes the live jobs of `scope` among `jobs`, skipping `exclude`.
    #[must_use]
    pub fn build<'a>(
        jobs: impl IntoIterator<Item = &'a Job>,
        scope: &Scope,
        resolver: &EntityResolver,
        exclude: Option<&JobId>,
    ) -> Self {
        let mut tallies: HashMap<EntityKey, Tally> = HashMap::new();
        for job in jobs {
            if !job.is_live() || !scope.contains(job) || exclude == Some(job.id()) {
                continue;
            }
            for entity in resolver.entities_of(job) {
                tallies.entry(entity).or_default().add(job);
            }
        }
        Self {
            scope: scope.clone(),
            tallies,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Current usage of `entity` under `family`.
    #[must_use]
    pub fn usage(&self, family: &Family, entity: &EntityKey) -> u64 {
        self.tallies.get(entity).map_or(0, |tally| tally.get(family))
    }

    /// Usage for `predicate`, which must name this index's scope.
    #[must_use]
    pub fn usage_of(&self, predicate: &UsagePredicate) -> u64 {
        debug_assert_eq!(predicate.scope, self.scope);
        self.usage(&predicate.family, &predicate.entity)
    }

    /// Tallies sorted by entity.
    #[must_use]
    pub fn tallies(&self) -> Vec<(&EntityKey, &Tally)> {
        let mut tallies: Vec<_> = self.tallies.iter().collect();
        tallies.sort_by(|a, b| a.0.cmp(b.0));
        tallies
    }
}

/// Computes usage on demand from a [`JobStore`].
pub struct UsageAccountant<'a, S: JobStore + ?Sized> {
    store: &'a S,
    resolver: &'a EntityResolver,
}

impl<'a, S: JobStore + ?Sized> UsageAccountant<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, resolver: &'a EntityResolver) -> Self {
        Self { store, resolver }
    }

    /// Usage of one predicate against the population as it is now.
    ///
    /// # Errors
    ///
    /// Propagates the store fault if the live jobs cannot be read.
    pub async fn usage(&self, predicate: &UsagePredicate) -> StoreResult<u64> {
        let jobs = self.store.live_jobs(&predicate.scope).await?;
        Ok(usage(&jobs, predicate, self.resolver))
    }

    /// Fresh index of `scope`, optionally leaving one job out.
    ///
    /// # Errors
    ///
    /// Propagates the store fault if the live jobs cannot be read.
    pub async fn index(&self, scope: &Scope, exclude: Option<&JobId>) -> StoreResult<UsageIndex> {
        let jobs = self.store.live_jobs(scope).await?;
        Ok(UsageIndex::build(&jobs, scope, self.resolver, exclude))
    }
}
