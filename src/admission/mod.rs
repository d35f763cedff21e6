// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Admission decisions for submissions, array submissions and alterations.
//!
//! # Check Order
//!
//! ```text
//! gate.lock()
//!   limits.snapshot()
//!   for scope in [Server, Queue(job.queue)]
//!       index = UsageIndex::build(store.live_jobs(scope), exclude?)
//!       for family in table.families(scope)           (JCQ, JCA, ResQ.., ResAny..)
//!           delta = family.contribution(candidate)
//!           for entity_type in [u, g, p, o]
//!               rule = rule_for(entity)      -> none: skip
//!               usage + delta > bound        -> Reject(rule)   first violation wins
//!   commit (job, or alteration)              -> Accept
//! gate released
//! ```
//!
//! A zero delta is still compared: an entity already above a lowered bound
//! is refused anything in that family until its usage drops. Alterations
//! re-read the job under the gate and are checked from its current record.
//!
//! The gate is held across the whole sequence so concurrent requests can
//! never both observe room under a bound and both commit.
//!
//! A rejection is a [`Decision`], not an error; only a failing job store
//! aborts a call.

mod diagnostic;


use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::StoreResult;
use crate::job::{Job, JobId, ResourceList};
use crate::limits::{Family, LimitStore, LimitTable, Scope};
use crate::resolve::EntityResolver;
use crate::store::JobStore;
use crate::usage::{UsageAccountant, UsageIndex};

pub use diagnostic::{Decision, Diagnostic};

/// What an admission call would add to the live population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    candidate: Job,
    exclude: Option<JobId>,
    resources: Option<BTreeSet<String>>,
}

impl Proposal {
    /// A new job, counted as it would be stored.
    #[must_use]
    pub const fn single(job: Job) -> Self {
        Self {
            candidate: job,
            exclude: None,
            resources: None,
        }
    }

    /// A new array parent declaring `count` subjobs.
    #[must_use]
    pub fn array(job: Job, count: NonZeroU32) -> Self {
        Self::single(job.into_array(count))
    }

    /// `existing` with `footprint` applied, replacing its old contribution.
    ///
    /// Only the resource families of the resources named in `footprint`
    /// are checked.
    #[must_use]
    pub fn alteration(existing: &Job, footprint: &ResourceList) -> Self {
        Self {
            candidate: existing.with_footprint(footprint),
            exclude: Some(existing.id().clone()),
            resources: Some(footprint.keys().cloned().collect()),
        }
    }

    #[must_use]
    pub const fn candidate(&self) -> &Job {
        &self.candidate
    }

    /// Scopes this proposal is checked in, server first.
    #[must_use]
    pub fn scopes(&self) -> [Scope; 2] {
        [Scope::Server, Scope::queue(self.candidate.queue())]
    }

    fn checks(&self, family: &Family) -> bool {
        match &self.resources {
            None => true,
            Some(resources) => family
                .resource()
                .is_some_and(|resource| resources.contains(resource)),
        }
    }
}

/// Evaluates `proposal` against `table` using one usage index per scope.
///
/// `indexes` must be built without the job the proposal replaces, in the
/// order of [`Proposal::scopes`].
#[must_use]
pub fn evaluate(
    table: &LimitTable,
    resolver: &EntityResolver,
    indexes: &[UsageIndex],
    proposal: &Proposal,
) -> Decision {
    let candidate = proposal.candidate();

    for index in indexes {
        let scope = index.scope();
        for family in table.families(scope) {
            if !proposal.checks(family) {
                continue;
            }
            let delta = family.contribution(candidate);

            for entity in resolver.entities_of(candidate) {
                let Some(rule) = EntityResolver::rule_for(table, scope, family, &entity) else {
                    continue;
                };

                let usage = index.usage(family, &entity);
                let proposed = usage.saturating_add(delta);
                tracing::debug!(
                    job = %candidate.id(),
                    rule = %rule,
                    entity = %entity,
                    usage,
                    delta,
                    "Checking limit"
                );
                if proposed > rule.bound {
                    return Decision::Reject(Diagnostic::from(rule));
                }
            }
        }
    }

    Decision::Accept
}

/// Serializes admission checks against one job store.
pub struct AdmissionEngine<S: JobStore> {
    limits: Arc<LimitStore>,
    store: Arc<S>,
    resolver: EntityResolver,
    gate: Mutex<()>,
}

impl<S: JobStore> AdmissionEngine<S> {
    #[must_use]
    pub fn new(limits: Arc<LimitStore>, store: Arc<S>, resolver: EntityResolver) -> Self {
        Self {
            limits,
            store,
            resolver,
            gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn limits(&self) -> &Arc<LimitStore> {
        &self.limits
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub const fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Admits a single job, committing it on acceptance.
    ///
    /// # Errors
    ///
    /// Returns the store fault if live jobs cannot be read or the commit
    /// fails; nothing is committed in that case.
    pub async fn admit_single(&self, job: Job) -> StoreResult<Decision> {
        self.admit(Proposal::single(job)).await
    }

    /// Admits an array of `count` subjobs as one unit.
    ///
    /// Either the whole array is committed as a single parent record or
    /// nothing is.
    ///
    /// # Errors
    ///
    /// Returns the store fault if live jobs cannot be read or the commit
    /// fails.
    pub async fn admit_array(&self, job: Job, count: NonZeroU32) -> StoreResult<Decision> {
        self.admit(Proposal::array(job, count)).await
    }

    /// Re-checks an admitted job whose resources change to `footprint`,
    /// committing the alteration on acceptance.
    ///
    /// Only the id of `existing` is used; the job is re-read from the store
    /// once the gate is held, so a state change since the caller's read is
    /// taken into account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownJob` if the job is no longer live, or the
    /// store fault if live jobs cannot be read or the commit fails.
    pub async fn reevaluate_alteration(
        &self,
        existing: &Job,
        footprint: ResourceList,
    ) -> StoreResult<Decision> {
        let _gate = self.gate.lock().await;

        let current = self.store.live_job(existing.id()).await?;
        let proposal = Proposal::alteration(&current, &footprint);
        let decision = self.decide(&proposal).await?;
        if decision.is_accept() {
            self.store
                .commit_alteration(existing.id(), &footprint)
                .await?;
        }
        log_decision(existing.id(), &decision);
        Ok(decision)
    }

    async fn admit(&self, proposal: Proposal) -> StoreResult<Decision> {
        let _gate = self.gate.lock().await;

        let decision = self.decide(&proposal).await?;
        let id = proposal.candidate.id().clone();
        if decision.is_accept() {
            self.store.commit_job(proposal.candidate).await?;
        }
        log_decision(&id, &decision);
        Ok(decision)
    }

    /// Snapshot, index and evaluate. Callers hold the gate.
    async fn decide(&self, proposal: &Proposal) -> StoreResult<Decision> {
        let table = self.limits.snapshot();
        let accountant = UsageAccountant::new(self.store.as_ref(), &self.resolver);

        let mut indexes = Vec::with_capacity(2);
        for scope in proposal.scopes() {
            if table.families(&scope).next().is_none() {
                continue;
            }
            indexes.push(accountant.index(&scope, proposal.exclude.as_ref()).await?);
        }

        Ok(evaluate(&table, &self.resolver, &indexes, proposal))
    }
}

fn log_decision(job: &JobId, decision: &Decision) {
    match decision {
        Decision::Accept => tracing::info!(job = %job, "Admitted"),
        Decision::Reject(diagnostic) => {
            tracing::info!(job = %job, rule = %diagnostic, "Rejected");
        }
    }
}
