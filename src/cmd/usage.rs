// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Usage command: current per-entity usage against the configured limits.

use super::Session;
use crate::cli::job::UsageArgs;
use crate::error::Result;
use crate::limits::{LimitTable, Scope};
use crate::resolve::EntityResolver;
use crate::usage::{UsageAccountant, UsageIndex};

/// Print usage of every entity with live jobs in the selected scope.
///
/// # Errors
///
/// Returns an error if the job store cannot be read.
pub async fn run_usage_command(args: &UsageArgs, session: &Session) -> Result<()> {
    let scope = args
        .queue
        .as_deref()
        .map_or(Scope::Server, Scope::queue);
    let engine = session.engine();
    let accountant = UsageAccountant::new(engine.store().as_ref(), engine.resolver());
    let index = accountant.index(&scope, None).await?;

    let lines = usage_report(&engine.limits().snapshot(), &index);
    if lines.is_empty() {
        println!("No live jobs in {scope}");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Report lines: one per entity, then one per family that constrains it.
#[must_use]
pub fn usage_report(table: &LimitTable, index: &UsageIndex) -> Vec<String> {
    let scope = index.scope();
    let mut lines = Vec::new();

    for (entity, tally) in index.tallies() {
        lines.push(format!(
            "{entity}: queued={} live={}",
            tally.queued_jobs, tally.live_jobs
        ));
        for family in table.families(scope) {
            if let Some(rule) = EntityResolver::rule_for(table, scope, family, entity) {
                lines.push(format!(
                    "  {family}: {}/{} [{}:{}]",
                    tally.get(family),
                    rule.bound,
                    rule.entity_type.code(),
                    rule.selector.rule_id()
                ));
            }
        }
    }
    lines
}
