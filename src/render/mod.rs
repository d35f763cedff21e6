// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! User-facing rejection messages.
//!
//! ```text
//! scope:  Server -> "complex"        Queue(q) -> "queue q"
//!
//! count     specific  Maximum number of jobs[ in 'Q' state] for <type> <id> already in <scope>
//!           overall   Maximum number of jobs[ in 'Q' state] already in <scope>
//!           generic   would exceed <scope>'s per-<type> limit[ of jobs in 'Q' state]
//! resource  specific  would exceed <type> <id>'s limit on resource <r> in <scope>[ for jobs in 'Q' state]
//!           generic   would exceed per-<type> limit on resource <r> in <scope>[ for jobs in 'Q' state]
//!           overall   would exceed limit on resource <r> in <scope>[ for jobs in 'Q' state]
//! ```
//!
//! The text depends on the [`Diagnostic`] alone.

use crate::admission::Diagnostic;
use crate::limits::{EntityType, Scope, Selector};

#[cfg(test)]
mod tests;

const QUEUED_SUFFIX: &str = " in 'Q' state";

/// Renders `diagnostic` the way the submission front end reports it.
#[must_use]
pub fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let scope = scope_name(&diagnostic.scope);
    let noun = diagnostic.entity_type.noun();
    let queued = diagnostic.is_queued_only();

    match diagnostic.resource() {
        None => render_count(diagnostic, &scope, noun, queued),
        Some(resource) => {
            let filter = if queued { " for jobs in 'Q' state" } else { "" };
            match &diagnostic.selector {
                Selector::Specific(id) => format!(
                    "would exceed {noun} {id}'s limit on resource {resource} in {scope}{filter}"
                ),
                Selector::Generic => format!(
                    "would exceed per-{noun} limit on resource {resource} in {scope}{filter}"
                ),
                Selector::All => {
                    format!("would exceed limit on resource {resource} in {scope}{filter}")
                }
            }
        }
    }
}

fn render_count(diagnostic: &Diagnostic, scope: &str, noun: &str, queued: bool) -> String {
    let state = if queued { QUEUED_SUFFIX } else { "" };
    match &diagnostic.selector {
        Selector::Specific(id) => {
            format!("Maximum number of jobs{state} for {noun} {id} already in {scope}")
        }
        Selector::All => format!("Maximum number of jobs{state} already in {scope}"),
        Selector::Generic => {
            let owner = match (&diagnostic.scope, diagnostic.entity_type) {
                (Scope::Queue(_), EntityType::User) => "queue generic".to_string(),
                _ => scope.to_string(),
            };
            let of_jobs = if queued { " of jobs in 'Q' state" } else { "" };
            format!("would exceed {owner}'s per-{noun} limit{of_jobs}")
        }
    }
}

fn scope_name(scope: &Scope) -> String {
    match scope {
        Scope::Server => "complex".to_string(),
        Scope::Queue(name) => format!("queue {name}"),
    }
}
