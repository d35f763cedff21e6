// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::render_diagnostic;
use crate::admission::Diagnostic;
use crate::limits::{EntityType, Family, Scope, Selector};

fn render(scope: Scope, family: Family, entity_type: EntityType, selector: Selector) -> String {
    render_diagnostic(&Diagnostic {
        scope,
        family,
        entity_type,
        selector,
        bound: 1,
    })
}

fn bob() -> Selector {
    Selector::Specific("bob".into())
}

#[test]
fn test_count_specific() {
    insta::assert_snapshot!(
        render(Scope::Server, Family::JobCountAny, EntityType::User, bob()),
        @"Maximum number of jobs for user bob already in complex"
    );
    insta::assert_snapshot!(
        render(Scope::queue("workq"), Family::JobCountQueuedOnly, EntityType::Project, Selector::Specific("p1".into())),
        @"Maximum number of jobs in 'Q' state for project p1 already in queue workq"
    );
}

#[test]
fn test_count_overall() {
    insta::assert_snapshot!(
        render(Scope::Server, Family::JobCountQueuedOnly, EntityType::Overall, Selector::All),
        @"Maximum number of jobs in 'Q' state already in complex"
    );
    insta::assert_snapshot!(
        render(Scope::queue("workq"), Family::JobCountAny, EntityType::Overall, Selector::All),
        @"Maximum number of jobs already in queue workq"
    );
}

#[test]
fn test_count_generic() {
    insta::assert_snapshot!(
        render(Scope::Server, Family::JobCountAny, EntityType::Group, Selector::Generic),
        @"would exceed complex's per-group limit"
    );
    insta::assert_snapshot!(
        render(Scope::Server, Family::JobCountQueuedOnly, EntityType::User, Selector::Generic),
        @"would exceed complex's per-user limit of jobs in 'Q' state"
    );
    insta::assert_snapshot!(
        render(Scope::queue("workq"), Family::JobCountQueuedOnly, EntityType::Project, Selector::Generic),
        @"would exceed queue workq's per-project limit of jobs in 'Q' state"
    );
}

#[test]
fn test_queue_generic_user_count_wording() {
    insta::assert_snapshot!(
        render(Scope::queue("workq"), Family::JobCountAny, EntityType::User, Selector::Generic),
        @"would exceed queue generic's per-user limit"
    );
}

#[test]
fn test_resource_messages() {
    let ncpus = || Family::ResourceAny("ncpus".into());
    let queued_ncpus = || Family::ResourceQueuedOnly("ncpus".into());

    insta::assert_snapshot!(
        render(Scope::Server, ncpus(), EntityType::User, bob()),
        @"would exceed user bob's limit on resource ncpus in complex"
    );
    insta::assert_snapshot!(
        render(Scope::queue("workq"), queued_ncpus(), EntityType::Group, Selector::Generic),
        @"would exceed per-group limit on resource ncpus in queue workq for jobs in 'Q' state"
    );
    insta::assert_snapshot!(
        render(Scope::Server, queued_ncpus(), EntityType::Overall, Selector::All),
        @"would exceed limit on resource ncpus in complex for jobs in 'Q' state"
    );
}

#[test]
fn test_identical_diagnostics_render_identically() {
    let diagnostic = Diagnostic {
        scope: Scope::queue("q2"),
        family: Family::ResourceAny("mem".into()),
        entity_type: EntityType::Project,
        selector: Selector::Generic,
        bound: 10,
    };
    assert_eq!(
        render_diagnostic(&diagnostic),
        render_diagnostic(&diagnostic.clone())
    );
}
