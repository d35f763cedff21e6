// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{EntityKey, EntityResolver};
use crate::job::{Job, Owner};
use crate::limits::{EntityType, Family, LimitStore, Scope, Selector};

fn job_for(owner: Owner) -> Job {
    Job::builder()
        .with_id("1.server")
        .with_owner(owner)
        .with_queue("workq")
        .build()
}

fn store_with(text: &str) -> LimitStore {
    let store = LimitStore::new();
    store.set(Scope::Server, Family::JobCountAny, text).unwrap();
    store
}

#[test]
fn test_specific_rule_shadows_generic_even_when_looser() {
    let store = store_with("[u:PBS_GENERIC=2],[u:alice=50]");
    let table = store.snapshot();
    let resolver = EntityResolver::new();

    let rule = resolver
        .applicable_rule(
            &table,
            &Scope::Server,
            &Family::JobCountAny,
            EntityType::User,
            &job_for(Owner::new("alice", "staff")),
        )
        .unwrap();

    assert_eq!(rule.selector, Selector::Specific("alice".into()));
    assert_eq!(rule.bound, 50);
}

#[test]
fn test_generic_rule_applies_to_other_ids() {
    let store = store_with("[u:PBS_GENERIC=2],[u:alice=50]");
    let table = store.snapshot();

    let rule = EntityResolver::new()
        .applicable_rule(
            &table,
            &Scope::Server,
            &Family::JobCountAny,
            EntityType::User,
            &job_for(Owner::new("bob", "staff")),
        )
        .unwrap();

    assert_eq!(rule.selector, Selector::Generic);
    assert_eq!(rule.bound, 2);
}

#[test]
fn test_unconstrained_without_matching_rule() {
    let store = store_with("[u:alice=1]");
    let table = store.snapshot();
    let resolver = EntityResolver::new();
    let job = job_for(Owner::new("bob", "staff"));

    for entity_type in EntityType::ALL {
        assert!(
            resolver
                .applicable_rule(&table, &Scope::Server, &Family::JobCountAny, entity_type, &job)
                .is_none()
        );
    }
    assert!(
        resolver
            .applicable_rule(
                &table,
                &Scope::queue("workq"),
                &Family::JobCountAny,
                EntityType::User,
                &job_for(Owner::new("alice", "staff")),
            )
            .is_none()
    );
}

#[test]
fn test_overall_rule_uses_all_selector() {
    let store = store_with("[o:PBS_ALL=7]");
    let table = store.snapshot();

    let rule = EntityResolver::new()
        .applicable_rule(
            &table,
            &Scope::Server,
            &Family::JobCountAny,
            EntityType::Overall,
            &job_for(Owner::new("bob", "staff")),
        )
        .unwrap();

    assert_eq!(rule.selector, Selector::All);
    assert_eq!(rule.bound, 7);
}

#[test]
fn test_job_without_project_never_matches_project_rules() {
    let store = store_with("[p:PBS_GENERIC=1],[p:p1=1]");
    let table = store.snapshot();
    let resolver = EntityResolver::new();
    let job = job_for(Owner::new("bob", "staff"));

    assert!(resolver.entity_of(&job, EntityType::Project).is_none());
    assert!(
        resolver
            .applicable_rule(&table, &Scope::Server, &Family::JobCountAny, EntityType::Project, &job)
            .is_none()
    );
}

#[test]
fn test_default_project_is_accounted_like_an_explicit_one() {
    let store = store_with("[p:PBS_GENERIC=1]");
    let table = store.snapshot();
    let resolver =
        EntityResolver::new().with_default_project(Some("_pbs_project_default".to_string()));
    let job = job_for(Owner::new("bob", "staff"));

    assert_eq!(
        resolver.entity_of(&job, EntityType::Project),
        Some(EntityKey::Project("_pbs_project_default".into()))
    );
    let rule = resolver
        .applicable_rule(&table, &Scope::Server, &Family::JobCountAny, EntityType::Project, &job)
        .unwrap();
    assert_eq!(rule.selector, Selector::Generic);
}

#[test]
fn test_explicit_project_beats_default() {
    let resolver = EntityResolver::new().with_default_project(Some("fallback".to_string()));
    let job = job_for(Owner::new("bob", "staff").with_project("p1"));
    assert_eq!(resolver.project_of(&job), Some("p1"));
}

#[test]
fn test_entities_of_in_evaluation_order() {
    let resolver = EntityResolver::new();
    let keys: Vec<String> = resolver
        .entities_of(&job_for(Owner::new("bob", "staff").with_project("p1")))
        .iter()
        .map(ToString::to_string)
        .collect();
    insta::assert_snapshot!(keys.join(" "), @"u:bob g:staff p:p1 o:PBS_ALL");
}
