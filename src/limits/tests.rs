// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{EntityType, Family, LimitStore, RuleSet, Scope, Selector};
use crate::error::RuleError;

fn specific(id: &str) -> Selector {
    Selector::Specific(id.to_string())
}

#[test]
fn test_parse_per_clause_brackets() {
    let set = RuleSet::parse("[u:PBS_GENERIC=10],[u:bob=5],[o:PBS_ALL=100]").unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.get(EntityType::User, &Selector::Generic), Some(10));
    assert_eq!(set.get(EntityType::User, &specific("bob")), Some(5));
    assert_eq!(set.get(EntityType::Overall, &Selector::All), Some(100));
}

#[test]
fn test_parse_single_bracket_list_with_spaces() {
    let set = RuleSet::parse(" [ g:staff = 3 , p:p1=0 ] ").unwrap();
    assert_eq!(set.get(EntityType::Group, &specific("staff")), Some(3));
    assert_eq!(set.get(EntityType::Project, &specific("p1")), Some(0));
}

#[test]
fn test_parse_last_clause_wins() {
    let set = RuleSet::parse("[u:bob=5],[u:bob=7]").unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(EntityType::User, &specific("bob")), Some(7));
}

#[test]
fn test_parse_empty_text_is_empty_set() {
    assert!(RuleSet::parse("").unwrap().is_empty());
    assert!(RuleSet::parse("  ").unwrap().is_empty());
    assert!(RuleSet::parse("[]").unwrap().is_empty());
}

#[test]
fn test_canonical_display() {
    let set = RuleSet::parse("[o:PBS_ALL=9],[u:PBS_GENERIC=10],[u:bob=5]").unwrap();
    insta::assert_snapshot!(set.to_string(), @"[u:bob=5],[u:PBS_GENERIC=10],[o:PBS_ALL=9]");
}

#[test]
fn test_malformed_rules() {
    let cases = [
        "[x:bob=1]",
        "[u:=1]",
        "[u:bob=-1]",
        "[u:bob=ten]",
        "[u:bob=]",
        "[o:bob=1]",
        "[o:PBS_GENERIC=1]",
        "[u:PBS_ALL=1]",
        "[u:bob]",
        "[u:bob=1],",
        "[u:bob=1",
        "[u:bob smith=1]",
    ];
    let messages: Vec<String> = cases
        .iter()
        .map(|text| match RuleSet::parse(text) {
            Err(err @ RuleError::MalformedRule { .. }) => format!("{text} -> {err}"),
            other => format!("{text} -> unexpected {other:?}"),
        })
        .collect();
    insta::assert_snapshot!(messages.join("\n"), @r"
    [x:bob=1] -> malformed limit clause 'x:bob=1': unknown entity type 'x', expected u, g, p or o
    [u:=1] -> malformed limit clause 'u:=1': missing entity id
    [u:bob=-1] -> malformed limit clause 'u:bob=-1': bound must be a non-negative integer, got '-1'
    [u:bob=ten] -> malformed limit clause 'u:bob=ten': bound must be a non-negative integer, got 'ten'
    [u:bob=] -> malformed limit clause 'u:bob=': bound must be a non-negative integer, got ''
    [o:bob=1] -> malformed limit clause 'o:bob=1': overall limits must use 'PBS_ALL'
    [o:PBS_GENERIC=1] -> malformed limit clause 'o:PBS_GENERIC=1': overall limits must use 'PBS_ALL'
    [u:PBS_ALL=1] -> malformed limit clause 'u:PBS_ALL=1': 'PBS_ALL' is only valid for overall limits
    [u:bob] -> malformed limit clause 'u:bob': expected 'type:id=bound'
    [u:bob=1], -> malformed limit clause '': empty clause
    [u:bob=1 -> malformed limit clause '[u:bob=1': unbalanced brackets
    [u:bob smith=1] -> malformed limit clause 'u:bob smith=1': entity id must not contain whitespace
    ");
}

#[test]
fn test_family_attribute_round_trip() {
    let names = [
        "queued_jobs_threshold",
        "max_queued",
        "queued_jobs_threshold_res.ncpus",
        "max_queued_res.mem",
    ];
    for name in names {
        let family = Family::from_attribute(name).unwrap();
        assert_eq!(family.attribute_name(), name);
    }
}

#[test]
fn test_family_unknown_attributes() {
    for name in ["max_running", "max_queued_res.", "max_queued.ncpus", ""] {
        assert!(
            matches!(Family::from_attribute(name), Err(RuleError::UnknownAttribute(_))),
            "{name} should be rejected"
        );
    }
}

#[test]
fn test_family_order_matches_evaluation_order() {
    let mut families = vec![
        Family::ResourceAny("ncpus".into()),
        Family::JobCountAny,
        Family::ResourceQueuedOnly("mem".into()),
        Family::JobCountQueuedOnly,
        Family::ResourceQueuedOnly("aaa".into()),
    ];
    families.sort();
    let names: Vec<String> = families.iter().map(Family::attribute_name).collect();
    insta::assert_snapshot!(names.join(" "), @"queued_jobs_threshold max_queued queued_jobs_threshold_res.aaa queued_jobs_threshold_res.mem max_queued_res.ncpus");
}

#[test]
fn test_server_scope_orders_first() {
    assert!(Scope::Server < Scope::queue("aaa"));
}

#[test]
fn test_store_set_replaces_whole_rule_set() {
    let store = LimitStore::new();
    store
        .set(Scope::Server, Family::JobCountAny, "[u:bob=5],[u:PBS_GENERIC=10]")
        .unwrap();
    store
        .set(Scope::Server, Family::JobCountAny, "[g:staff=2]")
        .unwrap();

    let rules = store.rules_for(&Scope::Server, &Family::JobCountAny);
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].entity_type, EntityType::Group);
    assert_eq!(rules[0].bound, 2);
}

#[test]
fn test_store_malformed_set_keeps_previous_rules() {
    let store = LimitStore::new();
    store
        .set(Scope::queue("workq"), Family::JobCountQueuedOnly, "[u:bob=5]")
        .unwrap();
    let err = store.set(Scope::queue("workq"), Family::JobCountQueuedOnly, "[u:bob=five]");
    assert!(err.is_err());

    let rules = store.rules_for(&Scope::queue("workq"), &Family::JobCountQueuedOnly);
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].bound, 5);
}

#[test]
fn test_store_scopes_are_independent() {
    let store = LimitStore::new();
    store
        .set(Scope::Server, Family::JobCountQueuedOnly, "[u:PBS_GENERIC=10]")
        .unwrap();
    store
        .set(Scope::queue("workq"), Family::JobCountQueuedOnly, "[u:PBS_GENERIC=5]")
        .unwrap();

    let table = store.snapshot();
    let rendered: Vec<String> = table.all_rules().iter().map(ToString::to_string).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    server queued_jobs_threshold: [u:PBS_GENERIC=10]
    queue workq queued_jobs_threshold: [u:PBS_GENERIC=5]
    ");
}

#[test]
fn test_snapshot_is_unaffected_by_later_updates() {
    let store = LimitStore::new();
    store
        .set_attribute(Scope::Server, "max_queued", "[o:PBS_ALL=3]")
        .unwrap();
    let before = store.snapshot();

    store.unset(Scope::Server, Family::JobCountAny);

    assert_eq!(before.rules_for(&Scope::Server, &Family::JobCountAny).len(), 1);
    assert!(store.snapshot().is_empty());
}
