// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for admission control.
//!
//! Drives the engine end to end over the in-memory job store with rules
//! installed from configuration text.

use std::num::NonZeroU32;
use std::sync::Arc;

use entlim::admission::{AdmissionEngine, Decision, Diagnostic};
use entlim::config::Config;
use entlim::job::{Job, JobId, JobState, Owner, ResourceList};
use entlim::limits::{EntityType, Family, LimitStore, Scope, Selector};
use entlim::render::render_diagnostic;
use entlim::resolve::EntityResolver;
use entlim::store::MemoryJobStore;

// =============================================================================
// Helpers
// =============================================================================

fn engine_from(toml: &str) -> AdmissionEngine<MemoryJobStore> {
    engine_with_store(toml, MemoryJobStore::new())
}

fn engine_with_store(toml: &str, store: MemoryJobStore) -> AdmissionEngine<MemoryJobStore> {
    let config = Config::parse(toml).unwrap();
    let limits = LimitStore::new();
    config.install_limits(&limits).unwrap();
    AdmissionEngine::new(Arc::new(limits), Arc::new(store), config.resolver())
}

fn job(seq: usize, user: &str, queue: &str) -> Job {
    Job::builder()
        .with_id(format!("{seq}.server"))
        .with_owner(Owner::new(user, "staff"))
        .with_queue(queue)
        .with_resources(ResourceList::from([("ncpus".to_string(), 1)]))
        .build()
}

fn ncpus_job(seq: usize, ncpus: u64) -> Job {
    Job::builder()
        .with_id(format!("{seq}.server"))
        .with_owner(Owner::new("alice", "staff"))
        .with_queue("workq")
        .with_resources(ResourceList::from([("ncpus".to_string(), ncpus)]))
        .build()
}

fn reject(decision: Decision) -> Diagnostic {
    match decision {
        Decision::Reject(diagnostic) => diagnostic,
        Decision::Accept => panic!("expected a rejection"),
    }
}

fn count(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn admission_specific_user_queued_limit_scenario() {
    let engine = engine_from(
        r#"
[limits]
queued_jobs_threshold = "[u:alice=10]"
"#,
    );

    for seq in 0..10 {
        let decision = engine.admit_single(job(seq, "alice", "workq")).await.unwrap();
        assert!(decision.is_accept(), "job {seq} should be admitted");
    }

    engine
        .store()
        .set_state(&JobId::new("0.server"), JobState::Running)
        .unwrap();
    assert!(engine.admit_single(job(10, "alice", "workq")).await.unwrap().is_accept());

    let diagnostic = reject(engine.admit_single(job(11, "alice", "workq")).await.unwrap());
    assert_eq!(diagnostic.scope, Scope::Server);
    assert_eq!(diagnostic.family, Family::JobCountQueuedOnly);
    assert_eq!(diagnostic.entity_type, EntityType::User);
    assert_eq!(diagnostic.selector, Selector::Specific("alice".to_string()));
    insta::assert_snapshot!(
        render_diagnostic(&diagnostic),
        @"Maximum number of jobs in 'Q' state for user alice already in complex"
    );
    assert_eq!(engine.store().len(), 11);
}

#[tokio::test]
async fn admission_queue_limit_tighter_than_server() {
    let engine = engine_from(
        r#"
[limits]
max_queued = "[u:PBS_GENERIC=10]"

[queues.q1]
max_queued = "[u:PBS_GENERIC=5]"
"#,
    );

    for seq in 0..5 {
        assert!(engine.admit_single(job(seq, "alice", "q1")).await.unwrap().is_accept());
    }

    let diagnostic = reject(engine.admit_single(job(5, "alice", "q1")).await.unwrap());
    assert_eq!(diagnostic.scope, Scope::queue("q1"));
    assert_eq!(diagnostic.selector, Selector::Generic);
    insta::assert_snapshot!(
        render_diagnostic(&diagnostic),
        @"would exceed queue generic's per-user limit"
    );

    // Other queues only see the server bound.
    for seq in 5..10 {
        assert!(engine.admit_single(job(seq + 1, "alice", "workq")).await.unwrap().is_accept());
    }
    let diagnostic = reject(engine.admit_single(job(20, "alice", "workq")).await.unwrap());
    assert_eq!(diagnostic.scope, Scope::Server);
}

#[tokio::test]
async fn admission_specific_rule_shadows_generic() {
    let engine = engine_from(
        r#"
[limits]
max_queued = "[u:PBS_GENERIC=1],[u:alice=3]"
"#,
    );

    for seq in 0..3 {
        assert!(engine.admit_single(job(seq, "alice", "workq")).await.unwrap().is_accept());
    }
    assert!(!engine.admit_single(job(3, "alice", "workq")).await.unwrap().is_accept());

    assert!(engine.admit_single(job(4, "bob", "workq")).await.unwrap().is_accept());
    let diagnostic = reject(engine.admit_single(job(5, "bob", "workq")).await.unwrap());
    assert_eq!(diagnostic.selector, Selector::Generic);
    assert_eq!(diagnostic.bound, 1);
}

#[tokio::test]
async fn admission_lower_bound_never_admits_more() {
    for bound in 0..6_u64 {
        let engine = engine_from(&format!(
            "[limits]\nmax_queued = \"[u:PBS_GENERIC={bound}]\"\n"
        ));
        let mut admitted = 0;
        for seq in 0..8 {
            if engine.admit_single(job(seq, "alice", "workq")).await.unwrap().is_accept() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, bound, "bound {bound}");
    }
}

#[tokio::test]
async fn admission_array_is_all_or_nothing() {
    let toml = r#"
[limits]
max_queued = "[u:PBS_GENERIC=4]"
"#;

    let engine = engine_from(toml);
    let diagnostic = reject(engine.admit_array(job(0, "alice", "workq"), count(5)).await.unwrap());
    assert_eq!(diagnostic.bound, 4);
    assert!(engine.store().is_empty());

    let engine = engine_from(toml);
    assert!(engine.admit_array(job(0, "alice", "workq"), count(4)).await.unwrap().is_accept());
    assert_eq!(engine.store().len(), 1);

    let engine = engine_from(toml);
    assert!(engine.admit_single(job(0, "alice", "workq")).await.unwrap().is_accept());
    assert!(!engine.admit_array(job(1, "alice", "workq"), count(4)).await.unwrap().is_accept());
    assert!(engine.admit_array(job(2, "alice", "workq"), count(3)).await.unwrap().is_accept());
}

#[tokio::test]
async fn admission_queued_only_family_follows_state() {
    let engine = engine_from(
        r#"
[limits]
queued_jobs_threshold = "[u:PBS_GENERIC=1]"
"#,
    );

    assert!(engine.admit_single(job(0, "alice", "workq")).await.unwrap().is_accept());
    assert!(!engine.admit_single(job(1, "alice", "workq")).await.unwrap().is_accept());

    engine
        .store()
        .set_state(&JobId::new("0.server"), JobState::Running)
        .unwrap();
    assert!(engine.admit_single(job(1, "alice", "workq")).await.unwrap().is_accept());
}

#[tokio::test]
async fn admission_expanded_array_counts_subjobs_by_state() {
    let engine = engine_from(
        r#"
[limits]
queued_jobs_threshold = "[u:PBS_GENERIC=3]"
"#,
    );

    assert!(engine.admit_array(job(0, "alice", "workq"), count(3)).await.unwrap().is_accept());
    assert!(!engine.admit_single(job(1, "alice", "workq")).await.unwrap().is_accept());

    let parent = JobId::new("0.server");
    engine.store().expand(&parent).unwrap();
    engine
        .store()
        .set_subjob_state(&parent, 0, JobState::Running)
        .unwrap();
    assert!(engine.admit_single(job(1, "alice", "workq")).await.unwrap().is_accept());
}

// =============================================================================
// Alterations
// =============================================================================

#[tokio::test]
async fn admission_alteration_accepted_iff_within_bound() {
    let toml = r#"
[limits.max_queued_res]
ncpus = "[u:PBS_GENERIC=8]"
"#;

    for requested in 0..=10_u64 {
        let engine = engine_from(toml);
        assert!(engine.admit_single(ncpus_job(0, 2)).await.unwrap().is_accept());
        assert!(engine.admit_single(ncpus_job(1, 4)).await.unwrap().is_accept());

        let existing = engine.store().get(&JobId::new("1.server")).unwrap();
        let footprint = ResourceList::from([("ncpus".to_string(), requested)]);
        let decision = engine
            .reevaluate_alteration(&existing, footprint)
            .await
            .unwrap();

        assert_eq!(decision.is_accept(), 2 + requested <= 8, "ncpus={requested}");
        let stored = engine.store().get(&JobId::new("1.server")).unwrap();
        let expected = if decision.is_accept() { requested } else { 4 };
        assert_eq!(stored.resource("ncpus"), expected);
    }
}

// =============================================================================
// Restart
// =============================================================================

#[tokio::test]
async fn admission_same_decision_after_reload() {
    let toml = r#"
[server]
default_project = "_pbs_project_default"

[limits]
max_queued = "[p:PBS_GENERIC=2]"
"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");

    let engine = engine_from(toml);
    for seq in 0..2 {
        assert!(engine.admit_single(job(seq, "alice", "workq")).await.unwrap().is_accept());
    }
    let before = reject(engine.admit_single(job(2, "bob", "workq")).await.unwrap());
    engine.store().save(&path).unwrap();

    let reloaded = engine_with_store(toml, MemoryJobStore::load(&path).unwrap());
    assert_eq!(reloaded.store().len(), 2);
    let after = reject(reloaded.admit_single(job(2, "bob", "workq")).await.unwrap());

    assert_eq!(before, after);
    insta::assert_snapshot!(
        render_diagnostic(&after),
        @"would exceed complex's per-project limit"
    );
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn admission_concurrent_submissions_never_overshoot() {
    let limits = LimitStore::new();
    limits
        .set(Scope::Server, Family::JobCountAny, "[u:PBS_GENERIC=5]")
        .unwrap();
    let engine = Arc::new(AdmissionEngine::new(
        Arc::new(limits),
        Arc::new(MemoryJobStore::new()),
        EntityResolver::new(),
    ));

    let handles: Vec<_> = (0..32)
        .map(|seq| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.admit_single(job(seq, "alice", "workq")).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_accept() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 5);
    assert_eq!(engine.store().len(), 5);
}
