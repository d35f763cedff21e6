// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Job commands: submission, alteration and dispatcher transitions.

use anyhow::Context;

use super::{Outcome, Session};
use crate::admission::Decision;
use crate::cli::job::{AlterArgs, JobIdArgs, StateArgs, SubmitArgs, resource_list};
use crate::error::Result;
use crate::job::{Job, JobId, JobState, Owner, Subjobs};
use crate::render::render_diagnostic;

/// Submit a job and print its id if admitted.
///
/// # Errors
///
/// Returns an error if the job store fails.
pub async fn run_submit_command(args: &SubmitArgs, session: &Session) -> Result<Outcome> {
    let server = &session.config().server;
    let queue = args
        .queue
        .clone()
        .unwrap_or_else(|| server.default_queue.clone());

    let mut owner = Owner::new(args.user.as_str(), args.group.as_str());
    owner.project.clone_from(&args.project);

    let id = session.store().allocate_id(&server.name, args.array.is_some());
    let job = Job::builder()
        .with_id(id.clone())
        .with_owner(owner)
        .with_queue(queue)
        .with_state(if args.hold {
            JobState::Held
        } else {
            JobState::Queued
        })
        .with_resources(resource_list(&args.resources))
        .build();

    let engine = session.engine();
    let decision = match args.array {
        Some(count) => engine.admit_array(job, count).await,
        None => engine.admit_single(job).await,
    }
    .inspect_err(|e| tracing::warn!(job = %id, "Job store fault during admission: {e}"))?;

    finish_decision(session, decision, || println!("{id}"))
}

/// Alter the resource request of an admitted job.
///
/// # Errors
///
/// Returns an error if the job is unknown or the job store fails.
pub async fn run_alter_command(args: &AlterArgs, session: &Session) -> Result<Outcome> {
    let id = JobId::new(args.job_id.as_str());
    let existing = find_job(session, &id)?;
    let footprint = resource_list(&args.resources);

    let decision = session
        .engine()
        .reevaluate_alteration(&existing, footprint)
        .await
        .inspect_err(|e| tracing::warn!(job = %id, "Job store fault during alteration: {e}"))?;

    finish_decision(session, decision, || println!("{id} altered"))
}

/// Move a job, or one subjob of an expanded array, to another state.
///
/// # Errors
///
/// Returns an error if the job is unknown or the transition is invalid.
pub fn run_state_command(args: &StateArgs, session: &Session) -> Result<Outcome> {
    let id = JobId::new(args.job_id.as_str());
    match args.subjob {
        Some(index) => session.store().set_subjob_state(&id, index, args.state)?,
        None => session.store().set_state(&id, args.state)?,
    }
    session.save()?;
    Ok(Outcome::Done)
}

/// Expand an array job into its subjobs.
///
/// # Errors
///
/// Returns an error if the job is unknown or not a pending array.
pub fn run_expand_command(args: &JobIdArgs, session: &Session) -> Result<Outcome> {
    session.store().expand(&JobId::new(args.job_id.as_str()))?;
    session.save()?;
    Ok(Outcome::Done)
}

/// Remove a job from the live population.
///
/// # Errors
///
/// Returns an error if the job is unknown.
pub fn run_finish_command(args: &JobIdArgs, session: &Session) -> Result<Outcome> {
    session.store().finish(&JobId::new(args.job_id.as_str()))?;
    session.save()?;
    Ok(Outcome::Done)
}

/// List live jobs.
pub fn run_jobs_command(session: &Session) {
    let jobs = session.store().jobs();
    if jobs.is_empty() {
        println!("No live jobs");
        return;
    }
    for job in &jobs {
        println!("{}", format_job(job));
    }
}

/// One line of the job listing.
#[must_use]
pub fn format_job(job: &Job) -> String {
    let owner = job.owner();
    let mut line = format!(
        "{:<14} {} {:<10} {}:{}",
        job.id(),
        job.state(),
        job.queue(),
        owner.user,
        owner.group
    );
    if let Some(project) = &owner.project {
        line.push_str(&format!(" project={project}"));
    }
    match job.subjobs() {
        Some(Subjobs::Pending { count }) => line.push_str(&format!(" subjobs={count}")),
        Some(Subjobs::Expanded { states }) => {
            let states: String = states.iter().map(|s| s.letter()).collect();
            line.push_str(&format!(" subjobs=[{states}]"));
        }
        None => {}
    }
    for (name, quantity) in job.resources() {
        line.push_str(&format!(" {name}={quantity}"));
    }
    line
}

fn find_job(session: &Session, id: &JobId) -> Result<Job> {
    session
        .store()
        .get(id)
        .with_context(|| format!("unknown job {id}"))
}

fn finish_decision(
    session: &Session,
    decision: Decision,
    on_accept: impl FnOnce(),
) -> Result<Outcome> {
    match decision {
        Decision::Accept => {
            session.save()?;
            on_accept();
            Ok(Outcome::Done)
        }
        Decision::Reject(diagnostic) => Ok(Outcome::Rejected(render_diagnostic(&diagnostic))),
    }
}
