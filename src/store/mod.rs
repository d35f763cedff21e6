// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Job store seam and the in-memory reference store.
//!
//! # Contract
//!
//! ```text
//! JobStore
//!   live_jobs(scope)              snapshot of live jobs, any order
//!   live_job(id)                  current record of one live job
//!   commit_job(job)               add an admitted job (array = one record)
//!   commit_alteration(id, fp)     apply a partial resource update
//!
//! MemoryJobStore
//!   RwLock<Population> ---save()---> JSON (tempfile + atomic rename)
//!                      <--load()---
//!
//! StoreLock   <path>.lock held across load .. save by one process
//! ```
//!
//! The admission engine never keeps usage counters: after a restart the
//! reloaded population is the whole state.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::job::{Job, JobId, JobState, MAX_ARRAY_SIZE, ResourceList, Subjobs};
use crate::limits::Scope;

mod lock;


pub use lock::StoreLock;

/// Access to the live job population.
///
/// Implementations must make each call atomic on its own; the admission
/// engine serializes check-then-commit sequences itself.
pub trait JobStore: Send + Sync {
    /// Returns the live jobs belonging to `scope`.
    fn live_jobs<'a>(&'a self, scope: &'a Scope) -> BoxFuture<'a, StoreResult<Vec<Job>>>;

    /// Returns the current record of live job `id`.
    ///
    /// Fails with `StoreError::UnknownJob` if there is none.
    fn live_job<'a>(&'a self, id: &'a JobId) -> BoxFuture<'a, StoreResult<Job>>;

    /// Adds an admitted job.
    fn commit_job(&self, job: Job) -> BoxFuture<'_, StoreResult<()>>;

    /// Applies `footprint` to the resources of job `id`.
    fn commit_alteration<'a>(
        &'a self,
        id: &'a JobId,
        footprint: &'a ResourceList,
    ) -> BoxFuture<'a, StoreResult<()>>;
}

/// On-disk form of the population.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    next_seq: u64,
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Default)]
struct Population {
    next_seq: u64,
    jobs: BTreeMap<JobId, Job>,
}

/// Job store keeping the population in memory, optionally persisted as JSON.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    population: RwLock<Population>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a population saved by [`Self::save`]. A missing file yields an
    /// empty store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read and
    /// `StoreError::Serialize` if it is not a valid snapshot.
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No job snapshot, starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|source| StoreError::Serialize {
                path: path.display().to_string(),
                source,
            })?;

        let jobs: BTreeMap<JobId, Job> = snapshot
            .jobs
            .into_iter()
            .map(|job| (job.id().clone(), job))
            .collect();
        tracing::debug!(path = %path.display(), jobs = jobs.len(), "Loaded job snapshot");

        Ok(Self {
            population: RwLock::new(Population {
                next_seq: snapshot.next_seq,
                jobs,
            }),
        })
    }

    /// Writes the population to `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` or `StoreError::Serialize` on failure.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StoreResult<()> {
        let path = path.as_ref();
        let io_error = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        let json = {
            let population = self.read();
            let snapshot = Snapshot {
                next_seq: population.next_seq,
                jobs: population.jobs.values().cloned().collect(),
            };
            serde_json::to_string_pretty(&snapshot).map_err(|source| StoreError::Serialize {
                path: path.display().to_string(),
                source,
            })?
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
        file.write_all(json.as_bytes()).map_err(io_error)?;
        file.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }

    /// Allocates the next job id on `server`.
    pub fn allocate_id(&self, server: &str, array: bool) -> JobId {
        let mut population = self.write();
        population.next_seq += 1;
        let seq = population.next_seq;
        if array {
            JobId::new(format!("{seq}[].{server}"))
        } else {
            JobId::new(format!("{seq}.{server}"))
        }
    }

    /// Adds `job` without any admission check.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateJob` if the id is already present.
    pub fn insert(&self, job: Job) -> StoreResult<()> {
        let mut population = self.write();
        if population.jobs.contains_key(job.id()) {
            return Err(StoreError::DuplicateJob(job.id().clone()));
        }
        population.jobs.insert(job.id().clone(), job);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.read().jobs.get(id).cloned()
    }

    /// All stored jobs ordered by id.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.read().jobs.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().jobs.is_empty()
    }

    /// Moves job `id` to `state`. Jobs leaving the live states are dropped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownJob` if there is no such job.
    pub fn set_state(&self, id: &JobId, state: JobState) -> StoreResult<()> {
        let mut population = self.write();
        let job = population
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownJob(id.clone()))?;
        job.set_state(state);
        if !job.is_live() {
            population.jobs.remove(id);
        }
        tracing::debug!(job = %id, state = %state, "Job state changed");
        Ok(())
    }

    /// Removes job `id` from the live population.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownJob` if there is no such job.
    pub fn finish(&self, id: &JobId) -> StoreResult<()> {
        self.set_state(id, JobState::Finished)
    }

    /// Expands a pending array parent into individually tracked subjobs.
    ///
    /// Subjobs start in the parent's state; the parent becomes `Begun`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownJob` or `StoreError::InvalidTransition`
    /// if the job is not a pending array or declares more than
    /// [`MAX_ARRAY_SIZE`] subjobs.
    pub fn expand(&self, id: &JobId) -> StoreResult<()> {
        let mut population = self.write();
        let job = population
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownJob(id.clone()))?;
        let Some(Subjobs::Pending { count }) = job.subjobs() else {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                message: "not a pending array job".to_string(),
            });
        };
        if *count > MAX_ARRAY_SIZE {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                message: format!("{count} subjobs exceed the array limit of {MAX_ARRAY_SIZE}"),
            });
        }
        let states = vec![job.state(); *count as usize];
        job.set_subjobs(Some(Subjobs::Expanded { states }));
        job.set_state(JobState::Begun);
        Ok(())
    }

    /// Moves subjob `index` of expanded array `id` to `state`.
    ///
    /// The parent is dropped once none of its subjobs is live.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownJob` or `StoreError::InvalidTransition`.
    pub fn set_subjob_state(&self, id: &JobId, index: usize, state: JobState) -> StoreResult<()> {
        let mut population = self.write();
        let job = population
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownJob(id.clone()))?;
        let Some(Subjobs::Expanded { states }) = job.subjobs() else {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                message: "not an expanded array job".to_string(),
            });
        };
        if index >= states.len() {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                message: format!("subjob index {index} out of range 0..{}", states.len()),
            });
        }

        let mut states = states.clone();
        states[index] = state;
        let all_done = states.iter().all(|s| !s.is_live());
        job.set_subjobs(Some(Subjobs::Expanded { states }));
        if all_done {
            population.jobs.remove(id);
        }
        Ok(())
    }

    fn live_in(&self, scope: &Scope) -> Vec<Job> {
        self.read()
            .jobs
            .values()
            .filter(|job| job.is_live() && scope.contains(job))
            .cloned()
            .collect()
    }

    fn alter(&self, id: &JobId, footprint: &ResourceList) -> StoreResult<()> {
        let mut population = self.write();
        let job = population
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownJob(id.clone()))?;
        job.apply_footprint(footprint);
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Population> {
        self.population.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Population> {
        self.population
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobStore for MemoryJobStore {
    fn live_jobs<'a>(&'a self, scope: &'a Scope) -> BoxFuture<'a, StoreResult<Vec<Job>>> {
        Box::pin(async move { Ok(self.live_in(scope)) })
    }

    fn live_job<'a>(&'a self, id: &'a JobId) -> BoxFuture<'a, StoreResult<Job>> {
        Box::pin(async move {
            self.get(id)
                .filter(Job::is_live)
                .ok_or_else(|| StoreError::UnknownJob(id.clone()))
        })
    }

    fn commit_job(&self, job: Job) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move { self.insert(job) })
    }

    fn commit_alteration<'a>(
        &'a self,
        id: &'a JobId,
        footprint: &'a ResourceList,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.alter(id, footprint) })
    }
}
