// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Job records as seen by the admission engine.
//!
//! ```text
//! Job
//!  |-- id        "12.server" / "13[].server"
//!  |-- owner     user, group, project?
//!  |-- queue     exactly one
//!  |-- state     T Q H W R E S B F M
//!  |-- resources name -> quantity (per subjob for arrays)
//!  '-- subjobs   None | Pending{count} | Expanded{states}
//!
//! units(states):
//!   plain job          1 if state in set
//!   pending array      count if parent state in set
//!   expanded array     #subjobs whose own state is in set
//! ```
//!
//! Jobs are owned by the job store; the engine only reads them, apart from
//! building candidates before admission.

use bitflags::bitflags;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;

use crate::error::ConfigError;

/// Largest number of subjobs one array job may declare.
pub const MAX_ARRAY_SIZE: u32 = 10_000;

/// Resource footprint: resource name to non-negative quantity.
pub type ResourceList = BTreeMap<String, u64>;

/// Job identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Job state, serialized as the single-letter code operators know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    #[serde(rename = "T")]
    Transit,
    #[serde(rename = "Q")]
    Queued,
    #[serde(rename = "H")]
    Held,
    #[serde(rename = "W")]
    Waiting,
    #[serde(rename = "R")]
    Running,
    #[serde(rename = "E")]
    Exiting,
    #[serde(rename = "S")]
    Suspended,
    /// Array parent with at least one subjob started.
    #[serde(rename = "B")]
    Begun,
    #[serde(rename = "F")]
    Finished,
    #[serde(rename = "M")]
    Moved,
}

bitflags! {
    /// A set of job states, used as the counting filter of a limit family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateSet: u16 {
        const TRANSIT = 1 << 0;
        const QUEUED = 1 << 1;
        const HELD = 1 << 2;
        const WAITING = 1 << 3;
        const RUNNING = 1 << 4;
        const EXITING = 1 << 5;
        const SUSPENDED = 1 << 6;
        const BEGUN = 1 << 7;
        const FINISHED = 1 << 8;
        const MOVED = 1 << 9;

        /// Every state in which a job still occupies the system.
        const LIVE = Self::TRANSIT.bits()
            | Self::QUEUED.bits()
            | Self::HELD.bits()
            | Self::WAITING.bits()
            | Self::RUNNING.bits()
            | Self::EXITING.bits()
            | Self::SUSPENDED.bits()
            | Self::BEGUN.bits();
    }
}

impl StateSet {
    /// Returns whether `state` is a member of this set.
    #[must_use]
    pub const fn admits(self, state: JobState) -> bool {
        self.contains(state.bit())
    }
}

impl JobState {
    /// All states, in display order.
    pub const ALL: [Self; 10] = [
        Self::Transit,
        Self::Queued,
        Self::Held,
        Self::Waiting,
        Self::Running,
        Self::Exiting,
        Self::Suspended,
        Self::Begun,
        Self::Finished,
        Self::Moved,
    ];

    /// Returns the flag for this state.
    #[must_use]
    pub const fn bit(self) -> StateSet {
        match self {
            Self::Transit => StateSet::TRANSIT,
            Self::Queued => StateSet::QUEUED,
            Self::Held => StateSet::HELD,
            Self::Waiting => StateSet::WAITING,
            Self::Running => StateSet::RUNNING,
            Self::Exiting => StateSet::EXITING,
            Self::Suspended => StateSet::SUSPENDED,
            Self::Begun => StateSet::BEGUN,
            Self::Finished => StateSet::FINISHED,
            Self::Moved => StateSet::MOVED,
        }
    }

    /// Returns the single-letter state code.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Transit => 'T',
            Self::Queued => 'Q',
            Self::Held => 'H',
            Self::Waiting => 'W',
            Self::Running => 'R',
            Self::Exiting => 'E',
            Self::Suspended => 'S',
            Self::Begun => 'B',
            Self::Finished => 'F',
            Self::Moved => 'M',
        }
    }

    /// Returns whether a job in this state still counts as live.
    #[must_use]
    pub const fn is_live(self) -> bool {
        StateSet::LIVE.admits(self)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl std::str::FromStr for JobState {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.chars();
        let single = match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c.to_ascii_uppercase()),
            _ => None,
        };
        let found = Self::ALL.into_iter().find(|state| {
            single == Some(state.letter()) || s.eq_ignore_ascii_case(&format!("{state:?}"))
        });
        found.ok_or_else(|| ConfigError::InvalidValue {
            section: "job".to_string(),
            key: "state".to_string(),
            message: format!("expected one of T, Q, H, W, R, E, S, B, F, M, got '{s}'"),
        })
    }
}

/// Entity identities of a job, immutable after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Owner {
    #[must_use]
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
            project: None,
        }
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}

/// Subjobs of an array job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subjobs {
    /// Not yet expanded: every prospective subjob shares the parent's state.
    Pending { count: u32 },
    /// Expanded: each subjob carries its own state.
    Expanded { states: Vec<JobState> },
}

impl Subjobs {
    /// Number of subjobs declared.
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            Self::Pending { count } => u64::from(*count),
            Self::Expanded { states } => states.len() as u64,
        }
    }
}

/// A job in the live population, or a candidate awaiting admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct Job {
    #[builder(setters(name = with_id), into)]
    id: JobId,
    #[builder(setters(name = with_owner))]
    owner: Owner,
    #[builder(setters(name = with_queue), into)]
    queue: String,
    #[builder(setters(name = with_state), default = JobState::Queued)]
    state: JobState,
    #[builder(setters(name = with_resources), default)]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    resources: ResourceList,
    #[builder(setters(name = with_subjobs))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subjobs: Option<Subjobs>,
}

impl Job {
    #[must_use]
    pub const fn id(&self) -> &JobId {
        &self.id
    }

    #[must_use]
    pub const fn owner(&self) -> &Owner {
        &self.owner
    }

    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    #[must_use]
    pub const fn state(&self) -> JobState {
        self.state
    }

    #[must_use]
    pub const fn resources(&self) -> &ResourceList {
        &self.resources
    }

    #[must_use]
    pub const fn subjobs(&self) -> Option<&Subjobs> {
        self.subjobs.as_ref()
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.subjobs.is_some()
    }

    /// Quantity of `resource` requested per unit; absent resources count as zero.
    #[must_use]
    pub fn resource(&self, resource: &str) -> u64 {
        self.resources.get(resource).copied().unwrap_or(0)
    }

    /// Returns whether the job still occupies the system.
    #[must_use]
    pub fn is_live(&self) -> bool {
        match &self.subjobs {
            Some(Subjobs::Expanded { states }) => {
                self.state.is_live() || states.iter().any(|s| s.is_live())
            }
            _ => self.state.is_live(),
        }
    }

    /// Number of countable units in `states`.
    ///
    /// An expanded array parent contributes only through its subjobs.
    #[must_use]
    pub fn units(&self, states: StateSet) -> u64 {
        match &self.subjobs {
            None => u64::from(states.admits(self.state)),
            Some(Subjobs::Pending { count }) => {
                if states.admits(self.state) {
                    u64::from(*count)
                } else {
                    0
                }
            }
            Some(Subjobs::Expanded { states: subjobs }) => {
                subjobs.iter().filter(|s| states.admits(**s)).count() as u64
            }
        }
    }

    /// Total quantity of `resource` held by the units in `states`.
    #[must_use]
    pub fn resource_usage(&self, resource: &str, states: StateSet) -> u64 {
        self.units(states).saturating_mul(self.resource(resource))
    }

    /// Turns this job into an unexpanded array parent of `count` subjobs.
    #[must_use]
    pub fn into_array(mut self, count: NonZeroU32) -> Self {
        self.subjobs = Some(Subjobs::Pending {
            count: count.get(),
        });
        self
    }

    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
    }

    pub fn set_subjobs(&mut self, subjobs: Option<Subjobs>) {
        self.subjobs = subjobs;
    }

    /// Applies a partial footprint update: named resources are replaced,
    /// the others keep their current quantity.
    pub fn apply_footprint(&mut self, footprint: &ResourceList) {
        for (name, quantity) in footprint {
            self.resources.insert(name.clone(), *quantity);
        }
    }

    /// Returns a copy with `footprint` applied.
    #[must_use]
    pub fn with_footprint(&self, footprint: &ResourceList) -> Self {
        let mut altered = self.clone();
        altered.apply_footprint(footprint);
        altered
    }
}
