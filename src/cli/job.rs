// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Arguments of the job commands.

use clap::Args;
use std::num::NonZeroU32;

use crate::job::{JobState, MAX_ARRAY_SIZE, ResourceList};

/// One `name=quantity` resource request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceArg {
    pub name: String,
    pub quantity: u64,
}

impl std::str::FromStr for ResourceArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, quantity) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=QUANTITY, got '{s}'"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing resource name in '{s}'"));
        }
        let quantity = quantity
            .trim()
            .parse()
            .map_err(|e| format!("invalid quantity in '{s}': {e}"))?;
        Ok(Self {
            name: name.to_string(),
            quantity,
        })
    }
}

/// Parses an `-J` subjob count in `1..=MAX_ARRAY_SIZE`.
///
/// # Errors
///
/// Returns a message for non-numeric, zero or oversized counts.
pub fn parse_array_count(s: &str) -> Result<NonZeroU32, String> {
    let count: NonZeroU32 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid array size '{s}': {e}"))?;
    if count.get() > MAX_ARRAY_SIZE {
        return Err(format!("array size {count} exceeds the limit of {MAX_ARRAY_SIZE}"));
    }
    Ok(count)
}

/// Collects `-r` arguments; a repeated name keeps the last quantity.
#[must_use]
pub fn resource_list(resources: &[ResourceArg]) -> ResourceList {
    resources
        .iter()
        .map(|r| (r.name.clone(), r.quantity))
        .collect()
}

/// Arguments for the submit command.
#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    /// Submitting user.
    #[arg(short = 'u', long, env = "USER", value_name = "USER")]
    pub user: String,

    /// Submitting group.
    #[arg(short = 'g', long, value_name = "GROUP")]
    pub group: String,

    /// Project the job is charged to.
    #[arg(short = 'P', long, value_name = "PROJECT")]
    pub project: Option<String>,

    /// Destination queue, defaults to server.default_queue.
    #[arg(short = 'q', long, value_name = "QUEUE")]
    pub queue: Option<String>,

    /// Submit an array job with COUNT subjobs.
    #[arg(short = 'J', long = "array", value_name = "COUNT", value_parser = parse_array_count)]
    pub array: Option<NonZeroU32>,

    /// Resource request, e.g. ncpus=4. Can be specified multiple times.
    #[arg(short = 'r', long = "resource", value_name = "NAME=QTY", action = clap::ArgAction::Append)]
    pub resources: Vec<ResourceArg>,

    /// Submit the job in the held state.
    #[arg(long)]
    pub hold: bool,
}

/// Arguments for the alter command.
#[derive(Debug, Clone, Args)]
pub struct AlterArgs {
    /// Job to alter.
    #[arg(value_name = "JOB_ID")]
    pub job_id: String,

    /// New resource request; unnamed resources keep their value.
    #[arg(short = 'r', long = "resource", value_name = "NAME=QTY", action = clap::ArgAction::Append, required = true)]
    pub resources: Vec<ResourceArg>,
}

/// Arguments for the state command.
#[derive(Debug, Clone, Args)]
pub struct StateArgs {
    /// Job to move.
    #[arg(value_name = "JOB_ID")]
    pub job_id: String,

    /// Target state, as a letter (Q, H, R, ...) or a name (queued, running, ...).
    #[arg(value_name = "STATE")]
    pub state: JobState,

    /// Move only this subjob of an expanded array.
    #[arg(long, value_name = "INDEX")]
    pub subjob: Option<usize>,
}

/// Arguments for commands taking only a job id.
#[derive(Debug, Clone, Args)]
pub struct JobIdArgs {
    #[arg(value_name = "JOB_ID")]
    pub job_id: String,
}

/// Arguments for the usage command.
#[derive(Debug, Clone, Args)]
pub struct UsageArgs {
    /// Show usage in this queue instead of the whole server.
    #[arg(short = 'q', long, value_name = "QUEUE")]
    pub queue: Option<String>,
}

/// Arguments for the check-rule command.
#[derive(Debug, Clone, Args)]
pub struct CheckRuleArgs {
    /// Limit attribute, e.g. max_queued or queued_jobs_threshold_res.ncpus.
    #[arg(value_name = "ATTRIBUTE")]
    pub attribute: String,

    /// Rule text, e.g. "[u:PBS_GENERIC=10],[u:bob=5]".
    #[arg(value_name = "RULES", allow_hyphen_values = true)]
    pub rules: String,
}
