// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for entlim using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! entlim [global options] <command>
//! version | options | inis
//! check-rule <ATTRIBUTE> <RULES>
//! submit -u USER -g GROUP [-P PROJECT] [-q QUEUE] [-J COUNT] [-r NAME=QTY].. [--hold]
//! alter <JOB_ID> -r NAME=QTY..
//! state <JOB_ID> <STATE> [--subjob N] | expand <JOB_ID> | finish <JOB_ID>
//! jobs
//! usage [-q QUEUE]
//! ```

pub mod global;
pub mod job;


use crate::cli::global::GlobalOptions;
use crate::cli::job::{AlterArgs, CheckRuleArgs, JobIdArgs, StateArgs, SubmitArgs, UsageArgs};
use clap::{Parser, Subcommand};

/// Entity-scoped admission control for batch job queues.
#[derive(Debug, Parser)]
#[command(
    name = "entlim",
    author,
    version,
    about = "Entity-scoped admission control for batch job queues",
    long_about = "entlim Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Admits or rejects jobs against per-user, per-group, per-project\n\
                  and overall limits at server and queue scope. Every invocation\n\
                  reloads the job store, so decisions always reflect the live\n\
                  population on disk.",
    after_help = "CONFIG FILES:\n\n\
                  entlim loads `entlim.toml` from the current directory if present,\n\
                  then every --config file in order, then ENTLIM_* environment\n\
                  variables (`__` separates sections, e.g. ENTLIM_SERVER__NAME),\n\
                  then --set overrides. Use --no-default-config to skip entlim.toml."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    #[command(visible_alias = "-v")]
    Version,

    /// Lists all options and their values.
    Options,

    /// Lists the configuration files used.
    Inis,

    /// Parses a limit attribute value and prints the rules it defines.
    #[command(name = "check-rule")]
    CheckRule(CheckRuleArgs),

    /// Submits a job, or an array job with -J.
    Submit(SubmitArgs),

    /// Changes the resource request of an admitted job.
    Alter(AlterArgs),

    /// Moves a job (or one subjob) to another state.
    State(StateArgs),

    /// Expands an array job into individually tracked subjobs.
    Expand(JobIdArgs),

    /// Removes a job from the live population.
    Finish(JobIdArgs),

    /// Lists live jobs.
    Jobs,

    /// Shows per-entity usage against the configured limits.
    Usage(UsageArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
