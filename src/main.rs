// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Config --> Logging --> Command Dispatch
//!   Options | Inis | CheckRule          (no job store)
//!   Submit | Alter | State | Expand | Finish | Jobs | Usage
//!
//! exit: 0 done, 1 error, 2 rejected
//! ```

use std::process::ExitCode;

use entlim::cli::global::GlobalOptions;
use entlim::cli::{self, Command};
use entlim::cmd::config::{run_check_rule_command, run_inis_command, run_options_command};
use entlim::cmd::job::{
    run_alter_command, run_expand_command, run_finish_command, run_jobs_command,
    run_state_command, run_submit_command,
};
use entlim::cmd::usage::run_usage_command;
use entlim::cmd::{Outcome, Session};
use entlim::config::Config;
use entlim::config::loader::ConfigLoader;
use entlim::logging::{LogConfig, LogGuard, LogLevel, init_logging};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const ENV_PREFIX: &str = "ENTLIM";
const DEFAULT_CONFIG: &str = "entlim.toml";
const EXIT_REJECTED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    match &cli.command {
        Some(Command::Version) => {
            handle_version_command();
            return ExitCode::SUCCESS;
        }
        Some(Command::Inis) => {
            let loader = build_config_loader(&cli.global);
            run_inis_command(&loader.format_loaded_files());
            return ExitCode::SUCCESS;
        }
        Some(Command::CheckRule(args)) => {
            return to_exit_code(run_check_rule_command(args).map(|()| Outcome::Done));
        }
        Some(_) => {}
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            return ExitCode::FAILURE;
        }
    }

    let config = match load_config(&cli.global) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match start_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    dispatch_command(&cli, config).await
}

async fn dispatch_command(cli: &cli::Cli, config: Config) -> ExitCode {
    if matches!(cli.command, Some(Command::Options)) {
        run_options_command(&config);
        return ExitCode::SUCCESS;
    }

    let session = match Session::open(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match &cli.command {
        Some(Command::Submit(args)) => run_submit_command(args, &session).await,
        Some(Command::Alter(args)) => run_alter_command(args, &session).await,
        Some(Command::State(args)) => run_state_command(args, &session),
        Some(Command::Expand(args)) => run_expand_command(args, &session),
        Some(Command::Finish(args)) => run_finish_command(args, &session),
        Some(Command::Jobs) => {
            run_jobs_command(&session);
            Ok(Outcome::Done)
        }
        Some(Command::Usage(args)) => run_usage_command(args, &session)
            .await
            .map(|()| Outcome::Done),
        _ => Ok(Outcome::Done),
    };

    to_exit_code(result)
}

fn to_exit_code(result: entlim::error::Result<Outcome>) -> ExitCode {
    match result {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Rejected(message)) => {
            eprintln!("{message}");
            ExitCode::from(EXIT_REJECTED)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn handle_version_command() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn start_logging(config: &Config) -> entlim::error::Result<LogGuard> {
    let global = &config.global;
    let log_config = LogConfig::builder()
        .with_console_level(global.output_log_level)
        .with_file_level(global.file_log_level)
        .maybe_with_log_file(
            (global.file_log_level > LogLevel::SILENT)
                .then(|| global.log_file.display().to_string()),
        )
        .with_json_file(global.json_log)
        .build();
    init_logging(&log_config)
}

fn build_config_loader(global: &GlobalOptions) -> ConfigLoader {
    let mut loader = ConfigLoader::new();
    if !global.no_default_config {
        loader = loader.add_toml_file_optional(DEFAULT_CONFIG);
    }
    for path in &global.configs {
        loader = loader.add_toml_file(path);
    }
    loader.with_env_prefix(ENV_PREFIX)
}

fn load_config(global: &GlobalOptions) -> entlim::error::Result<Config> {
    let mut loader = build_config_loader(global);
    for assignment in global.to_config_overrides() {
        loader = loader.set_assignment(&assignment)?;
    }
    loader.build()
}
