// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Config-related commands for entlim.

use crate::cli::job::CheckRuleArgs;
use crate::config::Config;
use crate::error::Result;
use crate::limits::{Family, RuleSet};

/// Display current configuration options.
pub fn run_options_command(config: &Config) {
    for line in config.format_options() {
        println!("{line}");
    }
}

/// Display loaded configuration files.
pub fn run_inis_command(config_files: &[String]) {
    if config_files.is_empty() {
        println!("No configuration files loaded");
    } else {
        for line in config_files {
            println!("{line}");
        }
    }
}

/// Parse a limit attribute value and list its rules.
///
/// # Errors
///
/// Returns an error if the attribute is unknown or the rule text is malformed.
pub fn run_check_rule_command(args: &CheckRuleArgs) -> Result<()> {
    for line in check_rule(&args.attribute, &args.rules)? {
        println!("{line}");
    }
    Ok(())
}

/// Lines printed by `check-rule`: the canonical text, then one rule per line.
///
/// # Errors
///
/// Returns an error if the attribute is unknown or the rule text is malformed.
pub fn check_rule(attribute: &str, rules: &str) -> Result<Vec<String>> {
    let family = Family::from_attribute(attribute)?;
    let set = RuleSet::parse(rules)?;

    let mut lines = vec![format!("{family} = {set}")];
    lines.extend(
        set.iter()
            .map(|(entity_type, selector, bound)| format!("  {entity_type} {}: {bound}", selector.rule_id())),
    );
    Ok(lines)
}
