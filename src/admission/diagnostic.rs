// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Admission outcomes.

use serde::{Deserialize, Serialize};

use crate::limits::{EntityType, Family, LimitRule, Scope, Selector};

/// The rule a rejected job would have exceeded.
///
/// Carries everything needed to render the user-facing message: scope,
/// family (which names the resource and the state filter), entity type and
/// whether the matched selector was specific, generic or overall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub scope: Scope,
    pub family: Family,
    pub entity_type: EntityType,
    pub selector: Selector,
    pub bound: u64,
}

impl Diagnostic {
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.family.resource()
    }

    #[must_use]
    pub const fn is_queued_only(&self) -> bool {
        self.family.is_queued_only()
    }

    #[must_use]
    pub const fn is_specific(&self) -> bool {
        self.selector.is_specific()
    }
}

impl From<LimitRule> for Diagnostic {
    fn from(rule: LimitRule) -> Self {
        Self {
            scope: rule.scope,
            family: rule.family,
            entity_type: rule.entity_type,
            selector: rule.selector,
            bound: rule.bound,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}:{}={}]",
            self.scope,
            self.family,
            self.entity_type.code(),
            self.selector.rule_id(),
            self.bound
        )
    }
}

/// Result of one admission call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "diagnostic", rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject(Diagnostic),
}

impl Decision {
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    #[must_use]
    pub const fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Accept => None,
            Self::Reject(diagnostic) => Some(diagnostic),
        }
    }
}
