// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Parser for the limit rule mini-language.
//!
//! ```text
//! "[u:PBS_GENERIC=10],[u:bob=5]"      per-clause brackets
//! "[u:PBS_GENERIC=10, u:bob=5]"       one bracket pair around the list
//!
//! clause  = type ":" id "=" bound
//! type    = u | g | p | o
//! id      = <name> | PBS_GENERIC       (u, g, p)
//!         = PBS_ALL                    (o)
//! bound   = [0-9]+
//! ```

use regex::Regex;
use std::collections::BTreeMap;

use super::{ALL_ID, EntityType, GENERIC_ID, Selector};
use crate::error::{RuleError, RuleResult};

const CLAUSE_PATTERN: &str = r"^([^:]*):([^=]*)=(.*)$";

/// Parsed rules of one (scope, family), keyed by entity type and selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    bounds: BTreeMap<(EntityType, Selector), u64>,
}

impl RuleSet {
    /// Parses rule text. An empty or blank text yields an empty set.
    ///
    /// A later clause for the same entity type and selector replaces an
    /// earlier one.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::MalformedRule` naming the first offending clause.
    pub fn parse(text: &str) -> RuleResult<Self> {
        let text = text.trim();
        let opening = text.matches('[').count();
        let closing = text.matches(']').count();
        if opening != closing {
            return Err(RuleError::malformed(text, "unbalanced brackets"));
        }
        if text.is_empty() || text == "[]" {
            return Ok(Self::default());
        }

        let pattern = Regex::new(CLAUSE_PATTERN).map_err(|e| RuleError::malformed(text, e.to_string()))?;

        let mut bounds = BTreeMap::new();
        for raw in text.split(',') {
            let clause = strip_brackets(raw);
            if clause.is_empty() {
                return Err(RuleError::malformed(raw.trim(), "empty clause"));
            }
            let (entity_type, selector, bound) = parse_clause(&pattern, clause)?;
            bounds.insert((entity_type, selector), bound);
        }
        Ok(Self { bounds })
    }

    /// Bound for exactly this entity type and selector.
    #[must_use]
    pub fn get(&self, entity_type: EntityType, selector: &Selector) -> Option<u64> {
        self.bounds.get(&(entity_type, selector.clone())).copied()
    }

    /// Returns whether any rule exists for `entity_type`.
    #[must_use]
    pub fn constrains(&self, entity_type: EntityType) -> bool {
        self.bounds.keys().any(|(t, _)| *t == entity_type)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Iterates rules in entity type order, specific ids before generic.
    pub fn iter(&self) -> impl Iterator<Item = (EntityType, &Selector, u64)> {
        self.bounds
            .iter()
            .map(|((entity_type, selector), bound)| (*entity_type, selector, *bound))
    }
}

impl std::fmt::Display for RuleSet {
    /// Canonical rule text, one bracketed clause per rule.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (entity_type, selector, bound)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "[{}:{}={}]", entity_type.code(), selector.rule_id(), bound)?;
        }
        Ok(())
    }
}

fn strip_brackets(raw: &str) -> &str {
    let clause = raw.trim();
    let clause = clause.strip_prefix('[').unwrap_or(clause);
    let clause = clause.strip_suffix(']').unwrap_or(clause);
    clause.trim()
}

fn parse_clause(pattern: &Regex, clause: &str) -> RuleResult<(EntityType, Selector, u64)> {
    let captures = pattern
        .captures(clause)
        .ok_or_else(|| RuleError::malformed(clause, "expected 'type:id=bound'"))?;
    let code = captures.get(1).map_or("", |m| m.as_str().trim());
    let id = captures.get(2).map_or("", |m| m.as_str().trim());
    let bound = captures.get(3).map_or("", |m| m.as_str().trim());

    let entity_type = EntityType::from_code(code).ok_or_else(|| {
        RuleError::malformed(clause, format!("unknown entity type '{code}', expected u, g, p or o"))
    })?;
    let selector = parse_selector(clause, entity_type, id)?;
    let bound = parse_bound(clause, bound)?;
    Ok((entity_type, selector, bound))
}

fn parse_selector(clause: &str, entity_type: EntityType, id: &str) -> RuleResult<Selector> {
    match (entity_type, id) {
        (EntityType::Overall, ALL_ID) => Ok(Selector::All),
        (EntityType::Overall, _) => Err(RuleError::malformed(
            clause,
            format!("overall limits must use '{ALL_ID}'"),
        )),
        (_, "") => Err(RuleError::malformed(clause, "missing entity id")),
        (_, ALL_ID) => Err(RuleError::malformed(
            clause,
            format!("'{ALL_ID}' is only valid for overall limits"),
        )),
        (_, GENERIC_ID) => Ok(Selector::Generic),
        (_, id) if id.chars().any(char::is_whitespace) => {
            Err(RuleError::malformed(clause, "entity id must not contain whitespace"))
        }
        (_, id) => Ok(Selector::Specific(id.to_string())),
    }
}

fn parse_bound(clause: &str, bound: &str) -> RuleResult<u64> {
    if bound.is_empty() || !bound.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RuleError::malformed(
            clause,
            format!("bound must be a non-negative integer, got '{bound}'"),
        ));
    }
    bound
        .parse()
        .map_err(|e| RuleError::malformed(clause, format!("bound out of range: {e}")))
}
