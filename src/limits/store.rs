// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Active limit rules for every scope.
//!
//! ```text
//! LimitStore
//!   RwLock<Arc<LimitTable>>
//!        |
//!   set(scope, family, text)
//!        parse --Err--> MalformedRule, table untouched
//!          | Ok
//!          v
//!        clone table, replace (scope, family), swap Arc
//!
//!   snapshot() --> Arc<LimitTable>   (stable for one admission check)
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{Family, LimitRule, RuleSet, Scope};
use crate::error::RuleResult;

/// Immutable view of every active rule set.
#[derive(Debug, Clone, Default)]
pub struct LimitTable {
    sets: BTreeMap<(Scope, Family), Arc<RuleSet>>,
}

impl LimitTable {
    /// Rule set of (scope, family), if any rules are configured.
    #[must_use]
    pub fn rule_set(&self, scope: &Scope, family: &Family) -> Option<&RuleSet> {
        self.sets
            .get(&(scope.clone(), family.clone()))
            .map(AsRef::as_ref)
    }

    /// Families configured at `scope`, in evaluation order.
    pub fn families<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a Family> + 'a {
        self.sets
            .keys()
            .filter(move |(s, _)| s == scope)
            .map(|(_, family)| family)
    }

    /// Every scope with at least one rule set, server first.
    #[must_use]
    pub fn scopes(&self) -> Vec<&Scope> {
        let mut scopes: Vec<&Scope> = self.sets.keys().map(|(scope, _)| scope).collect();
        scopes.dedup();
        scopes
    }

    /// All rules of (scope, family).
    #[must_use]
    pub fn rules_for(&self, scope: &Scope, family: &Family) -> Vec<LimitRule> {
        self.rule_set(scope, family)
            .map(|set| {
                set.iter()
                    .map(|(entity_type, selector, bound)| LimitRule {
                        scope: scope.clone(),
                        family: family.clone(),
                        entity_type,
                        selector: selector.clone(),
                        bound,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every configured rule, in evaluation order.
    #[must_use]
    pub fn all_rules(&self) -> Vec<LimitRule> {
        self.sets
            .keys()
            .flat_map(|(scope, family)| self.rules_for(scope, family))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    fn with_set(&self, scope: Scope, family: Family, set: RuleSet) -> Self {
        let mut sets = self.sets.clone();
        if set.is_empty() {
            sets.remove(&(scope, family));
        } else {
            sets.insert((scope, family), Arc::new(set));
        }
        Self { sets }
    }
}

/// Holder of the active [`LimitTable`], replaced as a whole on every update.
#[derive(Debug, Default)]
pub struct LimitStore {
    table: RwLock<Arc<LimitTable>>,
}

impl LimitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the rules of (scope, family) with the parsed `text`.
    ///
    /// An empty text clears them.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::MalformedRule` if `text` does not parse; the
    /// previously active rules stay in force.
    pub fn set(&self, scope: Scope, family: Family, text: &str) -> RuleResult<()> {
        let set = RuleSet::parse(text)?;
        tracing::info!(scope = %scope, attribute = %family, rules = %set, "Replacing limit rules");

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let next = table.with_set(scope, family, set);
        *table = Arc::new(next);
        Ok(())
    }

    /// Same as [`Self::set`], naming the family by attribute.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::UnknownAttribute` or `RuleError::MalformedRule`.
    pub fn set_attribute(&self, scope: Scope, attribute: &str, text: &str) -> RuleResult<()> {
        let family = Family::from_attribute(attribute)?;
        self.set(scope, family, text)
    }

    /// Removes the rules of (scope, family).
    pub fn unset(&self, scope: Scope, family: Family) {
        tracing::info!(scope = %scope, attribute = %family, "Clearing limit rules");
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let next = table.with_set(scope, family, RuleSet::default());
        *table = Arc::new(next);
    }

    /// Current table. Later updates never affect a snapshot already taken.
    #[must_use]
    pub fn snapshot(&self) -> Arc<LimitTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn rules_for(&self, scope: &Scope, family: &Family) -> Vec<LimitRule> {
        self.snapshot().rules_for(scope, family)
    }
}
