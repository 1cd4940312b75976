//! The 7×7 rule base mapping (error, change of error) to gain terms.

use super::membership::LinguisticTerm;
use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

const N: usize = LinguisticTerm::COUNT;

/// Output terms for Kp, Ki and Kd selected by one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainConsequent {
    pub kp: LinguisticTerm,
    pub ki: LinguisticTerm,
    pub kd: LinguisticTerm,
}

/// One `IF E is .. AND CE is .. THEN (Kp, Ki, Kd) is ..` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub error: LinguisticTerm,
    pub change: LinguisticTerm,
    pub then: GainConsequent,
}

/// Rule base indexed by `[error term][change-of-error term]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    table: [[GainConsequent; N]; N],
}

impl RuleTable {
    /// Build a table from a list of rules.
    ///
    /// Every `(error, change)` pair must appear exactly once.
    pub fn from_entries(entries: &[RuleEntry]) -> ControlResult<Self> {
        let mut slots: [[Option<GainConsequent>; N]; N] = [[None; N]; N];

        for entry in entries {
            let slot = &mut slots[entry.error.index()][entry.change.index()];
            if slot.is_some() {
                return Err(ControlError::RuleCoverage {
                    what: format!("duplicate rule for ({}, {})", entry.error, entry.change),
                });
            }
            *slot = Some(entry.then);
        }

        let mut table = [[GainConsequent {
            kp: LinguisticTerm::ZO,
            ki: LinguisticTerm::ZO,
            kd: LinguisticTerm::ZO,
        }; N]; N];

        for e in LinguisticTerm::ALL {
            for ce in LinguisticTerm::ALL {
                table[e.index()][ce.index()] =
                    slots[e.index()][ce.index()].ok_or_else(|| ControlError::RuleCoverage {
                        what: format!("missing rule for ({e}, {ce})"),
                    })?;
            }
        }

        Ok(Self { table })
    }

    /// The standard fuzzy PID tuning rules.
    pub fn standard() -> ControlResult<Self> {
        Self::from_entries(&super::tables::STANDARD_RULES)
    }

    pub fn get(&self, error: LinguisticTerm, change: LinguisticTerm) -> GainConsequent {
        self.table[error.index()][change.index()]
    }

    /// All 49 rules in (error, change) order.
    pub fn iter(&self) -> impl Iterator<Item = RuleEntry> + '_ {
        LinguisticTerm::ALL.into_iter().flat_map(move |error| {
            LinguisticTerm::ALL.into_iter().map(move |change| RuleEntry {
                error,
                change,
                then: self.get(error, change),
            })
        })
    }
}
