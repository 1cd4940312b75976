//! Mamdani inference from (error, change of error) to PID gains.

use super::membership::{FuzzyVariable, LinguisticTerm, TriangularMf, Universe};
use super::rules::{RuleEntry, RuleTable};
use super::tables::{self, Breakpoints};
use crate::controller::PidGains;
use crate::error::{ControlError, ControlResult};

/// A rule that fired with non-zero strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiredRule {
    pub rule: RuleEntry,
    pub strength: f64,
}

/// Aggregated output sets, sampled on each gain variable's grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub kp: Vec<f64>,
    pub ki: Vec<f64>,
    pub kd: Vec<f64>,
    pub fired: Vec<FiredRule>,
}

/// Result of one scheduling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub gains: PidGains,
    pub fired: Vec<FiredRule>,
    /// At least one aggregated set was identically zero and defuzzified to 0.
    pub degenerate: bool,
}

/// Centroid of a sampled fuzzy set, `None` when the set is identically zero.
pub fn defuzzify_centroid(set: &[f64], grid: &[f64]) -> Option<f64> {
    let mass: f64 = set.iter().sum();
    if mass <= 0.0 {
        return None;
    }
    let moment: f64 = set.iter().zip(grid).map(|(mu, x)| mu * x).sum();
    Some(moment / mass)
}

/// Fuzzy inference engine producing (Kp, Ki, Kd) from the control error.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyGainScheduler {
    error: FuzzyVariable,
    change: FuzzyVariable,
    kp: FuzzyVariable,
    ki: FuzzyVariable,
    kd: FuzzyVariable,
    rules: RuleTable,
}

fn variable(
    name: &'static str,
    universe: (f64, f64, usize),
    breakpoints: &Breakpoints,
) -> ControlResult<FuzzyVariable> {
    let (min, max, samples) = universe;
    let universe = Universe::new(min, max, samples)?;
    let terms = breakpoints
        .iter()
        .map(|&(a, b, c)| TriangularMf::new(a, b, c))
        .collect::<ControlResult<Vec<_>>>()?;
    let terms: [TriangularMf; LinguisticTerm::COUNT] =
        terms.try_into().map_err(|_| ControlError::InvalidArg {
            what: "each fuzzy variable needs exactly seven terms",
        })?;
    Ok(FuzzyVariable::new(name, universe, terms))
}

impl FuzzyGainScheduler {
    /// Scheduler with the standard universes, membership functions and rules.
    pub fn new() -> ControlResult<Self> {
        Self::with_rules(RuleTable::standard()?)
    }

    /// Scheduler with the standard variables and a custom rule base.
    pub fn with_rules(rules: RuleTable) -> ControlResult<Self> {
        Ok(Self {
            error: variable("error", tables::ERROR_UNIVERSE, &tables::ERROR_TERMS)?,
            change: variable("change_of_error", tables::CHANGE_UNIVERSE, &tables::CHANGE_TERMS)?,
            kp: variable("kp", tables::KP_UNIVERSE, &tables::KP_TERMS)?,
            ki: variable("ki", tables::KI_UNIVERSE, &tables::KI_TERMS)?,
            kd: variable("kd", tables::KD_UNIVERSE, &tables::KD_TERMS)?,
            rules,
        })
    }

    pub fn error_universe(&self) -> &Universe {
        self.error.universe()
    }

    pub fn change_universe(&self) -> &Universe {
        self.change.universe()
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Run fuzzification and min-max inference, without defuzzifying.
    pub fn infer(&self, error: f64, change: f64) -> Aggregate {
        let e_degrees = self.error.fuzzify(self.error.universe().clamp(error));
        let ce_degrees = self.change.fuzzify(self.change.universe().clamp(change));

        let mut aggregate = Aggregate {
            kp: vec![0.0; self.kp.grid().len()],
            ki: vec![0.0; self.ki.grid().len()],
            kd: vec![0.0; self.kd.grid().len()],
            fired: Vec::new(),
        };

        for rule in self.rules.iter() {
            let strength = e_degrees[rule.error.index()].min(ce_degrees[rule.change.index()]);
            if strength <= 0.0 {
                continue;
            }
            clip_max(&mut aggregate.kp, self.kp.curve(rule.then.kp), strength);
            clip_max(&mut aggregate.ki, self.ki.curve(rule.then.ki), strength);
            clip_max(&mut aggregate.kd, self.kd.curve(rule.then.kd), strength);
            aggregate.fired.push(FiredRule { rule, strength });
        }

        aggregate
    }

    /// Schedule gains for the given error (cm) and change of error (cm/s).
    ///
    /// Inputs are clamped to their universes. A gain whose aggregated set is
    /// empty defuzzifies to 0 and marks the schedule as degenerate.
    pub fn schedule(&self, error: f64, change: f64) -> Schedule {
        let aggregate = self.infer(error, change);

        let kp = defuzzify_centroid(&aggregate.kp, self.kp.grid());
        let ki = defuzzify_centroid(&aggregate.ki, self.ki.grid());
        let kd = defuzzify_centroid(&aggregate.kd, self.kd.grid());
        let degenerate = kp.is_none() || ki.is_none() || kd.is_none();
        if degenerate {
            tracing::warn!(error, change, "fuzzy aggregate empty, defuzzified gain set to 0");
        }

        Schedule {
            gains: PidGains {
                kp: kp.unwrap_or(0.0),
                ki: ki.unwrap_or(0.0),
                kd: kd.unwrap_or(0.0),
            },
            fired: aggregate.fired,
            degenerate,
        }
    }
}

/// `set[i] = max(set[i], min(strength, term[i]))`
fn clip_max(set: &mut [f64], term: &[f64], strength: f64) {
    for (acc, &mu) in set.iter_mut().zip(term) {
        *acc = acc.max(strength.min(mu));
    }
}
