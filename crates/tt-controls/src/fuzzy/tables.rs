//! Fixed universes, membership breakpoints and the standard rule base.
//!
//! Error is in cm, change of error in cm/s. Gain universes bound what the
//! scheduler can emit.

use super::membership::LinguisticTerm::{self, NB, NM, NS, PB, PM, PS, ZO};
use super::rules::{GainConsequent, RuleEntry};

/// `(min, max, samples)` for each universe.
pub const ERROR_UNIVERSE: (f64, f64, usize) = (-50.0, 50.0, 101);
pub const CHANGE_UNIVERSE: (f64, f64, usize) = (-20.0, 20.0, 81);
pub const KP_UNIVERSE: (f64, f64, usize) = (0.0, 200.0, 101);
pub const KI_UNIVERSE: (f64, f64, usize) = (0.0, 50.0, 101);
pub const KD_UNIVERSE: (f64, f64, usize) = (0.0, 300.0, 101);

/// Triangle breakpoints `(a, b, c)` in NB..PB order.
pub type Breakpoints = [(f64, f64, f64); 7];

pub const ERROR_TERMS: Breakpoints = [
    (-50.0, -50.0, -30.0),
    (-50.0, -30.0, -10.0),
    (-30.0, -10.0, 0.0),
    (-10.0, 0.0, 10.0),
    (0.0, 10.0, 30.0),
    (10.0, 30.0, 50.0),
    (30.0, 50.0, 50.0),
];

pub const CHANGE_TERMS: Breakpoints = [
    (-20.0, -20.0, -12.0),
    (-20.0, -12.0, -4.0),
    (-12.0, -4.0, 0.0),
    (-4.0, 0.0, 4.0),
    (0.0, 4.0, 12.0),
    (4.0, 12.0, 20.0),
    (12.0, 20.0, 20.0),
];

// PM and PB both collapse onto the upper bound of the Kp universe.
pub const KP_TERMS: Breakpoints = [
    (0.0, 0.0, 50.0),
    (0.0, 50.0, 100.0),
    (50.0, 100.0, 150.0),
    (100.0, 150.0, 200.0),
    (150.0, 200.0, 200.0),
    (200.0, 200.0, 200.0),
    (200.0, 200.0, 200.0),
];

pub const KI_TERMS: Breakpoints = [
    (0.0, 0.0, 10.0),
    (0.0, 10.0, 20.0),
    (10.0, 20.0, 30.0),
    (20.0, 30.0, 40.0),
    (30.0, 40.0, 50.0),
    (40.0, 50.0, 50.0),
    (50.0, 50.0, 50.0),
];

pub const KD_TERMS: Breakpoints = [
    (0.0, 0.0, 50.0),
    (0.0, 50.0, 100.0),
    (50.0, 100.0, 150.0),
    (100.0, 150.0, 200.0),
    (150.0, 200.0, 250.0),
    (200.0, 250.0, 300.0),
    (250.0, 300.0, 300.0),
];

const fn rule(
    error: LinguisticTerm,
    change: LinguisticTerm,
    kp: LinguisticTerm,
    ki: LinguisticTerm,
    kd: LinguisticTerm,
) -> RuleEntry {
    RuleEntry {
        error,
        change,
        then: GainConsequent { kp, ki, kd },
    }
}

pub const STANDARD_RULES: [RuleEntry; 49] = [
    // E = NB
    rule(NB, NB, PB, NB, PS),
    rule(NB, NM, PB, NB, NS),
    rule(NB, NS, PM, NM, NB),
    rule(NB, ZO, PM, NM, NB),
    rule(NB, PS, PS, NS, NB),
    rule(NB, PM, ZO, ZO, NM),
    rule(NB, PB, ZO, ZO, PS),
    // E = NM
    rule(NM, NB, PB, NB, NS),
    rule(NM, NM, PB, NB, NB),
    rule(NM, NS, PM, NM, NB),
    rule(NM, ZO, PM, NS, NM),
    rule(NM, PS, PS, NS, NM),
    rule(NM, PM, ZO, ZO, NS),
    rule(NM, PB, ZO, ZO, ZO),
    // E = NS
    rule(NS, NB, PM, NB, ZO),
    rule(NS, NM, PM, NM, NS),
    rule(NS, NS, PM, NS, NM),
    rule(NS, ZO, PS, NS, NM),
    rule(NS, PS, PS, ZO, NS),
    rule(NS, PM, ZO, ZO, NS),
    rule(NS, PB, ZO, PS, ZO),
    // E = ZO
    rule(ZO, NB, PM, NM, ZO),
    rule(ZO, NM, PS, NS, PS),
    rule(ZO, NS, PS, ZO, PS),
    rule(ZO, ZO, ZO, ZO, ZO),
    rule(ZO, PS, PS, ZO, PS),
    rule(ZO, PM, PS, NS, PS),
    rule(ZO, PB, PM, NM, ZO),
    // E = PS
    rule(PS, NB, ZO, PS, ZO),
    rule(PS, NM, ZO, ZO, NS),
    rule(PS, NS, PS, ZO, NS),
    rule(PS, ZO, PS, NS, NM),
    rule(PS, PS, PS, NS, NM),
    rule(PS, PM, PM, NS, NM),
    rule(PS, PB, PM, NM, ZO),
    // E = PM
    rule(PM, NB, ZO, ZO, ZO),
    rule(PM, NM, ZO, ZO, NS),
    rule(PM, NS, PS, NS, NM),
    rule(PM, ZO, PM, NS, NM),
    rule(PM, PS, PM, NS, NB),
    rule(PM, PM, PM, NM, NB),
    rule(PM, PB, PB, NB, NS),
    // E = PB
    rule(PB, NB, ZO, ZO, PS),
    rule(PB, NM, ZO, ZO, NM),
    rule(PB, NS, PS, NS, NB),
    rule(PB, ZO, PM, NM, NB),
    rule(PB, PS, PM, NM, NB),
    rule(PB, PM, PB, NB, NS),
    rule(PB, PB, PB, NB, PS),
];
