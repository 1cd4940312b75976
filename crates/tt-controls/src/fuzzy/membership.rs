//! Linguistic terms, triangular membership functions and sampled variables.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};
use tt_core::linspace;

/// The seven ordered linguistic labels shared by every fuzzy variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinguisticTerm {
    NB,
    NM,
    NS,
    ZO,
    PS,
    PM,
    PB,
}

impl LinguisticTerm {
    pub const COUNT: usize = 7;

    pub const ALL: [LinguisticTerm; Self::COUNT] = [
        LinguisticTerm::NB,
        LinguisticTerm::NM,
        LinguisticTerm::NS,
        LinguisticTerm::ZO,
        LinguisticTerm::PS,
        LinguisticTerm::PM,
        LinguisticTerm::PB,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            LinguisticTerm::NB => "NB",
            LinguisticTerm::NM => "NM",
            LinguisticTerm::NS => "NS",
            LinguisticTerm::ZO => "ZO",
            LinguisticTerm::PS => "PS",
            LinguisticTerm::PM => "PM",
            LinguisticTerm::PB => "PB",
        }
    }
}

impl std::fmt::Display for LinguisticTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Triangular membership function with breakpoints `a <= b <= c`.
///
/// The peak `b` always has degree 1. A degenerate side (`a == b` or
/// `b == c`) has no slope: it contributes nothing beyond the peak itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularMf {
    a: f64,
    b: f64,
    c: f64,
}

impl TriangularMf {
    pub fn new(a: f64, b: f64, c: f64) -> ControlResult<Self> {
        let ordered = a <= b && b <= c;
        if !(ordered && a.is_finite() && c.is_finite()) {
            return Err(ControlError::InvalidMembership { a, b, c });
        }
        Ok(Self { a, b, c })
    }

    pub fn breakpoints(&self) -> (f64, f64, f64) {
        (self.a, self.b, self.c)
    }

    pub fn degree(&self, x: f64) -> f64 {
        if x < self.a || x > self.c {
            0.0
        } else if x == self.b {
            1.0
        } else if x < self.b {
            (x - self.a) / (self.b - self.a)
        } else {
            (self.c - x) / (self.c - self.b)
        }
    }
}

/// Bounded universe of discourse sampled on a uniform grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl Universe {
    pub fn new(min: f64, max: f64, samples: usize) -> ControlResult<Self> {
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(ControlError::InvalidArg {
                what: "universe bounds must be finite with min < max",
            });
        }
        if samples < 2 {
            return Err(ControlError::InvalidArg {
                what: "universe needs at least two samples",
            });
        }
        Ok(Self { min, max, samples })
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    pub fn grid(&self) -> Vec<f64> {
        linspace(self.min, self.max, self.samples)
    }
}

/// Membership degree of a crisp value in each of the seven terms.
pub type Degrees = [f64; LinguisticTerm::COUNT];

/// A fuzzy variable: a universe and one sampled membership curve per term.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyVariable {
    name: &'static str,
    universe: Universe,
    grid: Vec<f64>,
    curves: [Vec<f64>; LinguisticTerm::COUNT],
}

impl FuzzyVariable {
    pub fn new(
        name: &'static str,
        universe: Universe,
        terms: [TriangularMf; LinguisticTerm::COUNT],
    ) -> Self {
        let grid = universe.grid();
        let curves = terms.map(|mf| grid.iter().map(|&x| mf.degree(x)).collect());
        Self {
            name,
            universe,
            grid,
            curves,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Sampled membership curve of `term` over [`Self::grid`].
    pub fn curve(&self, term: LinguisticTerm) -> &[f64] {
        &self.curves[term.index()]
    }

    /// Membership degree of `x` in every term.
    ///
    /// Degrees are linearly interpolated between grid samples. Values outside
    /// the universe take the degree of the nearest boundary sample.
    pub fn fuzzify(&self, x: f64) -> Degrees {
        let last = self.grid.len() - 1;
        // First sample at or above x.
        let idx = self.grid.partition_point(|&g| g < x);

        let mut degrees = [0.0; LinguisticTerm::COUNT];
        for (degree, curve) in degrees.iter_mut().zip(&self.curves) {
            *degree = if idx > last {
                curve[last]
            } else if idx == 0 || self.grid[idx] == x {
                curve[idx]
            } else {
                let (x1, x2) = (self.grid[idx - 1], self.grid[idx]);
                let (y1, y2) = (curve[idx - 1], curve[idx]);
                y1 + (y2 - y1) * (x - x1) / (x2 - x1)
            };
        }
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_indices_are_ordered() {
        for (i, term) in LinguisticTerm::ALL.iter().enumerate() {
            assert_eq!(term.index(), i);
        }
        assert!(LinguisticTerm::NB < LinguisticTerm::PB);
        assert_eq!(LinguisticTerm::ZO.to_string(), "ZO");
    }

    #[test]
    fn triangle_degrees() {
        let mf = TriangularMf::new(-10.0, 0.0, 10.0).unwrap();
        assert_eq!(mf.degree(0.0), 1.0);
        assert_eq!(mf.degree(-5.0), 0.5);
        assert_eq!(mf.degree(5.0), 0.5);
        assert_eq!(mf.degree(-10.0), 0.0);
        assert_eq!(mf.degree(11.0), 0.0);
    }

    #[test]
    fn degenerate_sides() {
        let left = TriangularMf::new(-50.0, -50.0, -30.0).unwrap();
        assert_eq!(left.degree(-50.0), 1.0);
        assert_eq!(left.degree(-40.0), 0.5);

        let right = TriangularMf::new(30.0, 50.0, 50.0).unwrap();
        assert_eq!(right.degree(50.0), 1.0);
        assert_eq!(right.degree(40.0), 0.5);

        let singleton = TriangularMf::new(200.0, 200.0, 200.0).unwrap();
        assert_eq!(singleton.degree(200.0), 1.0);
        assert_eq!(singleton.degree(199.9), 0.0);
    }

    #[test]
    fn rejects_unordered_breakpoints() {
        assert!(TriangularMf::new(1.0, 0.0, 2.0).is_err());
        assert!(TriangularMf::new(0.0, 3.0, 2.0).is_err());
        assert!(TriangularMf::new(f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn universe_validation() {
        assert!(Universe::new(0.0, 1.0, 2).is_ok());
        assert!(Universe::new(1.0, 0.0, 10).is_err());
        assert!(Universe::new(0.0, 1.0, 1).is_err());
    }

    fn ramp_variable() -> FuzzyVariable {
        let universe = Universe::new(-10.0, 10.0, 5).unwrap();
        let zo = TriangularMf::new(-10.0, 0.0, 10.0).unwrap();
        let off = TriangularMf::new(-10.0, -10.0, -10.0).unwrap();
        FuzzyVariable::new("ramp", universe, [off, off, off, zo, off, off, off])
    }

    #[test]
    fn fuzzify_interpolates_between_samples() {
        let var = ramp_variable();
        // Grid is -10, -5, 0, 5, 10
        let d = var.fuzzify(2.5);
        assert!((d[LinguisticTerm::ZO.index()] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn fuzzify_saturates_outside_universe() {
        let var = ramp_variable();
        assert_eq!(var.fuzzify(-100.0), var.fuzzify(-10.0));
        assert_eq!(var.fuzzify(100.0), var.fuzzify(10.0));
        assert_eq!(var.fuzzify(-100.0)[LinguisticTerm::NB.index()], 1.0);
    }
}
