//! Mamdani fuzzy gain scheduling.
//!
//! Pipeline evaluated every controller tick:
//! 1. **Fuzzify** the crisp error and change of error into term degrees
//! 2. **Infer** with min for rule strength and max for aggregation
//! 3. **Defuzzify** each gain's aggregated set by its centroid

pub mod membership;
pub mod rules;
pub mod scheduler;
pub mod tables;

pub use membership::{Degrees, FuzzyVariable, LinguisticTerm, TriangularMf, Universe};
pub use rules::{GainConsequent, RuleEntry, RuleTable};
pub use scheduler::{Aggregate, FiredRule, FuzzyGainScheduler, Schedule, defuzzify_centroid};
