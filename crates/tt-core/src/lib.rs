//! tt-core: stable foundation for twintank.
//!
//! Contains:
//! - units (uom flow types + constructors in the plant's cm³/s scale)
//! - numeric (tracked clamping, grids, means)

pub mod numeric;
pub mod units;

pub use numeric::*;
pub use units::*;
