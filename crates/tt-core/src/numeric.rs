/// Which side of a range a value was clamped against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clamped {
    No,
    Low,
    High,
}

impl Clamped {
    pub fn is_clamped(self) -> bool {
        self != Clamped::No
    }
}

/// Clamp `v` to `[lo, hi]` and report whether (and where) it saturated.
///
/// Callers must guarantee `lo <= hi`.
pub fn clamp_tracked(v: f64, lo: f64, hi: f64) -> (f64, Clamped) {
    if v < lo {
        (lo, Clamped::Low)
    } else if v > hi {
        (hi, Clamped::High)
    } else {
        (v, Clamped::No)
    }
}

/// Running count of saturation events against a range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaturationCounter {
    pub low: u64,
    pub high: u64,
}

impl SaturationCounter {
    pub fn record(&mut self, clamped: Clamped) {
        match clamped {
            Clamped::No => {}
            Clamped::Low => self.low += 1,
            Clamped::High => self.high += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.high
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Evenly spaced samples over `[min, max]`, endpoints included.
pub fn linspace(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        n => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_tracked_stays_in_range(v in -1e6_f64..1e6, lo in -100.0_f64..0.0, width in 0.0_f64..100.0) {
            let hi = lo + width;
            let (c, side) = clamp_tracked(v, lo, hi);
            prop_assert!(c >= lo && c <= hi);
            prop_assert_eq!(side.is_clamped(), c != v);
        }
    }
}
