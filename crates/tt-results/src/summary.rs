//! Run summary statistics.

use crate::types::{RunSummary, TimeseriesRecord};

/// Summarise a recorded run. `None` when nothing was recorded.
///
/// `output_limits` is the controller's output range; samples within 1e-9 of
/// either bound count as saturated. Counters that only the live simulation
/// knows (`level_clamps`, `output_saturations`) are left at zero.
pub fn summarize(records: &[TimeseriesRecord], output_limits: (f64, f64)) -> Option<RunSummary> {
    let last = records.last()?;
    let (lo, hi) = output_limits;

    let mut peak_h2 = f64::NEG_INFINITY;
    let mut overshoot: f64 = 0.0;
    let mut saturated = 0usize;
    for r in records {
        peak_h2 = peak_h2.max(r.h2_cm);
        overshoot = overshoot.max(r.h2_cm - r.setpoint_cm);
        if (r.inflow_cm3_s - lo).abs() < 1e-9 || (r.inflow_cm3_s - hi).abs() < 1e-9 {
            saturated += 1;
        }
    }

    Some(RunSummary {
        samples: records.len(),
        final_time_s: last.time_s,
        final_h1_cm: last.h1_cm,
        final_h2_cm: last.h2_cm,
        peak_h2_cm: peak_h2,
        overshoot_cm: overshoot,
        saturated_fraction: saturated as f64 / records.len() as f64,
        level_clamps: 0,
        output_saturations: 0,
        final_outflows: None,
        tuning: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(t: f64, sp: f64, h2: f64, q: f64) -> TimeseriesRecord {
        TimeseriesRecord {
            time_s: t,
            setpoint_cm: sp,
            h1_cm: h2 + 5.0,
            h2_cm: h2,
            inflow_cm3_s: q,
            disturbance_active: false,
        }
    }

    #[test]
    fn empty_has_no_summary() {
        assert!(summarize(&[], (0.0, 300.0)).is_none());
    }

    #[test]
    fn overshoot_and_saturation() {
        let records = [
            rec(0.1, 25.0, 1.0, 300.0),
            rec(0.2, 25.0, 26.5, 0.0),
            rec(0.3, 20.0, 21.0, 150.0),
            rec(0.4, 20.0, 20.0, 140.0),
        ];
        let s = summarize(&records, (0.0, 300.0)).unwrap();
        assert_eq!(s.samples, 4);
        assert_eq!(s.final_time_s, 0.4);
        assert_eq!(s.final_h2_cm, 20.0);
        assert_eq!(s.final_h1_cm, 25.0);
        assert_eq!(s.peak_h2_cm, 26.5);
        assert!((s.overshoot_cm - 1.5).abs() < 1e-12);
        assert!((s.saturated_fraction - 0.5).abs() < 1e-12);
    }

    #[test]
    fn never_above_setpoint_means_zero_overshoot() {
        let records = [rec(0.1, 25.0, 10.0, 300.0), rec(0.2, 25.0, 20.0, 300.0)];
        let s = summarize(&records, (0.0, 300.0)).unwrap();
        assert_eq!(s.overshoot_cm, 0.0);
        assert_eq!(s.saturated_fraction, 1.0);
    }
}
