//! Ziegler–Nichols gain rules from the ultimate gain and period.

use crate::autotune::TuningResult;
use crate::controller::PidGains;

/// "No overshoot" rule: `Kp = 0.33 Ku`, `Ki = 0.6 Ku / Tu`, `Kd = 0.11 Ku Tu`.
///
/// `Ki` and `Kd` are in the parallel form used by the controllers here
/// (`Ki = Kp / Ti`, `Kd = Kp * Td`).
pub fn no_overshoot(result: &TuningResult) -> PidGains {
    PidGains {
        kp: 0.33 * result.ku,
        ki: 0.6 * result.ku / result.tu,
        kd: 0.11 * result.ku * result.tu,
    }
}
