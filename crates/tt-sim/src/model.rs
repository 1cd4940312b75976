//! TransientModel trait for pluggable dynamic systems.

use crate::error::SimResult;

/// A system of ODEs `x_dot = f(t, x)` that an [`Integrator`](crate::Integrator)
/// can advance.
///
/// Inputs held constant over a step (inflows, valve openings, disturbance)
/// live in the model, not in the state.
pub trait TransientModel {
    type State: Clone;

    /// Compute the state derivative at `(t, x)`.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Element-wise `a + b`.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// `scale * a`.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}
