//! Solver abstractions used by the set fitters.
//!
//! Two seams are provided:
//!
//! - [`ConvexSolver`] over a [`BarrierProblem`]: a smooth convex objective
//!   with a logarithmic barrier for its inequality constraints. The built-in
//!   implementation is [`BarrierSolver`], an interior-point method with damped
//!   Newton centering.
//! - [`NonlinearSolver`] over a [`NonlinearProblem`]: a possibly non-convex
//!   objective with inequality constraints `g(x) ≤ 0`. The built-in
//!   implementation is [`AugmentedLagrangian`] with an inner quasi-Newton
//!   loop on finite-difference gradients.
//!
//! Both report through [`SolverOutcome`], so callers always see whether a
//! result is optimal, inaccurate, or failed, and why the solver stopped.

pub mod augmented;
pub mod barrier;

pub use augmented::{AugmentedLagrangian, AugmentedLagrangianConfig};
pub use barrier::{BarrierConfig, BarrierSolver};

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::result::SolverOutcome;

/// A convex problem in barrier form: minimise `t·f₀(x) + φ(x)` for growing t.
pub trait BarrierProblem {
    /// Number of optimisation variables.
    fn dimension(&self) -> usize;

    /// Number of logarithmic barrier terms (sets the duality gap `terms / t`).
    fn num_barrier_terms(&self) -> usize;

    /// Objective f₀; `+∞` outside its domain.
    fn objective(&self, x: &DVector<f64>) -> f64;

    /// Gradient and Hessian of f₀.
    fn objective_derivatives(&self, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>);

    /// Barrier φ(x) = −Σ log(−fᵢ(x)); `+∞` when any constraint is not strict.
    fn barrier(&self, x: &DVector<f64>) -> f64;

    /// Gradient and Hessian of φ.
    fn barrier_derivatives(&self, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>);

    /// True when x is strictly feasible and f₀ is defined.
    fn in_domain(&self, x: &DVector<f64>) -> bool {
        self.objective(x).is_finite() && self.barrier(x).is_finite()
    }
}

/// Solves [`BarrierProblem`]s from a strictly feasible start.
pub trait ConvexSolver {
    fn minimize<P: BarrierProblem + ?Sized>(
        &self,
        problem: &P,
        start: DVector<f64>,
    ) -> SolverOutcome<DVector<f64>>;
}

/// A smooth constrained problem: minimise f(x) subject to g(x) ≤ 0.
pub trait NonlinearProblem {
    /// Number of optimisation variables.
    fn dimension(&self) -> usize;

    /// Objective value; may be `+∞` where undefined.
    fn objective(&self, x: &DVector<f64>) -> f64;

    /// Inequality constraint values g(x); feasible when every entry is ≤ 0.
    ///
    /// The length must not depend on x.
    fn constraints(&self, x: &DVector<f64>) -> DVector<f64>;
}

/// Solves [`NonlinearProblem`]s from an initial guess.
pub trait NonlinearSolver {
    fn minimize<P: NonlinearProblem + ?Sized>(
        &self,
        problem: &P,
        start: DVector<f64>,
    ) -> SolverOutcome<DVector<f64>>;
}

/// Cholesky factorisation with a diagonal jitter ladder.
///
/// Tries the matrix as given, then adds 10⁻¹⁰·s, 10⁻⁹·s, ..., 10⁻⁴·s to the
/// diagonal where s is the mean absolute diagonal entry.
pub(crate) fn cholesky_with_jitter(matrix: &DMatrix<f64>) -> Option<Cholesky<f64, Dyn>> {
    if let Some(chol) = Cholesky::new(matrix.clone()) {
        return Some(chol);
    }

    let n = matrix.nrows();
    let scale = (matrix.diagonal().abs().sum() / n.max(1) as f64).max(1.0);
    for exp in -10..=-4 {
        let jitter = 10f64.powi(exp) * scale;
        let jittered = matrix + DMatrix::identity(n, n) * jitter;
        if let Some(chol) = Cholesky::new(jittered) {
            return Some(chol);
        }
    }

    None
}

/// log det of a symmetric positive definite matrix, or `None` if it is not PD.
pub(crate) fn log_det_spd(matrix: &DMatrix<f64>) -> Option<f64> {
    let chol = Cholesky::new(matrix.clone())?;
    let l = chol.l();
    let log_det = 2.0 * l.diagonal().iter().map(|v| v.ln()).sum::<f64>();
    log_det.is_finite().then_some(log_det)
}
