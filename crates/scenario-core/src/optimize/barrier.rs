//! Log-barrier interior-point method.
//!
//! For t = t₀, μt₀, μ²t₀, ... the centering step minimises
//! `t·f₀(x) + φ(x)` with damped Newton iterations. After each centering the
//! duality gap is bounded by `terms / t`; the method stops once that bound
//! falls below the gap tolerance.
//!
//! The line search backtracks until the trial point is strictly feasible
//! and satisfies the Armijo condition, so every iterate stays in the domain.

use nalgebra::{DMatrix, DVector};

use super::{cholesky_with_jitter, BarrierProblem, ConvexSolver};
use crate::constants::{
    DEFAULT_BARRIER_GROWTH, DEFAULT_BARRIER_MAX_ITERATIONS, DEFAULT_GAP_TOLERANCE,
    DEFAULT_INACCURATE_GAP_TOLERANCE, DEFAULT_NEWTON_TOLERANCE,
};
use crate::result::{SolveStatus, SolverExit, SolverOutcome};

/// Armijo sufficient-decrease fraction.
const ARMIJO_ALPHA: f64 = 0.25;

/// Backtracking shrink factor.
const BACKTRACK_BETA: f64 = 0.5;

/// Smallest step length tried before declaring a stall.
const MIN_STEP: f64 = 1e-14;

/// Configuration for [`BarrierSolver`].
#[derive(Debug, Clone)]
pub struct BarrierConfig {
    /// Total Newton step budget across all centering phases.
    pub max_iterations: usize,

    /// Duality-gap bound for `Optimal`.
    pub gap_tolerance: f64,

    /// Duality-gap bound under which an interrupted solve is still
    /// reported as `OptimalInaccurate` rather than `Failed`.
    pub inaccurate_gap_tolerance: f64,

    /// Initial barrier parameter t₀.
    pub initial_t: f64,

    /// Growth factor μ of t between centering phases.
    pub barrier_growth: f64,

    /// Newton decrement threshold λ²/2 ending a centering phase.
    pub newton_tolerance: f64,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_BARRIER_MAX_ITERATIONS,
            gap_tolerance: DEFAULT_GAP_TOLERANCE,
            inaccurate_gap_tolerance: DEFAULT_INACCURATE_GAP_TOLERANCE,
            initial_t: 1.0,
            barrier_growth: DEFAULT_BARRIER_GROWTH,
            newton_tolerance: DEFAULT_NEWTON_TOLERANCE,
        }
    }
}

/// Interior-point solver for [`BarrierProblem`]s.
#[derive(Debug, Clone, Default)]
pub struct BarrierSolver {
    pub config: BarrierConfig,
}

impl BarrierSolver {
    pub fn new(config: BarrierConfig) -> Self {
        Self { config }
    }

    fn finish(
        &self,
        x: DVector<f64>,
        objective: f64,
        gap: f64,
        iterations: usize,
        exit: SolverExit,
    ) -> SolverOutcome<DVector<f64>> {
        let (status, message) = if exit == SolverExit::Converged {
            (SolveStatus::Optimal, format!("duality gap {:.3e}", gap))
        } else if gap <= self.config.inaccurate_gap_tolerance {
            (
                SolveStatus::OptimalInaccurate,
                format!("{} with duality gap {:.3e}", exit, gap),
            )
        } else {
            (
                SolveStatus::Failed,
                format!("{} with duality gap {:.3e}", exit, gap),
            )
        };
        SolverOutcome {
            status,
            solution: x,
            objective,
            iterations,
            exit,
            message,
        }
    }
}

impl ConvexSolver for BarrierSolver {
    fn minimize<P: BarrierProblem + ?Sized>(
        &self,
        problem: &P,
        start: DVector<f64>,
    ) -> SolverOutcome<DVector<f64>> {
        let cfg = &self.config;
        let terms = problem.num_barrier_terms().max(1) as f64;
        let mut x = start;

        if !problem.in_domain(&x) {
            return SolverOutcome {
                status: SolveStatus::Failed,
                objective: f64::INFINITY,
                solution: x,
                iterations: 0,
                exit: SolverExit::NonFinite,
                message: String::from("starting point is not strictly feasible"),
            };
        }

        let mut t = cfg.initial_t;
        let mut iterations = 0usize;

        loop {
            // Centering: damped Newton on t·f₀ + φ.
            loop {
                if iterations >= cfg.max_iterations {
                    let f0 = problem.objective(&x);
                    return self.finish(x, f0, terms / t, iterations, SolverExit::MaxIterations);
                }

                let f_current = t * problem.objective(&x) + problem.barrier(&x);
                let (g0, h0) = problem.objective_derivatives(&x);
                let (gb, hb) = problem.barrier_derivatives(&x);
                let grad: DVector<f64> = g0 * t + gb;
                let hess: DMatrix<f64> = h0 * t + hb;

                if !f_current.is_finite() || grad.iter().any(|v| !v.is_finite()) {
                    let f0 = problem.objective(&x);
                    return self.finish(x, f0, terms / t, iterations, SolverExit::NonFinite);
                }

                let chol = match cholesky_with_jitter(&hess) {
                    Some(c) => c,
                    None => {
                        let f0 = problem.objective(&x);
                        return self.finish(x, f0, terms / t, iterations, SolverExit::Stalled);
                    }
                };
                let step = chol.solve(&(-&grad));
                let slope = grad.dot(&step);
                let decrement = -slope;

                if decrement / 2.0 <= cfg.newton_tolerance {
                    break;
                }

                let mut s = 1.0;
                let accepted = loop {
                    let trial = &x + &step * s;
                    if problem.in_domain(&trial) {
                        let value = t * problem.objective(&trial) + problem.barrier(&trial);
                        if value.is_finite() && value <= f_current + ARMIJO_ALPHA * s * slope {
                            break Some(trial);
                        }
                    }
                    s *= BACKTRACK_BETA;
                    if s < MIN_STEP {
                        break None;
                    }
                };
                iterations += 1;

                match accepted {
                    Some(next) => x = next,
                    None => {
                        let f0 = problem.objective(&x);
                        return self.finish(x, f0, terms / t, iterations, SolverExit::Stalled);
                    }
                }
            }

            let gap = terms / t;
            if gap <= cfg.gap_tolerance {
                let f0 = problem.objective(&x);
                return self.finish(x, f0, gap, iterations, SolverExit::Converged);
            }
            t *= cfg.barrier_growth;
        }
    }
}
