//! Powell-Hestenes-Rockafellar augmented Lagrangian for inequality
//! constrained problems.
//!
//! Each outer iteration minimises
//!
//! ```text
//! L(x; λ, ρ) = f(x) + 1/(2ρ) · Σᵢ [ max(0, λᵢ + ρ·gᵢ(x))² − λᵢ² ]
//! ```
//!
//! with a BFGS inner loop on central-difference gradients, then updates
//! `λ ← max(0, λ + ρ·g(x))`. The penalty ρ grows tenfold whenever the
//! constraint violation fails to shrink to a quarter of its previous value.
//!
//! A line search that cannot find a descent step away from a stationary
//! point ends the solve with [`SolverExit::LineSearchFailed`]; callers use
//! that exit to drive restart policies.

use nalgebra::{DMatrix, DVector};

use super::{NonlinearProblem, NonlinearSolver};
use crate::constants::{DEFAULT_FEASIBILITY_TOLERANCE, DEFAULT_NONLINEAR_MAX_ITERATIONS};
use crate::result::{SolveStatus, SolverExit, SolverOutcome};

/// Armijo sufficient-decrease fraction for the inner loop.
const ARMIJO_C1: f64 = 1e-4;

/// Maximum halvings in one inner line search.
const MAX_BACKTRACKS: usize = 60;

/// Upper bound on the penalty parameter.
const MAX_PENALTY: f64 = 1e10;

/// Configuration for [`AugmentedLagrangian`].
#[derive(Debug, Clone)]
pub struct AugmentedLagrangianConfig {
    /// Total inner-iteration budget across all outer iterations.
    pub max_iterations: usize,

    /// Maximum number of multiplier updates.
    pub max_outer_iterations: usize,

    /// Largest constraint value accepted as feasible.
    pub feasibility_tolerance: f64,

    /// Inner stationarity threshold on ‖∇L‖∞ / (1 + |L|).
    pub gradient_tolerance: f64,

    /// Relative change in x below which outer iterations are converged.
    pub step_tolerance: f64,

    /// Initial penalty ρ₀.
    pub initial_penalty: f64,

    /// Penalty growth factor.
    pub penalty_growth: f64,
}

impl Default for AugmentedLagrangianConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_NONLINEAR_MAX_ITERATIONS,
            max_outer_iterations: 40,
            feasibility_tolerance: DEFAULT_FEASIBILITY_TOLERANCE,
            gradient_tolerance: 1e-7,
            step_tolerance: 1e-7,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
        }
    }
}

/// Augmented Lagrangian solver with a BFGS inner loop.
#[derive(Debug, Clone, Default)]
pub struct AugmentedLagrangian {
    pub config: AugmentedLagrangianConfig,
}

struct InnerResult {
    x: DVector<f64>,
    value: f64,
    iterations: usize,
    exit: SolverExit,
}

impl AugmentedLagrangian {
    pub fn new(config: AugmentedLagrangianConfig) -> Self {
        Self { config }
    }

    /// BFGS with Armijo backtracking on a scalar function.
    fn minimize_inner<F>(&self, f: F, start: DVector<f64>, budget: usize) -> InnerResult
    where
        F: Fn(&DVector<f64>) -> f64,
    {
        let n = start.len();
        let mut x = start;
        let mut fx = f(&x);
        if !fx.is_finite() {
            return InnerResult {
                x,
                value: fx,
                iterations: 0,
                exit: SolverExit::NonFinite,
            };
        }
        let mut grad = central_gradient(&f, &x);
        let mut inv_hessian = DMatrix::<f64>::identity(n, n);
        let mut is_identity = true;

        for iteration in 0..budget {
            if grad.iter().any(|v| !v.is_finite()) {
                return InnerResult {
                    x,
                    value: fx,
                    iterations: iteration,
                    exit: SolverExit::NonFinite,
                };
            }
            if grad.amax() <= self.config.gradient_tolerance * (1.0 + fx.abs()) {
                return InnerResult {
                    x,
                    value: fx,
                    iterations: iteration,
                    exit: SolverExit::Converged,
                };
            }

            let mut direction = -(&inv_hessian * &grad);
            if grad.dot(&direction) >= 0.0 {
                inv_hessian = DMatrix::identity(n, n);
                is_identity = true;
                direction = -grad.clone();
            }

            let mut step = armijo(&f, &x, fx, &grad, &direction);
            if step.is_none() && !is_identity {
                // Stale curvature: retry along steepest descent.
                inv_hessian = DMatrix::identity(n, n);
                is_identity = true;
                direction = -grad.clone();
                step = armijo(&f, &x, fx, &grad, &direction);
            }

            let (next, f_next) = match step {
                Some(found) => found,
                None => {
                    let exit = if grad.amax() <= self.config.gradient_tolerance.sqrt() * (1.0 + fx.abs()) {
                        SolverExit::Converged
                    } else {
                        SolverExit::LineSearchFailed
                    };
                    return InnerResult {
                        x,
                        value: fx,
                        iterations: iteration + 1,
                        exit,
                    };
                }
            };

            let grad_next = central_gradient(&f, &next);
            let s = &next - &x;
            let y = &grad_next - &grad;
            let sy = s.dot(&y);

            if sy > 1e-12 * s.norm() * y.norm() {
                if is_identity {
                    // Scale the initial approximation before the first update.
                    inv_hessian *= sy / y.dot(&y);
                }
                let rho = 1.0 / sy;
                let eye = DMatrix::<f64>::identity(n, n);
                let left = &eye - (&s * y.transpose()) * rho;
                let right = &eye - (&y * s.transpose()) * rho;
                inv_hessian = &left * &inv_hessian * &right + (&s * s.transpose()) * rho;
                is_identity = false;
            }

            let small_step = s.amax() <= self.config.step_tolerance * (1.0 + x.amax());
            let small_change = (fx - f_next).abs() <= 1e-14 * (1.0 + fx.abs());
            x = next;
            fx = f_next;
            grad = grad_next;

            if small_step && small_change {
                return InnerResult {
                    x,
                    value: fx,
                    iterations: iteration + 1,
                    exit: SolverExit::Converged,
                };
            }
        }

        InnerResult {
            x,
            value: fx,
            iterations: budget,
            exit: SolverExit::MaxIterations,
        }
    }
}

impl NonlinearSolver for AugmentedLagrangian {
    fn minimize<P: NonlinearProblem + ?Sized>(
        &self,
        problem: &P,
        start: DVector<f64>,
    ) -> SolverOutcome<DVector<f64>> {
        let cfg = &self.config;
        let mut x = start;
        let mut multipliers = DVector::<f64>::zeros(problem.constraints(&x).len());
        let mut penalty = cfg.initial_penalty;
        let mut previous_violation = f64::INFINITY;
        let mut iterations = 0usize;
        let mut last_exit = SolverExit::MaxIterations;

        for _ in 0..cfg.max_outer_iterations {
            let remaining = cfg.max_iterations.saturating_sub(iterations);
            if remaining == 0 {
                break;
            }

            let lambda = multipliers.clone();
            let rho = penalty;
            let lagrangian = |z: &DVector<f64>| {
                let f = problem.objective(z);
                let g = problem.constraints(z);
                let shifted: f64 = g
                    .iter()
                    .zip(lambda.iter())
                    .map(|(gi, li)| (li + rho * gi).max(0.0).powi(2) - li * li)
                    .sum();
                f + shifted / (2.0 * rho)
            };

            let inner = self.minimize_inner(lagrangian, x.clone(), remaining);
            iterations += inner.iterations;
            last_exit = inner.exit;

            if matches!(inner.exit, SolverExit::LineSearchFailed | SolverExit::NonFinite) {
                let objective = problem.objective(&inner.x);
                return SolverOutcome {
                    status: SolveStatus::Failed,
                    solution: inner.x,
                    objective,
                    iterations,
                    exit: inner.exit,
                    message: format!("{} (augmented value {:.6e})", inner.exit, inner.value),
                };
            }

            let step = (&inner.x - &x).amax();
            let scale = 1.0 + x.amax();
            x = inner.x;

            let g = problem.constraints(&x);
            let violation = g.iter().cloned().fold(0.0_f64, f64::max);
            for (li, gi) in multipliers.iter_mut().zip(g.iter()) {
                *li = (*li + penalty * gi).max(0.0);
            }

            if violation <= cfg.feasibility_tolerance
                && inner.exit == SolverExit::Converged
                && step <= cfg.step_tolerance * scale
            {
                let objective = problem.objective(&x);
                return SolverOutcome {
                    status: SolveStatus::Optimal,
                    solution: x,
                    objective,
                    iterations,
                    exit: SolverExit::Converged,
                    message: format!("converged with max violation {:.3e}", violation),
                };
            }

            if violation > 0.25 * previous_violation {
                penalty = (penalty * cfg.penalty_growth).min(MAX_PENALTY);
            }
            previous_violation = violation;
        }

        let objective = problem.objective(&x);
        let violation = problem
            .constraints(&x)
            .iter()
            .cloned()
            .fold(0.0_f64, f64::max);
        let exit = if last_exit == SolverExit::Converged {
            SolverExit::Stalled
        } else {
            SolverExit::MaxIterations
        };
        let status = if violation <= cfg.feasibility_tolerance {
            SolveStatus::OptimalInaccurate
        } else {
            SolveStatus::Failed
        };
        SolverOutcome {
            status,
            solution: x,
            objective,
            iterations,
            exit,
            message: format!("{} with max violation {:.3e}", exit, violation),
        }
    }
}

/// Armijo backtracking along `direction`; returns the accepted point.
fn armijo<F>(
    f: &F,
    x: &DVector<f64>,
    fx: f64,
    grad: &DVector<f64>,
    direction: &DVector<f64>,
) -> Option<(DVector<f64>, f64)>
where
    F: Fn(&DVector<f64>) -> f64,
{
    let slope = grad.dot(direction);
    if slope >= 0.0 {
        return None;
    }
    let mut step = 1.0;
    for _ in 0..MAX_BACKTRACKS {
        let trial = x + direction * step;
        let value = f(&trial);
        if value.is_finite() && value <= fx + ARMIJO_C1 * step * slope {
            return Some((trial, value));
        }
        step *= 0.5;
    }
    None
}

/// Central-difference gradient with step 1e-6·max(1, |xᵢ|).
pub(crate) fn central_gradient<F>(f: &F, x: &DVector<f64>) -> DVector<f64>
where
    F: Fn(&DVector<f64>) -> f64,
{
    let mut grad = DVector::zeros(x.len());
    let mut shifted = x.clone();
    for i in 0..x.len() {
        let h = 1e-6 * x[i].abs().max(1.0);
        shifted[i] = x[i] + h;
        let forward = f(&shifted);
        shifted[i] = x[i] - h;
        let backward = f(&shifted);
        shifted[i] = x[i];
        grad[i] = (forward - backward) / (2.0 * h);
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    /// minimise (x₀ − 2)² + (x₁ − 2)² subject to x₀ + x₁ ≤ 2.
    struct ProjectOntoHalfPlane;

    impl NonlinearProblem for ProjectOntoHalfPlane {
        fn dimension(&self) -> usize {
            2
        }

        fn objective(&self, x: &DVector<f64>) -> f64 {
            (x[0] - 2.0).powi(2) + (x[1] - 2.0).powi(2)
        }

        fn constraints(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_element(1, x[0] + x[1] - 2.0)
        }
    }

    /// Unconstrained Rosenbrock.
    struct Rosenbrock;

    impl NonlinearProblem for Rosenbrock {
        fn dimension(&self) -> usize {
            2
        }

        fn objective(&self, x: &DVector<f64>) -> f64 {
            (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
        }

        fn constraints(&self, _x: &DVector<f64>) -> DVector<f64> {
            DVector::zeros(0)
        }
    }

    #[test]
    fn test_constrained_quadratic() {
        let outcome = AugmentedLagrangian::default()
            .minimize(&ProjectOntoHalfPlane, DVector::from_vec(vec![0.0, 0.0]));
        assert!(outcome.status.is_usable(), "{:?}", outcome);
        assert!((outcome.solution[0] - 1.0).abs() < 1e-3);
        assert!((outcome.solution[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_rosenbrock_unconstrained() {
        let outcome =
            AugmentedLagrangian::default().minimize(&Rosenbrock, DVector::from_vec(vec![-1.2, 1.0]));
        assert!(outcome.status.is_usable(), "{:?}", outcome);
        assert!((outcome.solution[0] - 1.0).abs() < 1e-3);
        assert!((outcome.solution[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_central_gradient() {
        let f = |x: &DVector<f64>| x[0] * x[0] + 3.0 * x[1];
        let g = central_gradient(&f, &DVector::from_vec(vec![2.0, -1.0]));
        assert!((g[0] - 4.0).abs() < 1e-6);
        assert!((g[1] - 3.0).abs() < 1e-6);
    }
}
