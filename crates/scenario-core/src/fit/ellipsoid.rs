//! Minimum-volume enclosing ellipsoid in dual form.
//!
//! Solves
//!
//! ```text
//! maximise   log det A
//! subject to ‖A xᵢ − b‖_p ≤ 1   for every training point xᵢ
//! ```
//!
//! over symmetric A and offset b. The variables are packed as
//! θ = [A₀₀, A₀₁, ..., A₀ₙ₋₁, A₁₁, ..., Aₙ₋₁ₙ₋₁, b] (upper triangle row by
//! row, then b). Constraint shapes depend on p:
//!
//! | p | barrier terms per point |
//! |---|-------------------------|
//! | 1 < p < ∞ | −log(1 − Σⱼ \|rⱼ\|^p) |
//! | 1 | −log(1 − σᵀr) over all 2ⁿ sign vectors σ |
//! | ∞ | −log(1 ∓ rⱼ) for every coordinate j |
//!
//! where r = A x − b.

use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScenarioError};
use crate::optimize::{BarrierConfig, BarrierProblem, BarrierSolver, ConvexSolver};
use crate::result::SolveStatus;
use crate::sets::EllipsoidSet;
use crate::types::{NormDegree, PointSet};

/// Clamp on |rⱼ| in the curvature term of the p-norm barrier (1 < p < 2).
const CURVATURE_FLOOR: f64 = 1e-9;

/// Largest dimension for which the L1 ball is expanded into 2ⁿ half-spaces.
pub const MAX_L1_DIMENSION: usize = 16;

/// Configuration for [`EllipsoidFitter`].
#[derive(Debug, Clone)]
pub struct EllipsoidConfig {
    /// Degree p of the norm ball `‖A x − b‖_p ≤ 1`.
    ///
    /// Default: L2.
    pub norm_degree: NormDegree,

    /// Interior-point solver settings.
    pub barrier: BarrierConfig,

    /// Whether an `OptimalInaccurate` solve is returned (with its status) or
    /// turned into an error.
    ///
    /// Default: true.
    pub accept_inaccurate: bool,
}

impl Default for EllipsoidConfig {
    fn default() -> Self {
        Self {
            norm_degree: NormDegree::L2,
            barrier: BarrierConfig::default(),
            accept_inaccurate: true,
        }
    }
}

/// Result of an ellipsoid fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EllipsoidFit {
    /// The fitted ellipsoid.
    pub set: EllipsoidSet,
    /// Solver status; `OptimalInaccurate` results are usable but imprecise.
    pub status: SolveStatus,
    /// log det A at the solution.
    pub optimal_value: f64,
    /// Newton iterations used.
    pub iterations: usize,
    /// Solver diagnostic.
    pub message: String,
}

/// Fits minimum-volume ellipsoids.
#[derive(Debug, Clone)]
pub struct EllipsoidFitter<S = BarrierSolver> {
    config: EllipsoidConfig,
    solver: S,
}

impl Default for EllipsoidFitter {
    fn default() -> Self {
        Self::new(EllipsoidConfig::default())
    }
}

impl EllipsoidFitter {
    /// Fitter using the built-in barrier solver.
    pub fn new(config: EllipsoidConfig) -> Self {
        let solver = BarrierSolver::new(config.barrier.clone());
        Self { config, solver }
    }
}

impl<S: ConvexSolver> EllipsoidFitter<S> {
    /// Fitter using a custom convex solver.
    pub fn with_solver(config: EllipsoidConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &EllipsoidConfig {
        &self.config
    }

    /// Fit the minimum-volume ellipsoid enclosing `points`.
    ///
    /// Needs at least n + 1 points that affinely span n dimensions.
    pub fn fit(&self, points: &PointSet) -> Result<EllipsoidFit> {
        let n = points.dim();
        if points.len() < n + 1 {
            return Err(ScenarioError::invalid(format!(
                "need at least {} points in dimension {}, got {}",
                n + 1,
                n,
                points.len()
            )));
        }
        if !points.spans_full_dimension() {
            return Err(ScenarioError::invalid(format!(
                "points do not affinely span {} dimensions",
                n
            )));
        }
        let degree = self.config.norm_degree;
        if degree == NormDegree::L1 && n > MAX_L1_DIMENSION {
            return Err(ScenarioError::invalid(format!(
                "L1 ellipsoid fitting is limited to dimension {}, got {}",
                MAX_L1_DIMENSION, n
            )));
        }

        let problem = EllipsoidProblem::new(points, degree);
        let start = problem.strictly_feasible_start();
        let outcome = self.solver.minimize(&problem, start);

        match outcome.status {
            SolveStatus::Failed => {
                return Err(ScenarioError::optimization("ellipsoid fit", outcome.message));
            }
            SolveStatus::OptimalInaccurate if !self.config.accept_inaccurate => {
                return Err(ScenarioError::optimization(
                    "ellipsoid fit",
                    format!("inaccurate solution rejected: {}", outcome.message),
                ));
            }
            _ => {}
        }

        let (transform, offset) = problem.unpack(&outcome.solution);
        let set = EllipsoidSet::from_dual(transform, offset, degree)?;
        Ok(EllipsoidFit {
            set,
            status: outcome.status,
            optimal_value: -outcome.objective,
            iterations: outcome.iterations,
            message: outcome.message,
        })
    }
}

/// Barrier formulation over θ = [vech(A); b].
struct EllipsoidProblem<'a> {
    points: &'a PointSet,
    n: usize,
    pairs: Vec<(usize, usize)>,
    degree: NormDegree,
    half_spaces: Vec<DVector<f64>>,
}

impl<'a> EllipsoidProblem<'a> {
    fn new(points: &'a PointSet, degree: NormDegree) -> Self {
        let n = points.dim();
        let pairs = (0..n)
            .flat_map(|a| (a..n).map(move |b| (a, b)))
            .collect();
        let half_spaces = match degree {
            NormDegree::P(p) if p == 1.0 => (0..1usize << n)
                .map(|mask| {
                    DVector::from_fn(n, |j, _| if mask & (1 << j) != 0 { 1.0 } else { -1.0 })
                })
                .collect(),
            NormDegree::Infinity => (0..n)
                .flat_map(|j| {
                    [1.0, -1.0]
                        .into_iter()
                        .map(move |sign| DVector::from_fn(n, |i, _| if i == j { sign } else { 0.0 }))
                })
                .collect(),
            NormDegree::P(_) => Vec::new(),
        };
        Self {
            points,
            n,
            pairs,
            degree,
            half_spaces,
        }
    }

    fn num_entries(&self) -> usize {
        self.pairs.len()
    }

    fn unpack(&self, theta: &DVector<f64>) -> (DMatrix<f64>, DVector<f64>) {
        let mut a = DMatrix::zeros(self.n, self.n);
        for (e, &(i, j)) in self.pairs.iter().enumerate() {
            a[(i, j)] = theta[e];
            a[(j, i)] = theta[e];
        }
        let b = theta.rows(self.num_entries(), self.n).into_owned();
        (a, b)
    }

    /// A = αI, b = α·mean with α = ½ / maxᵢ ‖xᵢ − mean‖_p.
    fn strictly_feasible_start(&self) -> DVector<f64> {
        let mean = self.points.mean();
        let radius = self
            .points
            .iter()
            .map(|x| self.degree.norm(&(x - &mean)))
            .fold(0.0_f64, f64::max);
        let alpha = 0.5 / radius;

        let mut theta = DVector::zeros(self.num_entries() + self.n);
        for (e, &(i, j)) in self.pairs.iter().enumerate() {
            if i == j {
                theta[e] = alpha;
            }
        }
        theta
            .rows_mut(self.num_entries(), self.n)
            .copy_from(&(mean * alpha));
        theta
    }

    /// Index pairs (p, q) with A = Σ θₑ Σ_{(p,q)} e_p e_qᵀ.
    fn basis_pairs(&self, e: usize) -> ([(usize, usize); 2], usize) {
        let (i, j) = self.pairs[e];
        if i == j {
            ([(i, i), (i, i)], 1)
        } else {
            ([(i, j), (j, i)], 2)
        }
    }

    /// ∂r/∂θ for r = A x − b, an n × dim matrix.
    fn residual_jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let k = self.num_entries();
        let mut jac = DMatrix::zeros(self.n, k + self.n);
        for (e, &(i, j)) in self.pairs.iter().enumerate() {
            if i == j {
                jac[(i, e)] = x[i];
            } else {
                jac[(i, e)] = x[j];
                jac[(j, e)] = x[i];
            }
        }
        for j in 0..self.n {
            jac[(j, k + j)] = -1.0;
        }
        jac
    }

    /// Barrier value and residual-space derivatives for one point.
    fn point_barrier(&self, r: &DVector<f64>) -> Option<(f64, DVector<f64>, DMatrix<f64>)> {
        let n = self.n;
        match self.degree {
            NormDegree::P(p) if p > 1.0 => {
                let h: f64 = r.iter().map(|v| v.abs().powf(p)).sum();
                let slack = 1.0 - h;
                if !(slack > 0.0) {
                    return None;
                }
                let grad_h = r.map(|v| p * v.signum() * v.abs().powf(p - 1.0));
                let curvature = r.map(|v| p * (p - 1.0) * v.abs().max(CURVATURE_FLOOR).powf(p - 2.0));
                let grad = &grad_h / slack;
                let hess = (&grad_h * grad_h.transpose()) / (slack * slack)
                    + DMatrix::from_diagonal(&curvature) / slack;
                Some((-slack.ln(), grad, hess))
            }
            _ => {
                let mut value = 0.0;
                let mut grad = DVector::zeros(n);
                let mut hess = DMatrix::zeros(n, n);
                for sigma in &self.half_spaces {
                    let slack = 1.0 - sigma.dot(r);
                    if !(slack > 0.0) {
                        return None;
                    }
                    value -= slack.ln();
                    grad += sigma / slack;
                    hess += (sigma * sigma.transpose()) / (slack * slack);
                }
                Some((value, grad, hess))
            }
        }
    }

    fn inverse(&self, a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        Cholesky::new(a.clone()).map(|c| c.inverse())
    }
}

impl BarrierProblem for EllipsoidProblem<'_> {
    fn dimension(&self) -> usize {
        self.num_entries() + self.n
    }

    fn num_barrier_terms(&self) -> usize {
        let per_point = match self.degree {
            NormDegree::P(p) if p > 1.0 => 1,
            _ => self.half_spaces.len(),
        };
        self.points.len() * per_point
    }

    fn objective(&self, theta: &DVector<f64>) -> f64 {
        let (a, _) = self.unpack(theta);
        match Cholesky::new(a) {
            Some(chol) => -2.0 * chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>(),
            None => f64::INFINITY,
        }
    }

    fn objective_derivatives(&self, theta: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
        let dim = self.dimension();
        let k = self.num_entries();
        let mut grad = DVector::zeros(dim);
        let mut hess = DMatrix::zeros(dim, dim);
        let (a, _) = self.unpack(theta);
        let s = match self.inverse(&a) {
            Some(s) => s,
            None => return (DVector::from_element(dim, f64::NAN), hess),
        };

        // ∂(−log det A)/∂θₑ = −tr(S Eₑ), ∂² = tr(S Eₑ S E_f).
        for e in 0..k {
            let (pe, ce) = self.basis_pairs(e);
            grad[e] = -pe[..ce].iter().map(|&(p, q)| s[(q, p)]).sum::<f64>();
            for f in e..k {
                let (pf, cf) = self.basis_pairs(f);
                let mut value = 0.0;
                for &(p, q) in &pe[..ce] {
                    for &(r, t) in &pf[..cf] {
                        value += s[(t, p)] * s[(q, r)];
                    }
                }
                hess[(e, f)] = value;
                hess[(f, e)] = value;
            }
        }
        (grad, hess)
    }

    fn barrier(&self, theta: &DVector<f64>) -> f64 {
        let (a, b) = self.unpack(theta);
        let mut total = 0.0;
        for x in self.points {
            let r = &a * x - &b;
            match self.point_barrier(&r) {
                Some((value, _, _)) => total += value,
                None => return f64::INFINITY,
            }
        }
        total
    }

    fn barrier_derivatives(&self, theta: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
        let dim = self.dimension();
        let (a, b) = self.unpack(theta);
        let mut grad = DVector::zeros(dim);
        let mut hess = DMatrix::zeros(dim, dim);
        for x in self.points {
            let r = &a * x - &b;
            let (_, g_r, h_r) = match self.point_barrier(&r) {
                Some(terms) => terms,
                None => return (DVector::from_element(dim, f64::NAN), hess),
            };
            let jac = self.residual_jacobian(x);
            grad += jac.transpose() * g_r;
            hess += jac.transpose() * h_r * &jac;
        }
        (grad, hess)
    }
}
