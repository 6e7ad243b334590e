//! Two-stage minimum-volume zonotope fitting.
//!
//! The zonotope `{c + Gᵀξ : ξ ∈ [−1, 1]^m}` has a caller-supplied center c.
//! A point x is certified inside when every coefficient of
//! `ξ = pinv(G)ᵀ (x − c)` has magnitude at most 1; the fitters express this
//! as the smooth constraints ξⱼ² − 1 ≤ 0.
//!
//! 1. **Diagonal warm start.** Fix the structural direction matrix G₀
//!    (coordinate axes, then scaled diagonals) and optimise per-generator
//!    scales d, minimising log det((DG₀)ᵀ(DG₀)) with D = diag(d), subject to
//!    containment of every training point.
//! 2. **Full generators.** Starting from DG₀, optimise all m·n entries of G,
//!    minimising ln(det(GᵀG) + ε) subject to containment of the
//!    `active_set_size` points with the largest residuals, re-ranked at
//!    every constraint evaluation.
//!
//! Both stages run under a bounded retry policy. A failed attempt (a
//! line-search failure, a non-finite value, or any solve whose status is
//! `Failed`) perturbs the last guess with Gaussian noise; more than
//! `failures_before_reinit` consecutive failures replace it with a fresh
//! random guess. After `max_attempts` solver runs the stage fails.
//!
//! Every starting guess is inflated by its worst residual so that it is
//! feasible, and the final generators are inflated the same way if the
//! solver leaves any training point uncertified.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACTIVE_SET_SIZE, DEFAULT_FAILURES_BEFORE_REINIT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_NUM_GENERATORS, DEFAULT_PERTURBATION_SCALE, DEFAULT_VOLUME_REGULARIZER,
};
use crate::error::{Result, ScenarioError};
use crate::optimize::{
    log_det_spd, AugmentedLagrangian, AugmentedLagrangianConfig, NonlinearProblem,
    NonlinearSolver,
};
use crate::result::{AttemptRecord, FitStage, RetryState, SolveStatus, SolverExit, SolverOutcome};
use crate::sets::zonotope::certificate_matrix;
use crate::sets::ZonotopeSet;
use crate::types::PointSet;

/// Configuration for [`ZonotopeFitter`].
#[derive(Debug, Clone)]
pub struct ZonotopeConfig {
    /// Number of generators m (must be at least the dimension).
    ///
    /// Default: 4.
    pub num_generators: usize,

    /// Number of worst-residual points constrained in the full stage.
    ///
    /// Default: 100.
    pub active_set_size: usize,

    /// ε added to det(GᵀG) before taking the log in the full stage.
    ///
    /// Default: 1e-5.
    pub volume_regularizer: f64,

    /// Solver runs per stage before giving up.
    ///
    /// Default: 20.
    pub max_attempts: usize,

    /// Consecutive line-search failures tolerated before reinitialising.
    ///
    /// Default: 3.
    pub failures_before_reinit: usize,

    /// Standard deviation of the noise added to a failed guess.
    ///
    /// Default: 0.01.
    pub perturbation_scale: f64,

    /// Settings of the built-in augmented Lagrangian solver.
    pub solver: AugmentedLagrangianConfig,
}

impl Default for ZonotopeConfig {
    fn default() -> Self {
        Self {
            num_generators: DEFAULT_NUM_GENERATORS,
            active_set_size: DEFAULT_ACTIVE_SET_SIZE,
            volume_regularizer: DEFAULT_VOLUME_REGULARIZER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            failures_before_reinit: DEFAULT_FAILURES_BEFORE_REINIT,
            perturbation_scale: DEFAULT_PERTURBATION_SCALE,
            solver: AugmentedLagrangianConfig::default(),
        }
    }
}

/// Result of a zonotope fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonotopeFit {
    /// The fitted zonotope; its center is the one supplied by the caller.
    pub set: ZonotopeSet,
    /// `OptimalInaccurate` if either stage stopped early or the final
    /// generators had to be inflated to cover the training points.
    pub status: SolveStatus,
    /// Per-generator scales found by the warm start.
    pub stage_one_scales: DVector<f64>,
    /// ln(det(GᵀG) + ε) of the returned generators.
    pub objective: f64,
    /// Inner iterations summed over every attempt of both stages.
    pub iterations: usize,
    /// Factor the final generators were scaled by (1 when none was needed).
    pub inflation: f64,
    /// Every solver attempt, in order.
    pub attempts: Vec<AttemptRecord>,
}

impl ZonotopeFit {
    /// Number of attempts that ended in a restart.
    pub fn restarts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.next, RetryState::Perturbing | RetryState::Reinitializing))
            .count()
    }
}

/// Fits minimum-volume zonotopes around a fixed center.
#[derive(Debug, Clone)]
pub struct ZonotopeFitter<S = AugmentedLagrangian> {
    config: ZonotopeConfig,
    solver: S,
}

impl Default for ZonotopeFitter {
    fn default() -> Self {
        Self::new(ZonotopeConfig::default())
    }
}

impl ZonotopeFitter {
    /// Fitter using the built-in augmented Lagrangian solver.
    pub fn new(config: ZonotopeConfig) -> Self {
        let solver = AugmentedLagrangian::new(config.solver.clone());
        Self { config, solver }
    }
}

impl<S: NonlinearSolver> ZonotopeFitter<S> {
    /// Fitter using a custom nonlinear solver.
    pub fn with_solver(config: ZonotopeConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &ZonotopeConfig {
        &self.config
    }

    /// Fit with a deterministic Xoshiro256++ generator seeded from `seed`.
    pub fn fit_seeded(
        &self,
        points: &PointSet,
        center: &DVector<f64>,
        seed: u64,
    ) -> Result<ZonotopeFit> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        self.fit(points, center, &mut rng)
    }

    /// Fit a zonotope centered at `center` that certifies every point.
    ///
    /// All randomness used by restarts is drawn from `rng`.
    pub fn fit<R: Rng + ?Sized>(
        &self,
        points: &PointSet,
        center: &DVector<f64>,
        rng: &mut R,
    ) -> Result<ZonotopeFit> {
        let cfg = &self.config;
        let n = points.dim();
        let m = cfg.num_generators;
        points.ensure_dim(center.len(), "center")?;
        if center.iter().any(|v| !v.is_finite()) {
            return Err(ScenarioError::invalid("center has a non-finite coordinate"));
        }
        if m < n {
            return Err(ScenarioError::invalid(format!(
                "need at least {} generators in dimension {}, got {}",
                n, n, m
            )));
        }
        if cfg.active_set_size == 0 || cfg.max_attempts == 0 {
            return Err(ScenarioError::invalid(
                "active_set_size and max_attempts must be positive",
            ));
        }

        let offsets: Vec<DVector<f64>> = points.iter().map(|x| x - center).collect();
        let mut attempts = Vec::new();

        let warm = DiagonalStage {
            directions: structural_directions(n, m),
            offsets: &offsets,
        };
        let stage_one = self.run_stage(&warm, DVector::from_element(m, 1.0), rng, &mut attempts)?;
        let scales = warm.repair(stage_one.solution.clone());
        let initial_generators = warm.generators(&scales);

        let full = GeneratorStage {
            m,
            n,
            offsets: &offsets,
            active_set_size: cfg.active_set_size.min(offsets.len()),
            regularizer: cfg.volume_regularizer,
        };
        let stage_two = self.run_stage(&full, pack(&initial_generators), rng, &mut attempts)?;

        let generators = full.unpack(&stage_two.solution);
        let worst = max_residual(&generators, &offsets).ok_or_else(|| {
            ScenarioError::degenerate("fitted generators have a singular Gram matrix")
        })?;
        let inflation = worst.max(1.0);
        let generators = generators * inflation;
        let set = ZonotopeSet::new(center.clone(), generators)?;

        let clean = stage_one.status == SolveStatus::Optimal
            && stage_two.status == SolveStatus::Optimal
            && inflation <= 1.0 + cfg.solver.feasibility_tolerance;
        let status = if clean {
            SolveStatus::Optimal
        } else {
            SolveStatus::OptimalInaccurate
        };

        Ok(ZonotopeFit {
            objective: full.objective(&pack(set.generators())),
            set,
            status,
            stage_one_scales: scales,
            iterations: attempts.iter().map(|a| a.iterations).sum(),
            inflation,
            attempts,
        })
    }

    /// Run one stage under the perturb/reinitialise retry policy.
    fn run_stage<P, R>(
        &self,
        stage: &P,
        initial: DVector<f64>,
        rng: &mut R,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<SolverOutcome<DVector<f64>>>
    where
        P: RetryStage,
        R: Rng + ?Sized,
    {
        let cfg = &self.config;
        let mut state = RetryState::Fitting;
        let mut guess = stage.repair(initial);
        let mut consecutive_failures = 0usize;
        let mut last_message = String::new();

        for attempt in 1..=cfg.max_attempts {
            let outcome = self.solver.minimize(stage, guess.clone());
            let origin = state;

            state = if attempt_succeeded(&outcome) {
                RetryState::Succeeded
            } else if attempt == cfg.max_attempts {
                RetryState::Failed
            } else {
                consecutive_failures += 1;
                if consecutive_failures > cfg.failures_before_reinit {
                    consecutive_failures = 0;
                    RetryState::Reinitializing
                } else {
                    RetryState::Perturbing
                }
            };

            attempts.push(AttemptRecord {
                stage: stage.stage(),
                attempt,
                origin,
                next: state,
                exit: outcome.exit,
                objective: outcome.objective,
                iterations: outcome.iterations,
            });

            match state {
                RetryState::Succeeded => return Ok(outcome),
                RetryState::Perturbing => {
                    guess = stage.repair(perturb(&guess, cfg.perturbation_scale, rng));
                }
                RetryState::Reinitializing => {
                    guess = stage.repair(stage.reinitialize(rng));
                }
                RetryState::Fitting | RetryState::Failed => {}
            }
            last_message = outcome.message;
        }

        Err(ScenarioError::optimization(
            stage.stage().to_string(),
            format!(
                "{} attempts exhausted, last attempt: {}",
                cfg.max_attempts, last_message
            ),
        ))
    }
}

/// An attempt succeeds when the solver reports a usable status and did not
/// stop on a line-search failure or a non-finite value. Every other attempt
/// is retried from a perturbed or fresh guess.
fn attempt_succeeded(outcome: &SolverOutcome<DVector<f64>>) -> bool {
    outcome.status.is_usable()
        && !matches!(
            outcome.exit,
            SolverExit::LineSearchFailed | SolverExit::NonFinite
        )
}

/// Structural direction matrix (m × n): coordinate axes, then √2(eᵢ + eⱼ)
/// and √2(eᵢ − eⱼ) for i < j, cycled until there are m rows.
pub fn structural_directions(n: usize, m: usize) -> DMatrix<f64> {
    let mut pool: Vec<DVector<f64>> = (0..n)
        .map(|i| DVector::from_fn(n, |k, _| if k == i { 1.0 } else { 0.0 }))
        .collect();
    let s = std::f64::consts::SQRT_2;
    for i in 0..n {
        for j in i + 1..n {
            for sign in [1.0, -1.0] {
                pool.push(DVector::from_fn(n, |k, _| {
                    if k == i {
                        s
                    } else if k == j {
                        sign * s
                    } else {
                        0.0
                    }
                }));
            }
        }
    }
    DMatrix::from_fn(m, n, |row, col| pool[row % pool.len()][col])
}

/// Largest certificate residual over `offsets`, or `None` if GᵀG is singular.
fn max_residual(generators: &DMatrix<f64>, offsets: &[DVector<f64>]) -> Option<f64> {
    let certificate = certificate_matrix(generators)?;
    Some(
        offsets
            .iter()
            .map(|o| (&certificate * o).amax())
            .fold(0.0_f64, f64::max),
    )
}

fn perturb<R: Rng + ?Sized>(guess: &DVector<f64>, scale: f64, rng: &mut R) -> DVector<f64> {
    guess.map(|v| {
        let noise: f64 = StandardNormal.sample(rng);
        v + scale * noise
    })
}

fn pack(generators: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_column_slice(generators.as_slice())
}

/// ξⱼ² − 1 for ξ = W·o over each offset o, generator by generator.
fn containment_values<'o, I>(certificate: &DMatrix<f64>, offsets: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'o DVector<f64>>,
{
    offsets
        .into_iter()
        .flat_map(|o| {
            (certificate * o)
                .iter()
                .map(|v| v * v - 1.0)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// A stage of the fit that the retry policy can restart.
trait RetryStage: NonlinearProblem {
    fn stage(&self) -> FitStage;

    /// Inflate a guess so that every constrained point is certified.
    fn repair(&self, guess: DVector<f64>) -> DVector<f64>;

    /// A fresh random guess.
    fn reinitialize<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64>;
}

struct DiagonalStage<'a> {
    directions: DMatrix<f64>,
    offsets: &'a [DVector<f64>],
}

impl DiagonalStage<'_> {
    fn generators(&self, scales: &DVector<f64>) -> DMatrix<f64> {
        let mut g = self.directions.clone();
        for (mut row, d) in g.row_iter_mut().zip(scales.iter()) {
            row *= *d;
        }
        g
    }
}

impl NonlinearProblem for DiagonalStage<'_> {
    fn dimension(&self) -> usize {
        self.directions.nrows()
    }

    fn objective(&self, scales: &DVector<f64>) -> f64 {
        let g = self.generators(scales);
        log_det_spd(&(g.transpose() * &g)).unwrap_or(f64::INFINITY)
    }

    fn constraints(&self, scales: &DVector<f64>) -> DVector<f64> {
        let g = self.generators(scales);
        match certificate_matrix(&g) {
            Some(w) => DVector::from_vec(containment_values(&w, self.offsets)),
            None => DVector::from_element(self.offsets.len() * g.nrows(), f64::INFINITY),
        }
    }
}

impl RetryStage for DiagonalStage<'_> {
    fn stage(&self) -> FitStage {
        FitStage::DiagonalWarmStart
    }

    fn repair(&self, guess: DVector<f64>) -> DVector<f64> {
        match max_residual(&self.generators(&guess), self.offsets) {
            Some(worst) => guess * worst.max(1.0),
            None => guess,
        }
    }

    fn reinitialize<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let uniform = Uniform::new(0.5, 1.5);
        DVector::from_fn(self.dimension(), |_, _| uniform.sample(rng))
    }
}

struct GeneratorStage<'a> {
    m: usize,
    n: usize,
    offsets: &'a [DVector<f64>],
    active_set_size: usize,
    regularizer: f64,
}

impl GeneratorStage<'_> {
    fn unpack(&self, packed: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.m, self.n, packed.as_slice())
    }
}

impl NonlinearProblem for GeneratorStage<'_> {
    fn dimension(&self) -> usize {
        self.m * self.n
    }

    fn objective(&self, packed: &DVector<f64>) -> f64 {
        let g = self.unpack(packed);
        let value = (g.transpose() * &g).determinant() + self.regularizer;
        if value > 0.0 {
            value.ln()
        } else {
            f64::INFINITY
        }
    }

    fn constraints(&self, packed: &DVector<f64>) -> DVector<f64> {
        let g = self.unpack(packed);
        let certificate = match certificate_matrix(&g) {
            Some(w) => w,
            None => {
                return DVector::from_element(self.active_set_size * self.m, f64::INFINITY);
            }
        };

        // Rank by residual, largest first.
        let mut ranked: Vec<(f64, &DVector<f64>)> = self
            .offsets
            .iter()
            .map(|o| ((&certificate * o).amax(), o))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        let active = ranked
            .into_iter()
            .take(self.active_set_size)
            .map(|(_, o)| o);

        DVector::from_vec(containment_values(&certificate, active))
    }
}

impl RetryStage for GeneratorStage<'_> {
    fn stage(&self) -> FitStage {
        FitStage::FullGenerators
    }

    fn repair(&self, guess: DVector<f64>) -> DVector<f64> {
        match max_residual(&self.unpack(&guess), self.offsets) {
            Some(worst) => guess * worst.max(1.0),
            None => guess,
        }
    }

    /// Random m × n matrix with orthonormal columns (thin QR of a Gaussian).
    fn reinitialize<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let gaussian = DMatrix::from_fn(self.m, self.n, |_, _| rng.sample::<f64, _>(StandardNormal));
        pack(&gaussian.qr().q())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn gaussian_cloud(seed: u64, count: usize) -> PointSet {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let rows: Vec<[f64; 2]> = (0..count)
            .map(|_| {
                let a: f64 = rng.sample(StandardNormal);
                let b: f64 = rng.sample(StandardNormal);
                [1.0 + 2.0 * a, -1.0 + 0.5 * b + 0.3 * a]
            })
            .collect();
        PointSet::from_rows(&rows).unwrap()
    }

    /// Fails with `failure` a fixed number of times, then returns its
    /// starting point as optimal.
    struct ScriptedSolver {
        failures_left: Cell<usize>,
        failure: SolverExit,
    }

    impl NonlinearSolver for ScriptedSolver {
        fn minimize<P: NonlinearProblem + ?Sized>(
            &self,
            problem: &P,
            start: DVector<f64>,
        ) -> SolverOutcome<DVector<f64>> {
            let left = self.failures_left.get();
            let (status, exit) = if left > 0 {
                self.failures_left.set(left - 1);
                (SolveStatus::Failed, self.failure)
            } else {
                (SolveStatus::Optimal, SolverExit::Converged)
            };
            SolverOutcome {
                status,
                objective: problem.objective(&start),
                solution: start,
                iterations: 1,
                exit,
                message: exit.to_string(),
            }
        }
    }

    fn scripted(failures: usize) -> ZonotopeFitter<ScriptedSolver> {
        scripted_with(failures, SolverExit::LineSearchFailed)
    }

    fn scripted_with(failures: usize, failure: SolverExit) -> ZonotopeFitter<ScriptedSolver> {
        ZonotopeFitter::with_solver(
            ZonotopeConfig::default(),
            ScriptedSolver {
                failures_left: Cell::new(failures),
                failure,
            },
        )
    }

    #[test]
    fn test_structural_directions_reference() {
        let s = std::f64::consts::SQRT_2;
        let expected = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 0.0, 1.0, s, s, s, -s]);
        assert_eq!(structural_directions(2, 4), expected);
        // Cycles when more rows are requested than the pool holds.
        let cycled = structural_directions(2, 5);
        assert_eq!(cycled.row(4), expected.row(0));
    }

    #[test]
    fn test_fit_certifies_training_points() {
        let points = gaussian_cloud(7, 200);
        let center = points.mean();
        let fit = ZonotopeFitter::default().fit_seeded(&points, &center, 11).unwrap();

        assert!(fit.status.is_usable());
        assert_eq!(fit.set.num_generators(), 4);
        assert_eq!(fit.set.center(), &center);
        assert_eq!(fit.stage_one_scales.len(), 4);
        for p in &points {
            assert!(fit.set.contains_certified(p));
        }
        assert_eq!(fit.attempts[0].origin, RetryState::Fitting);
        assert_eq!(fit.attempts[0].stage, FitStage::DiagonalWarmStart);
    }

    #[test]
    fn test_full_stage_does_not_undo_warm_start() {
        let points = gaussian_cloud(3, 150);
        let center = points.mean();
        let fit = ZonotopeFitter::default().fit_seeded(&points, &center, 5).unwrap();

        let offsets: Vec<DVector<f64>> = points.iter().map(|x| x - &center).collect();
        let warm = DiagonalStage {
            directions: structural_directions(2, 4),
            offsets: &offsets,
        };
        let full = GeneratorStage {
            m: 4,
            n: 2,
            offsets: &offsets,
            active_set_size: 100,
            regularizer: DEFAULT_VOLUME_REGULARIZER,
        };
        let warm_objective = full.objective(&pack(&warm.generators(&fit.stage_one_scales)));
        assert!(fit.objective <= warm_objective + 0.05);
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let points = gaussian_cloud(1, 100);
        let center = points.mean();
        let fitter = ZonotopeFitter::default();
        let a = fitter.fit_seeded(&points, &center, 99).unwrap();
        let b = fitter.fit_seeded(&points, &center, 99).unwrap();
        assert_eq!(a.set, b.set);
    }

    #[test]
    fn test_too_few_generators() {
        let points = gaussian_cloud(2, 20);
        let config = ZonotopeConfig {
            num_generators: 1,
            ..ZonotopeConfig::default()
        };
        let result = ZonotopeFitter::new(config).fit_seeded(&points, &points.mean(), 0);
        assert!(matches!(result, Err(ScenarioError::InvalidInput(_))));
    }

    #[test]
    fn test_center_dimension_mismatch() {
        let points = gaussian_cloud(2, 20);
        let result = ZonotopeFitter::default().fit_seeded(&points, &DVector::zeros(3), 0);
        assert!(matches!(result, Err(ScenarioError::InvalidInput(_))));
    }

    #[test]
    fn test_retry_sequence_perturbs_then_reinitializes() {
        let points = gaussian_cloud(4, 30);
        let center = points.mean();
        let fitter = scripted(5);
        let fit = fitter.fit_seeded(&points, &center, 0).unwrap();

        let origins: Vec<RetryState> = fit.attempts.iter().map(|a| a.origin).collect();
        assert_eq!(
            &origins[..6],
            &[
                RetryState::Fitting,
                RetryState::Perturbing,
                RetryState::Perturbing,
                RetryState::Perturbing,
                RetryState::Reinitializing,
                RetryState::Perturbing,
            ]
        );
        assert_eq!(fit.attempts[5].next, RetryState::Succeeded);
        assert_eq!(fit.restarts(), 5);
        for p in &points {
            assert!(fit.set.contains_certified(p));
        }
    }

    #[test]
    fn test_attempt_cap_fails_stage() {
        let points = gaussian_cloud(4, 30);
        let result = scripted(usize::MAX).fit_seeded(&points, &points.mean(), 0);
        match result {
            Err(ScenarioError::OptimizationFailure { stage, message }) => {
                assert_eq!(stage, "zonotope stage 1");
                assert!(message.contains("20 attempts"));
            }
            other => panic!("expected OptimizationFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_status_is_never_accepted() {
        let points = gaussian_cloud(4, 30);
        let result = scripted_with(usize::MAX, SolverExit::MaxIterations)
            .fit_seeded(&points, &points.mean(), 0);
        match result {
            Err(ScenarioError::OptimizationFailure { stage, message }) => {
                assert_eq!(stage, "zonotope stage 1");
                assert!(message.contains("20 attempts"));
            }
            other => panic!("expected OptimizationFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_iteration_cap_failure_is_retried() {
        let points = gaussian_cloud(4, 30);
        let fit = scripted_with(2, SolverExit::MaxIterations)
            .fit_seeded(&points, &points.mean(), 0)
            .unwrap();

        assert_eq!(fit.attempts[0].exit, SolverExit::MaxIterations);
        assert_eq!(fit.attempts[0].next, RetryState::Perturbing);
        assert_eq!(fit.attempts[1].next, RetryState::Perturbing);
        assert_eq!(fit.attempts[2].next, RetryState::Succeeded);
        assert!(fit
            .attempts
            .iter()
            .filter(|a| a.exit == SolverExit::MaxIterations)
            .all(|a| a.next != RetryState::Succeeded));
        assert_eq!(fit.restarts(), 2);
    }

    #[test]
    fn test_active_set_tracks_worst_points() {
        let points = gaussian_cloud(8, 50);
        let center = points.mean();
        let offsets: Vec<DVector<f64>> = points.iter().map(|x| x - &center).collect();
        let stage = GeneratorStage {
            m: 2,
            n: 2,
            offsets: &offsets,
            active_set_size: 5,
            regularizer: 1e-5,
        };
        let g = DMatrix::identity(2, 2);
        let constraints = stage.constraints(&pack(&g));
        assert_eq!(constraints.len(), 10);

        let worst = offsets.iter().map(|o| o.amax()).fold(0.0_f64, f64::max);
        assert!((constraints.max() - (worst * worst - 1.0)).abs() < 1e-12);
    }
}
