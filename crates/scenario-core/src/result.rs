//! Solver outcomes, retry bookkeeping, and coverage statistics.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScenarioError};

/// Overall status of an optimisation.
///
/// Callers must check this before trusting a result: an inaccurate optimum is
/// usable but is not a clean optimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// The optimality criterion was met.
    Optimal,
    /// The solver stopped early but the iterate is feasible and close to
    /// optimal (within the configured inaccurate tolerance).
    OptimalInaccurate,
    /// The solver could not produce a usable answer.
    Failed,
}

impl SolveStatus {
    /// True for `Optimal` and `OptimalInaccurate`.
    pub fn is_usable(&self) -> bool {
        !matches!(self, SolveStatus::Failed)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::OptimalInaccurate => write!(f, "optimal_inaccurate"),
            SolveStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverExit {
    /// Convergence criterion satisfied.
    Converged,
    /// Iteration budget exhausted.
    MaxIterations,
    /// Positive directional derivative in the line search: no descent step
    /// could be found away from a stationary point.
    LineSearchFailed,
    /// Steps became too small to make progress.
    Stalled,
    /// The objective or constraints evaluated to NaN/∞ where a finite value
    /// was required.
    NonFinite,
}

impl std::fmt::Display for SolverExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverExit::Converged => write!(f, "converged"),
            SolverExit::MaxIterations => write!(f, "iteration limit reached"),
            SolverExit::LineSearchFailed => {
                write!(f, "positive directional derivative for line search")
            }
            SolverExit::Stalled => write!(f, "step size stalled"),
            SolverExit::NonFinite => write!(f, "non-finite value encountered"),
        }
    }
}

/// Explicit result of a solver run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome<T> {
    /// Overall status.
    pub status: SolveStatus,
    /// Final iterate (meaningful only when `status.is_usable()`).
    pub solution: T,
    /// Objective value at `solution`.
    pub objective: f64,
    /// Iterations consumed.
    pub iterations: usize,
    /// Why the solver stopped.
    pub exit: SolverExit,
    /// Human-readable diagnostic.
    pub message: String,
}

/// State of the zonotope retry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryState {
    /// Running the solver on the current guess.
    Fitting,
    /// Adding noise to the guess after a line-search failure.
    Perturbing,
    /// Replacing the guess with a fresh random orthonormal matrix.
    Reinitializing,
    /// Attempt budget exhausted.
    Failed,
    /// A solve finished without a line-search failure.
    Succeeded,
}

/// Which zonotope stage an attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStage {
    /// Per-generator scale warm start.
    DiagonalWarmStart,
    /// Full generator-matrix optimisation.
    FullGenerators,
}

impl std::fmt::Display for FitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStage::DiagonalWarmStart => write!(f, "zonotope stage 1"),
            FitStage::FullGenerators => write!(f, "zonotope stage 2"),
        }
    }
}

/// One solver attempt inside the zonotope retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Stage the attempt belongs to.
    pub stage: FitStage,
    /// 1-based attempt number within the stage.
    pub attempt: usize,
    /// How the starting guess was produced (`Fitting` for the first).
    pub origin: RetryState,
    /// State the retry machine moved to after this attempt.
    pub next: RetryState,
    /// Why the solver stopped.
    pub exit: SolverExit,
    /// Objective value reached.
    pub objective: f64,
    /// Iterations consumed.
    pub iterations: usize,
}

/// Empirical miss count against a held-out sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStatistic {
    misses: u64,
    num_samples: u64,
}

impl CoverageStatistic {
    /// Validated constructor: `num_samples > 0` and `misses <= num_samples`.
    pub fn new(misses: u64, num_samples: u64) -> Result<Self> {
        if num_samples == 0 {
            return Err(ScenarioError::invalid("num_samples must be > 0"));
        }
        if misses > num_samples {
            return Err(ScenarioError::invalid(format!(
                "misses ({}) exceed num_samples ({})",
                misses, num_samples
            )));
        }
        Ok(Self {
            misses,
            num_samples,
        })
    }

    /// Number of samples that fell outside the set.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of samples the bound is computed over.
    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    /// Empirical miss rate.
    pub fn miss_rate(&self) -> f64 {
        self.misses as f64 / self.num_samples as f64
    }
}
