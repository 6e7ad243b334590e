//! Default numeric constants used throughout the crate.

/// Default deterministic seed for randomised restarts.
///
/// The value `0x7363656E6172` is "scenar" encoded in ASCII.
pub const DEFAULT_SEED: u64 = 0x7363656E6172;

/// Default extreme-tail risk level δ for the binomial tail bound.
pub const DEFAULT_RISK_LEVEL: f64 = 1e-9;

// =============================================================================
// Binomial tail inversion
// =============================================================================

/// Default bisection budget for the tail boundary search.
pub const DEFAULT_TAIL_MAX_ITERATIONS: usize = 200;

/// Default bracket width at which the tail boundary search stops.
pub const DEFAULT_TAIL_TOLERANCE: f64 = 1e-13;

/// Bracket width below which an iteration-capped tail search still counts
/// as a usable (inaccurate) answer.
pub const TAIL_INACCURATE_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Ellipsoid fitting (log-barrier interior point)
// =============================================================================

/// Default total Newton step budget across all centering phases.
pub const DEFAULT_BARRIER_MAX_ITERATIONS: usize = 1000;

/// Default duality-gap bound at which the barrier method reports `Optimal`.
pub const DEFAULT_GAP_TOLERANCE: f64 = 1e-8;

/// Duality-gap bound under which an interrupted solve is `OptimalInaccurate`.
pub const DEFAULT_INACCURATE_GAP_TOLERANCE: f64 = 1e-4;

/// Default multiplicative growth of the barrier parameter t.
pub const DEFAULT_BARRIER_GROWTH: f64 = 10.0;

/// Default Newton decrement threshold (λ²/2) ending a centering phase.
pub const DEFAULT_NEWTON_TOLERANCE: f64 = 1e-10;

// =============================================================================
// Zonotope fitting (augmented Lagrangian)
// =============================================================================

/// Number of generators in the reference configuration.
pub const DEFAULT_NUM_GENERATORS: usize = 4;

/// Number of worst-residual points constrained in the full optimisation.
pub const DEFAULT_ACTIVE_SET_SIZE: usize = 100;

/// Regulariser added to det(GᵀG) before taking the log.
pub const DEFAULT_VOLUME_REGULARIZER: f64 = 1e-5;

/// Standard deviation of the additive noise used to perturb a failed guess.
pub const DEFAULT_PERTURBATION_SCALE: f64 = 1e-2;

/// Consecutive line-search failures tolerated before reinitialising.
pub const DEFAULT_FAILURES_BEFORE_REINIT: usize = 3;

/// Hard cap on solver attempts per fitting stage.
pub const DEFAULT_MAX_ATTEMPTS: usize = 20;

/// Default inner-iteration budget of one nonlinear solve.
pub const DEFAULT_NONLINEAR_MAX_ITERATIONS: usize = 1500;

/// Default constraint violation accepted as feasible.
pub const DEFAULT_FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Largest generator count for which vertices are enumerated (2^m points).
pub const MAX_ENUMERABLE_GENERATORS: usize = 20;
