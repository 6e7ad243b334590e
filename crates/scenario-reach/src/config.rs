//! Configuration for fitting and certification.

use scenario_core::constants::{
    DEFAULT_ACTIVE_SET_SIZE, DEFAULT_FAILURES_BEFORE_REINIT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_NUM_GENERATORS, DEFAULT_PERTURBATION_SCALE, DEFAULT_RISK_LEVEL,
    DEFAULT_VOLUME_REGULARIZER,
};
use scenario_core::optimize::{AugmentedLagrangianConfig, BarrierConfig};
use scenario_core::{BinomialTailSolver, EllipsoidConfig, NormDegree, ZonotopeConfig};

/// Configuration options for [`ScenarioCertifier`](crate::ScenarioCertifier).
///
/// Every field has a default matching the reference setup: δ = 1e-9, an L2
/// ellipsoid, and a four-generator zonotope with a 100-point active set.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Statistical bound
    // =========================================================================
    /// Extreme-tail risk level δ of the binomial bound.
    ///
    /// The certificate holds with confidence 1 − δ. Default: 1e-9.
    pub risk_level: f64,

    /// Keep the held-out points that fall outside the set in the report.
    ///
    /// Useful for plotting violations. Default: false.
    pub record_outside: bool,

    // =========================================================================
    // Ellipsoid fitting
    // =========================================================================
    /// Degree p of the norm ball `‖A x − b‖_p ≤ 1`.
    ///
    /// Default: L2.
    pub norm_degree: NormDegree,

    /// Interior-point solver settings.
    pub barrier: BarrierConfig,

    /// Return `OptimalInaccurate` ellipsoid fits instead of failing.
    ///
    /// Default: true.
    pub accept_inaccurate: bool,

    // =========================================================================
    // Zonotope fitting
    // =========================================================================
    /// Number of zonotope generators m (at least the dimension).
    ///
    /// Default: 4.
    pub num_generators: usize,

    /// Number of worst-residual points constrained in the full stage.
    ///
    /// Default: 100.
    pub active_set_size: usize,

    /// Regulariser ε in ln(det(GᵀG) + ε).
    ///
    /// Default: 1e-5.
    pub volume_regularizer: f64,

    /// Solver runs per zonotope stage before giving up.
    ///
    /// Default: 20.
    pub max_attempts: usize,

    /// Consecutive line-search failures before a random reinitialisation.
    ///
    /// Default: 3.
    pub failures_before_reinit: usize,

    /// Standard deviation of the perturbation applied after a failure.
    ///
    /// Default: 0.01.
    pub perturbation_scale: f64,

    /// Augmented Lagrangian solver settings.
    pub nonlinear: AugmentedLagrangianConfig,

    /// Seed for the zonotope restart generator.
    ///
    /// Default: None (uses a fixed built-in seed, so fits stay reproducible).
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            risk_level: DEFAULT_RISK_LEVEL,
            record_outside: false,
            norm_degree: NormDegree::L2,
            barrier: BarrierConfig::default(),
            accept_inaccurate: true,
            num_generators: DEFAULT_NUM_GENERATORS,
            active_set_size: DEFAULT_ACTIVE_SET_SIZE,
            volume_regularizer: DEFAULT_VOLUME_REGULARIZER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            failures_before_reinit: DEFAULT_FAILURES_BEFORE_REINIT,
            perturbation_scale: DEFAULT_PERTURBATION_SCALE,
            nonlinear: AugmentedLagrangianConfig::default(),
            seed: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looser tolerances and smaller budgets for fast iteration.
    ///
    /// - duality gap 1e-6
    /// - 500 nonlinear iterations per solve
    /// - 10 attempts per zonotope stage
    pub fn quick() -> Self {
        Self {
            barrier: BarrierConfig {
                gap_tolerance: 1e-6,
                max_iterations: 300,
                ..BarrierConfig::default()
            },
            nonlinear: AugmentedLagrangianConfig {
                max_iterations: 500,
                ..AugmentedLagrangianConfig::default()
            },
            max_attempts: 10,
            ..Self::default()
        }
    }

    /// Tighter tolerances and larger budgets.
    ///
    /// - duality gap 1e-10
    /// - 5,000 nonlinear iterations per solve
    /// - 50 attempts per zonotope stage
    pub fn thorough() -> Self {
        Self {
            barrier: BarrierConfig {
                gap_tolerance: 1e-10,
                max_iterations: 5_000,
                ..BarrierConfig::default()
            },
            nonlinear: AugmentedLagrangianConfig {
                max_iterations: 5_000,
                ..AugmentedLagrangianConfig::default()
            },
            max_attempts: 50,
            ..Self::default()
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the risk level δ.
    pub fn risk_level(mut self, delta: f64) -> Self {
        assert!(delta > 0.0 && delta < 1.0, "risk_level must be in (0, 1)");
        self.risk_level = delta;
        self
    }

    /// Set the norm degree p (`f64::INFINITY` for the sup-norm).
    pub fn norm_degree(mut self, p: f64) -> Self {
        assert!(p >= 1.0, "norm degree must be >= 1");
        self.norm_degree = if p.is_infinite() {
            NormDegree::Infinity
        } else {
            NormDegree::P(p)
        };
        self
    }

    /// Set the number of zonotope generators.
    pub fn num_generators(mut self, m: usize) -> Self {
        assert!(m > 0, "num_generators must be positive");
        self.num_generators = m;
        self
    }

    /// Set the active-set size of the full zonotope stage.
    pub fn active_set_size(mut self, k: usize) -> Self {
        assert!(k > 0, "active_set_size must be positive");
        self.active_set_size = k;
        self
    }

    /// Set the attempt cap per zonotope stage.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        assert!(attempts > 0, "max_attempts must be positive");
        self.max_attempts = attempts;
        self
    }

    /// Set the consecutive-failure threshold for reinitialisation.
    pub fn failures_before_reinit(mut self, failures: usize) -> Self {
        self.failures_before_reinit = failures;
        self
    }

    /// Set the perturbation noise scale.
    pub fn perturbation_scale(mut self, scale: f64) -> Self {
        assert!(
            scale > 0.0 && scale.is_finite(),
            "perturbation_scale must be positive and finite"
        );
        self.perturbation_scale = scale;
        self
    }

    /// Set the zonotope volume regulariser.
    pub fn volume_regularizer(mut self, epsilon: f64) -> Self {
        assert!(epsilon >= 0.0, "volume_regularizer must be non-negative");
        self.volume_regularizer = epsilon;
        self
    }

    /// Set a deterministic seed for zonotope restarts.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Record outside points in coverage reports.
    pub fn record_outside(mut self, record: bool) -> Self {
        self.record_outside = record;
        self
    }

    /// Accept or reject inaccurate ellipsoid solves.
    pub fn accept_inaccurate(mut self, accept: bool) -> Self {
        self.accept_inaccurate = accept;
        self
    }

    // =========================================================================
    // Resolution methods
    // =========================================================================

    /// Binomial tail solver at the configured risk level.
    pub fn tail_solver(&self) -> BinomialTailSolver {
        BinomialTailSolver::with_risk_level(self.risk_level)
    }

    /// Ellipsoid fitter configuration.
    pub fn ellipsoid_config(&self) -> EllipsoidConfig {
        EllipsoidConfig {
            norm_degree: self.norm_degree,
            barrier: self.barrier.clone(),
            accept_inaccurate: self.accept_inaccurate,
        }
    }

    /// Zonotope fitter configuration.
    pub fn zonotope_config(&self) -> ZonotopeConfig {
        ZonotopeConfig {
            num_generators: self.num_generators,
            active_set_size: self.active_set_size,
            volume_regularizer: self.volume_regularizer,
            max_attempts: self.max_attempts,
            failures_before_reinit: self.failures_before_reinit,
            perturbation_scale: self.perturbation_scale,
            solver: self.nonlinear.clone(),
        }
    }

    /// Check if the configuration is valid.
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.risk_level > 0.0 && self.risk_level < 1.0) {
            return Err("risk_level must be in (0, 1)".to_string());
        }
        if self.norm_degree.value().is_nan() || self.norm_degree.value() < 1.0 {
            return Err("norm degree must be >= 1".to_string());
        }
        if self.num_generators == 0 {
            return Err("num_generators must be positive".to_string());
        }
        if self.active_set_size == 0 {
            return Err("active_set_size must be positive".to_string());
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be positive".to_string());
        }
        if self.barrier.max_iterations == 0 || self.nonlinear.max_iterations == 0 {
            return Err("iteration budgets must be positive".to_string());
        }
        Ok(())
    }
}
