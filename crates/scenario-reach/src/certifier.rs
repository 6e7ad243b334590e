//! Main `ScenarioCertifier` entry point and builder.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use scenario_core::constants::DEFAULT_SEED;
use scenario_core::{
    EllipsoidFit, EllipsoidFitter, MembershipOracle, PointSet, Result, ScenarioError,
    SolveStatus, ZonotopeFit, ZonotopeFitter,
};

use crate::config::Config;
use crate::coverage::{CoverageEvaluator, CoverageReport};

/// A fitted set together with its held-out coverage bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate<F> {
    /// The fit on the training sample.
    pub fit: F,
    /// Coverage of the fitted set on the held-out sample.
    pub coverage: CoverageReport,
}

/// Main entry point for fitting and certifying reachable-set approximations.
///
/// Use the builder pattern to configure, then fit on a training sample and
/// evaluate on a separate test sample.
///
/// # Example
///
/// ```ignore
/// use scenario_reach::ScenarioCertifier;
///
/// let certificate = ScenarioCertifier::new()
///     .risk_level(1e-9)
///     .norm_degree(2.0)
///     .certify_ellipsoid(&training, &test)?;
///
/// assert!(certificate.coverage.epsilon < 0.05);
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioCertifier {
    config: Config,
}

impl Default for ScenarioCertifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioCertifier {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Create with [`Config::quick`].
    pub fn quick() -> Self {
        Self::with_config(Config::quick())
    }

    /// Create with [`Config::thorough`].
    pub fn thorough() -> Self {
        Self::with_config(Config::thorough())
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the risk level δ.
    pub fn risk_level(mut self, delta: f64) -> Self {
        self.config = self.config.risk_level(delta);
        self
    }

    /// Set the ellipsoid norm degree p.
    pub fn norm_degree(mut self, p: f64) -> Self {
        self.config = self.config.norm_degree(p);
        self
    }

    /// Set the number of zonotope generators.
    pub fn num_generators(mut self, m: usize) -> Self {
        self.config = self.config.num_generators(m);
        self
    }

    /// Set the active-set size of the full zonotope stage.
    pub fn active_set_size(mut self, k: usize) -> Self {
        self.config = self.config.active_set_size(k);
        self
    }

    /// Set the attempt cap per zonotope stage.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config = self.config.max_attempts(attempts);
        self
    }

    /// Set a deterministic seed for zonotope restarts.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config = self.config.seed(seed);
        self
    }

    /// Record outside points in coverage reports.
    pub fn record_outside(mut self, record: bool) -> Self {
        self.config = self.config.record_outside(record);
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Coverage evaluator at the configured risk level.
    pub fn evaluator(&self) -> CoverageEvaluator {
        CoverageEvaluator::new(self.config.tail_solver()).record_outside(self.config.record_outside)
    }

    /// Fit the minimum-volume ellipsoid around `training`.
    pub fn fit_ellipsoid(&self, training: &PointSet) -> Result<EllipsoidFit> {
        self.check_config()?;
        tracing::debug!(
            points = training.len(),
            dim = training.dim(),
            norm = %self.config.norm_degree,
            "Fitting ellipsoid"
        );
        let fit = EllipsoidFitter::new(self.config.ellipsoid_config()).fit(training)?;
        if fit.status == SolveStatus::OptimalInaccurate {
            tracing::warn!(
                iterations = fit.iterations,
                "Ellipsoid solve was inaccurate: {}",
                fit.message
            );
        }
        tracing::debug!(
            log_det = fit.optimal_value,
            iterations = fit.iterations,
            "Ellipsoid fit finished"
        );
        Ok(fit)
    }

    /// Fit a minimum-volume zonotope around `training`.
    ///
    /// The zonotope is centered at `center`, or at the training mean when
    /// none is given.
    pub fn fit_zonotope(
        &self,
        training: &PointSet,
        center: Option<&DVector<f64>>,
    ) -> Result<ZonotopeFit> {
        self.check_config()?;
        let center = match center {
            Some(c) => c.clone(),
            None => training.mean(),
        };
        let seed = self.config.seed.unwrap_or(DEFAULT_SEED);
        tracing::debug!(
            points = training.len(),
            dim = training.dim(),
            generators = self.config.num_generators,
            seed,
            "Fitting zonotope"
        );

        let fit = ZonotopeFitter::new(self.config.zonotope_config())
            .fit_seeded(training, &center, seed)?;

        for attempt in &fit.attempts {
            tracing::debug!(
                stage = %attempt.stage,
                attempt = attempt.attempt,
                origin = ?attempt.origin,
                next = ?attempt.next,
                exit = %attempt.exit,
                objective = attempt.objective,
                "Zonotope attempt"
            );
        }
        let restarts = fit.restarts();
        if restarts > 0 {
            tracing::warn!(restarts, "Zonotope fit needed restarts");
        }
        if fit.inflation > 1.0 {
            tracing::warn!(
                inflation = fit.inflation,
                "Zonotope generators were inflated to cover the training points"
            );
        }
        Ok(fit)
    }

    /// Count misses of `test` against `set` and bound them.
    ///
    /// The bound uses `test.len()` as the sample count.
    pub fn evaluate<O>(&self, test: &PointSet, set: &O) -> Result<CoverageReport>
    where
        O: MembershipOracle + Sync + ?Sized,
    {
        let report = self.evaluator().evaluate(test, set, test.len() as u64)?;
        tracing::debug!(
            misses = report.misses,
            samples = report.num_samples,
            epsilon = report.epsilon,
            "Coverage evaluated"
        );
        Ok(report)
    }

    /// Fit an ellipsoid on `training` and certify it on `test`.
    pub fn certify_ellipsoid(
        &self,
        training: &PointSet,
        test: &PointSet,
    ) -> Result<Certificate<EllipsoidFit>> {
        let fit = self.fit_ellipsoid(training)?;
        let coverage = self.evaluate(test, &fit.set)?;
        log_certificate("ellipsoid", &coverage);
        Ok(Certificate { fit, coverage })
    }

    /// Fit a zonotope on `training` and certify it on `test`.
    pub fn certify_zonotope(
        &self,
        training: &PointSet,
        test: &PointSet,
        center: Option<&DVector<f64>>,
    ) -> Result<Certificate<ZonotopeFit>> {
        let fit = self.fit_zonotope(training, center)?;
        let coverage = self.evaluate(test, &fit.set)?;
        log_certificate("zonotope", &coverage);
        Ok(Certificate { fit, coverage })
    }

    fn check_config(&self) -> Result<()> {
        self.config.validate().map_err(ScenarioError::InvalidInput)
    }
}

fn log_certificate(kind: &str, coverage: &CoverageReport) {
    tracing::info!(
        kind,
        misses = coverage.misses,
        samples = coverage.num_samples,
        epsilon = coverage.epsilon,
        confidence = coverage.confidence,
        "Certified {} covers at least {:.4}% of future samples",
        kind,
        coverage.guaranteed_coverage() * 100.0
    );
}
