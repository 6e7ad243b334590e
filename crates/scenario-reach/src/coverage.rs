//! Empirical coverage of a fitted set and its binomial accuracy bound.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use scenario_core::{
    BinomialTailSolver, CoverageStatistic, MembershipOracle, PointSet, Result, ScenarioError,
    SolveStatus,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of a coverage evaluation.
///
/// Only `misses` and `num_samples` feed `epsilon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Held-out points outside the set.
    pub misses: u64,

    /// Sample count the bound is computed over.
    pub num_samples: u64,

    /// Upper bound on the probability that a future sample is outside.
    pub epsilon: f64,

    /// Risk level δ of the bound.
    pub risk_level: f64,

    /// Confidence 1 − δ.
    pub confidence: f64,

    /// Status of the tail inversion.
    pub tail_status: SolveStatus,

    /// The outside points, if recording was enabled.
    pub outside_points: Vec<DVector<f64>>,

    /// True when the set's membership test is only sufficient. Misses are
    /// then an upper bound and `epsilon` is conservative.
    #[serde(default)]
    pub conservative: bool,
}

impl CoverageReport {
    /// Empirical miss rate.
    pub fn miss_rate(&self) -> f64 {
        self.misses as f64 / self.num_samples as f64
    }

    /// Empirical coverage, 1 − miss rate.
    pub fn coverage(&self) -> f64 {
        1.0 - self.miss_rate()
    }

    /// The certified coverage level, 1 − ε.
    pub fn guaranteed_coverage(&self) -> f64 {
        1.0 - self.epsilon
    }
}

/// Counts held-out misses and inverts the binomial tail.
#[derive(Debug, Clone, Default)]
pub struct CoverageEvaluator {
    solver: BinomialTailSolver,
    record_outside: bool,
}

impl CoverageEvaluator {
    /// Evaluator with the given tail solver.
    pub fn new(solver: BinomialTailSolver) -> Self {
        Self {
            solver,
            record_outside: false,
        }
    }

    /// Keep the outside points in reports.
    pub fn record_outside(mut self, record: bool) -> Self {
        self.record_outside = record;
        self
    }

    /// The tail solver in use.
    pub fn solver(&self) -> &BinomialTailSolver {
        &self.solver
    }

    /// Whether outside points are recorded.
    pub fn records_outside(&self) -> bool {
        self.record_outside
    }

    /// Classify `test_points` against `set` and bound the miss probability.
    ///
    /// `num_samples` is the sample count of the bound; it must be at least
    /// the number of misses.
    pub fn evaluate<O>(
        &self,
        test_points: &PointSet,
        set: &O,
        num_samples: u64,
    ) -> Result<CoverageReport>
    where
        O: MembershipOracle + Sync + ?Sized,
    {
        let outside = outside_indices(test_points, set)?;
        let outside_points = if self.record_outside {
            outside.iter().map(|&i| test_points.point(i).clone()).collect()
        } else {
            Vec::new()
        };
        let mut report = self.report(outside.len() as u64, num_samples, outside_points)?;
        report.conservative = !set.is_exact();
        Ok(report)
    }

    /// Bound a miss count that was accumulated elsewhere.
    ///
    /// The report is marked exact; callers counting with a sufficient
    /// membership test set `conservative` themselves.
    pub fn report(
        &self,
        misses: u64,
        num_samples: u64,
        outside_points: Vec<DVector<f64>>,
    ) -> Result<CoverageReport> {
        let statistic = CoverageStatistic::new(misses, num_samples)?;
        let bound = self.solver.solve_statistic(&statistic)?;
        Ok(CoverageReport {
            misses,
            num_samples,
            epsilon: bound.epsilon,
            risk_level: bound.risk_level,
            confidence: bound.confidence(),
            tail_status: bound.status,
            outside_points,
            conservative: false,
        })
    }
}

/// Indices of the points outside `set`, in input order.
pub(crate) fn outside_indices<O>(points: &PointSet, set: &O) -> Result<Vec<usize>>
where
    O: MembershipOracle + Sync + ?Sized,
{
    if set.dimension() != points.dim() {
        return Err(ScenarioError::InvalidInput(format!(
            "set has dimension {}, points have dimension {}",
            set.dimension(),
            points.dim()
        )));
    }

    #[cfg(feature = "parallel")]
    let outside: Vec<usize> = (0..points.len())
        .into_par_iter()
        .filter(|&i| !set.contains(points.point(i)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outside: Vec<usize> = (0..points.len())
        .filter(|&i| !set.contains(points.point(i)))
        .collect();

    Ok(outside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use scenario_core::{EllipsoidSet, NormDegree, ZonotopeSet};

    fn unit_disc() -> EllipsoidSet {
        EllipsoidSet::from_dual(DMatrix::identity(2, 2), DVector::zeros(2), NormDegree::L2).unwrap()
    }

    #[test]
    fn test_counts_outside_points() {
        let points =
            PointSet::from_rows(&[[0.0, 0.0], [0.5, 0.0], [2.0, 0.0], [0.0, -3.0]]).unwrap();
        let report = CoverageEvaluator::default()
            .record_outside(true)
            .evaluate(&points, &unit_disc(), 4)
            .unwrap();
        assert_eq!(report.misses, 2);
        assert_eq!(report.outside_points.len(), 2);
        assert_eq!(report.outside_points[0], DVector::from_vec(vec![2.0, 0.0]));
        assert!((report.miss_rate() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_zonotope_report_is_conservative() {
        let points = PointSet::from_rows(&[[0.0, 0.0], [2.0, 0.0]]).unwrap();
        let square = ZonotopeSet::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
        let evaluator = CoverageEvaluator::default();

        let zonotope = evaluator.evaluate(&points, &square, 2).unwrap();
        assert!(zonotope.conservative);
        let ellipsoid = evaluator.evaluate(&points, &unit_disc(), 2).unwrap();
        assert!(!ellipsoid.conservative);
        assert_eq!(zonotope.misses, ellipsoid.misses);
    }

    #[test]
    fn test_dimension_mismatch() {
        let points = PointSet::from_rows(&[[0.0, 0.0, 0.0]]).unwrap();
        assert!(CoverageEvaluator::default()
            .evaluate(&points, &unit_disc(), 1)
            .is_err());
    }

    #[test]
    fn test_misses_above_num_samples_rejected() {
        let points = PointSet::from_rows(&[[5.0, 0.0], [6.0, 0.0]]).unwrap();
        let result = CoverageEvaluator::default().evaluate(&points, &unit_disc(), 1);
        assert!(matches!(result, Err(ScenarioError::InvalidInput(_))));
    }
}
