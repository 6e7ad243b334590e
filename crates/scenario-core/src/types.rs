//! Point sets and norm selection.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScenarioError};

/// Relative eigenvalue floor below which a point cloud is treated as flat.
const AFFINE_RANK_TOLERANCE: f64 = 1e-12;

/// An ordered collection of n-dimensional samples with a fixed dimension.
///
/// Order carries no meaning for fitting; duplicates are allowed. Every entry
/// is finite and the set is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    dim: usize,
    points: Vec<DVector<f64>>,
}

impl PointSet {
    /// Build a point set from vectors, validating dimension and finiteness.
    pub fn new(points: Vec<DVector<f64>>) -> Result<Self> {
        let dim = match points.first() {
            Some(p) => p.len(),
            None => return Err(ScenarioError::invalid("point set is empty")),
        };
        if dim == 0 {
            return Err(ScenarioError::invalid("points must have at least one coordinate"));
        }
        for (i, p) in points.iter().enumerate() {
            if p.len() != dim {
                return Err(ScenarioError::invalid(format!(
                    "point {} has dimension {}, expected {}",
                    i,
                    p.len(),
                    dim
                )));
            }
            if p.iter().any(|v| !v.is_finite()) {
                return Err(ScenarioError::invalid(format!(
                    "point {} has a non-finite coordinate",
                    i
                )));
            }
        }
        Ok(Self { dim, points })
    }

    /// Build a point set from rows of a rectangular array.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        Self::new(
            rows.iter()
                .map(|r| DVector::from_column_slice(r.as_ref()))
                .collect(),
        )
    }

    /// Build a point set from a matrix holding one sample per row.
    pub fn from_matrix(rows: &DMatrix<f64>) -> Result<Self> {
        Self::new(rows.row_iter().map(|r| r.transpose()).collect())
    }

    /// Dimension n of every point.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point at index `i`.
    pub fn point(&self, i: usize) -> &DVector<f64> {
        &self.points[i]
    }

    /// Iterate over the points in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DVector<f64>> {
        self.points.iter()
    }

    /// Borrow the points as a slice.
    pub fn as_slice(&self) -> &[DVector<f64>] {
        &self.points
    }

    /// Arithmetic mean of the points.
    pub fn mean(&self) -> DVector<f64> {
        let mut mean = DVector::zeros(self.dim);
        for p in &self.points {
            mean += p;
        }
        mean / self.points.len() as f64
    }

    /// Check that the points affinely span all `dim` dimensions.
    ///
    /// A cloud confined to a lower-dimensional affine subspace has no
    /// bounded minimum-volume enclosing ellipsoid.
    pub fn spans_full_dimension(&self) -> bool {
        if self.points.len() <= self.dim {
            return false;
        }
        let mean = self.mean();
        let mut scatter = DMatrix::zeros(self.dim, self.dim);
        for p in &self.points {
            let centered = p - &mean;
            scatter += &centered * centered.transpose();
        }
        let eigenvalues = scatter.symmetric_eigenvalues();
        let max = eigenvalues.iter().cloned().fold(0.0_f64, f64::max);
        let min = eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min);
        max > 0.0 && min > AFFINE_RANK_TOLERANCE * max
    }

    /// Check that `other` lives in the same dimension.
    pub fn ensure_dim(&self, dim: usize, what: &str) -> Result<()> {
        if self.dim != dim {
            return Err(ScenarioError::invalid(format!(
                "{} has dimension {}, points have dimension {}",
                what, dim, self.dim
            )));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a DVector<f64>;
    type IntoIter = std::slice::Iter<'a, DVector<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Degree of the norm ball used in ellipsoid fitting: ‖Ax − b‖_p ≤ 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NormDegree {
    /// Finite p ≥ 1.
    P(f64),
    /// The sup-norm.
    Infinity,
}

impl Default for NormDegree {
    fn default() -> Self {
        Self::L2
    }
}

impl NormDegree {
    /// Taxicab norm.
    pub const L1: NormDegree = NormDegree::P(1.0);

    /// Euclidean norm.
    pub const L2: NormDegree = NormDegree::P(2.0);

    /// Validated constructor; `f64::INFINITY` maps to [`NormDegree::Infinity`].
    pub fn new(p: f64) -> Result<Self> {
        if p.is_nan() || p < 1.0 {
            return Err(ScenarioError::invalid(format!(
                "norm degree must be >= 1, got {}",
                p
            )));
        }
        if p.is_infinite() {
            Ok(Self::Infinity)
        } else {
            Ok(Self::P(p))
        }
    }

    /// Evaluate ‖v‖ under this degree.
    pub fn norm(&self, v: &DVector<f64>) -> f64 {
        match *self {
            NormDegree::Infinity => v.amax(),
            NormDegree::P(p) if p == 1.0 => v.iter().map(|x| x.abs()).sum(),
            NormDegree::P(p) if p == 2.0 => v.norm(),
            NormDegree::P(p) => v.iter().map(|x| x.abs().powf(p)).sum::<f64>().powf(1.0 / p),
        }
    }

    /// Numeric value of p (infinite for the sup-norm).
    pub fn value(&self) -> f64 {
        match *self {
            NormDegree::P(p) => p,
            NormDegree::Infinity => f64::INFINITY,
        }
    }
}

impl std::fmt::Display for NormDegree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormDegree::P(p) => write!(f, "L{}", p),
            NormDegree::Infinity => write!(f, "L∞"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_ragged() {
        let empty: Vec<Vec<f64>> = vec![];
        assert!(PointSet::from_rows(&empty).is_err());

        let ragged = vec![vec![0.0, 1.0], vec![2.0]];
        assert!(matches!(
            PointSet::from_rows(&ragged),
            Err(ScenarioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite() {
        let rows = vec![vec![0.0, f64::NAN]];
        assert!(PointSet::from_rows(&rows).is_err());
    }

    #[test]
    fn test_mean_and_span() {
        let rows = vec![
            vec![0.0, 0.0],
            vec![2.0, 0.0],
            vec![0.0, 2.0],
            vec![2.0, 2.0],
        ];
        let points = PointSet::from_rows(&rows).unwrap();
        assert_eq!(points.dim(), 2);
        assert_eq!(points.len(), 4);
        assert!((points.mean() - DVector::from_vec(vec![1.0, 1.0])).norm() < 1e-12);
        assert!(points.spans_full_dimension());
    }

    #[test]
    fn test_collinear_points_do_not_span() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let points = PointSet::from_rows(&rows).unwrap();
        assert!(!points.spans_full_dimension());
    }

    #[test]
    fn test_from_matrix_matches_rows() {
        let m = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let points = PointSet::from_matrix(&m).unwrap();
        assert_eq!(points.point(1), &DVector::from_vec(vec![3.0, 4.0]));
    }

    #[test]
    fn test_norm_degrees() {
        let v = DVector::from_vec(vec![3.0, -4.0]);
        assert_eq!(NormDegree::L1.norm(&v), 7.0);
        assert_eq!(NormDegree::L2.norm(&v), 5.0);
        assert_eq!(NormDegree::Infinity.norm(&v), 4.0);
        let p3 = NormDegree::new(3.0).unwrap().norm(&v);
        assert!((p3 - (27.0_f64 + 64.0).powf(1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_norm_degree_validation() {
        assert!(NormDegree::new(0.5).is_err());
        assert!(NormDegree::new(f64::NAN).is_err());
        assert_eq!(NormDegree::new(f64::INFINITY).unwrap(), NormDegree::Infinity);
    }
}
