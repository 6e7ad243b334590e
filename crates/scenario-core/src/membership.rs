//! Point-in-set classification shared by every fitted set.

use nalgebra::DVector;

use crate::sets::{EllipsoidSet, ZonotopeSet};
use crate::types::PointSet;

/// Classifies points as inside or outside a fitted set.
///
/// Implementations must be pure: the same point always gets the same answer.
pub trait MembershipOracle {
    /// Dimension of the points the oracle accepts.
    fn dimension(&self) -> usize;

    /// True if `point` lies in the set (boundary included).
    fn contains(&self, point: &DVector<f64>) -> bool;

    /// False when `contains` is only a sufficient test, so a point of the
    /// set can be reported outside and miss counts are upper bounds.
    fn is_exact(&self) -> bool {
        true
    }

    /// Number of points of `points` outside the set.
    fn count_outside(&self, points: &PointSet) -> u64 {
        points.iter().filter(|p| !self.contains(p)).count() as u64
    }
}

/// Dual form `‖A p − b‖₂ ≤ 1`.
impl MembershipOracle for EllipsoidSet {
    fn dimension(&self) -> usize {
        self.dim()
    }

    fn contains(&self, point: &DVector<f64>) -> bool {
        self.contains_dual(point)
    }
}

/// Certificate test; may report a point of the set as outside.
impl MembershipOracle for ZonotopeSet {
    fn dimension(&self) -> usize {
        self.dim()
    }

    fn contains(&self, point: &DVector<f64>) -> bool {
        self.contains_certified(point)
    }

    fn is_exact(&self) -> bool {
        false
    }
}

impl<T: MembershipOracle + ?Sized> MembershipOracle for &T {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn contains(&self, point: &DVector<f64>) -> bool {
        (**self).contains(point)
    }

    fn is_exact(&self) -> bool {
        (**self).is_exact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormDegree;
    use nalgebra::DMatrix;

    #[test]
    fn test_count_outside() {
        let disc =
            EllipsoidSet::from_dual(DMatrix::identity(2, 2), DVector::zeros(2), NormDegree::L2).unwrap();
        let points = PointSet::from_rows(&[[0.0, 0.0], [0.5, 0.5], [1.0, 1.0], [-2.0, 0.0]]).unwrap();
        assert_eq!(disc.count_outside(&points), 2);

        let square = ZonotopeSet::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
        assert_eq!(square.count_outside(&points), 1);
        assert_eq!((&square).dimension(), 2);
    }

    #[test]
    fn test_zonotope_oracle_is_not_exact() {
        let disc =
            EllipsoidSet::from_dual(DMatrix::identity(2, 2), DVector::zeros(2), NormDegree::L2).unwrap();
        let square = ZonotopeSet::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
        assert!(disc.is_exact());
        assert!(!square.is_exact());
        assert!(!(&square).is_exact());
    }
}
