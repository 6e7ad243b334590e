//! Zonotopes `{c + Gᵀξ : ξ ∈ [−1, 1]^m}` with m generator rows.

use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::CONTAINMENT_TOLERANCE;
use crate::constants::MAX_ENUMERABLE_GENERATORS;
use crate::error::{Result, ScenarioError};

/// A zonotope with its generator certificate.
///
/// The certificate matrix W = G(GᵀG)⁻¹ = pinv(G)ᵀ maps an offset `x − c` to
/// the minimum-norm coefficients ξ with Gᵀξ = x − c. If every |ξⱼ| ≤ 1 the
/// point is inside. The converse does not hold, so the test is conservative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonotopeSet {
    center: DVector<f64>,
    generators: DMatrix<f64>,
    certificate: DMatrix<f64>,
}

impl ZonotopeSet {
    /// Build from a center (length n) and an m×n generator matrix, m ≥ n.
    pub fn new(center: DVector<f64>, generators: DMatrix<f64>) -> Result<Self> {
        let n = center.len();
        let m = generators.nrows();
        if n == 0 || generators.ncols() != n {
            return Err(ScenarioError::invalid(format!(
                "generator matrix is {}x{}, center has dimension {}",
                m,
                generators.ncols(),
                n
            )));
        }
        if m < n {
            return Err(ScenarioError::invalid(format!(
                "need at least {} generators in dimension {}, got {}",
                n, n, m
            )));
        }
        if generators.iter().any(|v| !v.is_finite()) {
            return Err(ScenarioError::degenerate("generator matrix has non-finite entries"));
        }
        let certificate = certificate_matrix(&generators)
            .ok_or_else(|| ScenarioError::degenerate("GᵀG is not positive definite"))?;
        Ok(Self {
            center,
            generators,
            certificate,
        })
    }

    /// Ambient dimension n.
    pub fn dim(&self) -> usize {
        self.center.len()
    }

    /// Number of generators m.
    pub fn num_generators(&self) -> usize {
        self.generators.nrows()
    }

    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    /// Generator matrix G, one generator per row.
    pub fn generators(&self) -> &DMatrix<f64> {
        &self.generators
    }

    /// Certificate matrix pinv(G)ᵀ.
    pub fn certificate(&self) -> &DMatrix<f64> {
        &self.certificate
    }

    /// `‖pinv(G)ᵀ (x − c)‖∞`; at most 1 certifies membership.
    pub fn generator_residual(&self, point: &DVector<f64>) -> f64 {
        (&self.certificate * (point - &self.center)).amax()
    }

    /// Sufficient membership test through the certificate.
    pub fn contains_certified(&self, point: &DVector<f64>) -> bool {
        self.generator_residual(point) <= 1.0 + CONTAINMENT_TOLERANCE
    }

    /// All 2^m sign combinations `c + Σ ±gⱼ`.
    ///
    /// The true vertices are a subset. Fails for more than
    /// [`MAX_ENUMERABLE_GENERATORS`] generators.
    pub fn vertex_candidates(&self) -> Result<Vec<DVector<f64>>> {
        let m = self.num_generators();
        if m > MAX_ENUMERABLE_GENERATORS {
            return Err(ScenarioError::invalid(format!(
                "refusing to enumerate 2^{} vertex candidates (limit 2^{})",
                m, MAX_ENUMERABLE_GENERATORS
            )));
        }
        Ok((0..1usize << m)
            .map(|mask| {
                let mut vertex = self.center.clone();
                for (j, row) in self.generators.row_iter().enumerate() {
                    if mask & (1 << j) != 0 {
                        vertex += row.transpose();
                    } else {
                        vertex -= row.transpose();
                    }
                }
                vertex
            })
            .collect())
    }

    /// Convex hull of the vertex candidates projected onto `(dim_x, dim_y)`,
    /// counter-clockwise starting from the lowest-leftmost point.
    pub fn projection_hull(&self, dim_x: usize, dim_y: usize) -> Result<Vec<[f64; 2]>> {
        let n = self.dim();
        if dim_x >= n || dim_y >= n || dim_x == dim_y {
            return Err(ScenarioError::invalid(format!(
                "projection axes ({}, {}) invalid for dimension {}",
                dim_x, dim_y, n
            )));
        }
        let projected: Vec<[f64; 2]> = self
            .vertex_candidates()?
            .iter()
            .map(|v| [v[dim_x], v[dim_y]])
            .collect();
        Ok(convex_hull(projected))
    }

    /// Volume `2ⁿ Σ_S |det G_S|` over all n-row subsets S of the generators.
    pub fn volume(&self) -> f64 {
        let n = self.dim();
        let m = self.num_generators();
        let mut total = 0.0;
        let mut subset: Vec<usize> = (0..n).collect();
        loop {
            let minor = DMatrix::from_fn(n, n, |i, j| self.generators[(subset[i], j)]);
            total += minor.determinant().abs();
            if !next_combination(&mut subset, m) {
                break;
            }
        }
        2f64.powi(n as i32) * total
    }
}

/// G(GᵀG)⁻¹, or `None` when GᵀG is not positive definite.
pub(crate) fn certificate_matrix(generators: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let gram = generators.transpose() * generators;
    let chol = Cholesky::new(gram)?;
    Some(generators * chol.inverse())
}

/// Advance `subset` to the next k-combination of 0..m in lexicographic order.
fn next_combination(subset: &mut [usize], m: usize) -> bool {
    let k = subset.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if subset[i] < m - k + i {
            subset[i] += 1;
            for j in i + 1..k {
                subset[j] = subset[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Andrew's monotone chain.
fn convex_hull(mut points: Vec<[f64; 2]>) -> Vec<[f64; 2]> {
    points.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let cross = |o: [f64; 2], a: [f64; 2], b: [f64; 2]| {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    };

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(2 * points.len());
    for &p in &points {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_zonotope() -> ZonotopeSet {
        let s = std::f64::consts::SQRT_2;
        let g = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 0.0, 1.0, s, s, s, -s]);
        ZonotopeSet::new(DVector::zeros(2), g).unwrap()
    }

    #[test]
    fn test_vertex_candidate_count() {
        let z = reference_zonotope();
        assert_eq!(z.vertex_candidates().unwrap().len(), 16);
    }

    #[test]
    fn test_certificate_is_left_inverse() {
        let z = reference_zonotope();
        let product = z.generators().transpose() * z.certificate();
        assert!((product - DMatrix::identity(2, 2)).norm() < 1e-12);
    }

    #[test]
    fn test_unit_square() {
        let z = ZonotopeSet::new(DVector::from_vec(vec![1.0, 1.0]), DMatrix::identity(2, 2)).unwrap();
        assert!((z.volume() - 4.0).abs() < 1e-12);
        assert!(z.contains_certified(&DVector::from_vec(vec![1.9, 0.1])));
        assert!(!z.contains_certified(&DVector::from_vec(vec![2.1, 1.0])));

        let hull = z.projection_hull(0, 1).unwrap();
        assert_eq!(hull, vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
    }

    #[test]
    fn test_volume_sums_minors() {
        // Square plus a diagonal generator: 4 · (1 + 1 + 1) = 12.
        let g = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let z = ZonotopeSet::new(DVector::zeros(2), g).unwrap();
        assert!((z.volume() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_rank_deficient_generators() {
        let g = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]);
        assert!(matches!(
            ZonotopeSet::new(DVector::zeros(2), g),
            Err(ScenarioError::NumericDegeneracy(_))
        ));
        let too_few = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        assert!(matches!(
            ZonotopeSet::new(DVector::zeros(2), too_few),
            Err(ScenarioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_hull_is_convex_and_covers_candidates() {
        let z = reference_zonotope();
        let hull = z.projection_hull(0, 1).unwrap();
        // The reference zonotope is an octagon.
        assert_eq!(hull.len(), 8);

        // Shoelace area of the hull matches the generator-minor volume.
        let area: f64 = (0..hull.len())
            .map(|i| {
                let (a, b) = (hull[i], hull[(i + 1) % hull.len()]);
                a[0] * b[1] - b[0] * a[1]
            })
            .sum::<f64>()
            / 2.0;
        assert!(area > 0.0);
        assert!((area - z.volume()).abs() < 1e-9);
    }
}
