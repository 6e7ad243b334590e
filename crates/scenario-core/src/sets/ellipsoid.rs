//! Ellipsoids in canonical and dual form.
//!
//! Canonical form: `{x : (x − c)ᵀ Q (x − c) ≤ r}` with Q symmetric positive
//! definite. After renormalisation the level r is 1.
//!
//! Dual form: `{x : ‖A x − b‖₂ ≤ 1}`. The two are related by
//!
//! ```text
//! Q = AᵀA,  c = Q⁻¹Aᵀb,  r = bᵀA Q⁻¹ Aᵀb − bᵀb + 1,  then Q ← Q / r
//! ```
//!
//! and in the other direction by A = Lᵀ, b = Lᵀc where L Lᵀ = Q.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::gamma;

use super::CONTAINMENT_TOLERANCE;
use crate::error::{Result, ScenarioError};
use crate::types::NormDegree;

/// An ellipsoid holding both representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipsoidSet {
    shape: DMatrix<f64>,
    center: DVector<f64>,
    level: f64,
    transform: DMatrix<f64>,
    offset: DVector<f64>,
    cholesky: DMatrix<f64>,
    norm_degree: NormDegree,
}

impl EllipsoidSet {
    /// Build from the dual form `‖A x − b‖ ≤ 1`.
    ///
    /// `norm_degree` records the p the dual form was fitted under; the
    /// canonical form is always the Euclidean ellipsoid.
    pub fn from_dual(
        transform: DMatrix<f64>,
        offset: DVector<f64>,
        norm_degree: NormDegree,
    ) -> Result<Self> {
        let n = transform.ncols();
        if transform.nrows() != n || offset.len() != n || n == 0 {
            return Err(ScenarioError::invalid(format!(
                "dual form needs a square A and matching b, got {}x{} and {}",
                transform.nrows(),
                n,
                offset.len()
            )));
        }

        let gram = transform.transpose() * &transform;
        let gram_inv = gram.clone().try_inverse().ok_or_else(|| {
            ScenarioError::degenerate("AᵀA is singular; the ellipsoid is unbounded")
        })?;
        let at_b = transform.transpose() * &offset;
        let center = &gram_inv * &at_b;
        let level = at_b.dot(&(&gram_inv * &at_b)) - offset.dot(&offset) + 1.0;
        if !(level > 0.0 && level.is_finite()) {
            return Err(ScenarioError::degenerate(format!(
                "ellipsoid level r = {} is not positive",
                level
            )));
        }
        let shape = gram / level;

        let cholesky = symmetric_cholesky(&shape)?;
        Ok(Self {
            shape,
            center,
            level: 1.0,
            transform,
            offset,
            cholesky: cholesky.l(),
            norm_degree,
        })
    }

    /// Build from the canonical form `(x − c)ᵀ Q (x − c) ≤ 1`.
    pub fn from_canonical(shape: DMatrix<f64>, center: DVector<f64>) -> Result<Self> {
        let n = center.len();
        if shape.nrows() != n || shape.ncols() != n || n == 0 {
            return Err(ScenarioError::invalid(format!(
                "shape matrix is {}x{}, center has dimension {}",
                shape.nrows(),
                shape.ncols(),
                n
            )));
        }
        let l = symmetric_cholesky(&shape)?.l();
        let transform = l.transpose();
        let offset = &transform * &center;
        Ok(Self {
            shape,
            center,
            level: 1.0,
            transform,
            offset,
            cholesky: l,
            norm_degree: NormDegree::L2,
        })
    }

    /// Ambient dimension.
    pub fn dim(&self) -> usize {
        self.center.len()
    }

    /// Shape matrix Q (normalised so that r = 1).
    pub fn shape(&self) -> &DMatrix<f64> {
        &self.shape
    }

    /// Center c.
    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    /// Level r of the canonical form (1 after renormalisation).
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Dual-form matrix A.
    pub fn transform(&self) -> &DMatrix<f64> {
        &self.transform
    }

    /// Dual-form offset b.
    pub fn offset(&self) -> &DVector<f64> {
        &self.offset
    }

    /// Lower Cholesky factor L of (Q + Qᵀ)/2.
    pub fn cholesky_factor(&self) -> &DMatrix<f64> {
        &self.cholesky
    }

    /// Norm degree the dual form was fitted under.
    pub fn norm_degree(&self) -> NormDegree {
        self.norm_degree
    }

    /// `(x − c)ᵀ Q (x − c) − 1`; non-positive inside.
    pub fn canonical_level(&self, point: &DVector<f64>) -> f64 {
        let d = point - &self.center;
        d.dot(&(&self.shape * &d)) - self.level
    }

    /// `‖A x − b‖₂ − 1`; non-positive inside.
    pub fn dual_level(&self, point: &DVector<f64>) -> f64 {
        (&self.transform * point - &self.offset).norm() - 1.0
    }

    /// Membership through the dual form.
    pub fn contains_dual(&self, point: &DVector<f64>) -> bool {
        self.dual_level(point) <= CONTAINMENT_TOLERANCE
    }

    /// Membership through the canonical form.
    pub fn contains_canonical(&self, point: &DVector<f64>) -> bool {
        self.canonical_level(point) <= CONTAINMENT_TOLERANCE
    }

    /// Membership in `{x : ‖A x − b‖_p ≤ 1}` under the fitted norm degree.
    pub fn norm_ball_contains(&self, point: &DVector<f64>) -> bool {
        let r = &self.transform * point - &self.offset;
        self.norm_degree.norm(&r) <= 1.0 + CONTAINMENT_TOLERANCE
    }

    /// Point where the ray from c along `direction` meets the boundary.
    ///
    /// Returns `c + L⁻ᵀ u / ‖u‖`, which satisfies `(x − c)ᵀ Q (x − c) = 1`.
    pub fn boundary_point(&self, direction: &DVector<f64>) -> Result<DVector<f64>> {
        if direction.len() != self.dim() {
            return Err(ScenarioError::invalid(format!(
                "direction has dimension {}, ellipsoid has dimension {}",
                direction.len(),
                self.dim()
            )));
        }
        let norm = direction.norm();
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(ScenarioError::invalid("direction must be non-zero and finite"));
        }
        let unit = direction / norm;
        let offset = self
            .cholesky
            .transpose()
            .solve_upper_triangular(&unit)
            .ok_or_else(|| ScenarioError::degenerate("Cholesky factor is singular"))?;
        Ok(&self.center + offset)
    }

    /// `count` boundary points along uniformly random directions.
    pub fn sample_boundary<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<DVector<f64>>> {
        let n = self.dim();
        (0..count)
            .map(|_| {
                let mut direction = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));
                while direction.norm() == 0.0 {
                    direction = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));
                }
                self.boundary_point(&direction)
            })
            .collect()
    }

    /// Volume `π^{n/2} / Γ(n/2 + 1) · det(Q)^{−1/2}`.
    pub fn volume(&self) -> f64 {
        let n = self.dim() as f64;
        let unit_ball = std::f64::consts::PI.powf(n / 2.0) / gamma(n / 2.0 + 1.0);
        let log_det_l: f64 = self.cholesky.diagonal().iter().map(|v| v.ln()).sum();
        unit_ball * (-log_det_l).exp()
    }

    /// Closed polyline of the ellipse obtained by projecting onto the
    /// coordinates `(dim_x, dim_y)`, with `samples` points.
    pub fn outline(&self, dim_x: usize, dim_y: usize, samples: usize) -> Result<Vec<[f64; 2]>> {
        let n = self.dim();
        if dim_x >= n || dim_y >= n || dim_x == dim_y {
            return Err(ScenarioError::invalid(format!(
                "projection axes ({}, {}) invalid for dimension {}",
                dim_x, dim_y, n
            )));
        }
        if samples < 3 {
            return Err(ScenarioError::invalid("outline needs at least 3 samples"));
        }

        // The projection of {(x − c)ᵀQ(x − c) ≤ 1} has shape (Q⁻¹)_sub⁻¹.
        let covariance = Cholesky::new(self.shape.clone())
            .ok_or_else(|| ScenarioError::degenerate("Q is not positive definite"))?
            .inverse();
        let idx = [dim_x, dim_y];
        let sub = DMatrix::from_fn(2, 2, |i, j| covariance[(idx[i], idx[j])]);
        let factor = symmetric_cholesky(&sub)?.l();

        let (cx, cy) = (self.center[dim_x], self.center[dim_y]);
        Ok((0..samples)
            .map(|k| {
                let theta = 2.0 * std::f64::consts::PI * k as f64 / samples as f64;
                let (s, c) = theta.sin_cos();
                [
                    cx + factor[(0, 0)] * c,
                    cy + factor[(1, 0)] * c + factor[(1, 1)] * s,
                ]
            })
            .collect())
    }
}

/// Cholesky of the symmetrised matrix (M + Mᵀ)/2.
fn symmetric_cholesky(matrix: &DMatrix<f64>) -> Result<Cholesky<f64, Dyn>> {
    let symmetric = (matrix + matrix.transpose()) * 0.5;
    Cholesky::new(symmetric)
        .ok_or_else(|| ScenarioError::degenerate("(Q + Qᵀ)/2 is not positive definite"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn tilted() -> EllipsoidSet {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let b = DVector::from_vec(vec![1.0, -0.5]);
        EllipsoidSet::from_dual(a, b, NormDegree::L2).unwrap()
    }

    #[test]
    fn test_dual_to_canonical() {
        let e = tilted();
        let a = e.transform();
        assert!((e.shape() - a.transpose() * a).norm() < 1e-12);
        // For square invertible A the center solves A c = b.
        assert!((a * e.center() - e.offset()).norm() < 1e-12);
        assert_eq!(e.level(), 1.0);
    }

    #[test]
    fn test_forms_agree_on_boundary() {
        let e = tilted();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        for p in e.sample_boundary(&mut rng, 1000).unwrap() {
            assert!(e.canonical_level(&p).abs() < 1e-9);
            assert!(e.dual_level(&p).abs() < 1e-9);
        }
    }

    #[test]
    fn test_canonical_round_trip() {
        let e = tilted();
        let back = EllipsoidSet::from_canonical(e.shape().clone(), e.center().clone()).unwrap();
        assert!((back.shape() - e.shape()).norm() < 1e-10);
        assert!((back.center() - e.center()).norm() < 1e-10);
        let point = DVector::from_vec(vec![0.3, 0.1]);
        assert!((back.dual_level(&point) - e.dual_level(&point)).abs() < 1e-10);
    }

    #[test]
    fn test_unit_disc_volume_and_outline() {
        let e = EllipsoidSet::from_canonical(DMatrix::identity(2, 2), DVector::zeros(2)).unwrap();
        assert!((e.volume() - std::f64::consts::PI).abs() < 1e-12);

        let outline = e.outline(0, 1, 64).unwrap();
        assert_eq!(outline.len(), 64);
        for [x, y] in outline {
            assert!((x * x + y * y - 1.0).abs() < 1e-12);
        }
        assert!(e.outline(0, 0, 64).is_err());
    }

    #[test]
    fn test_projection_of_stretched_ellipsoid() {
        // Semi-axes 1, 2, 3: projecting onto (0, 2) keeps semi-axes 1 and 3.
        let q = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 0.25, 1.0 / 9.0]));
        let e = EllipsoidSet::from_canonical(q, DVector::zeros(3)).unwrap();
        let outline = e.outline(0, 2, 4).unwrap();
        assert!((outline[0][0] - 1.0).abs() < 1e-12);
        assert!((outline[1][1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_indefinite_shape_is_degenerate() {
        let q = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        assert!(matches!(
            EllipsoidSet::from_canonical(q, DVector::zeros(2)),
            Err(ScenarioError::NumericDegeneracy(_))
        ));
    }

    #[test]
    fn test_norm_ball_membership() {
        let e = EllipsoidSet::from_dual(DMatrix::identity(2, 2), DVector::zeros(2), NormDegree::Infinity)
            .unwrap();
        let corner = DVector::from_vec(vec![0.9, 0.9]);
        assert!(e.norm_ball_contains(&corner));
        assert!(!e.contains_dual(&corner));
    }
}
