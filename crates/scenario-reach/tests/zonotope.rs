//! Zonotope fitting and geometry.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

use scenario_reach::{
    FitStage, MembershipOracle, PointSet, RetryState, ScenarioCertifier, ZonotopeSet,
};

fn correlated_cloud(count: usize, seed: u64) -> PointSet {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let rows: Vec<[f64; 2]> = (0..count)
        .map(|_| {
            let a: f64 = StandardNormal.sample(&mut rng);
            let b: f64 = StandardNormal.sample(&mut rng);
            [a + 0.3 * b, 0.4 * b]
        })
        .collect();
    PointSet::from_rows(&rows).unwrap()
}

fn certifier() -> ScenarioCertifier {
    ScenarioCertifier::quick().active_set_size(60)
}

// =============================================================================
// FITTING
// =============================================================================

#[test]
fn fitted_zonotope_certifies_training_points() {
    let points = correlated_cloud(200, 21);
    let fit = certifier().fit_zonotope(&points, None).unwrap();
    assert!(fit.status.is_usable());
    assert_eq!(fit.set.num_generators(), 4);
    assert_eq!(fit.set.count_outside(&points), 0);
    assert!(fit.set.volume() > 0.0);
}

#[test]
fn attempts_cover_both_stages_in_order() {
    let points = correlated_cloud(120, 22);
    let fit = certifier().fit_zonotope(&points, None).unwrap();

    let first_full = fit
        .attempts
        .iter()
        .position(|a| a.stage == FitStage::FullGenerators)
        .unwrap();
    assert!(first_full > 0);
    assert!(fit.attempts[..first_full]
        .iter()
        .all(|a| a.stage == FitStage::DiagonalWarmStart));
    assert_eq!(fit.attempts[first_full - 1].next, RetryState::Succeeded);
    assert_eq!(fit.attempts.last().unwrap().next, RetryState::Succeeded);
    assert_eq!(
        fit.iterations,
        fit.attempts.iter().map(|a| a.iterations).sum::<usize>()
    );
}

#[test]
fn same_seed_gives_same_zonotope() {
    let points = correlated_cloud(150, 23);
    let first = certifier().seed(5).fit_zonotope(&points, None).unwrap();
    let second = certifier().seed(5).fit_zonotope(&points, None).unwrap();
    assert_eq!(first.set.generators(), second.set.generators());
    assert_eq!(first.attempts, second.attempts);
}

#[test]
fn explicit_center_is_kept() {
    let points = correlated_cloud(100, 24);
    let center = DVector::from_vec(vec![0.1, -0.05]);
    let fit = certifier().fit_zonotope(&points, Some(&center)).unwrap();
    assert_eq!(fit.set.center(), &center);
    assert_eq!(fit.set.count_outside(&points), 0);
}

#[test]
fn fewer_generators_than_dimension_rejected() {
    let points = correlated_cloud(50, 25);
    assert!(ScenarioCertifier::new()
        .num_generators(1)
        .fit_zonotope(&points, None)
        .is_err());
}

// =============================================================================
// GEOMETRY
// =============================================================================

#[test]
fn vertex_candidates_enumerate_all_sign_patterns() {
    let generators = DMatrix::from_row_slice(
        4,
        2,
        &[1.0, 0.0, 0.0, 1.0, 0.5, 0.5, 0.5, -0.5],
    );
    let set = ZonotopeSet::new(DVector::zeros(2), generators).unwrap();
    let candidates = set.vertex_candidates().unwrap();
    assert_eq!(candidates.len(), 16);

    // Every candidate is inside the zonotope, so the hull of the candidates
    // is the zonotope itself.
    let hull = set.projection_hull(0, 1).unwrap();
    assert_eq!(hull.len(), 8);
    let max_x = candidates.iter().map(|v| v[0]).fold(f64::MIN, f64::max);
    assert!((max_x - 2.0).abs() < 1e-12);
}

#[test]
fn certified_membership_is_sound() {
    let generators = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    let set = ZonotopeSet::new(DVector::zeros(2), generators).unwrap();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(26);
    for _ in 0..500 {
        let x = DVector::from_fn(2, |_, _| {
            let z: f64 = StandardNormal.sample(&mut rng);
            2.0 * z
        });
        if set.contains_certified(&x) {
            // A certified point lies in the box spanned by |Gᵀ| row sums.
            assert!(x[0].abs() <= 2.0 + 1e-8 && x[1].abs() <= 2.0 + 1e-8);
        }
    }
}
