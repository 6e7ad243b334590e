//! Tests for configuration validation.
//!
//! Invalid values are rejected by the builder methods with a panic naming
//! the offending option.

use scenario_reach::{Config, NormDegree, ScenarioCertifier};

// =============================================================================
// RISK LEVEL VALIDATION
// =============================================================================

#[test]
#[should_panic(expected = "risk_level must be in (0, 1)")]
fn risk_level_zero_panics() {
    let _ = ScenarioCertifier::new().risk_level(0.0);
}

#[test]
#[should_panic(expected = "risk_level must be in (0, 1)")]
fn risk_level_one_panics() {
    let _ = ScenarioCertifier::new().risk_level(1.0);
}

#[test]
#[should_panic(expected = "risk_level must be in (0, 1)")]
fn risk_level_nan_panics() {
    let _ = Config::new().risk_level(f64::NAN);
}

#[test]
fn risk_level_extreme_tail_valid() {
    let certifier = ScenarioCertifier::new().risk_level(1e-12);
    assert_eq!(certifier.config().risk_level, 1e-12);
}

// =============================================================================
// NORM DEGREE VALIDATION
// =============================================================================

#[test]
#[should_panic(expected = "norm degree must be >= 1")]
fn norm_degree_below_one_panics() {
    let _ = ScenarioCertifier::new().norm_degree(0.5);
}

#[test]
fn norm_degree_infinity_valid() {
    let certifier = ScenarioCertifier::new().norm_degree(f64::INFINITY);
    assert_eq!(certifier.config().norm_degree, NormDegree::Infinity);
}

// =============================================================================
// ZONOTOPE OPTIONS VALIDATION
// =============================================================================

#[test]
#[should_panic(expected = "num_generators must be positive")]
fn num_generators_zero_panics() {
    let _ = ScenarioCertifier::new().num_generators(0);
}

#[test]
#[should_panic(expected = "active_set_size must be positive")]
fn active_set_size_zero_panics() {
    let _ = ScenarioCertifier::new().active_set_size(0);
}

#[test]
#[should_panic(expected = "max_attempts must be positive")]
fn max_attempts_zero_panics() {
    let _ = ScenarioCertifier::new().max_attempts(0);
}

#[test]
#[should_panic(expected = "perturbation_scale must be positive and finite")]
fn perturbation_scale_infinite_panics() {
    let _ = Config::new().perturbation_scale(f64::INFINITY);
}

#[test]
#[should_panic(expected = "volume_regularizer must be non-negative")]
fn volume_regularizer_negative_panics() {
    let _ = Config::new().volume_regularizer(-1e-5);
}

#[test]
fn failures_before_reinit_zero_valid() {
    // Zero means every failure reinitialises.
    let config = Config::new().failures_before_reinit(0);
    assert_eq!(config.zonotope_config().failures_before_reinit, 0);
}

// =============================================================================
// PRESETS
// =============================================================================

#[test]
fn presets_validate() {
    assert!(Config::quick().validate().is_ok());
    assert!(Config::thorough().validate().is_ok());
    assert!(ScenarioCertifier::quick().config().validate().is_ok());
}
