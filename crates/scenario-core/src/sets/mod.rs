//! Fitted set representations.
//!
//! Both sets are immutable once built: every constructor validates the
//! positivity and rank invariants and precomputes the factorisations that
//! membership tests need.

pub mod ellipsoid;
pub mod zonotope;

pub use ellipsoid::EllipsoidSet;
pub use zonotope::ZonotopeSet;

/// Slack allowed on the unit level set in membership tests.
pub const CONTAINMENT_TOLERANCE: f64 = 1e-9;
