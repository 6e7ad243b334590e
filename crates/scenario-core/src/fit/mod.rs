//! Minimum-volume set fitting.
//!
//! - [`EllipsoidFitter`]: convex, maximises log det A over the dual form.
//! - [`ZonotopeFitter`]: non-convex, two stages with a bounded retry policy.

pub mod ellipsoid;
pub mod zonotope;

pub use ellipsoid::{EllipsoidConfig, EllipsoidFit, EllipsoidFitter};
pub use zonotope::{structural_directions, ZonotopeConfig, ZonotopeFit, ZonotopeFitter};
