//! Numeric core for scenario-based reachable-set certification.
//!
//! This crate provides the algorithms behind `scenario-reach`:
//!
//! - Binomial tail inversion turning an observed miss count into a
//!   probabilistic accuracy bound ([`binomial`])
//! - Minimum-volume ellipsoid fitting under a p-norm ball parametrisation
//!   ([`fit::ellipsoid`]), solved with a log-barrier interior-point method
//! - Two-stage zonotope fitting with a bounded perturb/reinitialise retry
//!   policy ([`fit::zonotope`])
//! - Set representations and membership tests ([`sets`], [`membership`])
//!
//! Nothing in here logs or touches I/O. Solvers report what happened through
//! [`SolverOutcome`] and attempt histories, and the caller decides what to
//! surface.
//!
//! ```ignore
//! use scenario_core::{binomial::BinomialTailSolver, fit::EllipsoidFitter, PointSet};
//!
//! let fit = EllipsoidFitter::default().fit(&training)?;
//! let misses = test.iter().filter(|p| !fit.set.contains_dual(p)).count() as u64;
//! let bound = BinomialTailSolver::default().solve(misses, test.len() as u64)?;
//! ```

pub mod binomial;
pub mod constants;
pub mod error;
pub mod fit;
pub mod membership;
pub mod optimize;
pub mod result;
pub mod sets;
pub mod types;

pub use binomial::{binomial_tail, BinomialTailSolver, CdfFormulation, TailBound};
pub use error::{Result, ScenarioError};
pub use fit::{EllipsoidConfig, EllipsoidFit, EllipsoidFitter, ZonotopeConfig, ZonotopeFit, ZonotopeFitter};
pub use membership::MembershipOracle;
pub use result::{
    AttemptRecord, CoverageStatistic, FitStage, RetryState, SolveStatus, SolverExit, SolverOutcome,
};
pub use sets::{EllipsoidSet, ZonotopeSet};
pub use types::{NormDegree, PointSet};
