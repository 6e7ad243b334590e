//! # scenario-reach
//!
//! Scenario-based reachable-set certification.
//!
//! Given sampled states of a dynamical or stochastic process, this crate fits
//! the tightest enclosing ellipsoid or zonotope and certifies it against a
//! held-out sample: "with confidence 1 − δ, at most ε of future samples fall
//! outside this set".
//!
//! The flow is:
//!
//! 1. Fit a set to training points ([`ScenarioCertifier::fit_ellipsoid`],
//!    [`ScenarioCertifier::fit_zonotope`]).
//! 2. Count how many held-out points fall outside ([`CoverageEvaluator`]).
//! 3. Turn the miss count into an accuracy bound ε with a binomial tail
//!    inversion at risk level δ (default 1e-9).
//!
//! ## Quick Start
//!
//! ```ignore
//! use scenario_reach::{PointSet, ScenarioCertifier};
//!
//! let training = PointSet::from_rows(&training_rows)?;
//! let test = PointSet::from_rows(&test_rows)?;
//!
//! let certificate = ScenarioCertifier::new()
//!     .risk_level(1e-9)
//!     .certify_ellipsoid(&training, &test)?;
//!
//! println!("{}", scenario_reach::output::format_report(&certificate.coverage));
//! ```
//!
//! ## Reachable tubes
//!
//! When each time step has its own fitted set, a [`TubeAccumulator`] counts
//! misses step by step across one trajectory or a batch of trajectories
//! before the single binomial-tail call.
//!
//! ## Features
//!
//! - `parallel`: classify held-out points with rayon.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod certifier;
mod config;
mod coverage;
mod tube;

pub mod output;

pub use certifier::{Certificate, ScenarioCertifier};
pub use config::Config;
pub use coverage::{CoverageEvaluator, CoverageReport};
pub use tube::TubeAccumulator;

pub use scenario_core::{
    binomial_tail, AttemptRecord, BinomialTailSolver, CoverageStatistic, EllipsoidFit,
    EllipsoidSet, FitStage, MembershipOracle, NormDegree, PointSet, Result, RetryState,
    ScenarioError, SolveStatus, SolverExit, TailBound, ZonotopeFit, ZonotopeSet,
};
