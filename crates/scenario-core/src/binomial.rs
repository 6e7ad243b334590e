//! Binomial tail inversion for scenario-based accuracy bounds.
//!
//! Given `k` misses out of `n` held-out samples, the accuracy level ε is the
//! largest miss probability p that still makes observing at most `k` misses
//! plausible at the extreme-tail risk level δ:
//!
//! ```text
//! ε = sup { p : P(Binomial(n, p) ≤ k) ≥ δ }
//! ```
//!
//! With confidence 1 − δ, the true probability that a future sample falls
//! outside the fitted set is at most ε.
//!
//! The constraint CDF(k; n, p) ≥ δ is decreasing in p, so the optimum sits on
//! the constraint boundary. The search is seeded at the maximum-likelihood
//! estimate p₀ = k/n, brackets the boundary on the side the constraint sign
//! points to, and bisects while always keeping a feasible end.
//!
//! Two CDF formulations are available. The primary one evaluates the
//! regularised incomplete beta function; the fallback sums the probability
//! mass function term by term and skips terms that underflow to NaN.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, Discrete, DiscreteCDF};

use crate::constants::{
    DEFAULT_RISK_LEVEL, DEFAULT_TAIL_MAX_ITERATIONS, DEFAULT_TAIL_TOLERANCE,
    TAIL_INACCURATE_TOLERANCE,
};
use crate::error::{Result, ScenarioError};
use crate::result::{CoverageStatistic, SolveStatus, SolverExit, SolverOutcome};

/// Which CDF evaluation produced a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CdfFormulation {
    /// Regularised incomplete beta function.
    IncompleteBeta,
    /// Term-by-term PMF summation skipping NaN terms.
    PmfSum,
}

/// A probabilistic accuracy bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailBound {
    /// Upper bound on the probability of a future miss.
    pub epsilon: f64,
    /// Solver status of the boundary search.
    pub status: SolveStatus,
    /// Bisection steps used.
    pub iterations: usize,
    /// CDF formulation that produced the bound.
    pub formulation: CdfFormulation,
    /// Risk level δ the bound holds at.
    pub risk_level: f64,
}

impl TailBound {
    /// Confidence 1 − δ attached to the bound.
    pub fn confidence(&self) -> f64 {
        1.0 - self.risk_level
    }
}

/// Inverts the binomial CDF at a configurable risk level.
#[derive(Debug, Clone)]
pub struct BinomialTailSolver {
    /// Extreme-tail risk level δ (default 1e-9).
    pub risk_level: f64,
    /// Maximum bisection steps per formulation.
    pub max_iterations: usize,
    /// Bracket width at which the search stops.
    pub tolerance: f64,
}

impl Default for BinomialTailSolver {
    fn default() -> Self {
        Self {
            risk_level: DEFAULT_RISK_LEVEL,
            max_iterations: DEFAULT_TAIL_MAX_ITERATIONS,
            tolerance: DEFAULT_TAIL_TOLERANCE,
        }
    }
}

impl BinomialTailSolver {
    /// Solver with the default δ = 1e-9.
    pub fn new() -> Self {
        Self::default()
    }

    /// Solver at a custom risk level.
    pub fn with_risk_level(risk_level: f64) -> Self {
        Self {
            risk_level,
            ..Self::default()
        }
    }

    /// Compute the accuracy bound for `misses` out of `num_samples`.
    ///
    /// Retries once with the PMF-sum formulation if the incomplete-beta
    /// search fails; if both fail the error carries the fallback diagnostic.
    pub fn solve(&self, misses: u64, num_samples: u64) -> Result<TailBound> {
        let statistic = CoverageStatistic::new(misses, num_samples)?;
        self.solve_statistic(&statistic)
    }

    /// Compute the accuracy bound for a validated coverage statistic.
    pub fn solve_statistic(&self, statistic: &CoverageStatistic) -> Result<TailBound> {
        if !(self.risk_level > 0.0 && self.risk_level < 1.0) {
            return Err(ScenarioError::invalid(format!(
                "risk level must be in (0, 1), got {}",
                self.risk_level
            )));
        }
        let (k, n) = (statistic.misses(), statistic.num_samples());

        // Every sample missed: no p < 1 is excluded.
        if k == n {
            return Ok(TailBound {
                epsilon: 1.0,
                status: SolveStatus::Optimal,
                iterations: 0,
                formulation: CdfFormulation::IncompleteBeta,
                risk_level: self.risk_level,
            });
        }

        self.with_fallback(|formulation| self.invert(k, n, formulation))
    }

    /// Run `search` with the incomplete beta, then with the PMF sum if the
    /// first search is not usable.
    fn with_fallback<F>(&self, mut search: F) -> Result<TailBound>
    where
        F: FnMut(CdfFormulation) -> SolverOutcome<f64>,
    {
        let primary = search(CdfFormulation::IncompleteBeta);
        if primary.status.is_usable() {
            return Ok(self.bound_from(primary, CdfFormulation::IncompleteBeta));
        }

        let fallback = search(CdfFormulation::PmfSum);
        if fallback.status.is_usable() {
            return Ok(self.bound_from(fallback, CdfFormulation::PmfSum));
        }

        Err(ScenarioError::optimization(
            "binomial tail",
            format!(
                "incomplete beta: {}; pmf sum: {}",
                primary.message, fallback.message
            ),
        ))
    }

    fn bound_from(&self, outcome: SolverOutcome<f64>, formulation: CdfFormulation) -> TailBound {
        TailBound {
            epsilon: outcome.solution.clamp(0.0, 1.0),
            status: outcome.status,
            iterations: outcome.iterations,
            formulation,
            risk_level: self.risk_level,
        }
    }

    /// Boundary search for sup { p : CDF(k; n, p) − δ ≥ 0 }, seeded at k/n.
    pub(crate) fn invert(&self, k: u64, n: u64, formulation: CdfFormulation) -> SolverOutcome<f64> {
        let constraint = |p: f64| binomial_cdf(formulation, k, n, p) - self.risk_level;
        let seed = k as f64 / n as f64;

        let at_seed = constraint(seed);
        if !at_seed.is_finite() {
            return failed(
                seed,
                0,
                SolverExit::NonFinite,
                format!("cdf is not finite at seed p = {}", seed),
            );
        }

        // `lo` stays feasible, `hi` stays infeasible. CDF(k; n, 0) = 1 and
        // CDF(k; n, 1) = 0 for k < n, so both bracket ends are valid.
        let (mut lo, mut hi) = if at_seed >= 0.0 { (seed, 1.0) } else { (0.0, seed) };

        for iteration in 0..self.max_iterations {
            if hi - lo <= self.tolerance {
                return solved(lo, iteration, SolveStatus::Optimal, SolverExit::Converged);
            }
            let mid = 0.5 * (lo + hi);
            let value = constraint(mid);
            if !value.is_finite() {
                return failed(
                    lo,
                    iteration,
                    SolverExit::NonFinite,
                    format!("cdf is not finite at p = {}", mid),
                );
            }
            if value >= 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let width = hi - lo;
        if width <= self.tolerance {
            solved(lo, self.max_iterations, SolveStatus::Optimal, SolverExit::Converged)
        } else if width <= TAIL_INACCURATE_TOLERANCE {
            solved(
                lo,
                self.max_iterations,
                SolveStatus::OptimalInaccurate,
                SolverExit::MaxIterations,
            )
        } else {
            failed(
                lo,
                self.max_iterations,
                SolverExit::MaxIterations,
                format!("bracket width {:.3e} after iteration limit", width),
            )
        }
    }
}

fn solved(p: f64, iterations: usize, status: SolveStatus, exit: SolverExit) -> SolverOutcome<f64> {
    SolverOutcome {
        status,
        solution: p,
        objective: -p,
        iterations,
        exit,
        message: exit.to_string(),
    }
}

fn failed(p: f64, iterations: usize, exit: SolverExit, message: String) -> SolverOutcome<f64> {
    SolverOutcome {
        status: SolveStatus::Failed,
        solution: p,
        objective: -p,
        iterations,
        exit,
        message,
    }
}

/// P(Binomial(n, p) ≤ k) under the chosen formulation; NaN if p is invalid.
pub fn binomial_cdf(formulation: CdfFormulation, k: u64, n: u64, p: f64) -> f64 {
    let dist = match Binomial::new(p, n) {
        Ok(d) => d,
        Err(_) => return f64::NAN,
    };
    match formulation {
        CdfFormulation::IncompleteBeta => dist.cdf(k),
        CdfFormulation::PmfSum => sum_pmf_terms((0..=k.min(n)).map(|j| dist.pmf(j))),
    }
}

/// Sum of PMF terms, skipping NaN terms, capped at 1.
fn sum_pmf_terms(terms: impl Iterator<Item = f64>) -> f64 {
    let sum: f64 = terms.filter(|term| !term.is_nan()).sum();
    sum.min(1.0)
}

/// Accuracy bound ε for `misses` out of `num_samples` at δ = 1e-9.
pub fn binomial_tail(misses: u64, num_samples: u64) -> Result<f64> {
    BinomialTailSolver::default()
        .solve(misses, num_samples)
        .map(|bound| bound.epsilon)
}
