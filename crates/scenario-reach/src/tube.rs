//! Miss accumulation over a reachable tube.
//!
//! A tube is a sequence of per-time-step sets. A trajectory is a point set
//! whose i-th point is the state at step i. Each state outside its step's
//! set counts as one miss; the accumulated count then goes through a single
//! binomial tail call.

use nalgebra::DVector;

use scenario_core::{MembershipOracle, PointSet, Result, ScenarioError};

use crate::coverage::{outside_indices, CoverageEvaluator, CoverageReport};

/// Accumulates misses of test states against per-step sets.
#[derive(Debug, Clone)]
pub struct TubeAccumulator<O> {
    sets: Vec<O>,
    step_misses: Vec<u64>,
    trajectories: u64,
    outside: Vec<DVector<f64>>,
    evaluator: CoverageEvaluator,
}

impl<O: MembershipOracle + Sync> TubeAccumulator<O> {
    /// Accumulator over `sets`, one per time step.
    pub fn new(sets: Vec<O>, evaluator: CoverageEvaluator) -> Result<Self> {
        if sets.is_empty() {
            return Err(ScenarioError::InvalidInput("tube has no time steps".to_string()));
        }
        let steps = sets.len();
        Ok(Self {
            sets,
            step_misses: vec![0; steps],
            trajectories: 0,
            outside: Vec::new(),
            evaluator,
        })
    }

    /// Number of time steps.
    pub fn num_steps(&self) -> usize {
        self.sets.len()
    }

    /// Misses per time step so far.
    pub fn step_misses(&self) -> &[u64] {
        &self.step_misses
    }

    /// Total misses so far.
    pub fn misses(&self) -> u64 {
        self.step_misses.iter().sum()
    }

    /// Trajectories added through [`add_trajectory`](Self::add_trajectory).
    pub fn trajectories(&self) -> u64 {
        self.trajectories
    }

    /// Count the states of many trajectories at one time step.
    ///
    /// Returns the misses added.
    pub fn add_time_step(&mut self, step: usize, states: &PointSet) -> Result<u64> {
        let set = self.sets.get(step).ok_or_else(|| {
            ScenarioError::InvalidInput(format!(
                "time step {} out of range for a tube of {} steps",
                step,
                self.sets.len()
            ))
        })?;
        let outside = outside_indices(states, set)?;
        if self.evaluator.records_outside() {
            self.outside
                .extend(outside.iter().map(|&i| states.point(i).clone()));
        }
        let added = outside.len() as u64;
        self.step_misses[step] += added;
        Ok(added)
    }

    /// Count one trajectory, state i against set i.
    ///
    /// Returns the misses added. A rejected trajectory leaves the counts
    /// untouched.
    pub fn add_trajectory(&mut self, trajectory: &PointSet) -> Result<u64> {
        self.check_trajectory(trajectory)?;
        Ok(self.count_trajectory(trajectory))
    }

    /// Count a batch of trajectories.
    ///
    /// Every trajectory is checked before any is counted, so a rejected
    /// batch leaves the counts untouched. Returns the misses added.
    pub fn add_batch(&mut self, trajectories: &[PointSet]) -> Result<u64> {
        for (i, trajectory) in trajectories.iter().enumerate() {
            self.check_trajectory(trajectory).map_err(|e| match e {
                ScenarioError::InvalidInput(msg) => {
                    ScenarioError::InvalidInput(format!("trajectory {}: {}", i, msg))
                }
                other => other,
            })?;
        }
        Ok(trajectories
            .iter()
            .map(|trajectory| self.count_trajectory(trajectory))
            .sum())
    }

    fn check_trajectory(&self, trajectory: &PointSet) -> Result<()> {
        if trajectory.len() != self.sets.len() {
            return Err(ScenarioError::InvalidInput(format!(
                "trajectory has {} states, tube has {} steps",
                trajectory.len(),
                self.sets.len()
            )));
        }
        for (step, set) in self.sets.iter().enumerate() {
            if set.dimension() != trajectory.dim() {
                return Err(ScenarioError::InvalidInput(format!(
                    "step {} set has dimension {}, states have dimension {}",
                    step,
                    set.dimension(),
                    trajectory.dim()
                )));
            }
        }
        Ok(())
    }

    fn count_trajectory(&mut self, trajectory: &PointSet) -> u64 {
        let mut added = 0;
        for (step, (state, set)) in trajectory.iter().zip(&self.sets).enumerate() {
            if !set.contains(state) {
                self.step_misses[step] += 1;
                added += 1;
                if self.evaluator.records_outside() {
                    self.outside.push(state.clone());
                }
            }
        }
        self.trajectories += 1;
        added
    }

    /// Bound the accumulated misses over `num_samples` samples.
    pub fn finish(self, num_samples: u64) -> Result<CoverageReport> {
        let misses = self.misses();
        let conservative = self.sets.iter().any(|set| !set.is_exact());
        let mut report = self.evaluator.report(misses, num_samples, self.outside)?;
        report.conservative = conservative;
        Ok(report)
    }
}
