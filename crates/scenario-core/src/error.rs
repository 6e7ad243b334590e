//! Error types for fitting and certification.

/// Error returned by fitting, membership, and tail-bound operations.
///
/// Numerical outcomes that are usable but imprecise are *not* errors: they are
/// reported through [`SolveStatus::OptimalInaccurate`](crate::SolveStatus)
/// on the returned value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    /// Mismatched dimensions, empty or non-finite data, or invalid counts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A solver stopped without reaching its optimality criterion after
    /// exhausting the configured attempts.
    #[error("optimization failed during {stage}: {message}")]
    OptimizationFailure {
        /// Which solve failed (e.g. "binomial tail", "zonotope stage 2").
        stage: String,
        /// Diagnostic message from the solver.
        message: String,
    },

    /// A fitted matrix violates its positivity or rank invariant.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),
}

impl ScenarioError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn optimization(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OptimizationFailure {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        Self::NumericDegeneracy(message.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ScenarioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ScenarioError::invalid("dimension mismatch");
        assert_eq!(err.to_string(), "invalid input: dimension mismatch");

        let err = ScenarioError::optimization("binomial tail", "cdf was NaN");
        assert_eq!(
            err.to_string(),
            "optimization failed during binomial tail: cdf was NaN"
        );

        let err = ScenarioError::degenerate("Q is not positive definite");
        assert!(err.to_string().starts_with("numeric degeneracy"));
    }
}
