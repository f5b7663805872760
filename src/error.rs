//! Error types for the proximal solvers

use thiserror::Error;

/// Error raised by a user-supplied gradient or proximal strategy.
pub type StrategyError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for solver calls.
pub type Result<T> = std::result::Result<T, ApgError>;

/// Conditions under which [`apg`](crate::prox::apg) gives up.
///
/// Running out of iterations is not an error, see
/// [`Termination`](crate::prox::Termination).
#[derive(Debug, Error)]
pub enum ApgError {
    /// A tuning parameter is outside its admissible range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },

    /// A strategy returned a matrix whose shape differs from the iterate.
    #[error("{} returned a {}x{} matrix, expected {}x{}", .stage, .found.0, .found.1, .expected.0, .expected.1)]
    ShapeMismatch {
        stage: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A strategy returned NaN or infinite entries.
    #[error("{stage} returned non-finite values at iteration {iteration}")]
    NonFinite {
        stage: &'static str,
        iteration: usize,
    },

    /// The step size is no longer positive and finite.
    #[error("step size degenerated at iteration {iteration}")]
    DegenerateStep { iteration: usize },

    /// The gradient strategy failed.
    #[error("gradient evaluation failed")]
    Gradient(#[source] StrategyError),

    /// The proximal strategy failed.
    #[error("proximal evaluation failed")]
    Prox(#[source] StrategyError),
}
