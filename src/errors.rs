//! Error types returned by the driver and by the methods.
use thiserror::Error;

/// Errors that abort a minimization run before a result can be produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("optimize: initial point has zero dimension")]
    ZeroDimensional,

    #[error("optimize: method needs a gradient but the function does not provide one")]
    MissingGradient,

    #[error("optimize: method needs a Hessian but the function does not provide one")]
    MissingHessian,

    /// Warm start data that does not match the point or the method.
    #[error("optimize: invalid initial data: {0}")]
    InitialData(String),

    #[error("optimize: function evaluated to {0}")]
    NonFiniteValue(f64),

    #[error("optimize: gradient element {index} evaluated to {value}")]
    NonFiniteGradient { index: usize, value: f64 },

    #[error("optimize: Hessian element ({row}, {col}) evaluated to {value}")]
    NonFiniteHessian { row: usize, col: usize, value: f64 },

    #[error("optimize: gradient has length {found}, expected {expected}")]
    GradientDimension { expected: usize, found: usize },

    #[error("optimize: Hessian has shape {found:?}, expected {expected:?}")]
    HessianDimension {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// Algorithmic failures. The run stops with `Status::Failure` and keeps the best location
/// found so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MethodError {
    /// The step is so small that the next point equals the current one in floating point.
    #[error("linesearch: no change in location after linesearch step")]
    NoProgress,

    #[error("linesearch: initial direction is not a descent direction")]
    NonDescentDirection,

    /// The linesearcher could not satisfy its acceptance condition.
    #[error("linesearch: failed to converge")]
    LinesearcherFailure,
}
