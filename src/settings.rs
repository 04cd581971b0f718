//! Convergence criteria, limits and warm start data for a run of `local`.
use crate::minimizer::Status;
use ndarray::prelude::*;
use std::time::Duration;

pub(crate) const DEFAULT_GRADIENT_THRESHOLD: f64 = 1e-12;

/// Function value convergence. The run stops with `Status::FunctionConvergence` when the best
/// function value has not improved by more than `absolute + relative * |f|` over `iterations`
/// consecutive major iterations.
///
/// The driver only applies this criterion to methods that do not need a gradient. Gradient based
/// methods stop through the gradient threshold instead.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(default)]
pub struct FunctionConverge {
    pub absolute: f64,
    pub relative: f64,
    /// Zero disables the check.
    pub iterations: usize,

    #[builder(setter(skip))]
    best: f64,
    #[builder(setter(skip))]
    iter: usize,
}

impl Default for FunctionConverge {
    fn default() -> Self {
        FunctionConverge {
            absolute: 1e-10,
            relative: 0.0,
            iterations: 20,
            best: f64::INFINITY,
            iter: 0,
        }
    }
}

impl FunctionConverge {
    pub(crate) fn init(&mut self, f: f64) {
        self.best = f;
        self.iter = 0;
    }

    pub(crate) fn converged(&mut self, f: f64) -> Option<Status> {
        if self.iterations == 0 {
            return None;
        }
        let max_abs = f.abs().max(self.best.abs());
        if f < self.best && self.best - f > self.relative * max_abs + self.absolute {
            self.best = f;
            self.iter = 0;
            return None;
        }
        self.iter += 1;
        if self.iter < self.iterations {
            None
        } else {
            Some(Status::FunctionConvergence)
        }
    }
}

/// Settings of a minimization run. Zero limits mean no limit.
///
/// ```
/// # extern crate unconstrained;
/// # use unconstrained::SettingsBuilder;
/// let settings = SettingsBuilder::default()
///     .gradient_threshold(1e-8)
///     .major_iterations(500usize)
///     .build()
///     .unwrap();
/// assert_eq!(settings.major_iterations, 500);
/// ```
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(default)]
pub struct Settings {
    /// Use `initial_value`, `initial_gradient` and `initial_hessian` instead of evaluating the
    /// function at the starting point.
    pub use_initial_data: bool,
    pub initial_value: f64,
    /// Required with `use_initial_data` iff the method needs a gradient.
    #[builder(setter(into))]
    pub initial_gradient: Option<Array1<f64>>,
    /// Required with `use_initial_data` iff the method needs a Hessian.
    #[builder(setter(into))]
    pub initial_hessian: Option<Array2<f64>>,

    /// Stop when the function value drops below this value.
    pub function_threshold: f64,
    /// Stop when the infinity norm of the gradient drops below this value. Zero selects 1e-12.
    pub gradient_threshold: f64,
    #[builder(setter(into))]
    pub function_converge: Option<FunctionConverge>,

    /// Maximum number of accepted iterates.
    pub major_iterations: usize,
    /// Maximum number of calls to `Method::iterate`, including line search trials.
    pub iterations: usize,
    pub func_evaluations: usize,
    pub grad_evaluations: usize,
    pub hess_evaluations: usize,
    /// Wall-clock limit on the run.
    #[builder(setter(into))]
    pub runtime: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            use_initial_data: false,
            initial_value: 0.0,
            initial_gradient: None,
            initial_hessian: None,
            function_threshold: f64::NEG_INFINITY,
            gradient_threshold: DEFAULT_GRADIENT_THRESHOLD,
            function_converge: Some(FunctionConverge::default()),
            major_iterations: 0,
            iterations: 0,
            func_evaluations: 0,
            grad_evaluations: 0,
            hess_evaluations: 0,
            runtime: None,
        }
    }
}

impl Settings {
    pub(crate) fn gradient_threshold(&self) -> f64 {
        if self.gradient_threshold == 0.0 {
            DEFAULT_GRADIENT_THRESHOLD
        } else {
            self.gradient_threshold
        }
    }
}
