//! This module provides the base framework for all minimizers present in this crate, such as the
//! `Method` trait that every algorithm implements, the evaluated `Location` passed between the
//! driver and a method, and the returned `OptimResult`.
use crate::errors::MethodError;
use ndarray::prelude::*;
use std::fmt;
use std::time::Duration;

/// Minimizer states at the end of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Minimizer finished successfully without a more specific reason.
    Success,
    /// The infinity norm of the gradient dropped below `Settings::gradient_threshold`.
    GradientThreshold,
    /// The function value dropped below `Settings::function_threshold`.
    FunctionThreshold,
    /// The function value did not decrease enough over the configured number of iterations.
    FunctionConvergence,
    /// The limit on major or total iterations was reached.
    IterationLimit,
    /// The limit on function, gradient or Hessian evaluations was reached.
    EvaluationLimit,
    /// The wall-clock limit was reached.
    RuntimeLimit,
    /// The method could not make further progress. See `OptimResult::cause`.
    Failure,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Status::Success => "Success",
            Status::GradientThreshold => "GradientThreshold",
            Status::FunctionThreshold => "FunctionThreshold",
            Status::FunctionConvergence => "FunctionConvergence",
            Status::IterationLimit => "IterationLimit",
            Status::EvaluationLimit => "EvaluationLimit",
            Status::RuntimeLimit => "RuntimeLimit",
            Status::Failure => "Failure",
        };
        f.write_str(s)
    }
}

/// The derivatives a method requires from the objective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Needs {
    pub gradient: bool,
    pub hessian: bool,
}

/// A set of quantities to evaluate at `Location::x`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub func: bool,
    pub grad: bool,
    pub hess: bool,
}

impl Evaluation {
    pub const NONE: Evaluation = Evaluation { func: false, grad: false, hess: false };
    pub const FUNC: Evaluation = Evaluation { func: true, grad: false, hess: false };
    pub const GRAD: Evaluation = Evaluation { func: false, grad: true, hess: false };
    pub const FUNC_GRAD: Evaluation = Evaluation { func: true, grad: true, hess: false };

    /// Everything a method with the given needs expects to find in a complete location.
    pub fn complete(needs: Needs) -> Evaluation {
        Evaluation {
            func: true,
            grad: needs.gradient,
            hess: needs.hessian,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.func || self.grad || self.hess)
    }

    pub fn union(self, other: Evaluation) -> Evaluation {
        Evaluation {
            func: self.func || other.func,
            grad: self.grad || other.grad,
            hess: self.hess || other.hess,
        }
    }

    /// The members of `self` that are missing from `done`.
    pub fn difference(self, done: Evaluation) -> Evaluation {
        Evaluation {
            func: self.func && !done.func,
            grad: self.grad && !done.grad,
            hess: self.hess && !done.hess,
        }
    }
}

/// What a method asks the driver to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Evaluate the requested quantities at `Location::x`.
    Evaluate(Evaluation),
    /// `Location` holds a complete new iterate. The driver records it and checks convergence.
    MajorIteration,
}

/// An evaluated point.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub x: Array1<f64>,
    pub f: f64,
    /// Present iff the method needs a gradient.
    pub gradient: Option<Array1<f64>>,
    /// Present iff the method needs a Hessian.
    pub hessian: Option<Array2<f64>>,
}

impl Location {
    /// Allocates a location at `x` with storage for the quantities in `needs`.
    /// The function value is NaN until evaluated.
    pub fn new(x: ArrayView1<f64>, needs: Needs) -> Self {
        let n = x.len();
        Location {
            x: x.to_owned(),
            f: f64::NAN,
            gradient: if needs.gradient { Some(Array1::from_elem(n, f64::NAN)) } else { None },
            hessian: if needs.hessian { Some(Array2::from_elem((n, n), f64::NAN)) } else { None },
        }
    }

    /// Copies every field of `other` into `self`, reusing the allocations.
    pub fn assign(&mut self, other: &Location) {
        self.x.assign(&other.x);
        self.f = other.f;
        match (&mut self.gradient, &other.gradient) {
            (Some(g), Some(h)) => g.assign(h),
            (g, h) => *g = h.clone(),
        }
        match (&mut self.hessian, &other.hessian) {
            (Some(g), Some(h)) => g.assign(h),
            (g, h) => *g = h.clone(),
        }
    }

    /// The infinity norm of the gradient, if one is present.
    pub fn gradient_norm(&self) -> Option<f64> {
        self.gradient.as_ref().map(|g| g.fold(0f64, |acc, gi| acc.max(gi.abs())))
    }
}

/// Counters of the work performed in a run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    /// The number of accepted iterates.
    pub major_iterations: usize,
    /// The number of calls to `Method::iterate`.
    pub iterations: usize,
    /// The number of function evaluations performed.
    pub func_evaluations: usize,
    /// The number of gradient evaluations performed.
    pub grad_evaluations: usize,
    /// The number of Hessian evaluations performed.
    pub hess_evaluations: usize,
    /// The runtime of the minimization according to the system clock.
    pub runtime: Duration,
}

impl Stats {
    pub(crate) fn record(&mut self, eval: Evaluation) {
        if eval.func {
            self.func_evaluations += 1;
        }
        if eval.grad {
            self.grad_evaluations += 1;
        }
        if eval.hess {
            self.hess_evaluations += 1;
        }
    }
}

/// A minimization result, storing various details of the run and the final results.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimResult {
    /// The best location found.
    pub location: Location,
    /// Why the run stopped.
    pub status: Status,
    /// The work performed.
    pub stats: Stats,
    /// The error reported by the method when `status` is `Status::Failure`.
    pub cause: Option<MethodError>,
}

impl OptimResult {
    /// The parameters at the found minimum.
    pub fn x(&self) -> ArrayView1<f64> {
        self.location.x.view()
    }

    /// The function value at the found minimum.
    pub fn f(&self) -> f64 {
        self.location.f
    }
}

impl fmt::Display for OptimResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "status: {}", self.status)?;
        writeln!(f, "f: {}", self.location.f)?;
        writeln!(f, "x: {}", self.location.x)?;
        write!(
            f,
            "major iterations: {}, func evals: {}, grad evals: {}, hess evals: {}",
            self.stats.major_iterations,
            self.stats.func_evaluations,
            self.stats.grad_evaluations,
            self.stats.hess_evaluations
        )
    }
}

/// A general minimization method driven by `local`.
///
/// `init` receives a fully evaluated starting location and must reset every piece of
/// internal state. Both `init` and `iterate` store the next point to evaluate in `loc.x`
/// and return what the driver should do with it. Between calls the driver only writes the
/// requested quantities into `loc`.
pub trait Method {
    /// The derivatives this method needs the objective to provide.
    fn needs(&self) -> Needs;

    fn init(&mut self, loc: &mut Location) -> Result<Operation, MethodError>;

    fn iterate(&mut self, loc: &mut Location) -> Result<Operation, MethodError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_sets() {
        let needed = Evaluation::complete(Needs { gradient: true, hessian: false });
        assert_eq!(needed, Evaluation::FUNC_GRAD);
        assert_eq!(needed.difference(Evaluation::FUNC), Evaluation::GRAD);
        assert!(needed.difference(Evaluation::FUNC_GRAD).is_empty());
        assert_eq!(Evaluation::FUNC.union(Evaluation::GRAD), Evaluation::FUNC_GRAD);
    }

    #[test]
    fn location_storage_follows_needs() {
        let x = arr1(&[1.0, -2.0, 0.5]);
        let loc = Location::new(x.view(), Needs { gradient: true, hessian: false });
        assert!(loc.f.is_nan());
        assert_eq!(loc.gradient.as_ref().map(|g| g.len()), Some(3));
        assert!(loc.hessian.is_none());

        let mut other = Location::new(x.view(), Needs::default());
        other.assign(&loc);
        assert_eq!(other.x, loc.x);
        assert!(other.gradient.is_some());
    }

    #[test]
    fn gradient_norm_is_infinity_norm() {
        let mut loc = Location::new(arr1(&[0.0, 0.0]).view(), Needs { gradient: true, hessian: false });
        loc.gradient = Some(arr1(&[0.5, -3.0]));
        assert_eq!(loc.gradient_norm(), Some(3.0));
    }
}
