//! The objective abstraction.
//!
//! An objective always provides its value through `Function::func`. Derivatives are optional
//! capabilities, advertised by returning `Some(self)` from `Function::gradient` and
//! `Function::hessian`. Every call must be a pure function of `x`: the driver relies on it for
//! reproducible runs and for warm starts.
//!
//! ```
//! # extern crate ndarray;
//! # extern crate unconstrained;
//! # use ndarray::prelude::*;
//! # use unconstrained::{Function, Gradient};
//! struct Bowl;
//!
//! impl Function for Bowl {
//!     fn func(&self, x: ArrayView1<f64>) -> f64 {
//!         x.dot(&x)
//!     }
//!     fn gradient(&self) -> Option<&dyn Gradient> {
//!         Some(self)
//!     }
//! }
//!
//! impl Gradient for Bowl {
//!     fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
//!         2.0 * &x
//!     }
//! }
//! # fn main() {}
//! ```
use crate::errors::Error;
use crate::minimizer::{Evaluation, Location, Needs};
use crate::utils::approx_fprime;
use ndarray::prelude::*;

/// A scalar function of a vector.
pub trait Function {
    fn func(&self, x: ArrayView1<f64>) -> f64;

    /// The gradient capability of this function, if any.
    fn gradient(&self) -> Option<&dyn Gradient> {
        None
    }

    /// The Hessian capability of this function, if any.
    fn hessian(&self) -> Option<&dyn Hessian> {
        None
    }
}

pub trait Gradient {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64>;
}

/// Second derivatives. The returned matrix must be symmetric.
pub trait Hessian {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64>;
}

/// Plain closures are value-only objectives.
impl<F> Function for F
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        self(x)
    }
}

/// Adds a forward finite-difference gradient to a value-only objective.
#[derive(Clone, Debug)]
pub struct NumericalGradient<F> {
    function: F,
    step: f64,
}

impl<F: Function> NumericalGradient<F> {
    pub fn new(function: F) -> Self {
        NumericalGradient {
            function,
            step: f64::EPSILON.sqrt(),
        }
    }

    /// Sets the relative finite difference step.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

impl<F: Function> Function for NumericalGradient<F> {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        self.function.func(x)
    }

    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
}

impl<F: Function> Gradient for NumericalGradient<F> {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        approx_fprime(x, |y: ArrayView1<f64>| self.function.func(y), self.step)
    }
}

/// The capabilities of an objective, resolved once per run.
pub(crate) struct ProblemInfo<'a> {
    function: &'a dyn Function,
    gradient: Option<&'a dyn Gradient>,
    hessian: Option<&'a dyn Hessian>,
}

impl<'a> ProblemInfo<'a> {
    pub fn new(function: &'a dyn Function) -> Self {
        ProblemInfo {
            function,
            gradient: function.gradient(),
            hessian: function.hessian(),
        }
    }

    /// Checks that the objective can provide everything in `needs`.
    pub fn satisfy(&self, needs: Needs) -> Result<(), Error> {
        if needs.gradient && self.gradient.is_none() {
            return Err(Error::MissingGradient);
        }
        if needs.hessian && self.hessian.is_none() {
            return Err(Error::MissingHessian);
        }
        Ok(())
    }

    pub fn has_gradient(&self) -> bool {
        self.gradient.is_some()
    }

    /// Evaluates the quantities in `eval` at `loc.x` and stores them in `loc`.
    pub fn evaluate(&self, loc: &mut Location, eval: Evaluation) -> Result<(), Error> {
        let n = loc.x.len();
        if eval.func {
            let f = self.function.func(loc.x.view());
            check_value(f)?;
            loc.f = f;
        }
        if eval.grad {
            let g = self.gradient.ok_or(Error::MissingGradient)?.grad(loc.x.view());
            if g.len() != n {
                return Err(Error::GradientDimension {
                    expected: n,
                    found: g.len(),
                });
            }
            check_gradient(g.view())?;
            loc.gradient = Some(g);
        }
        if eval.hess {
            let h = self.hessian.ok_or(Error::MissingHessian)?.hess(loc.x.view());
            if h.dim() != (n, n) {
                return Err(Error::HessianDimension {
                    expected: (n, n),
                    found: h.dim(),
                });
            }
            check_hessian(h.view())?;
            loc.hessian = Some(h);
        }
        Ok(())
    }
}

pub(crate) fn check_value(f: f64) -> Result<(), Error> {
    if f.is_finite() {
        Ok(())
    } else {
        Err(Error::NonFiniteValue(f))
    }
}

pub(crate) fn check_gradient(g: ArrayView1<f64>) -> Result<(), Error> {
    match g.iter().position(|gi| !gi.is_finite()) {
        Some(index) => Err(Error::NonFiniteGradient {
            index,
            value: g[index],
        }),
        None => Ok(()),
    }
}

pub(crate) fn check_hessian(h: ArrayView2<f64>) -> Result<(), Error> {
    for ((row, col), &value) in h.indexed_iter() {
        if !value.is_finite() {
            return Err(Error::NonFiniteHessian { row, col, value });
        }
    }
    Ok(())
}
