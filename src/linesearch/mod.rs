//! Line searches find a step length along a descent direction that decreases the function
//! sufficiently.
//!
//! A `Linesearcher` only sees the one dimensional problem: the function value and the projected
//! gradient at the trial steps it asks for. `Linesearch` turns a `NextDirectioner` (the part of
//! a method that picks directions and first trial steps) and a `Linesearcher` into the
//! `Method::init` / `Method::iterate` protocol.

mod backtracking;
mod bisection;
mod stepsize;

pub use self::backtracking::{Backtracking, BacktrackingBuilder};
pub use self::bisection::{Bisection, BisectionBuilder};
pub use self::stepsize::{FirstOrderStepSize, FirstOrderStepSizeBuilder, QuadraticStepSize,
                         QuadraticStepSizeBuilder, StepSizer};

use crate::errors::MethodError;
use crate::minimizer::{Evaluation, Location, Needs, Operation};
use crate::utils::all_equal;
use ndarray::prelude::*;

/// What a linesearcher wants next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinesearchStep {
    /// Evaluate the requested quantities at the given step length.
    Evaluate(Evaluation, f64),
    /// The given step, which is the last one evaluated, is accepted.
    Finished(f64),
}

/// A one dimensional search for an acceptable step length.
pub trait Linesearcher {
    /// Starts a new search from a point with value `f` and directional derivative `proj_grad`,
    /// trying `step` first. Returns what to evaluate at `step`.
    fn init(&mut self, f: f64, proj_grad: f64, step: f64) -> Evaluation;

    /// Consumes the value and directional derivative at the last requested step. Quantities that
    /// were not evaluated there are NaN.
    fn iterate(&mut self, f: f64, proj_grad: f64) -> Result<LinesearchStep, MethodError>;
}

/// The line searches available to the methods of this crate.
#[derive(Clone, Debug)]
pub enum LinesearchMethod {
    Backtracking(Backtracking),
    Bisection(Bisection),
}

impl Linesearcher for LinesearchMethod {
    fn init(&mut self, f: f64, proj_grad: f64, step: f64) -> Evaluation {
        match *self {
            LinesearchMethod::Backtracking(ref mut b) => b.init(f, proj_grad, step),
            LinesearchMethod::Bisection(ref mut b) => b.init(f, proj_grad, step),
        }
    }

    fn iterate(&mut self, f: f64, proj_grad: f64) -> Result<LinesearchStep, MethodError> {
        match *self {
            LinesearchMethod::Backtracking(ref mut b) => b.iterate(f, proj_grad),
            LinesearchMethod::Bisection(ref mut b) => b.iterate(f, proj_grad),
        }
    }
}

impl From<Backtracking> for LinesearchMethod {
    fn from(b: Backtracking) -> Self {
        LinesearchMethod::Backtracking(b)
    }
}

impl From<Bisection> for LinesearchMethod {
    fn from(b: Bisection) -> Self {
        LinesearchMethod::Bisection(b)
    }
}

/// The direction choosing half of a line search based method.
pub trait NextDirectioner {
    /// Stores the first search direction in `dir` and returns the first trial step.
    fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64;

    /// Stores the next search direction in `dir` and returns the first trial step. `loc` is the
    /// newly accepted iterate.
    fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64;

    /// Called when the line search along `dir` failed, with `loc` back at the start of that
    /// search. Stores a direction to retry along and returns its first trial step, or returns
    /// `None` to give up.
    fn retry_direction(&mut self, _loc: &Location, _dir: &mut Array1<f64>) -> Option<f64> {
        None
    }
}

/// Returns `true` if the Armijo sufficient decrease condition holds at `step`.
pub fn armijo_condition_met(f: f64, f0: f64, proj_grad0: f64, step: f64, decrease: f64) -> bool {
    f <= f0 + step * decrease * proj_grad0
}

/// Returns `true` if the strong Wolfe conditions hold at `step`.
pub fn strong_wolfe_conditions_met(
    f: f64,
    proj_grad: f64,
    f0: f64,
    proj_grad0: f64,
    step: f64,
    decrease: f64,
    curvature: f64,
) -> bool {
    armijo_condition_met(f, f0, proj_grad0, step, decrease)
        && proj_grad.abs() <= curvature * proj_grad0.abs()
}

/// The gradient of a location evaluated for a gradient based method.
pub(crate) fn gradient(loc: &Location) -> &Array1<f64> {
    match loc.gradient {
        Some(ref g) => g,
        None => panic!("linesearch: location has no gradient"),
    }
}

/// Drives a `Linesearcher` along the directions produced by a `NextDirectioner`.
///
/// The state kept here is shared by every line search based method: the start of the current
/// search, its direction, which fields of the location are valid at the current trial point, and
/// whether a major iteration must be announced once the missing fields are evaluated.
#[derive(Clone, Debug, Default)]
pub struct Linesearch {
    x: Array1<f64>,
    start: Option<Location>,
    dir: Array1<f64>,
    complete: Evaluation,

    first: bool,
    next_major: bool,
    eval: Evaluation,

    last_step: f64,
    last_op: Option<Operation>,
}

impl Linesearch {
    pub fn init<L, D>(
        &mut self,
        loc: &mut Location,
        needs: Needs,
        linesearcher: &mut L,
        directioner: &mut D,
    ) -> Result<Operation, MethodError>
    where
        L: Linesearcher + ?Sized,
        D: NextDirectioner + ?Sized,
    {
        assert!(loc.gradient.is_some(), "linesearch: location has no gradient");
        let n = loc.x.len();
        self.complete = Evaluation::complete(needs);
        self.first = true;
        self.next_major = false;
        self.x = loc.x.clone();
        self.start = Some(loc.clone());
        self.dir = Array1::zeros(n);
        self.init_next_linesearch(loc, linesearcher, directioner)
    }

    pub fn iterate<L, D>(
        &mut self,
        loc: &mut Location,
        linesearcher: &mut L,
        directioner: &mut D,
    ) -> Result<Operation, MethodError>
    where
        L: Linesearcher + ?Sized,
        D: NextDirectioner + ?Sized,
    {
        match self.last_op {
            None => panic!("linesearch: iterate called before init or after an error"),
            Some(Operation::MajorIteration) => {
                // The accepted point did not converge the run, start the next search from it.
                return self.init_next_linesearch(loc, linesearcher, directioner);
            }
            Some(Operation::Evaluate(e)) => {
                self.eval = self.eval.union(e);
                if self.next_major {
                    // The search finished and the missing fields are now valid.
                    self.next_major = false;
                    self.last_op = Some(Operation::MajorIteration);
                    return Ok(Operation::MajorIteration);
                }
            }
        }

        let f = if self.eval.func { loc.f } else { f64::NAN };
        let proj_grad = if self.eval.grad {
            gradient(loc).dot(&self.dir)
        } else {
            f64::NAN
        };

        match linesearcher.iterate(f, proj_grad) {
            Err(err) => self.retry(loc, err, linesearcher, directioner),
            Ok(LinesearchStep::Finished(_)) => {
                let missing = self.complete.difference(self.eval);
                let op = if missing.is_empty() {
                    Operation::MajorIteration
                } else {
                    // Announce the major iteration once the missing fields are evaluated.
                    self.next_major = true;
                    Operation::Evaluate(missing)
                };
                self.last_op = Some(op);
                Ok(op)
            }
            Ok(LinesearchStep::Evaluate(e, step)) => {
                if step != self.last_step {
                    // Moving to a new trial point rather than completing the current one.
                    if let Err(err) = self.move_to(loc, step) {
                        return self.retry(loc, err, linesearcher, directioner);
                    }
                }
                self.last_op = Some(Operation::Evaluate(e));
                Ok(Operation::Evaluate(e))
            }
        }
    }

    fn init_next_linesearch<L, D>(
        &mut self,
        loc: &mut Location,
        linesearcher: &mut L,
        directioner: &mut D,
    ) -> Result<Operation, MethodError>
    where
        L: Linesearcher + ?Sized,
        D: NextDirectioner + ?Sized,
    {
        self.x.assign(&loc.x);
        match self.start {
            Some(ref mut start) => start.assign(loc),
            None => self.start = Some(loc.clone()),
        }

        let step = if self.first {
            self.first = false;
            directioner.init_direction(loc, &mut self.dir)
        } else {
            directioner.next_direction(loc, &mut self.dir)
        };
        self.start_linesearch(loc, linesearcher, step)
    }

    /// Returns `loc` to the start of the failed search and searches again along the direction
    /// the directioner falls back to. Fails with `err` if there is none.
    fn retry<L, D>(
        &mut self,
        loc: &mut Location,
        err: MethodError,
        linesearcher: &mut L,
        directioner: &mut D,
    ) -> Result<Operation, MethodError>
    where
        L: Linesearcher + ?Sized,
        D: NextDirectioner + ?Sized,
    {
        if let Some(ref start) = self.start {
            loc.assign(start);
        }
        match directioner.retry_direction(loc, &mut self.dir) {
            Some(step) => {
                debug!("linesearch: {}, searching again from the same point", err);
                self.start_linesearch(loc, linesearcher, step)
            }
            None => self.error(err),
        }
    }

    fn start_linesearch<L>(
        &mut self,
        loc: &mut Location,
        linesearcher: &mut L,
        step: f64,
    ) -> Result<Operation, MethodError>
    where
        L: Linesearcher + ?Sized,
    {
        let proj_grad = gradient(loc).dot(&self.dir);
        if !(proj_grad < 0.0) {
            return self.error(MethodError::NonDescentDirection);
        }

        let e = linesearcher.init(loc.f, proj_grad, step);
        self.move_to(loc, step)?;
        self.last_op = Some(Operation::Evaluate(e));
        Ok(Operation::Evaluate(e))
    }

    /// Stores `x + step * dir` in `loc.x` and marks every field of `loc` invalid.
    fn move_to(&mut self, loc: &mut Location, step: f64) -> Result<(), MethodError> {
        loc.x.assign(&self.x);
        loc.x.scaled_add(step, &self.dir);
        if all_equal(self.x.view(), loc.x.view()) {
            // The step is too small to change any coordinate.
            return self.error(MethodError::NoProgress);
        }
        self.last_step = step;
        self.eval = Evaluation::NONE;
        Ok(())
    }

    fn error<T>(&mut self, err: MethodError) -> Result<T, MethodError> {
        self.last_op = None;
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armijo() {
        // f(a) = (1 - a)^2, f(0) = 1, f'(0) = -2
        let f = |a: f64| (1.0 - a).powi(2);
        assert!(armijo_condition_met(f(1.0), 1.0, -2.0, 1.0, 1e-4));
        assert!(!armijo_condition_met(f(2.0), 1.0, -2.0, 2.0, 1e-4));
        assert!(!armijo_condition_met(f(1.0), 1.0, -2.0, 1.0, 0.6));
    }

    #[test]
    fn strong_wolfe() {
        // at the exact minimizer the directional derivative is zero
        assert!(strong_wolfe_conditions_met(0.0, 0.0, 1.0, -2.0, 1.0, 1e-4, 0.1));
        // too short a step: still steep
        assert!(!strong_wolfe_conditions_met(0.81, -1.8, 1.0, -2.0, 0.1, 1e-4, 0.1));
    }

    struct SteepestDescent;

    impl NextDirectioner for SteepestDescent {
        fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
            dir.assign(&-gradient(loc));
            1.0
        }
        fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
            self.init_direction(loc, dir)
        }
    }

    fn evaluated(x: f64) -> Location {
        let mut loc = Location::new(arr1(&[x]).view(), Needs { gradient: true, hessian: false });
        loc.f = x * x;
        loc.gradient = Some(arr1(&[2.0 * x]));
        loc
    }

    #[test]
    fn completes_location_before_major_iteration() {
        // Backtracking only evaluates the function, so the gradient at the accepted point must be
        // requested before the iteration is announced.
        let mut ls = Linesearch::default();
        let mut backtracking = LinesearchMethod::from(Backtracking::default());
        let mut loc = evaluated(1.0);
        let needs = Needs { gradient: true, hessian: false };

        let op = ls.init(&mut loc, needs, &mut backtracking, &mut SteepestDescent).unwrap();
        assert_eq!(op, Operation::Evaluate(Evaluation::FUNC));
        // 1 - 1 * 2 = -1
        assert_eq!(loc.x[0], -1.0);
        loc.f = 1.0;
        // f(-1) = 1 fails the Armijo condition, so the step is halved to 0.5
        let op = ls.iterate(&mut loc, &mut backtracking, &mut SteepestDescent).unwrap();
        assert_eq!(op, Operation::Evaluate(Evaluation::FUNC));
        assert_eq!(loc.x[0], 0.0);
        loc.f = 0.0;
        let op = ls.iterate(&mut loc, &mut backtracking, &mut SteepestDescent).unwrap();
        assert_eq!(op, Operation::Evaluate(Evaluation::GRAD));
        loc.gradient = Some(arr1(&[0.0]));
        let op = ls.iterate(&mut loc, &mut backtracking, &mut SteepestDescent).unwrap();
        assert_eq!(op, Operation::MajorIteration);
    }

    #[test]
    fn rejects_ascent_directions() {
        struct Uphill;
        impl NextDirectioner for Uphill {
            fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
                dir.assign(gradient(loc));
                1.0
            }
            fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
                self.init_direction(loc, dir)
            }
        }
        let mut ls = Linesearch::default();
        let mut bisection = LinesearchMethod::from(Bisection::default());
        let mut loc = evaluated(1.0);
        let needs = Needs { gradient: true, hessian: false };
        assert_eq!(
            ls.init(&mut loc, needs, &mut bisection, &mut Uphill),
            Err(MethodError::NonDescentDirection)
        );
    }

    #[test]
    fn tiny_steps_make_no_progress() {
        struct Tiny;
        impl NextDirectioner for Tiny {
            fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
                dir.assign(&-gradient(loc));
                1e-300
            }
            fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
                self.init_direction(loc, dir)
            }
        }
        let mut ls = Linesearch::default();
        let mut backtracking = LinesearchMethod::from(Backtracking::default());
        let mut loc = evaluated(1.0);
        let needs = Needs { gradient: true, hessian: false };
        assert_eq!(
            ls.init(&mut loc, needs, &mut backtracking, &mut Tiny),
            Err(MethodError::NoProgress)
        );
    }

    #[test]
    fn failed_search_is_retried_from_its_start() {
        struct FailsOnce(bool);
        impl Linesearcher for FailsOnce {
            fn init(&mut self, _: f64, _: f64, _: f64) -> Evaluation {
                Evaluation::FUNC
            }
            fn iterate(&mut self, _: f64, _: f64) -> Result<LinesearchStep, MethodError> {
                if self.0 {
                    return Ok(LinesearchStep::Finished(0.5));
                }
                self.0 = true;
                Err(MethodError::LinesearcherFailure)
            }
        }
        struct Retrying(usize);
        impl NextDirectioner for Retrying {
            fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
                dir.assign(&-gradient(loc));
                1.0
            }
            fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
                self.init_direction(loc, dir)
            }
            fn retry_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> Option<f64> {
                self.0 += 1;
                dir.assign(&-gradient(loc));
                Some(0.5)
            }
        }

        let mut ls = Linesearch::default();
        let mut searcher = FailsOnce(false);
        let mut directioner = Retrying(0);
        let mut loc = evaluated(1.0);
        let needs = Needs { gradient: true, hessian: false };
        ls.init(&mut loc, needs, &mut searcher, &mut directioner).unwrap();
        assert_eq!(loc.x[0], -1.0);
        loc.f = 3.0;

        let op = ls.iterate(&mut loc, &mut searcher, &mut directioner).unwrap();
        assert_eq!(op, Operation::Evaluate(Evaluation::FUNC));
        assert_eq!(directioner.0, 1);
        // back at x = 1 with its value and gradient, then half a step along -2
        assert_eq!(loc.x[0], 0.0);
        assert_eq!(loc.f, 1.0);
        loc.f = 0.0;
        let op = ls.iterate(&mut loc, &mut searcher, &mut directioner).unwrap();
        assert_eq!(op, Operation::Evaluate(Evaluation::GRAD));
    }

    #[test]
    fn failed_search_without_retry_is_an_error() {
        let mut ls = Linesearch::default();
        let mut bisection = LinesearchMethod::from(Bisection::default());
        let mut loc = evaluated(1.0);
        let needs = Needs { gradient: true, hessian: false };
        ls.init(&mut loc, needs, &mut bisection, &mut SteepestDescent).unwrap();
        // A value that never decreases collapses the bracket.
        let mut result = Ok(Operation::MajorIteration);
        for _ in 0..2000 {
            loc.f = 2.0;
            result = ls.iterate(&mut loc, &mut bisection, &mut SteepestDescent);
            if result.is_err() {
                break;
            }
        }
        assert!(result.is_err());
    }
}
