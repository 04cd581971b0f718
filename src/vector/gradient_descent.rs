//! Steepest descent with a line search.
//!
//! The search direction is always the negative gradient. Slow on badly scaled problems, but
//! cheap per iteration and robust.
use crate::errors::MethodError;
use crate::linesearch::{
    gradient, Backtracking, Linesearch, LinesearchMethod, NextDirectioner, QuadraticStepSize, StepSizer,
};
use crate::minimizer::{Location, Method, Needs, Operation};
use ndarray::prelude::*;

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct GradientDescent {
    /// Defaults to `Backtracking`.
    #[builder(setter(into))]
    pub linesearcher: LinesearchMethod,

    /// Defaults to `StepSizer::Quadratic`.
    #[builder(setter(into))]
    pub step_sizer: StepSizer,

    #[builder(setter(skip))]
    ls: Linesearch,
    #[builder(setter(skip))]
    direction: SteepestDescent,
}

impl Default for GradientDescent {
    fn default() -> Self {
        GradientDescent {
            linesearcher: Backtracking::default().into(),
            step_sizer: QuadraticStepSize::default().into(),
            ls: Linesearch::default(),
            direction: SteepestDescent::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct SteepestDescent {
    step_sizer: StepSizer,
}

impl Default for SteepestDescent {
    fn default() -> Self {
        SteepestDescent {
            step_sizer: StepSizer::Constant(1.0),
        }
    }
}

fn negative_gradient(loc: &Location, dir: &mut Array1<f64>) {
    dir.zip_mut_with(gradient(loc), |d, &gi| *d = -gi);
}

impl NextDirectioner for SteepestDescent {
    fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        negative_gradient(loc, dir);
        self.step_sizer.init(loc, dir.view())
    }

    fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        negative_gradient(loc, dir);
        self.step_sizer.step_size(loc, dir.view())
    }
}

impl Method for GradientDescent {
    fn needs(&self) -> Needs {
        Needs {
            gradient: true,
            hessian: false,
        }
    }

    fn init(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        self.direction = SteepestDescent {
            step_sizer: self.step_sizer.clone(),
        };
        let needs = self.needs();
        self.ls
            .init(loc, needs, &mut self.linesearcher, &mut self.direction)
    }

    fn iterate(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        self.ls.iterate(loc, &mut self.linesearcher, &mut self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linesearch::Bisection;
    use crate::minimizer::Evaluation;

    #[test]
    fn first_trial_is_along_the_negative_gradient() {
        let mut gd = GradientDescentBuilder::default()
            .step_sizer(StepSizer::Constant(0.5))
            .build()
            .unwrap();
        let needs = gd.needs();
        let mut loc = Location::new(arr1(&[1.0, -2.0]).view(), needs);
        loc.f = 5.0;
        loc.gradient = Some(arr1(&[2.0, -4.0]));
        let op = gd.init(&mut loc).unwrap();
        assert_eq!(op, Operation::Evaluate(Evaluation::FUNC));
        assert_eq!(loc.x, arr1(&[0.0, 0.0]));
    }

    #[test]
    fn builder_accepts_any_linesearcher() {
        let gd = GradientDescentBuilder::default()
            .linesearcher(Bisection::default())
            .build()
            .unwrap();
        match gd.linesearcher {
            LinesearchMethod::Bisection(ref b) => assert_eq!(b.grad_const, 0.9),
            _ => panic!("expected bisection"),
        }
    }
}
