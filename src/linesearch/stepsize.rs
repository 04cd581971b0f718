//! Policies for the first trial step of each line search.
use super::gradient;
use crate::linalg::{norm2, norm_inf};
use crate::minimizer::Location;
use float_cmp::ApproxEqRatio;
use ndarray::prelude::*;

const INITIAL_STEP_FACTOR: f64 = 1.0;
const QUADRATIC_THRESHOLD: f64 = 1e-12;
const MIN_STEP_SIZE: f64 = 1e-3;
const MAX_STEP_SIZE: f64 = 1.0;

/// Chooses the first trial step of a line search along `dir` from `loc`.
#[derive(Clone, Debug)]
pub enum StepSizer {
    /// Always the same step.
    Constant(f64),
    Quadratic(QuadraticStepSize),
    FirstOrder(FirstOrderStepSize),
}

impl StepSizer {
    /// The step for the first direction of a run.
    pub fn init(&mut self, loc: &Location, dir: ArrayView1<f64>) -> f64 {
        match *self {
            StepSizer::Constant(step) => step,
            StepSizer::Quadratic(ref mut q) => q.init(loc, dir),
            StepSizer::FirstOrder(ref mut f) => f.init(loc, dir),
        }
    }

    /// The step for every later direction.
    pub fn step_size(&mut self, loc: &Location, dir: ArrayView1<f64>) -> f64 {
        match *self {
            StepSizer::Constant(step) => step,
            StepSizer::Quadratic(ref mut q) => q.step_size(loc, dir),
            StepSizer::FirstOrder(ref mut f) => f.step_size(loc, dir),
        }
    }
}

impl From<QuadraticStepSize> for StepSizer {
    fn from(q: QuadraticStepSize) -> Self {
        StepSizer::Quadratic(q)
    }
}

impl From<FirstOrderStepSize> for StepSizer {
    fn from(f: FirstOrderStepSize) -> Self {
        StepSizer::FirstOrder(f)
    }
}

/// The first step scaled to the infinity norm of the gradient, clamped to the bounds.
fn initial_step(factor: f64, min: f64, max: f64, loc: &Location) -> f64 {
    let gnorm = norm_inf(gradient(loc).view());
    (factor / gnorm).max(min).min(max)
}

/// Estimates the step to the minimum of the quadratic interpolating the previous function value,
/// the previous directional derivative and the current function value along the previous
/// direction. The estimate is doubled when the interpolation is not convex or the function
/// values are indistinguishable.
///
/// Nocedal, J., Wright, S.: Numerical Optimization (2nd ed). Springer (2006), p. 59.
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct QuadraticStepSize {
    /// Relative tolerance under which two function values are considered equal.
    pub threshold: f64,
    /// The first step of a run is `initial_step_factor / |g|∞`.
    pub initial_step_factor: f64,
    pub min_step_size: f64,
    pub max_step_size: f64,

    #[builder(setter(skip))]
    x_prev: Array1<f64>,
    #[builder(setter(skip))]
    f_prev: f64,
    #[builder(setter(skip))]
    dir_prev_norm: f64,
    #[builder(setter(skip))]
    proj_grad_prev: f64,
}

impl Default for QuadraticStepSize {
    fn default() -> Self {
        QuadraticStepSize {
            threshold: QUADRATIC_THRESHOLD,
            initial_step_factor: INITIAL_STEP_FACTOR,
            min_step_size: MIN_STEP_SIZE,
            max_step_size: MAX_STEP_SIZE,
            x_prev: Array1::zeros(0),
            f_prev: 0.0,
            dir_prev_norm: 0.0,
            proj_grad_prev: 0.0,
        }
    }
}

impl QuadraticStepSize {
    fn fill_defaults(&mut self) {
        if self.threshold == 0.0 {
            self.threshold = QUADRATIC_THRESHOLD;
        }
        if self.initial_step_factor == 0.0 {
            self.initial_step_factor = INITIAL_STEP_FACTOR;
        }
        if self.min_step_size == 0.0 {
            self.min_step_size = MIN_STEP_SIZE;
        }
        if self.max_step_size == 0.0 {
            self.max_step_size = MAX_STEP_SIZE;
        }
        if self.max_step_size <= self.min_step_size {
            panic!("quadratic step size: max_step_size <= min_step_size");
        }
    }

    fn remember(&mut self, loc: &Location, dir: ArrayView1<f64>) {
        self.x_prev = loc.x.clone();
        self.f_prev = loc.f;
        self.dir_prev_norm = norm2(dir);
        self.proj_grad_prev = gradient(loc).dot(&dir);
    }

    pub fn init(&mut self, loc: &Location, dir: ArrayView1<f64>) -> f64 {
        self.fill_defaults();
        let step = initial_step(self.initial_step_factor, self.min_step_size, self.max_step_size, loc);
        self.remember(loc, dir);
        step
    }

    pub fn step_size(&mut self, loc: &Location, dir: ArrayView1<f64>) -> f64 {
        // The previous step length, recovered from the distance travelled.
        let step_prev = norm2((&loc.x - &self.x_prev).view()) / self.dir_prev_norm;
        let mut step = 2.0 * step_prev;

        let same = self
            .f_prev
            .approx_eq_ratio(&loc.f, self.threshold);
        if !same {
            let df = (loc.f - self.f_prev) / step_prev;
            let quad_test = df - self.proj_grad_prev;
            if quad_test > 0.0 {
                step = -self.proj_grad_prev * step_prev / quad_test / 2.0;
            }
        }
        let step = step.max(self.min_step_size).min(self.max_step_size);

        self.remember(loc, dir);
        step
    }
}

/// Assumes the first order change of the function is the same as in the previous iteration, so
/// the new step is the previous one scaled by the ratio of the directional derivatives.
///
/// Nocedal, J., Wright, S.: Numerical Optimization (2nd ed). Springer (2006), p. 58.
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct FirstOrderStepSize {
    /// The first step of a run is `initial_step_factor / |g|∞`.
    pub initial_step_factor: f64,
    pub min_step_size: f64,
    pub max_step_size: f64,

    #[builder(setter(skip))]
    x_prev: Array1<f64>,
    #[builder(setter(skip))]
    dir_prev_norm: f64,
    #[builder(setter(skip))]
    proj_grad_prev: f64,
}

impl Default for FirstOrderStepSize {
    fn default() -> Self {
        FirstOrderStepSize {
            initial_step_factor: INITIAL_STEP_FACTOR,
            min_step_size: MIN_STEP_SIZE,
            max_step_size: MAX_STEP_SIZE,
            x_prev: Array1::zeros(0),
            dir_prev_norm: 0.0,
            proj_grad_prev: 0.0,
        }
    }
}

impl FirstOrderStepSize {
    fn fill_defaults(&mut self) {
        if self.initial_step_factor == 0.0 {
            self.initial_step_factor = INITIAL_STEP_FACTOR;
        }
        if self.min_step_size == 0.0 {
            self.min_step_size = MIN_STEP_SIZE;
        }
        if self.max_step_size == 0.0 {
            self.max_step_size = MAX_STEP_SIZE;
        }
        if self.max_step_size <= self.min_step_size {
            panic!("first order step size: max_step_size <= min_step_size");
        }
    }

    fn remember(&mut self, loc: &Location, dir: ArrayView1<f64>) {
        self.x_prev = loc.x.clone();
        self.dir_prev_norm = norm2(dir);
        self.proj_grad_prev = gradient(loc).dot(&dir);
    }

    pub fn init(&mut self, loc: &Location, dir: ArrayView1<f64>) -> f64 {
        self.fill_defaults();
        let step = initial_step(self.initial_step_factor, self.min_step_size, self.max_step_size, loc);
        self.remember(loc, dir);
        step
    }

    pub fn step_size(&mut self, loc: &Location, dir: ArrayView1<f64>) -> f64 {
        let step_prev = norm2((&loc.x - &self.x_prev).view()) / self.dir_prev_norm;
        let proj_grad = gradient(loc).dot(&dir);
        let step = (step_prev * self.proj_grad_prev / proj_grad)
            .max(self.min_step_size)
            .min(self.max_step_size);

        self.x_prev.assign(&loc.x);
        self.dir_prev_norm = norm2(dir);
        self.proj_grad_prev = proj_grad;
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimizer::Needs;
    use float_cmp::ApproxEq;

    fn location(x: &[f64], f: f64, g: &[f64]) -> Location {
        let mut loc = Location::new(aview1(x), Needs { gradient: true, hessian: false });
        loc.f = f;
        loc.gradient = Some(arr1(g));
        loc
    }

    #[test]
    fn first_step_follows_gradient_norm() {
        let loc = location(&[0.0, 0.0], 1.0, &[4.0, -2.0]);
        let dir = arr1(&[-4.0, 2.0]);
        let mut q = QuadraticStepSize::default();
        assert_eq!(q.init(&loc, dir.view()), 0.25);

        // clamped to the minimum step
        let loc = location(&[0.0, 0.0], 1.0, &[1e6, 0.0]);
        let mut f = FirstOrderStepSize::default();
        assert_eq!(f.init(&loc, arr1(&[-1e6, 0.0]).view()), 1e-3);
    }

    #[test]
    fn quadratic_interpolates_a_parabola() {
        // f(x) = x^2 from x = 1 along d = -1 is phi(a) = (1 - a)^2. The previous step of 0.25
        // landed at 0.75.
        let mut q = QuadraticStepSize::default();
        q.init(&location(&[1.0], 1.0, &[2.0]), arr1(&[-1.0]).view());
        let loc = location(&[0.75], 0.5625, &[1.5]);
        // The parabola through phi(0), phi'(0) and phi(0.25) is phi itself, minimal at a = 1.
        let step = q.step_size(&loc, arr1(&[-1.0]).view());
        assert!(step.approx_eq(1.0, (1e-12, 4)));
    }

    #[test]
    fn first_order_scales_previous_step() {
        let mut f = FirstOrderStepSize::default();
        f.init(&location(&[1.0], 1.0, &[2.0]), arr1(&[-2.0]).view());
        // moved 0.5 along d = -2, so the previous step was 0.25
        let loc = location(&[0.5], 0.25, &[1.0]);
        let step = f.step_size(&loc, arr1(&[-1.0]).view());
        // 0.25 * (-4) / (-1) = 1
        assert!(step.approx_eq(1.0, (1e-12, 4)));
    }

    #[test]
    fn constant_ignores_the_location() {
        let loc = location(&[3.0], 9.0, &[6.0]);
        let mut s = StepSizer::Constant(0.5);
        assert_eq!(s.init(&loc, arr1(&[-6.0]).view()), 0.5);
        assert_eq!(s.step_size(&loc, arr1(&[-6.0]).view()), 0.5);
    }
}
