//! Modified Newton's method.
//!
//! The direction solves `(H + τI) d = -g`, where `τ ≥ 0` is the smallest multiple of the
//! identity (from an increasing sequence) that makes the matrix positive definite, so that `d` is
//! always a descent direction. This is Algorithm 3.3, Cholesky with Added Multiple of the
//! Identity, from Nocedal, Wright: Numerical Optimization (2nd ed), Springer (2006).
use crate::errors::MethodError;
use crate::linalg::cholesky_solve;
use crate::linesearch::{gradient, Bisection, Linesearch, LinesearchMethod, NextDirectioner};
use crate::minimizer::{Location, Method, Needs, Operation};
use ndarray::prelude::*;

const DEFAULT_INCREASE: f64 = 5.0;
const MAX_MODIFICATIONS: usize = 20;
const MIN_TAU: f64 = 1e-3;

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct Newton {
    /// Defaults to `Bisection` with a curvature constant of 0.9.
    #[builder(setter(into))]
    pub linesearcher: LinesearchMethod,

    /// The factor by which `τ` grows after a failed factorization. Must be greater than one.
    /// Zero selects 5.
    pub increase: f64,

    #[builder(setter(skip))]
    ls: Linesearch,
    #[builder(setter(skip))]
    direction: NewtonDirection,
}

impl Default for Newton {
    fn default() -> Self {
        Newton {
            linesearcher: Bisection::default().into(),
            increase: DEFAULT_INCREASE,
            ls: Linesearch::default(),
            direction: NewtonDirection::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct NewtonDirection {
    increase: f64,
    /// The modification used for the last direction.
    tau: f64,
    hess: Array2<f64>,
}

impl NextDirectioner for NewtonDirection {
    fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        self.next_direction(loc, dir)
    }

    fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        let hessian = match loc.hessian {
            Some(ref h) => h,
            None => panic!("newton: location has no Hessian"),
        };
        let g = gradient(loc);
        self.hess = hessian.clone();

        let min_diag = hessian.diag().fold(f64::INFINITY, |acc, &a| acc.min(a));
        // Try the unmodified Hessian first if it can be positive definite. Otherwise start from
        // a shift that makes the diagonal positive.
        self.tau = if min_diag > 0.0 { 0.0 } else { -min_diag + MIN_TAU };

        for _ in 0..MAX_MODIFICATIONS {
            if self.tau != 0.0 {
                let tau = self.tau;
                self.hess.diag_mut().zip_mut_with(&hessian.diag(), |h, &a| *h = a + tau);
            }
            if let Some(step) = cholesky_solve(self.hess.view(), g.view()) {
                dir.zip_mut_with(&step, |d, &s| *d = -s);
                return 1.0;
            }
            self.tau = (self.increase * self.tau).max(MIN_TAU);
        }

        warn!(
            "newton: no positive definite modification after {} attempts, using steepest descent",
            MAX_MODIFICATIONS
        );
        dir.zip_mut_with(g, |d, &gi| *d = -gi);
        1.0
    }
}

impl Method for Newton {
    fn needs(&self) -> Needs {
        Needs {
            gradient: true,
            hessian: true,
        }
    }

    fn init(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        let mut increase = self.increase;
        if increase == 0.0 {
            increase = DEFAULT_INCREASE;
        }
        if increase <= 1.0 {
            panic!("newton: increase must be greater than 1");
        }
        self.direction = NewtonDirection {
            increase,
            ..NewtonDirection::default()
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
    use float_cmp::ApproxEq;

    fn evaluated(g: &[f64], h: Array2<f64>) -> Location {
        let n = g.len();
        let needs = Needs {
            gradient: true,
            hessian: true,
        };
        let mut loc = Location::new(Array1::zeros(n).view(), needs);
        loc.f = 0.0;
        loc.gradient = Some(arr1(g));
        loc.hessian = Some(h);
        loc
    }

    fn direction() -> NewtonDirection {
        NewtonDirection {
            increase: DEFAULT_INCREASE,
            ..NewtonDirection::default()
        }
    }

    #[test]
    fn positive_definite_hessian_gives_the_newton_step() {
        let loc = evaluated(&[2.0, 4.0], arr2(&[[2.0, 0.0], [0.0, 4.0]]));
        let mut d = direction();
        let mut dir = Array1::zeros(2);
        assert_eq!(d.init_direction(&loc, &mut dir), 1.0);
        assert!(dir[0].approx_eq(-1.0, (1e-15, 2)));
        assert!(dir[1].approx_eq(-1.0, (1e-15, 2)));
        assert_eq!(d.tau, 0.0);
    }

    #[test]
    fn indefinite_hessian_is_shifted() {
        let loc = evaluated(&[1.0, 1.0], arr2(&[[1.0, 0.0], [0.0, -2.0]]));
        let mut d = direction();
        let mut dir = Array1::zeros(2);
        d.init_direction(&loc, &mut dir);
        assert!(d.tau > 2.0);
        // still a descent direction
        assert!(dir.dot(&arr1(&[1.0, 1.0])) < 0.0);
    }

    #[test]
    fn shift_restarts_every_iteration() {
        let mut d = direction();
        let mut dir = Array1::zeros(2);
        let loc = evaluated(&[1.0, 1.0], arr2(&[[1.0, 0.0], [0.0, -50.0]]));
        d.init_direction(&loc, &mut dir);
        assert!(d.tau > 50.0);

        // A mildly indefinite Hessian starts again from its own diagonal.
        let loc = evaluated(&[1.0, 1.0], arr2(&[[1.0, 0.0], [0.0, -0.5]]));
        d.next_direction(&loc, &mut dir);
        assert!(d.tau.approx_eq(0.5 + MIN_TAU, (1e-15, 2)));

        let loc = evaluated(&[1.0, 1.0], arr2(&[[2.0, 0.0], [0.0, 3.0]]));
        d.next_direction(&loc, &mut dir);
        assert_eq!(d.tau, 0.0);
    }

    #[test]
    fn singular_hessian_gets_the_smallest_shift() {
        let loc = evaluated(&[1.0, 1.0], arr2(&[[1.0, 1.0], [1.0, 1.0]]));
        let mut d = direction();
        let mut dir = Array1::zeros(2);
        d.init_direction(&loc, &mut dir);
        assert!(d.tau.approx_eq(MIN_TAU, (1e-15, 2)));
        assert!(dir.dot(&arr1(&[1.0, 1.0])) < 0.0);
    }
}
