//! Broyden–Fletcher–Goldfarb–Shanno quasi-Newton method.
//!
//! Keeps a dense approximation of the inverse Hessian, so memory and time per iteration grow as
//! `n²`. Use `Lbfgs` for large problems.
use crate::errors::MethodError;
use crate::linalg::{norm2, sym_rank_one, sym_rank_two};
use crate::linesearch::{gradient, Bisection, Linesearch, LinesearchMethod, NextDirectioner};
use crate::minimizer::{Location, Method, Needs, Operation};
use ndarray::prelude::*;

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct Bfgs {
    /// Defaults to `Bisection` with a curvature constant of 0.9.
    #[builder(setter(into))]
    pub linesearcher: LinesearchMethod,

    #[builder(setter(skip))]
    ls: Linesearch,
    #[builder(setter(skip))]
    direction: BfgsDirection,
}

impl Default for Bfgs {
    fn default() -> Self {
        Bfgs {
            linesearcher: Bisection::default().into(),
            ls: Linesearch::default(),
            direction: BfgsDirection::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct BfgsDirection {
    x: Array1<f64>,
    grad: Array1<f64>,
    inv_hess: Array2<f64>,
    /// The inverse Hessian is scaled on the first update.
    first: bool,
}

impl Default for BfgsDirection {
    fn default() -> Self {
        BfgsDirection {
            x: Array1::zeros(0),
            grad: Array1::zeros(0),
            inv_hess: Array2::zeros((0, 0)),
            first: true,
        }
    }
}

impl NextDirectioner for BfgsDirection {
    fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        let n = loc.x.len();
        let g = gradient(loc);
        self.x = loc.x.clone();
        self.grad = g.clone();
        self.inv_hess = Array2::eye(n);
        self.first = true;

        // the inverse Hessian is the identity
        dir.zip_mut_with(g, |d, &gi| *d = -gi);
        1.0 / norm2(dir.view())
    }

    fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        let g = gradient(loc);
        let s = &loc.x - &self.x;
        let y = g - &self.grad;
        let s_dot_y = s.dot(&y);

        if self.first {
            // Nocedal, Wright: Numerical Optimization (2nd ed), eq. 6.20.
            if s_dot_y > 0.0 {
                self.inv_hess *= s_dot_y / y.dot(&y);
            }
            self.first = false;
        }

        if s_dot_y > 0.0 {
            // H += (sᵀy + yᵀHy) / (sᵀy)² s sᵀ - (H y sᵀ + s yᵀ H) / sᵀy
            let hy = self.inv_hess.dot(&y);
            let scale = (1.0 + y.dot(&hy) / s_dot_y) / s_dot_y;
            sym_rank_one(&mut self.inv_hess, scale, s.view());
            sym_rank_two(&mut self.inv_hess, -1.0 / s_dot_y, hy.view(), s.view());
        } else {
            debug!("bfgs: skipping update with sᵀy = {}", s_dot_y);
        }

        self.x.assign(&loc.x);
        self.grad.assign(g);

        dir.assign(&self.inv_hess.dot(g));
        dir.mapv_inplace(|d| -d);
        1.0
    }
}

impl Method for Bfgs {
    fn needs(&self) -> Needs {
        Needs {
            gradient: true,
            hessian: false,
        }
    }

    fn init(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
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

    fn evaluated(x: &[f64], g: &[f64]) -> Location {
        let mut loc = Location::new(aview1(x), Needs { gradient: true, hessian: false });
        loc.f = 0.0;
        loc.gradient = Some(arr1(g));
        loc
    }

    #[test]
    fn first_step_is_normalized() {
        let mut d = BfgsDirection::default();
        let mut dir = Array1::zeros(2);
        let step = d.init_direction(&evaluated(&[1.0, 1.0], &[3.0, 4.0]), &mut dir);
        assert_eq!(dir, arr1(&[-3.0, -4.0]));
        assert_eq!(step, 0.2);
    }

    #[test]
    fn update_satisfies_the_secant_equation() {
        // f(x) = x0² + 5 x1², g = (2 x0, 10 x1)
        let mut d = BfgsDirection::default();
        let mut dir = Array1::zeros(2);
        d.init_direction(&evaluated(&[1.0, 1.0], &[2.0, 10.0]), &mut dir);
        d.next_direction(&evaluated(&[0.5, -0.5], &[1.0, -5.0]), &mut dir);

        let s = arr1(&[-0.5, -1.5]);
        let y = arr1(&[-1.0, -15.0]);
        let hy = d.inv_hess.dot(&y);
        for (a, b) in hy.iter().zip(s.iter()) {
            assert!(a.approx_eq(*b, (1e-12, 4)));
        }
        assert_eq!(d.inv_hess, d.inv_hess.t());
    }

    #[test]
    fn negative_curvature_skips_the_update() {
        let mut d = BfgsDirection::default();
        let mut dir = Array1::zeros(1);
        d.init_direction(&evaluated(&[0.0], &[-1.0]), &mut dir);
        // the gradient decreased along the step: sᵀy < 0
        d.next_direction(&evaluated(&[1.0], &[-2.0]), &mut dir);
        assert_eq!(d.inv_hess, arr2(&[[1.0]]));
        assert_eq!(dir, arr1(&[2.0]));
    }
}
