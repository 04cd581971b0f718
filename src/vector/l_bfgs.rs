//! Limited-memory BFGS Quasi-Newton optimizer. Uses the two-loop recursion to
//! calculate the quasi-inverse-hessian, as formulated in
//!
//! Jorge Nocedal. Updating Quasi-Newton Matrices With Limited Storage.
//! MATHEMATICS OF  COMPUTATION, VOLUME 35,  NUMBER 151 JULY 1980, PAGES 773-782
//!
//! Only the `store` most recent step and gradient difference pairs are kept, so memory grows
//! linearly with the dimension.
use crate::errors::MethodError;
use crate::linalg::norm2;
use crate::linesearch::{gradient, Bisection, Linesearch, LinesearchMethod, NextDirectioner};
use crate::minimizer::{Location, Method, Needs, Operation};
use ndarray::prelude::*;
use std::iter::Chain;
use std::ops::Index;
use std::slice;

const DEFAULT_STORE: usize = 15;

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct Lbfgs {
    /// Defaults to `Bisection` with a curvature constant of 0.9.
    #[builder(setter(into))]
    pub linesearcher: LinesearchMethod,

    /// The number of past updates used to approximate the inverse Hessian. Zero selects 15.
    pub store: usize,

    #[builder(setter(skip))]
    ls: Linesearch,
    #[builder(setter(skip))]
    direction: LbfgsDirection,
}

impl Default for Lbfgs {
    fn default() -> Self {
        Lbfgs {
            linesearcher: Bisection::default().into(),
            store: DEFAULT_STORE,
            ls: Linesearch::default(),
            direction: LbfgsDirection::default(),
        }
    }
}

/// A step `s`, the matching gradient difference `y` and `1 / sᵀy`.
type Pair = (Array1<f64>, Array1<f64>, f64);

#[derive(Clone, Debug, Default)]
struct LbfgsDirection {
    x: Array1<f64>,
    grad: Array1<f64>,
    hist: RobinVec<Pair>,
    /// Scratch space for the first loop of the recursion.
    a: Vec<f64>,
}

impl LbfgsDirection {
    fn new(store: usize) -> Self {
        LbfgsDirection {
            hist: RobinVec::with_capacity(store),
            ..LbfgsDirection::default()
        }
    }

    /// Applies the inverse Hessian approximation to `q` in place.
    fn quasi_update(&mut self, q: &mut Array1<f64>) {
        self.a.clear();
        for (si, yi, ri) in self.hist.iter().rev() {
            let ai = ri * si.dot(&*q);
            q.scaled_add(-ai, yi);
            self.a.push(ai);
        }

        // H_0 = γ I, scaled with the most recent pair
        if let Some((s, y, _)) = self.hist.newest() {
            let gamma = s.dot(y) / y.dot(y);
            *q *= gamma;
        }

        for ((si, yi, ri), ai) in self.hist.iter().zip(self.a.iter().rev()) {
            let bi = ri * yi.dot(&*q);
            q.scaled_add(ai - bi, si);
        }
    }
}

impl NextDirectioner for LbfgsDirection {
    fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        let g = gradient(loc);
        self.x = loc.x.clone();
        self.grad = g.clone();
        self.hist.clear();

        dir.zip_mut_with(g, |d, &gi| *d = -gi);
        1.0 / norm2(dir.view())
    }

    fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        let g = gradient(loc);
        let s = &loc.x - &self.x;
        let y = g - &self.grad;
        let s_dot_y = s.dot(&y);
        if s_dot_y > 0.0 {
            self.hist.push((s, y, 1.0 / s_dot_y));
        } else {
            debug!("lbfgs: dropping pair with sᵀy = {}", s_dot_y);
        }

        self.x.assign(&loc.x);
        self.grad.assign(g);

        dir.assign(g);
        self.quasi_update(dir);
        dir.mapv_inplace(|d| -d);
        1.0
    }
}

impl Method for Lbfgs {
    fn needs(&self) -> Needs {
        Needs {
            gradient: true,
            hessian: false,
        }
    }

    fn init(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        let store = if self.store == 0 { DEFAULT_STORE } else { self.store };
        self.direction = LbfgsDirection::new(store);
        let needs = self.needs();
        self.ls
            .init(loc, needs, &mut self.linesearcher, &mut self.direction)
    }

    fn iterate(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        self.ls.iterate(loc, &mut self.linesearcher, &mut self.direction)
    }
}

/// A ring buffer of at most `size` elements. Iterates from the oldest to the newest element.
#[derive(Clone, Debug, Default)]
struct RobinVec<T> {
    i0: usize,
    size: usize,
    vec: Vec<T>,
}

impl<T> RobinVec<T> {
    pub fn with_capacity(size: usize) -> RobinVec<T> {
        RobinVec {
            i0: 0,
            size,
            vec: Vec::with_capacity(size),
        }
    }

    pub fn iter(&self) -> Chain<slice::Iter<T>, slice::Iter<T>> {
        self.vec[self.i0..].iter().chain(self.vec[..self.i0].iter())
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn clear(&mut self) {
        self.vec.clear();
        self.i0 = 0;
    }

    pub fn newest(&self) -> Option<&T> {
        if self.vec.is_empty() {
            None
        } else {
            Some(&self[self.len() - 1])
        }
    }

    /// Appends `el`, overwriting the oldest element when full.
    pub fn push(&mut self, el: T) {
        if self.vec.len() < self.size {
            self.vec.push(el);
        } else if self.size > 0 {
            self.vec[self.i0] = el;
            self.i0 = (self.i0 + 1) % self.size;
        }
    }
}

impl<T> Index<usize> for RobinVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.vec[(index + self.i0) % self.vec.len()]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::ApproxEq;

    fn evaluated(x: &[f64], g: &[f64]) -> Location {
        let mut loc = Location::new(aview1(x), Needs { gradient: true, hessian: false });
        loc.f = 0.0;
        loc.gradient = Some(arr1(g));
        loc
    }

    #[test]
    fn robin() {
        let mut r = RobinVec::with_capacity(4);
        for i in 1..16 {
            r.push(i);
        }
        assert_eq!(r.len(), 4);
        for (i, &ri) in r.iter().enumerate() {
            assert_eq!(i + 12, ri);
            assert_eq!(ri, r[i]);
        }
        assert_eq!(r.newest(), Some(&15));
        r.clear();
        assert_eq!(r.newest(), None);
    }

    #[test]
    fn recursion_satisfies_the_secant_equation() {
        // f(x) = x0² + 5 x1², g = (2 x0, 10 x1)
        let mut l = LbfgsDirection::new(5);
        let mut dir = Array1::zeros(2);
        l.init_direction(&evaluated(&[1.0, 1.0], &[2.0, 10.0]), &mut dir);
        l.next_direction(&evaluated(&[0.5, -0.5], &[1.0, -5.0]), &mut dir);
        assert_eq!(l.hist.len(), 1);

        let s = arr1(&[-0.5, -1.5]);
        let mut q = arr1(&[-1.0, -15.0]);
        l.quasi_update(&mut q);
        for (a, b) in q.iter().zip(s.iter()) {
            assert!(a.approx_eq(*b, (1e-12, 8)));
        }
    }

    #[test]
    fn drops_pairs_with_negative_curvature() {
        let mut l = LbfgsDirection::new(5);
        let mut dir = Array1::zeros(1);
        l.init_direction(&evaluated(&[0.0], &[-1.0]), &mut dir);
        l.next_direction(&evaluated(&[1.0], &[-2.0]), &mut dir);
        assert_eq!(l.hist.len(), 0);
        assert_eq!(dir, arr1(&[2.0]));
    }
}
