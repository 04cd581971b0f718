//! This implementation of Nelder-Mead is based on
//!
//! Gao, F and Han, L. Implementing the Nelder-Mead simplex algorithm with
//! adaptive parameters. 2012. Computational Optimization and Applications.
//! 51:1, pp 259--277
//!
//! In particular, it adapts their suggestion to use adaptive step sizes,
//! which depend on the dimensionality of the optimization problem.
//!
//! # Use case
//!
//! The Nelder-Mead algorithm does not require a gradient or a hessian.
//! As a tradeoff it typically requires a lot of function evaluations to
//! find a minimum. Further, there are few theoretical results on the
//! convergence of Nelder-Mead iterations. The driver stops it through function
//! value convergence.
//!
//! # Examples
//!
//! ```
//! # extern crate ndarray;
//! # extern crate unconstrained;
//! # use ndarray::prelude::*;
//! # use unconstrained::{local, Settings, Status};
//! # use unconstrained::vector::NelderMeadBuilder;
//! let function =
//!     |x: ArrayView1<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
//! let mut minimizer = NelderMeadBuilder::default()
//!     .adaptive(true)
//!     .build()
//!     .unwrap();
//! let args = Array::from_vec(vec![3.0, -8.3]);
//! let res = local(&function, args.view(), &Settings::default(), Some(&mut minimizer)).unwrap();
//! assert_eq!(res.status, Status::FunctionConvergence);
//! println!("res: {}", res);
//! ```
use crate::errors::MethodError;
use crate::minimizer::{Evaluation, Location, Method, Needs, Operation};
use float_cmp::ApproxEqUlps;
use ndarray::prelude::*;
use std::cmp::Ordering;

/// Vertices paired with their function values, ordered by ascending value.
type Simplex = Vec<(f64, Array1<f64>)>;

const DEFAULT_SIMPLEX_SIZE: f64 = 0.05;

/// Orders two function values, treating values within `ulps` of each other as equal.
fn cmp_ulps(a: f64, b: f64, ulps: i64) -> Ordering {
    if a.approx_eq_ulps(&b, ulps) {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// A minimizer for a scalar function of one or more variables using the Nelder-Mead algorithm.
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct NelderMead {
    /// The required number of floating point representations that separate two numbers to consider them
    /// equal. See crate float_cmp for more information.
    pub ulps: i64,

    /// The vertices of the initial simplex. If set, `initial_values` must hold the function
    /// values at these `n + 1` vertices. Otherwise the simplex is built around the starting
    /// point with `simplex_size`.
    #[builder(setter(into))]
    pub initial_vertices: Option<Vec<Array1<f64>>>,
    #[builder(setter(into))]
    pub initial_values: Option<Vec<f64>>,

    /// The offset of the generated vertices from the starting point along each axis.
    /// Zero selects 0.05.
    pub simplex_size: f64,

    /// Adapt algorithm parameters to dimensionality of the problem. Useful for high-dimensional minimization.
    pub adaptive: bool,

    /// Reflection coefficient, greater than zero. Zero selects the default.
    pub reflection: f64,
    /// Expansion coefficient, greater than one. Zero selects the default.
    pub expansion: f64,
    /// Contraction coefficient, in (0, 1). Zero selects the default.
    pub contraction: f64,
    /// Shrink coefficient, in (0, 1). Zero selects the default.
    pub shrink: f64,

    #[builder(setter(skip))]
    state: SimplexState,
}

impl Default for NelderMead {
    fn default() -> Self {
        NelderMead {
            ulps: 1,
            initial_vertices: None,
            initial_values: None,
            simplex_size: DEFAULT_SIMPLEX_SIZE,
            adaptive: false,
            reflection: 0.0,
            expansion: 0.0,
            contraction: 0.0,
            shrink: 0.0,
            state: SimplexState::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    /// Evaluating the generated vertices.
    Initialize,
    Major,
    Reflected,
    Expanded,
    ContractedOutside,
    ContractedInside,
    /// Evaluating the shrunk vertices.
    Shrink,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Initialize
    }
}

#[derive(Clone, Debug, Default)]
struct SimplexState {
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
    simplex_size: f64,

    simplex: Simplex,
    /// Centroid of all vertices but the worst.
    centroid: Array1<f64>,
    /// The vertex being evaluated while initializing or shrinking.
    fill_idx: usize,
    stage: Stage,
    reflected: Array1<f64>,
    f_reflected: f64,
}

impl NelderMead {
    /// Helper function to keep the main loop clean. Resolves default values that can
    /// only be known after the dimension is.
    fn initialize_parameters(&self, n: usize) -> (f64, f64, f64, f64) {
        let (alpha, beta, gamma, delta) = if self.adaptive {
            let dim = n as f64;
            (1.0, 1.0 + 2.0 / dim, 0.75 - 1.0 / (2.0 * dim), 1.0 - 1.0 / dim)
        } else {
            (1.0, 2.0, 0.5, 0.5)
        };
        let pick = |set: f64, default: f64| if set == 0.0 { default } else { set };
        (
            pick(self.reflection, alpha),
            pick(self.expansion, beta),
            pick(self.contraction, gamma),
            pick(self.shrink, delta),
        )
    }

    /// Writes the next point to evaluate into `loc` and moves to `stage`.
    fn next(&mut self, stage: Stage, loc: &mut Location) -> Operation {
        let s = &mut self.state;
        s.stage = stage;
        let worst = s.simplex.len() - 1;
        let scale = match stage {
            Stage::Major => {
                // Report the best vertex for the convergence check.
                loc.x.assign(&s.simplex[0].1);
                loc.f = s.simplex[0].0;
                return Operation::MajorIteration;
            }
            Stage::Shrink => {
                // x_i = x_0 + δ (x_i - x_0)
                let (best, rest) = s.simplex.split_at(1);
                let x0 = &best[0].1;
                loc.x.assign(&rest[s.fill_idx - 1].1);
                loc.x -= x0;
                loc.x *= s.delta;
                loc.x += x0;
                return Operation::Evaluate(Evaluation::FUNC);
            }
            Stage::Initialize => panic!("neldermead: cannot return to initialization"),
            Stage::Reflected => s.alpha,
            Stage::Expanded => s.alpha * s.beta,
            Stage::ContractedOutside => s.alpha * s.gamma,
            Stage::ContractedInside => -s.gamma,
        };
        // x = c + scale (c - x_worst)
        loc.x.assign(&s.centroid);
        loc.x -= &s.simplex[worst].1;
        loc.x *= scale;
        loc.x += &s.centroid;
        if stage == Stage::Reflected {
            s.reflected.assign(&loc.x);
        }
        Operation::Evaluate(Evaluation::FUNC)
    }

    /// Replaces the worst vertex and updates the centroid efficiently, knowing only one value
    /// changed. Inserting a single value into a sorted simplex is O(n).
    fn lean_update(&mut self, xnew: ArrayView1<f64>, fnew: f64) {
        let ulps = self.ulps;
        let s = &mut self.state;
        let n = s.simplex.len() - 1;
        {
            let worst = &mut s.simplex[n];
            worst.0 = fnew;
            worst.1.assign(&xnew);
        }
        let mut i = n;
        while i > 0 && cmp_ulps(s.simplex[i - 1].0, fnew, ulps) != Ordering::Less {
            s.simplex.swap(i - 1, i);
            i -= 1;
        }
        // the vertex now at the end leaves the centroid, the new one enters
        s.centroid.scaled_add(-1.0 / n as f64, &s.simplex[n].1);
        s.centroid.scaled_add(1.0 / n as f64, &xnew);
    }

    /// Sorts the simplex and recomputes the centroid. O(n²).
    fn order_simplex(&mut self) {
        let ulps = self.ulps;
        let s = &mut self.state;
        s.simplex
            .sort_by(|&(fa, _), &(fb, _)| cmp_ulps(fa, fb, ulps));
        let n = s.simplex.len() - 1;
        s.centroid.fill(0.0);
        for (_, xi) in s.simplex.iter().take(n) {
            s.centroid += xi;
        }
        s.centroid /= n as f64;
    }
}

impl Method for NelderMead {
    fn needs(&self) -> Needs {
        Needs::default()
    }

    fn init(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        let n = loc.x.len();
        let (alpha, beta, gamma, delta) = self.initialize_parameters(n);
        let simplex_size = if self.simplex_size == 0.0 {
            DEFAULT_SIMPLEX_SIZE
        } else {
            self.simplex_size
        };
        self.state = SimplexState {
            alpha,
            beta,
            gamma,
            delta,
            simplex_size,
            centroid: Array1::zeros(n),
            reflected: Array1::zeros(n),
            ..SimplexState::default()
        };

        if let Some(ref vertices) = self.initial_vertices {
            let values = match self.initial_values {
                Some(ref values) => values,
                None => panic!("neldermead: initial vertices without initial values"),
            };
            if vertices.len() != n + 1 || values.len() != n + 1 {
                panic!("neldermead: initial simplex must have {} vertices", n + 1);
            }
            if vertices.iter().any(|v| v.len() != n) {
                panic!("neldermead: vertex size mismatch");
            }
            self.state.simplex = values.iter().cloned().zip(vertices.iter().cloned()).collect();
            self.order_simplex();
            return Ok(self.next(Stage::Major, loc));
        }

        // The starting point is the last vertex, the others are offset along each axis.
        let s = &mut self.state;
        s.simplex = vec![(f64::NAN, Array1::zeros(n)); n + 1];
        s.simplex[n] = (loc.f, loc.x.clone());
        s.fill_idx = 0;
        loc.x[0] += simplex_size;
        Ok(Operation::Evaluate(Evaluation::FUNC))
    }

    fn iterate(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        let n = loc.x.len();
        let op = match self.state.stage {
            Stage::Initialize => {
                let s = &mut self.state;
                s.simplex[s.fill_idx] = (loc.f, loc.x.clone());
                s.fill_idx += 1;
                if s.fill_idx == n {
                    self.order_simplex();
                    self.next(Stage::Major, loc)
                } else {
                    loc.x.assign(&s.simplex[n].1);
                    loc.x[s.fill_idx] += s.simplex_size;
                    Operation::Evaluate(Evaluation::FUNC)
                }
            }
            Stage::Major => self.next(Stage::Reflected, loc),
            Stage::Reflected => {
                let f = loc.f;
                self.state.f_reflected = f;
                let f_best = self.state.simplex[0].0;
                let f_second_worst = self.state.simplex[n - 1].0;
                let f_worst = self.state.simplex[n].0;
                if f >= f_best && f < f_second_worst {
                    self.lean_update(loc.x.view(), f);
                    self.next(Stage::Major, loc)
                } else if f < f_best {
                    // try expanding beyond the reflected point
                    self.next(Stage::Expanded, loc)
                } else if f < f_worst {
                    self.next(Stage::ContractedOutside, loc)
                } else {
                    self.next(Stage::ContractedInside, loc)
                }
            }
            Stage::Expanded => {
                if loc.f < self.state.f_reflected {
                    self.lean_update(loc.x.view(), loc.f);
                } else {
                    let reflected = self.state.reflected.clone();
                    let f_reflected = self.state.f_reflected;
                    self.lean_update(reflected.view(), f_reflected);
                }
                self.next(Stage::Major, loc)
            }
            Stage::ContractedOutside => {
                if loc.f <= self.state.f_reflected {
                    self.lean_update(loc.x.view(), loc.f);
                    self.next(Stage::Major, loc)
                } else {
                    self.state.fill_idx = 1;
                    self.next(Stage::Shrink, loc)
                }
            }
            Stage::ContractedInside => {
                if loc.f < self.state.simplex[n].0 {
                    self.lean_update(loc.x.view(), loc.f);
                    self.next(Stage::Major, loc)
                } else {
                    self.state.fill_idx = 1;
                    self.next(Stage::Shrink, loc)
                }
            }
            Stage::Shrink => {
                let s = &mut self.state;
                s.simplex[s.fill_idx] = (loc.f, loc.x.clone());
                s.fill_idx += 1;
                if s.fill_idx <= n {
                    self.next(Stage::Shrink, loc)
                } else {
                    self.order_simplex();
                    self.next(Stage::Major, loc)
                }
            }
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use float_cmp::ApproxEq;

    #[test]
    fn values_within_ulps_compare_equal() {
        let a = 1.0f64;
        let b = a + std::f64::EPSILON;
        assert_eq!(cmp_ulps(a, b, 1), Ordering::Equal);
        assert_eq!(cmp_ulps(a, b, 0), Ordering::Less);
        assert_eq!(cmp_ulps(2.0, 1.0, 4), Ordering::Greater);
        assert_eq!(cmp_ulps(-0.0, 0.0, 0), Ordering::Equal);
    }

    /// Runs the state machine by hand, evaluating `f` whenever asked, until `majors` major
    /// iterations have been reported.
    fn drive<F>(nm: &mut NelderMead, f: F, x0: &[f64], majors: usize) -> (Location, usize)
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        let mut loc = Location::new(aview1(x0), Needs::default());
        loc.f = f(loc.x.view());
        let mut evals = 1;
        let mut op = nm.init(&mut loc).unwrap();
        let mut count = 0;
        loop {
            match op {
                Operation::Evaluate(_) => {
                    loc.f = f(loc.x.view());
                    evals += 1;
                }
                Operation::MajorIteration => {
                    count += 1;
                    if count == majors {
                        return (loc, evals);
                    }
                }
            }
            op = nm.iterate(&mut loc).unwrap();
        }
    }

    #[test]
    fn simplex() {
        let function =
            |x: ArrayView1<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
        let mut minimizer = NelderMeadBuilder::default().build().unwrap();
        let (res, _) = drive(&mut minimizer, function, &[3.0, -8.3], 2000);
        println!("res: {}", res.x);
        assert!(res.x[0].approx_eq(1.0, (1e-4, 10)));
        assert!(res.x[1].approx_eq(1.0, (1e-4, 10)));
    }

    #[test]
    fn initial_simplex_costs_n_evaluations() {
        let f = |x: ArrayView1<f64>| x.dot(&x);
        let mut nm = NelderMead::default();
        let (loc, evals) = drive(&mut nm, f, &[1.0, 2.0, 3.0], 1);
        assert_eq!(evals, 4);
        // every offset vertex is worse than the starting point
        assert_eq!(loc.x, arr1(&[1.0, 2.0, 3.0]));
        assert_eq!(loc.f, 14.0);
    }

    #[test]
    fn supplied_simplex_reports_its_best_vertex() {
        let f = |x: ArrayView1<f64>| x.dot(&x);
        let vertices = vec![arr1(&[1.0, 1.0]), arr1(&[0.5, 0.0]), arr1(&[2.0, 0.0])];
        let values = vertices.iter().map(|v| f(v.view())).collect::<Vec<_>>();
        let mut nm = NelderMeadBuilder::default()
            .initial_vertices(vertices)
            .initial_values(values)
            .build()
            .unwrap();
        let mut loc = Location::new(aview1(&[1.0, 1.0]), Needs::default());
        loc.f = 2.0;
        assert_eq!(nm.init(&mut loc), Ok(Operation::MajorIteration));
        assert_eq!(loc.x, arr1(&[0.5, 0.0]));
        assert_eq!(loc.f, 0.25);
    }

    #[test]
    fn adaptive_parameters() {
        let nm = NelderMeadBuilder::default().adaptive(true).build().unwrap();
        let (alpha, beta, gamma, delta) = nm.initialize_parameters(4);
        assert_eq!((alpha, beta, gamma, delta), (1.0, 1.5, 0.625, 0.75));

        let nm = NelderMeadBuilder::default().expansion(3.0).build().unwrap();
        assert_eq!(nm.initialize_parameters(4), (1.0, 3.0, 0.5, 0.5));
    }

    #[test]
    fn centroid_tracks_replacements() {
        let f = |x: ArrayView1<f64>| (x[0] - 0.3).powi(2) + (x[1] + 0.2).powi(2);
        let mut nm = NelderMead::default();
        drive(&mut nm, f, &[1.0, 1.0], 25);
        let s = &nm.state;
        let n = s.simplex.len() - 1;
        let mut expected = Array1::<f64>::zeros(2);
        for (_, xi) in s.simplex.iter().take(n) {
            expected += xi;
        }
        expected /= n as f64;
        for (a, b) in s.centroid.iter().zip(expected.iter()) {
            assert!(a.approx_eq(*b, (1e-12, 4)));
        }
        for w in s.simplex.windows(2) {
            assert!(w[0].0 <= w[1].0);
        }
    }
}
