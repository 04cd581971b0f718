//! Standard test problems for unconstrained minimization.
//!
//! Most come from
//!
//! Moré, J., Garbow, B. S., Hillstrom, K. E.: Testing unconstrained optimization software.
//! ACM Transactions on Mathematical Software 7 (1981), pp. 17-41.
//!
//! Each problem documents its standard starting point and known minima. Problems of fixed
//! dimension panic when evaluated at a point of another dimension.
use crate::function::{Function, Gradient, Hessian};
use ndarray::prelude::*;

fn check_dim(x: ArrayView1<f64>, dim: usize) {
    if x.len() != dim {
        panic!("functions: dimension of the problem must be {}", dim);
    }
}

/// `f(x) = |x|²`, minimal at the origin.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bowl;

impl Function for Bowl {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        x.dot(&x)
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
    fn hessian(&self) -> Option<&dyn Hessian> {
        Some(self)
    }
}

impl Gradient for Bowl {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        2.0 * &x
    }
}

impl Hessian for Bowl {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64> {
        Array2::eye(x.len()) * 2.0
    }
}

/// Beale's function, two variables.
///
/// Standard starting point: `[1, 1]`. Minimum `f = 0` at `[3, 0.5]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Beale;

const BEALE_C: [f64; 3] = [1.5, 2.25, 2.625];

impl Function for Beale {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        check_dim(x, 2);
        BEALE_C
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let r = c - x[0] * (1.0 - x[1].powi(i as i32 + 1));
                r * r
            })
            .sum()
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
    fn hessian(&self) -> Option<&dyn Hessian> {
        Some(self)
    }
}

impl Gradient for Beale {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        check_dim(x, 2);
        let mut g = Array1::zeros(2);
        for (k, c) in BEALE_C.iter().enumerate() {
            let i = k as i32 + 1;
            let r = c - x[0] * (1.0 - x[1].powi(i));
            g[0] -= 2.0 * r * (1.0 - x[1].powi(i));
            g[1] += 2.0 * r * x[0] * f64::from(i) * x[1].powi(i - 1);
        }
        g
    }
}

impl Hessian for Beale {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64> {
        check_dim(x, 2);
        let mut h = Array2::zeros((2, 2));
        for (k, c) in BEALE_C.iter().enumerate() {
            let i = k as i32 + 1;
            let fi = f64::from(i);
            let t = 1.0 - x[1].powi(i);
            let r = c - x[0] * t;
            let dy = x[0] * fi * x[1].powi(i - 1);
            h[[0, 0]] += 2.0 * t * t;
            h[[0, 1]] += 2.0 * fi * x[1].powi(i - 1) * (r - x[0] * t);
            h[[1, 1]] += 2.0 * dy * dy;
            if i > 1 {
                h[[1, 1]] += 2.0 * r * x[0] * fi * (fi - 1.0) * x[1].powi(i - 2);
            }
        }
        h[[1, 0]] = h[[0, 1]];
        h
    }
}

/// The Rosenbrock function extended to any dimension of at least two,
/// `f(x) = Σ 100 (x[i+1] - x[i]²)² + (1 - x[i])²`.
///
/// Standard starting point: `[-1.2, 1]` for two variables. Minimum `f = 0` at `[1, ..., 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedRosenbrock;

impl Function for ExtendedRosenbrock {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        x.windows(2)
            .into_iter()
            .map(|w| {
                let a = w[1] - w[0] * w[0];
                let b = 1.0 - w[0];
                100.0 * a * a + b * b
            })
            .sum()
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
    fn hessian(&self) -> Option<&dyn Hessian> {
        Some(self)
    }
}

impl Gradient for ExtendedRosenbrock {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let n = x.len();
        let mut g = Array1::zeros(n);
        for i in 0..n - 1 {
            let a = x[i + 1] - x[i] * x[i];
            g[i] += -400.0 * x[i] * a - 2.0 * (1.0 - x[i]);
            g[i + 1] += 200.0 * a;
        }
        g
    }
}

impl Hessian for ExtendedRosenbrock {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64> {
        let n = x.len();
        let mut h = Array2::zeros((n, n));
        for i in 0..n - 1 {
            h[[i, i]] += 1200.0 * x[i] * x[i] - 400.0 * x[i + 1] + 2.0;
            h[[i, i + 1]] -= 400.0 * x[i];
            h[[i + 1, i]] -= 400.0 * x[i];
            h[[i + 1, i + 1]] += 200.0;
        }
        h
    }
}

/// Brown's badly scaled function, two variables.
///
/// Standard starting point: `[1, 1]`. Minimum `f = 0` at `[1e6, 2e-6]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrownBadlyScaled;

impl Function for BrownBadlyScaled {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        check_dim(x, 2);
        let f1 = x[0] - 1e6;
        let f2 = x[1] - 2e-6;
        let f3 = x[0] * x[1] - 2.0;
        f1 * f1 + f2 * f2 + f3 * f3
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
    fn hessian(&self) -> Option<&dyn Hessian> {
        Some(self)
    }
}

impl Gradient for BrownBadlyScaled {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        check_dim(x, 2);
        let f1 = x[0] - 1e6;
        let f2 = x[1] - 2e-6;
        let f3 = x[0] * x[1] - 2.0;
        arr1(&[2.0 * f1 + 2.0 * f3 * x[1], 2.0 * f2 + 2.0 * f3 * x[0]])
    }
}

impl Hessian for BrownBadlyScaled {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64> {
        check_dim(x, 2);
        let h01 = 4.0 * x[0] * x[1] - 4.0;
        arr2(&[[2.0 + 2.0 * x[1] * x[1], h01], [h01, 2.0 + 2.0 * x[0] * x[0]]])
    }
}

/// Powell's badly scaled function, two variables.
///
/// Standard starting point: `[0, 1]`. Minimum `f = 0` at `[1.098159e-5, 9.106146]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PowellBadlyScaled;

impl Function for PowellBadlyScaled {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        check_dim(x, 2);
        let f1 = 1e4 * x[0] * x[1] - 1.0;
        let f2 = (-x[0]).exp() + (-x[1]).exp() - 1.0001;
        f1 * f1 + f2 * f2
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
    fn hessian(&self) -> Option<&dyn Hessian> {
        Some(self)
    }
}

impl Gradient for PowellBadlyScaled {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        check_dim(x, 2);
        let f1 = 1e4 * x[0] * x[1] - 1.0;
        let f2 = (-x[0]).exp() + (-x[1]).exp() - 1.0001;
        arr1(&[
            2.0 * (1e4 * f1 * x[1] - f2 * (-x[0]).exp()),
            2.0 * (1e4 * f1 * x[0] - f2 * (-x[1]).exp()),
        ])
    }
}

impl Hessian for PowellBadlyScaled {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64> {
        check_dim(x, 2);
        let f2 = (-x[0]).exp() + (-x[1]).exp() - 1.0001;
        let e0 = (-x[0]).exp();
        let e1 = (-x[1]).exp();
        let h00 = 2.0 * (1e8 * x[1] * x[1] + e0 * (e0 + f2));
        let h11 = 2.0 * (1e8 * x[0] * x[0] + e1 * (e1 + f2));
        let h01 = 2.0 * (1e4 * (2e4 * x[0] * x[1] - 1.0) + e0 * e1);
        arr2(&[[h00, h01], [h01, h11]])
    }
}

/// Wood's function, four variables.
///
/// Standard starting point: `[-3, -1, -3, -1]`. Minimum `f = 0` at `[1, 1, 1, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Wood;

impl Function for Wood {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        check_dim(x, 4);
        let f1 = x[1] - x[0] * x[0];
        let f2 = 1.0 - x[0];
        let f3 = x[3] - x[2] * x[2];
        let f4 = 1.0 - x[2];
        let f5 = x[1] + x[3] - 2.0;
        let f6 = x[1] - x[3];
        100.0 * f1 * f1 + f2 * f2 + 90.0 * f3 * f3 + f4 * f4 + 10.0 * f5 * f5 + 0.1 * f6 * f6
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
    fn hessian(&self) -> Option<&dyn Hessian> {
        Some(self)
    }
}

impl Gradient for Wood {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        check_dim(x, 4);
        let f1 = x[1] - x[0] * x[0];
        let f2 = 1.0 - x[0];
        let f3 = x[3] - x[2] * x[2];
        let f4 = 1.0 - x[2];
        let f5 = x[1] + x[3] - 2.0;
        let f6 = x[1] - x[3];
        arr1(&[
            -400.0 * x[0] * f1 - 2.0 * f2,
            200.0 * f1 + 20.0 * f5 + 0.2 * f6,
            -360.0 * x[2] * f3 - 2.0 * f4,
            180.0 * f3 + 20.0 * f5 - 0.2 * f6,
        ])
    }
}

impl Hessian for Wood {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64> {
        check_dim(x, 4);
        let mut h = Array2::zeros((4, 4));
        h[[0, 0]] = 1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0;
        h[[0, 1]] = -400.0 * x[0];
        h[[1, 1]] = 220.2;
        h[[1, 3]] = 19.8;
        h[[2, 2]] = 1080.0 * x[2] * x[2] - 360.0 * x[3] + 2.0;
        h[[2, 3]] = -360.0 * x[2];
        h[[3, 3]] = 200.2;
        h[[1, 0]] = h[[0, 1]];
        h[[3, 1]] = h[[1, 3]];
        h[[3, 2]] = h[[2, 3]];
        h
    }
}

/// The helical valley function, three variables.
///
/// Standard starting point: `[-1, 0, 0]`. Minimum `f = 0` at `[1, 0, 0]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HelicalValley;

fn helical_theta(x: ArrayView1<f64>) -> f64 {
    let mut theta = 0.5 * (x[1] / x[0]).atan() / std::f64::consts::PI;
    if x[0] < 0.0 {
        theta += 0.5;
    }
    theta
}

impl Function for HelicalValley {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        check_dim(x, 3);
        let f1 = 10.0 * (x[2] - 10.0 * helical_theta(x));
        let f2 = 10.0 * (x[0].hypot(x[1]) - 1.0);
        let f3 = x[2];
        f1 * f1 + f2 * f2 + f3 * f3
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
}

impl Gradient for HelicalValley {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        check_dim(x, 3);
        let h = x[0].hypot(x[1]);
        let r = 1.0 / h;
        let q = r * r / std::f64::consts::PI;
        let s = x[2] - 10.0 * helical_theta(x);
        arr1(&[
            200.0 * (5.0 * s * q * x[1] + (h - 1.0) * r * x[0]),
            200.0 * (-5.0 * s * q * x[0] + (h - 1.0) * r * x[1]),
            2.0 * (x[2] + 100.0 * s),
        ])
    }
}

/// The variably dimensioned function, any dimension,
/// `f(x) = Σ (x[i] - 1)² + s² + s⁴` with `s = Σ (i + 1) (x[i] - 1)`.
///
/// Standard starting point: `x[i] = 1 - (i + 1) / n`. Minimum `f = 0` at `[1, ..., 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct VariablyDimensioned;

fn weighted_residual(x: ArrayView1<f64>) -> f64 {
    x.iter()
        .enumerate()
        .map(|(i, xi)| (i + 1) as f64 * (xi - 1.0))
        .sum()
}

impl Function for VariablyDimensioned {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        let s = weighted_residual(x);
        let sq = x.iter().map(|xi| (xi - 1.0) * (xi - 1.0)).sum::<f64>();
        sq + s * s + s.powi(4)
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
    fn hessian(&self) -> Option<&dyn Hessian> {
        Some(self)
    }
}

impl Gradient for VariablyDimensioned {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let s = weighted_residual(x);
        let ds = 2.0 * s + 4.0 * s.powi(3);
        Array1::from_shape_fn(x.len(), |i| 2.0 * (x[i] - 1.0) + ds * (i + 1) as f64)
    }
}

impl Hessian for VariablyDimensioned {
    fn hess(&self, x: ArrayView1<f64>) -> Array2<f64> {
        let s = weighted_residual(x);
        let d2s = 2.0 + 12.0 * s * s;
        Array2::from_shape_fn((x.len(), x.len()), |(i, j)| {
            let diag = if i == j { 2.0 } else { 0.0 };
            diag + d2s * ((i + 1) * (j + 1)) as f64
        })
    }
}

/// The Brown and Dennis function, four variables and twenty residuals.
///
/// Standard starting point: `[25, 5, -5, -1]`. Minimum `f ≈ 85822.2` at approximately
/// `[-11.594, 13.204, -0.403, 0.237]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrownAndDennis;

/// The two parts of the `i`th residual, `a² + b²`.
fn brown_dennis_parts(x: ArrayView1<f64>, i: usize) -> (f64, f64, f64) {
    let t = (i + 1) as f64 / 5.0;
    let a = x[0] + t * x[1] - t.exp();
    let b = x[2] + x[3] * t.sin() - t.cos();
    (a, b, t)
}

impl Function for BrownAndDennis {
    fn func(&self, x: ArrayView1<f64>) -> f64 {
        check_dim(x, 4);
        (0..20)
            .map(|i| {
                let (a, b, _) = brown_dennis_parts(x, i);
                let f = a * a + b * b;
                f * f
            })
            .sum()
    }
    fn gradient(&self) -> Option<&dyn Gradient> {
        Some(self)
    }
}

impl Gradient for BrownAndDennis {
    fn grad(&self, x: ArrayView1<f64>) -> Array1<f64> {
        check_dim(x, 4);
        let mut g = Array1::zeros(4);
        for i in 0..20 {
            let (a, b, t) = brown_dennis_parts(x, i);
            let f = a * a + b * b;
            g[0] += 4.0 * f * a;
            g[1] += 4.0 * f * a * t;
            g[2] += 4.0 * f * b;
            g[3] += 4.0 * f * b * t.sin();
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::ApproxEq;

    /// Central differences of `f`, exact for quadratics up to rounding.
    fn central<F: Fn(ArrayView1<f64>) -> f64>(x: ArrayView1<f64>, f: F) -> Array1<f64> {
        let mut xp = x.to_owned();
        Array1::from_shape_fn(x.len(), |k| {
            let h = 1e-5 * x[k].abs().max(1.0);
            xp[k] = x[k] + h;
            let fp = f(xp.view());
            xp[k] = x[k] - h;
            let fm = f(xp.view());
            xp[k] = x[k];
            (fp - fm) / (2.0 * h)
        })
    }

    fn assert_close(a: ArrayView1<f64>, b: ArrayView1<f64>) {
        for (ai, bi) in a.iter().zip(b.iter()) {
            let tol = 1e-5 * ai.abs().max(bi.abs()).max(1.0);
            assert!(ai.approx_eq(*bi, (tol, 4)), "{} != {}", a, b);
        }
    }

    /// Checks the gradient against differences of the function, and each Hessian row against
    /// differences of the gradient.
    fn check_derivatives(f: &dyn Function, x: &[f64]) {
        let x = arr1(x);
        let g = f.gradient().unwrap();
        let numerical = central(x.view(), |y| f.func(y));
        assert_close(g.grad(x.view()).view(), numerical.view());

        if let Some(h) = f.hessian() {
            let hx = h.hess(x.view());
            assert_eq!(hx, hx.t());
            for k in 0..x.len() {
                let numerical = central(x.view(), |y| g.grad(y)[k]);
                assert_close(hx.row(k), numerical.view());
            }
        }
    }

    #[test]
    fn derivatives() {
        check_derivatives(&Bowl, &[1.0, -2.0, 0.5]);
        check_derivatives(&Beale, &[1.0, 1.0]);
        check_derivatives(&Beale, &[0.3, -0.7]);
        check_derivatives(&ExtendedRosenbrock, &[-1.2, 1.0]);
        check_derivatives(&ExtendedRosenbrock, &[0.5, -0.3, 1.1, 0.8]);
        // f is about 1e12 at the standard starting point, too large to difference
        check_derivatives(&BrownBadlyScaled, &[1e6 + 0.5, 1e-6]);
        check_derivatives(&PowellBadlyScaled, &[0.5, 0.8]);
        check_derivatives(&Wood, &[-3.0, -1.0, -3.0, -1.0]);
        check_derivatives(&HelicalValley, &[-1.0, 0.5, 0.2]);
        check_derivatives(&VariablyDimensioned, &[0.75, 0.5, 0.25, 0.0]);
        check_derivatives(&BrownAndDennis, &[1.0, 0.5, -0.5, 0.1]);
    }

    #[test]
    fn known_minima() {
        assert_eq!(Beale.func(aview1(&[3.0, 0.5])), 0.0);
        assert_eq!(ExtendedRosenbrock.func(aview1(&[1.0; 5])), 0.0);
        assert_eq!(Wood.func(aview1(&[1.0; 4])), 0.0);
        assert_eq!(HelicalValley.func(aview1(&[1.0, 0.0, 0.0])), 0.0);
        assert_eq!(VariablyDimensioned.func(aview1(&[1.0; 6])), 0.0);
        assert_eq!(Bowl.grad(aview1(&[0.0, 0.0])), arr1(&[0.0, 0.0]));
    }

    #[test]
    #[should_panic]
    fn fixed_dimension() {
        Wood.func(aview1(&[1.0, 1.0]));
    }
}
