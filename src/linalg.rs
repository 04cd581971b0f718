//! Dense symmetric matrix helpers used by the Newton and BFGS methods.
use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};
use ndarray::prelude::*;

/// Solves `a x = b` through the Cholesky factorization of the lower triangle of `a`. Returns
/// `None` if `a` is not numerically positive definite.
pub(crate) fn cholesky_solve(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let mat = Mat::from_fn(n, n, |i, j| a[[i, j]]);
    let llt = Llt::new(mat.as_ref(), Side::Lower).ok()?;
    let mut rhs = Mat::from_fn(n, 1, |i, _| b[i]);
    llt.solve_in_place(rhs.as_mut());
    let x = Array1::from_shape_fn(n, |i| rhs[(i, 0)]);
    if x.iter().all(|xi| xi.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// `a += alpha * x xᵀ`
pub(crate) fn sym_rank_one(a: &mut Array2<f64>, alpha: f64, x: ArrayView1<f64>) {
    for ((i, j), aij) in a.indexed_iter_mut() {
        *aij += alpha * (x[i] * x[j]);
    }
}

/// `a += alpha * (x yᵀ + y xᵀ)`
pub(crate) fn sym_rank_two(a: &mut Array2<f64>, alpha: f64, x: ArrayView1<f64>, y: ArrayView1<f64>) {
    for ((i, j), aij) in a.indexed_iter_mut() {
        *aij += alpha * (x[i] * y[j] + y[i] * x[j]);
    }
}

/// Euclidean norm.
pub(crate) fn norm2(x: ArrayView1<f64>) -> f64 {
    x.dot(&x).sqrt()
}

/// Infinity norm.
pub(crate) fn norm_inf(x: ArrayView1<f64>) -> f64 {
    x.fold(0f64, |acc, xi| acc.max(xi.abs()))
}
