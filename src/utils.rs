use ndarray::prelude::*;

/// Forward difference approximation of the gradient of `func` at `xk`.
///
/// The step along coordinate `k` is `epsilon * max(1, |xk[k]|)`, so that the perturbation stays
/// representable for large coordinates. Requires `xk.len() + 1` function evaluations.
pub fn approx_fprime<F>(xk: ArrayView1<f64>, func: F, epsilon: f64) -> Array1<f64>
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    let f0 = func(xk);
    let n = xk.len();
    let mut grad = Array1::<f64>::zeros(n);
    let mut xp = xk.to_owned();
    for k in 0..n {
        let h = epsilon * xk[k].abs().max(1.0);
        xp[k] = xk[k] + h;
        // the step actually taken after rounding
        let dh = xp[k] - xk[k];
        grad[k] = (func(xp.view()) - f0) / dh;
        xp[k] = xk[k];
    }
    grad
}

/// Returns `true` if `a` and `b` are equal element by element.
pub fn all_equal(a: ArrayView1<f64>, b: ArrayView1<f64>) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(ai, bi)| ai == bi)
}

#[cfg(test)]
mod tests {

    use super::*;
    use float_cmp::ApproxEq;

    #[test]
    fn gradient() {
        let function = |x: ArrayView1<f64>| 1.0 * x[0].powi(2) + 200. * x[1].powi(2);
        let x = Array::from_vec(vec![1.0, 1.0]);
        let res = approx_fprime(x.view(), function, 1e-7);

        println!("Res: {}", res);
        assert!(res[0].approx_eq(2.0, (1e-4, 10)));
        assert!(res[1].approx_eq(400.0, (1e-3, 10)));
    }

    #[test]
    fn equality_is_exact() {
        let a = arr1(&[1.0, 2.0]);
        let b = arr1(&[1.0, 2.0 + 1e-15]);
        assert!(all_equal(a.view(), a.view()));
        assert!(!all_equal(a.view(), b.view()));
    }
}
