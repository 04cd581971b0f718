extern crate ndarray;
extern crate unconstrained;

use ndarray::prelude::*;
use unconstrained::vector::NelderMeadBuilder;
use unconstrained::{local, Function, SettingsBuilder};

fn main() {
    let n = 5;
    let f = |x: ArrayView1<f64>| (&x - x.mean().unwrap_or(0.0)).mapv(f64::abs).sum();

    // Start from a simplex on the standard n-simplex instead of the default one around x0.
    let x0 = Array1::ones(n) / n as f64;
    let eps = 1f64 / n as f64;
    let mut vertices = vec![x0.clone()];
    for i in 0..n {
        let mut v = &x0 * (1.0 - eps);
        v[i] += eps;
        vertices.push(v);
    }
    let values: Vec<f64> = vertices.iter().map(|v| f.func(v.view())).collect();

    let mut nm = NelderMeadBuilder::default()
        .initial_vertices(vertices)
        .initial_values(values)
        .build()
        .unwrap();
    let settings = SettingsBuilder::default()
        .major_iterations(5000usize)
        .build()
        .unwrap();

    match local(&f, x0.view(), &settings, Some(&mut nm)) {
        Ok(res) => println!("{}", res),
        Err(err) => println!("{}", err),
    }
}
