extern crate ndarray;
extern crate unconstrained;

use ndarray::prelude::*;
use unconstrained::functions::ExtendedRosenbrock;
use unconstrained::linesearch::Backtracking;
use unconstrained::vector::{Bfgs, Cg, CgBuilder, CgVariant, GradientDescentBuilder, Lbfgs,
                            NelderMead, Newton};
use unconstrained::{local, Method, SettingsBuilder};

fn main() {
    let settings = SettingsBuilder::default()
        .gradient_threshold(1e-8)
        .major_iterations(100_000usize)
        .build()
        .unwrap();
    let x0 = arr1(&[-1.2, 1.0, -1.2, 1.0]);

    let methods: Vec<(&str, Box<dyn Method>)> = vec![
        ("bfgs", Box::new(Bfgs::default()) as Box<dyn Method>),
        ("lbfgs", Box::new(Lbfgs::default())),
        ("cg", Box::new(Cg::default())),
        (
            "cg (polak-ribiere)",
            Box::new(
                CgBuilder::default()
                    .variant(CgVariant::PolakRibierePolyak)
                    .build()
                    .unwrap(),
            ),
        ),
        ("newton", Box::new(Newton::default())),
        (
            "gradient descent",
            Box::new(
                GradientDescentBuilder::default()
                    .linesearcher(Backtracking::default())
                    .build()
                    .unwrap(),
            ),
        ),
        ("nelder-mead", Box::new(NelderMead::default())),
    ];

    for (name, mut method) in methods {
        match local(&ExtendedRosenbrock, x0.view(), &settings, Some(&mut *method)) {
            Ok(res) => println!("{}\n{}\n", name, res),
            Err(err) => println!("{}: {}\n", name, err),
        }
    }
}
