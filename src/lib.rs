//! Local minimization of unconstrained multivariate functions.
//!
//! Every algorithm implements the `Method` protocol and is run by `local`, which evaluates the
//! objective, counts evaluations, checks convergence and enforces limits the same way for all of
//! them.
//!
//! ```
//! # extern crate ndarray;
//! # extern crate unconstrained;
//! # use ndarray::prelude::*;
//! # use unconstrained::functions::Wood;
//! # use unconstrained::vector::LbfgsBuilder;
//! # use unconstrained::{local, SettingsBuilder, Status};
//! let settings = SettingsBuilder::default()
//!     .gradient_threshold(1e-8)
//!     .build()
//!     .unwrap();
//! let mut method = LbfgsBuilder::default().store(5usize).build().unwrap();
//! let x0 = arr1(&[-3.0, -1.0, -3.0, -1.0]);
//! let res = local(&Wood, x0.view(), &settings, Some(&mut method)).unwrap();
//! assert_eq!(res.status, Status::GradientThreshold);
//! ```

#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate log;

extern crate faer;
extern crate float_cmp;
extern crate ndarray;
extern crate thiserror;

pub mod errors;
pub mod function;
pub mod functions;
mod linalg;
pub mod linesearch;
mod local;
pub mod minimizer;
pub mod settings;
pub mod utils;
pub mod vector;

pub use crate::errors::{Error, MethodError};
pub use crate::function::{Function, Gradient, Hessian, NumericalGradient};
pub use crate::local::local;
pub use crate::minimizer::{Evaluation, Location, Method, Needs, Operation, OptimResult, Stats,
                           Status};
pub use crate::settings::{FunctionConverge, FunctionConvergeBuilder, Settings, SettingsBuilder};
