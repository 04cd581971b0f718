//! Algorithms that search for local minima of functions along multiple dimensions.
//!
//! Every method here implements `Method` and is configured through its builder. The gradient
//! based methods combine a direction rule with one of the line searches in `linesearch`.

mod bfgs;
mod cg;
mod gradient_descent;
mod l_bfgs;
mod nelder_mead;
mod newton;

pub use self::bfgs::{Bfgs, BfgsBuilder};
pub use self::cg::{Cg, CgBuilder, CgVariant};
pub use self::gradient_descent::{GradientDescent, GradientDescentBuilder};
pub use self::l_bfgs::{Lbfgs, LbfgsBuilder};
pub use self::nelder_mead::{NelderMead, NelderMeadBuilder};
pub use self::newton::{Newton, NewtonBuilder};
