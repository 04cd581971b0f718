//! Bisection brackets a minimum along the search direction and halves the bracket until the
//! strong Wolfe curvature condition holds at a point with the lowest function value seen.
//! The gradient is only evaluated at trial points that lowered the function.
use super::{strong_wolfe_conditions_met, LinesearchStep, Linesearcher};
use crate::errors::MethodError;
use crate::minimizer::Evaluation;

const DEFAULT_GRAD_CONST: f64 = 0.9;

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct Bisection {
    /// The curvature constant of the strong Wolfe condition. Must be in (0, 1).
    /// Zero selects 0.9.
    pub grad_const: f64,

    #[builder(setter(skip))]
    state: BisectionState,
}

#[derive(Clone, Debug, Default)]
struct BisectionState {
    min_step: f64,
    max_step: f64,
    curr_step: f64,

    init_f: f64,
    min_f: f64,
    max_f: f64,
    last_f: f64,

    init_grad: f64,
    last_eval: Evaluation,
}

impl Default for Bisection {
    fn default() -> Self {
        Bisection {
            grad_const: DEFAULT_GRAD_CONST,
            state: BisectionState::default(),
        }
    }
}

impl Bisection {
    pub fn new(grad_const: f64) -> Self {
        Bisection {
            grad_const,
            ..Bisection::default()
        }
    }

    /// Moves to `step`. A step equal to the current one means the bracket has collapsed.
    fn next_step(&mut self, step: f64) -> Result<LinesearchStep, MethodError> {
        let s = &mut self.state;
        if s.curr_step == step {
            s.last_eval = Evaluation::NONE;
            return Err(MethodError::LinesearcherFailure);
        }
        s.curr_step = step;
        s.last_eval = Evaluation::FUNC;
        Ok(LinesearchStep::Evaluate(Evaluation::FUNC, step))
    }
}

impl Linesearcher for Bisection {
    fn init(&mut self, f: f64, proj_grad: f64, step: f64) -> Evaluation {
        if step <= 0.0 {
            panic!("bisection: bad step size {}", step);
        }
        if proj_grad >= 0.0 {
            panic!("bisection: initial derivative is non-negative");
        }
        if self.grad_const == 0.0 {
            self.grad_const = DEFAULT_GRAD_CONST;
        }
        if self.grad_const <= 0.0 || self.grad_const >= 1.0 {
            panic!("bisection: grad_const not between 0 and 1");
        }

        self.state = BisectionState {
            min_step: 0.0,
            max_step: f64::INFINITY,
            curr_step: step,
            init_f: f,
            min_f: f,
            max_f: f64::NAN,
            last_f: f64::NAN,
            init_grad: proj_grad,
            last_eval: Evaluation::FUNC,
        };
        Evaluation::FUNC
    }

    fn iterate(&mut self, f: f64, g: f64) -> Result<LinesearchStep, MethodError> {
        let last_eval = self.state.last_eval;
        if last_eval != Evaluation::FUNC && last_eval != Evaluation::GRAD {
            panic!("bisection: init has not been called");
        }

        let s = &mut self.state;
        let mut min_f = s.init_f;
        if s.max_f < min_f {
            min_f = s.max_f;
        }
        if s.min_f < min_f {
            min_f = s.min_f;
        }

        if last_eval == Evaluation::FUNC {
            // A lower value is worth a gradient evaluation. Otherwise the trial step becomes the
            // upper bound of the bracket or replaces the worse end of it.
            if f <= min_f {
                s.last_f = f;
                s.last_eval = Evaluation::GRAD;
                return Ok(LinesearchStep::Evaluate(Evaluation::GRAD, s.curr_step));
            }
            if s.max_step.is_infinite() {
                s.max_step = s.curr_step;
                s.max_f = f;
                let mid = (s.min_step + s.max_step) / 2.0;
                return self.next_step(mid);
            }
            if s.min_f <= s.max_f {
                s.max_step = s.curr_step;
                s.max_f = f;
            } else {
                s.min_step = s.curr_step;
                s.min_f = f;
            }
            let mid = (s.min_step + s.max_step) / 2.0;
            return self.next_step(mid);
        }

        let f = s.last_f;
        if strong_wolfe_conditions_met(f, g, min_f, s.init_grad, s.curr_step, 0.0, self.grad_const) {
            s.last_eval = Evaluation::NONE;
            return Ok(LinesearchStep::Finished(s.curr_step));
        }

        if s.max_step.is_infinite() {
            // The value is lower. A positive slope bounds the minimum, a negative one means the
            // minimum is further along the direction.
            if g > 0.0 {
                s.max_step = s.curr_step;
                s.max_f = f;
                let mid = (s.min_step + s.max_step) / 2.0;
                return self.next_step(mid);
            }
            s.min_step = s.curr_step;
            s.min_f = f;
            let double = s.curr_step * 2.0;
            return self.next_step(double);
        }

        // Bracketed with a new lowest value: the slope decides which end moves.
        if g < 0.0 {
            s.min_step = s.curr_step;
            s.min_f = f;
        } else {
            s.max_step = s.curr_step;
            s.max_f = f;
        }
        let mid = (s.min_step + s.max_step) / 2.0;
        self.next_step(mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::ApproxEq;

    /// Runs a bisection on `phi` with derivative `dphi` and returns the accepted step.
    fn search<P, D>(b: &mut Bisection, phi: P, dphi: D, step: f64) -> Result<f64, MethodError>
    where
        P: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let mut eval = b.init(phi(0.0), dphi(0.0), step);
        let mut a = step;
        for _ in 0..5000 {
            let (f, g) = if eval.grad {
                (f64::NAN, dphi(a))
            } else {
                (phi(a), f64::NAN)
            };
            match b.iterate(f, g)? {
                LinesearchStep::Evaluate(e, s) => {
                    eval = e;
                    a = s;
                }
                LinesearchStep::Finished(s) => return Ok(s),
            }
        }
        panic!("bisection did not terminate");
    }

    #[test]
    fn expands_then_brackets() {
        // minimum at a = 3
        let phi = |a: f64| (a - 3.0).powi(2);
        let dphi = |a: f64| 2.0 * (a - 3.0);
        let mut b = BisectionBuilder::default().grad_const(0.1).build().unwrap();
        let a = search(&mut b, phi, dphi, 1.0).unwrap();
        assert!(dphi(a).abs() <= 0.1 * dphi(0.0).abs());
        assert!(a.approx_eq(3.0, (0.6, 0)));
    }

    #[test]
    fn shrinks_an_overlong_step() {
        let phi = |a: f64| (a - 0.01).powi(2);
        let dphi = |a: f64| 2.0 * (a - 0.01);
        let mut b = Bisection::default();
        let a = search(&mut b, phi, dphi, 1.0).unwrap();
        assert!(phi(a) < phi(0.0));
        assert!(dphi(a).abs() <= 0.9 * dphi(0.0).abs());
    }

    #[test]
    fn collapsed_bracket_fails() {
        // a descent direction along which the function jumps up immediately
        let phi = |a: f64| if a == 0.0 { 0.0 } else { 1.0 };
        let dphi = |_: f64| -1.0;
        let mut b = Bisection::default();
        assert_eq!(search(&mut b, phi, dphi, 1.0), Err(MethodError::LinesearcherFailure));
    }
}
