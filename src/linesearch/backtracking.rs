//! Backtracking shrinks the trial step by a constant factor until the Armijo sufficient decrease
//! condition holds. It never evaluates the gradient during the search.
use super::{armijo_condition_met, LinesearchStep, Linesearcher};
use crate::errors::MethodError;
use crate::minimizer::Evaluation;

const DEFAULT_DECREASE: f64 = 0.5;
const DEFAULT_FUN_CONST: f64 = 1e-4;
const MINIMUM_STEP_SIZE: f64 = 1e-20;

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct Backtracking {
    /// The factor the step is multiplied with after a rejected trial. Must be in (0, 1).
    /// Zero selects 0.5.
    pub decrease: f64,

    /// The sufficient decrease constant of the Armijo condition. Must be in (0, 1).
    /// Zero selects 1e-4.
    pub fun_const: f64,

    #[builder(setter(skip))]
    step: f64,
    #[builder(setter(skip))]
    init_f: f64,
    #[builder(setter(skip))]
    init_g: f64,
}

impl Default for Backtracking {
    fn default() -> Self {
        Backtracking {
            decrease: DEFAULT_DECREASE,
            fun_const: DEFAULT_FUN_CONST,
            step: 0.0,
            init_f: 0.0,
            init_g: 0.0,
        }
    }
}

impl Linesearcher for Backtracking {
    fn init(&mut self, f: f64, proj_grad: f64, step: f64) -> Evaluation {
        if step <= 0.0 {
            panic!("backtracking: bad step size {}", step);
        }
        if proj_grad >= 0.0 {
            panic!("backtracking: initial derivative is non-negative");
        }
        if self.decrease == 0.0 {
            self.decrease = DEFAULT_DECREASE;
        }
        if self.fun_const == 0.0 {
            self.fun_const = DEFAULT_FUN_CONST;
        }
        if self.decrease <= 0.0 || self.decrease >= 1.0 {
            panic!("backtracking: decrease must be between 0 and 1");
        }
        if self.fun_const <= 0.0 || self.fun_const >= 1.0 {
            panic!("backtracking: fun_const must be between 0 and 1");
        }

        self.step = step;
        self.init_f = f;
        self.init_g = proj_grad;
        Evaluation::FUNC
    }

    fn iterate(&mut self, f: f64, _: f64) -> Result<LinesearchStep, MethodError> {
        if armijo_condition_met(f, self.init_f, self.init_g, self.step, self.fun_const) {
            return Ok(LinesearchStep::Finished(self.step));
        }
        self.step *= self.decrease;
        if self.step < MINIMUM_STEP_SIZE {
            return Err(MethodError::LinesearcherFailure);
        }
        Ok(LinesearchStep::Evaluate(Evaluation::FUNC, self.step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_until_sufficient_decrease() {
        // phi(a) = (a - 0.1)^2 - 0.01, phi(0) = 0, phi'(0) = -0.2
        let phi = |a: f64| (a - 0.1).powi(2) - 0.01;
        let mut b = Backtracking::default();
        assert_eq!(b.init(0.0, -0.2, 1.0), Evaluation::FUNC);
        let mut step = 1.0;
        let accepted = loop {
            match b.iterate(phi(step), f64::NAN).unwrap() {
                LinesearchStep::Evaluate(e, s) => {
                    assert_eq!(e, Evaluation::FUNC);
                    assert_eq!(s, step / 2.0);
                    step = s;
                }
                LinesearchStep::Finished(s) => break s,
            }
        };
        assert_eq!(accepted, 0.125);
    }

    #[test]
    fn fails_below_minimum_step() {
        let mut b = BacktrackingBuilder::default().fun_const(0.5).build().unwrap();
        b.init(0.0, -1.0, 1.0);
        let mut result = Ok(LinesearchStep::Finished(0.0));
        for _ in 0..100 {
            // the function never decreases
            result = b.iterate(1.0, f64::NAN);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(MethodError::LinesearcherFailure));
    }

    #[test]
    #[should_panic]
    fn rejects_ascent() {
        Backtracking::default().init(0.0, 1.0, 1.0);
    }
}
