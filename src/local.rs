//! The driver shared by every method. It owns the evaluation counters and the convergence state
//! of a run, evaluates the objective wherever the method asks and decides when to stop.
use crate::errors::{Error, MethodError};
use crate::function::{check_gradient, check_hessian, check_value, Function, ProblemInfo};
use crate::minimizer::{Evaluation, Location, Method, Needs, Operation, OptimResult, Stats, Status};
use crate::settings::{FunctionConverge, Settings};
use crate::vector::{Bfgs, NelderMead};
use ndarray::prelude::*;
use std::time::{Duration, Instant};

/// Searches for a local minimum of `function` starting at `x0`.
///
/// When `method` is `None`, `Bfgs` is used for objectives with a gradient and `NelderMead`
/// otherwise. A method instance may be reused across runs since `Method::init` resets it.
///
/// Configuration problems and evaluation failures are returned as `Err`. Algorithmic failures
/// end the run with `Status::Failure` and the best location found so far.
///
/// ```
/// # extern crate ndarray;
/// # extern crate unconstrained;
/// # use ndarray::prelude::*;
/// # use unconstrained::functions::ExtendedRosenbrock;
/// # use unconstrained::{local, SettingsBuilder, Status};
/// let settings = SettingsBuilder::default().gradient_threshold(1e-8).build().unwrap();
/// let x0 = arr1(&[-1.2, 1.0]);
/// let res = local(&ExtendedRosenbrock, x0.view(), &settings, None).unwrap();
/// assert_eq!(res.status, Status::GradientThreshold);
/// assert!((res.x()[0] - 1.0).abs() < 1e-6);
/// ```
pub fn local(
    function: &dyn Function,
    x0: ArrayView1<f64>,
    settings: &Settings,
    method: Option<&mut dyn Method>,
) -> Result<OptimResult, Error> {
    if x0.is_empty() {
        return Err(Error::ZeroDimensional);
    }
    let problem = ProblemInfo::new(function);
    match method {
        Some(method) => minimize(&problem, x0, settings, method),
        None if problem.has_gradient() => minimize(&problem, x0, settings, &mut Bfgs::default()),
        None => minimize(&problem, x0, settings, &mut NelderMead::default()),
    }
}

fn minimize(
    problem: &ProblemInfo,
    x0: ArrayView1<f64>,
    settings: &Settings,
    method: &mut dyn Method,
) -> Result<OptimResult, Error> {
    let start = Instant::now();
    let needs = method.needs();
    problem.satisfy(needs)?;

    let mut stats = Stats::default();
    let mut loc = initial_location(problem, x0, settings, needs, &mut stats)?;
    let mut opt_loc = loc.clone();

    // Gradient based methods stop through the gradient threshold.
    let mut converge = if needs.gradient {
        None
    } else {
        settings.function_converge.clone()
    };
    if let Some(c) = converge.as_mut() {
        c.init(loc.f);
    }

    let (status, cause) = match check_convergence(&opt_loc, settings, None) {
        Some(status) => (status, None),
        None => {
            let mut run = Run {
                problem,
                settings,
                converge,
                start,
                stats: &mut stats,
                opt_loc: &mut opt_loc,
            };
            run.iterate(method, &mut loc)?
        }
    };
    stats.runtime = start.elapsed();

    info!(
        "local: {} after {} major iterations, f = {}",
        status, stats.major_iterations, opt_loc.f
    );
    Ok(OptimResult {
        location: opt_loc,
        status,
        stats,
        cause,
    })
}

/// Builds the evaluated starting location, either by evaluating the objective or from the warm
/// start data in `settings`.
fn initial_location(
    problem: &ProblemInfo,
    x0: ArrayView1<f64>,
    settings: &Settings,
    needs: Needs,
    stats: &mut Stats,
) -> Result<Location, Error> {
    let n = x0.len();
    let mut loc = Location::new(x0, needs);
    if !settings.use_initial_data {
        let eval = Evaluation::complete(needs);
        problem.evaluate(&mut loc, eval)?;
        stats.record(eval);
        return Ok(loc);
    }

    loc.gradient = match (&settings.initial_gradient, needs.gradient) {
        (Some(g), true) if g.len() != n => {
            return Err(Error::InitialData(format!(
                "gradient has length {}, expected {}",
                g.len(),
                n
            )));
        }
        (Some(g), true) => Some(g.clone()),
        (None, true) => {
            return Err(Error::InitialData("method needs an initial gradient".into()));
        }
        (Some(_), false) => {
            return Err(Error::InitialData("method does not use a gradient".into()));
        }
        (None, false) => None,
    };
    loc.hessian = match (&settings.initial_hessian, needs.hessian) {
        (Some(h), true) if h.dim() != (n, n) => {
            return Err(Error::InitialData(format!(
                "Hessian has shape {:?}, expected {:?}",
                h.dim(),
                (n, n)
            )));
        }
        (Some(h), true) => Some(h.clone()),
        (None, true) => {
            return Err(Error::InitialData("method needs an initial Hessian".into()));
        }
        (Some(_), false) => {
            return Err(Error::InitialData("method does not use a Hessian".into()));
        }
        (None, false) => None,
    };

    check_value(settings.initial_value)?;
    loc.f = settings.initial_value;
    if let Some(ref g) = loc.gradient {
        check_gradient(g.view())?;
    }
    if let Some(ref h) = loc.hessian {
        check_hessian(h.view())?;
    }
    Ok(loc)
}

/// The state of the driver while the method iterates.
struct Run<'a> {
    problem: &'a ProblemInfo<'a>,
    settings: &'a Settings,
    converge: Option<FunctionConverge>,
    start: Instant,
    stats: &'a mut Stats,
    opt_loc: &'a mut Location,
}

impl<'a> Run<'a> {
    fn iterate(
        &mut self,
        method: &mut dyn Method,
        loc: &mut Location,
    ) -> Result<(Status, Option<MethodError>), Error> {
        let mut op = method.init(loc);
        loop {
            let operation = match op {
                Ok(operation) => operation,
                Err(err) => {
                    warn!("local: method failed: {}", err);
                    return Ok((Status::Failure, Some(err)));
                }
            };

            let mut status = match operation {
                Operation::Evaluate(eval) => {
                    self.problem.evaluate(loc, eval)?;
                    self.stats.record(eval);
                    None
                }
                Operation::MajorIteration => {
                    self.opt_loc.assign(loc);
                    self.stats.major_iterations += 1;
                    debug!(
                        "local: iteration {}: f = {}, |g| = {:?}",
                        self.stats.major_iterations,
                        self.opt_loc.f,
                        self.opt_loc.gradient_norm()
                    );
                    check_convergence(self.opt_loc, self.settings, self.converge.as_mut())
                }
            };

            self.stats.runtime = self.start.elapsed();
            if status.is_none() {
                status = check_limits(self.stats, self.settings);
            }
            if let Some(status) = status {
                return Ok((status, None));
            }

            self.stats.iterations += 1;
            op = method.iterate(loc);
        }
    }
}

fn check_convergence(
    loc: &Location,
    settings: &Settings,
    converge: Option<&mut FunctionConverge>,
) -> Option<Status> {
    if let Some(norm) = loc.gradient_norm() {
        if norm < settings.gradient_threshold() {
            return Some(Status::GradientThreshold);
        }
    }
    if loc.f < settings.function_threshold {
        return Some(Status::FunctionThreshold);
    }
    converge.and_then(|c| c.converged(loc.f))
}

fn check_limits(stats: &Stats, settings: &Settings) -> Option<Status> {
    fn reached(count: usize, limit: usize) -> bool {
        limit > 0 && count >= limit
    }

    if reached(stats.major_iterations, settings.major_iterations)
        || reached(stats.iterations, settings.iterations)
    {
        return Some(Status::IterationLimit);
    }
    if reached(stats.func_evaluations, settings.func_evaluations)
        || reached(stats.grad_evaluations, settings.grad_evaluations)
        || reached(stats.hess_evaluations, settings.hess_evaluations)
    {
        return Some(Status::EvaluationLimit);
    }
    match settings.runtime {
        Some(limit) if limit > Duration::from_secs(0) && stats.runtime >= limit => {
            Some(Status::RuntimeLimit)
        }
        _ => None,
    }
}
