//! Nonlinear conjugate gradient.
//!
//! The search direction is `d_k = -g_k + β_k d_{k-1}`, where the scalar `β_k` is given by one of
//! the classic formulas in `CgVariant`. The method restarts from the steepest descent direction
//! every `⌈iteration_restart_factor · n⌉` iterations, when two consecutive gradients point in
//! nearly opposite directions, and whenever the update does not produce a descent direction.
//! A line search that fails along a conjugate direction is retried once along steepest descent.
//!
//! Hager, W. W., Zhang, H.: A survey of nonlinear conjugate gradient methods. Pacific Journal of
//! Optimization, 2 (2006), pp. 35-58.
use crate::errors::MethodError;
use crate::linalg::norm2;
use crate::linesearch::{
    gradient, Bisection, FirstOrderStepSize, Linesearch, LinesearchMethod, NextDirectioner,
    StepSizer,
};
use crate::minimizer::{Location, Method, Needs, Operation};
use ndarray::prelude::*;

const ITERATION_RESTART_FACTOR: f64 = 6.0;
const ANGLE_RESTART_THRESHOLD: f64 = -0.9;
const HAGER_ZHANG_ETA: f64 = 0.01;

/// The formula for the scaling factor `β_k`. `g` is the current gradient, `g_prev` the previous
/// gradient, `d_prev` the previous direction and `y = g - g_prev`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CgVariant {
    /// `|g|² / |g_prev|²`
    FletcherReeves,
    /// `max(0, gᵀy / d_prevᵀy)`
    HestenesStiefel,
    /// `max(0, gᵀy / |g_prev|²)`
    PolakRibierePolyak,
    /// `|g|² / d_prevᵀy`
    DaiYuan,
    /// `(y - 2 d_prev |y|² / d_prevᵀy)ᵀ g / d_prevᵀy`, bounded below by
    /// `-1 / (|d_prev| min(η, |g_prev|))` with `η = 0.01`.
    HagerZhang,
}

impl Default for CgVariant {
    fn default() -> Self {
        CgVariant::HestenesStiefel
    }
}

impl CgVariant {
    pub fn beta(self, g: ArrayView1<f64>, g_prev: ArrayView1<f64>, d_prev: ArrayView1<f64>) -> f64 {
        match self {
            CgVariant::FletcherReeves => {
                let g_prev_norm = norm2(g_prev);
                let ratio = norm2(g) / g_prev_norm;
                ratio * ratio
            }
            CgVariant::HestenesStiefel => {
                let y = &g - &g_prev;
                let beta = g.dot(&y) / d_prev.dot(&y);
                beta.max(0.0)
            }
            CgVariant::PolakRibierePolyak => {
                let g_prev_norm = norm2(g_prev);
                let beta = (g.dot(&g) - g.dot(&g_prev)) / (g_prev_norm * g_prev_norm);
                beta.max(0.0)
            }
            CgVariant::DaiYuan => {
                let y = &g - &g_prev;
                g.dot(&g) / d_prev.dot(&y)
            }
            CgVariant::HagerZhang => {
                let y = &g - &g_prev;
                let d_dot_y = d_prev.dot(&y);
                let y_norm = norm2(y.view());
                let beta = (g.dot(&y) - 2.0 * g.dot(&d_prev) * y_norm * y_norm / d_dot_y) / d_dot_y;
                let eta = -1.0 / (norm2(d_prev) * HAGER_ZHANG_ETA.min(norm2(g_prev)));
                beta.max(eta)
            }
        }
    }
}

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct Cg {
    #[builder(setter(into))]
    pub variant: CgVariant,

    /// Defaults to `Bisection` with a curvature constant of 0.1, as conjugate gradient needs
    /// fairly exact line searches.
    #[builder(setter(into))]
    pub linesearcher: LinesearchMethod,

    /// Defaults to `StepSizer::FirstOrder`.
    #[builder(setter(into))]
    pub initial_step: StepSizer,

    /// The method restarts every `⌈iteration_restart_factor · n⌉` iterations.
    /// Zero selects 6, a negative value disables periodic restarts.
    pub iteration_restart_factor: f64,

    /// The method restarts when the cosine of the angle between two consecutive gradients is at
    /// most this value. Must be in [-1, 1). Zero selects -0.9.
    pub angle_restart_threshold: f64,

    #[builder(setter(skip))]
    ls: Linesearch,
    #[builder(setter(skip))]
    direction: CgDirection,
}

impl Default for Cg {
    fn default() -> Self {
        Cg {
            variant: CgVariant::default(),
            linesearcher: Bisection::new(0.1).into(),
            initial_step: FirstOrderStepSize::default().into(),
            iteration_restart_factor: ITERATION_RESTART_FACTOR,
            angle_restart_threshold: ANGLE_RESTART_THRESHOLD,
            ls: Linesearch::default(),
            direction: CgDirection::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct CgDirection {
    variant: CgVariant,
    initial_step: StepSizer,
    angle_restart_threshold: f64,

    /// Zero when periodic restarts are disabled.
    restart_after: usize,
    iter_from_restart: usize,
    /// Whether the current direction is the negative gradient.
    steepest: bool,

    g_prev: Array1<f64>,
    g_prev_norm: f64,
}

impl Default for CgDirection {
    fn default() -> Self {
        CgDirection {
            variant: CgVariant::default(),
            initial_step: StepSizer::Constant(1.0),
            angle_restart_threshold: ANGLE_RESTART_THRESHOLD,
            restart_after: 0,
            iter_from_restart: 0,
            steepest: true,
            g_prev: Array1::zeros(0),
            g_prev_norm: 0.0,
        }
    }
}

impl NextDirectioner for CgDirection {
    fn init_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        let g = gradient(loc);
        dir.zip_mut_with(g, |d, &gi| *d = -gi);
        self.iter_from_restart = 0;
        self.steepest = true;
        self.g_prev = g.clone();
        self.g_prev_norm = norm2(g.view());
        self.initial_step.init(loc, dir.view())
    }

    fn next_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> f64 {
        let g = gradient(loc);
        let g_norm = norm2(g.view());

        let mut restart = false;
        if self.restart_after > 0 {
            self.iter_from_restart += 1;
            if self.iter_from_restart == self.restart_after {
                restart = true;
            }
        }
        if g.dot(&self.g_prev) <= self.angle_restart_threshold * g_norm * self.g_prev_norm {
            restart = true;
        }

        if !restart {
            // dir still holds the previous direction
            let beta = self.variant.beta(g.view(), self.g_prev.view(), dir.view());
            if beta.is_finite() {
                dir.zip_mut_with(g, |d, &gi| *d = beta * *d - gi);
                if !(g.dot(&*dir) < 0.0) {
                    debug!("cg: {:?} update is not a descent direction", self.variant);
                    restart = true;
                }
            } else {
                debug!("cg: {:?} produced β = {}", self.variant, beta);
                restart = true;
            }
        }
        if restart {
            self.iter_from_restart = 0;
            dir.zip_mut_with(g, |d, &gi| *d = -gi);
        }
        self.steepest = restart;

        self.g_prev.assign(g);
        self.g_prev_norm = g_norm;
        self.initial_step.step_size(loc, dir.view())
    }

    fn retry_direction(&mut self, loc: &Location, dir: &mut Array1<f64>) -> Option<f64> {
        if self.steepest {
            return None;
        }
        debug!("cg: line search failed along the {:?} direction, restarting", self.variant);
        let g = gradient(loc);
        dir.zip_mut_with(g, |d, &gi| *d = -gi);
        self.iter_from_restart = 0;
        self.steepest = true;
        Some(self.initial_step.init(loc, dir.view()))
    }
}

impl Method for Cg {
    fn needs(&self) -> Needs {
        Needs {
            gradient: true,
            hessian: false,
        }
    }

    fn init(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        let mut factor = self.iteration_restart_factor;
        if factor == 0.0 {
            factor = ITERATION_RESTART_FACTOR;
        }
        let mut threshold = self.angle_restart_threshold;
        if threshold == 0.0 {
            threshold = ANGLE_RESTART_THRESHOLD;
        }
        if threshold < -1.0 || threshold >= 1.0 {
            panic!("cg: angle_restart_threshold not in [-1, 1)");
        }
        let restart_after = if factor > 0.0 {
            (factor * loc.x.len() as f64).ceil() as usize
        } else {
            0
        };

        self.direction = CgDirection {
            variant: self.variant,
            initial_step: self.initial_step.clone(),
            angle_restart_threshold: threshold,
            restart_after,
            ..CgDirection::default()
        };
        let needs = self.needs();
        self.ls
            .init(loc, needs, &mut self.linesearcher, &mut self.direction)
    }

    fn iterate(&mut self, loc: &mut Location) -> Result<Operation, MethodError> {
        self.ls.iterate(loc, &mut self.linesearcher, &mut self.direction)
    }
}
