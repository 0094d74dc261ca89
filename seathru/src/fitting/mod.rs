//! Bounded nonlinear least squares for scalar curve models.
//!
//! Fits `y = f(x; θ)` to sample pairs with Levenberg-Marquardt. Every trial
//! step is projected onto the parameter box, and parameters pinned at a bound
//! with the gradient pointing outward are frozen for that iteration, so the
//! remaining parameters keep moving instead of the step collapsing.
//!
//! The fitter never fails loudly: when the sample set is too small, contains
//! non-finite values, or the evaluation budget runs out before convergence,
//! the caller's initial guess is handed back together with a [`FitStatus`]
//! describing why.

mod linear_solver;


use serde::{Deserialize, Serialize};

use linear_solver::solve;

/// Relative floor for Marquardt diagonal scaling. Keeps a zero Jacobian
/// column (parameter with no influence on the data) solvable.
const DIAG_FLOOR: f64 = 1e-6;

/// Smallest damping the optimizer will shrink to.
const MIN_LAMBDA: f64 = 1e-12;

/// Configuration for the Levenberg-Marquardt fitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Hard cap on model passes over the sample set (residual or Jacobian).
    pub max_evaluations: usize,
    /// Converged once the accepted step is below
    /// `step_tolerance * (1 + max|θ|)`.
    pub step_tolerance: f64,
    /// Converged once an accepted step reduces the cost by less than
    /// `cost_tolerance * cost`.
    pub cost_tolerance: f64,
    /// Initial damping parameter.
    pub initial_lambda: f64,
    /// Factor to increase lambda on a rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on an accepted step.
    pub lambda_down: f64,
    /// Damping beyond which no descent step exists; the current point is
    /// taken as the minimum.
    pub max_lambda: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 4000,
            step_tolerance: 1e-10,
            cost_tolerance: 1e-12,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e10,
        }
    }
}

impl FitConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) {
        assert!(
            self.max_evaluations >= 2,
            "max_evaluations must be at least 2, got {}",
            self.max_evaluations
        );
        assert!(
            self.step_tolerance >= 0.0 && self.cost_tolerance >= 0.0,
            "tolerances must be non-negative, got step {} cost {}",
            self.step_tolerance,
            self.cost_tolerance
        );
        assert!(
            self.initial_lambda > 0.0,
            "initial_lambda must be positive, got {}",
            self.initial_lambda
        );
        assert!(
            self.lambda_up > 1.0,
            "lambda_up must be > 1, got {}",
            self.lambda_up
        );
        assert!(
            self.lambda_down > 0.0 && self.lambda_down < 1.0,
            "lambda_down must be in (0, 1), got {}",
            self.lambda_down
        );
        assert!(
            self.max_lambda > self.initial_lambda,
            "max_lambda ({}) must exceed initial_lambda ({})",
            self.max_lambda,
            self.initial_lambda
        );
    }
}

/// Scalar model `y = f(x; θ)` with an analytic Jacobian.
pub trait CurveModel<const N: usize> {
    fn evaluate(&self, x: f64, params: &[f64; N]) -> f64;

    /// Partial derivatives `∂f/∂θᵢ` at `x`.
    fn jacobian_row(&self, x: f64, params: &[f64; N]) -> [f64; N];
}

/// Box constraints `lower ≤ θ ≤ upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<const N: usize> {
    pub lower: [f64; N],
    pub upper: [f64; N],
}

impl<const N: usize> Bounds<N> {
    pub const fn new(lower: [f64; N], upper: [f64; N]) -> Self {
        Self { lower, upper }
    }

    /// Unbounded in every direction.
    pub const fn unbounded() -> Self {
        Self {
            lower: [f64::NEG_INFINITY; N],
            upper: [f64::INFINITY; N],
        }
    }

    #[inline]
    pub fn project(&self, params: &mut [f64; N]) {
        for ((p, &lo), &hi) in params.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.clamp(lo, hi);
        }
    }

    pub fn contains(&self, params: &[f64; N]) -> bool {
        params
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(p, (lo, hi))| (*lo..=*hi).contains(p))
    }
}

/// Outcome of one curve fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitStatus {
    /// Optimizer reached a minimum within the bounds.
    Converged,
    /// Evaluation budget exhausted before convergence; initial guess returned.
    EvaluationLimit,
    /// Samples or the optimized cost were not finite; initial guess returned.
    NonFinite,
    /// Fewer samples than the model requires; fallback parameters returned.
    InsufficientSamples,
    /// No samples at all; the caller substituted a zero model.
    Skipped,
}

impl FitStatus {
    /// `true` when the parameters did not come from a successful fit.
    pub fn is_fallback(self) -> bool {
        self != FitStatus::Converged
    }
}

impl std::fmt::Display for FitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStatus::Converged => write!(f, "converged"),
            FitStatus::EvaluationLimit => write!(f, "evaluation limit reached"),
            FitStatus::NonFinite => write!(f, "non-finite data"),
            FitStatus::InsufficientSamples => write!(f, "insufficient samples"),
            FitStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of [`fit_curve`].
#[derive(Debug, Clone, Copy)]
pub struct FitResult<const N: usize> {
    pub params: [f64; N],
    /// Sum of squared residuals at `params` (NaN when no fit was attempted).
    pub cost: f64,
    pub status: FitStatus,
    pub iterations: usize,
    pub evaluations: usize,
}

impl<const N: usize> FitResult<N> {
    fn fallback(
        initial: [f64; N],
        status: FitStatus,
        iterations: usize,
        evaluations: usize,
    ) -> Self {
        Self {
            params: initial,
            cost: f64::NAN,
            status,
            iterations,
            evaluations,
        }
    }
}

/// Fit `model` to `(xs[i], ys[i])` within `bounds`, starting from `initial`.
///
/// Falls back to `initial` unchanged when there are fewer samples than
/// parameters, a sample is non-finite, or the optimizer does not converge
/// within `config.max_evaluations`.
pub fn fit_curve<const N: usize, M: CurveModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    initial: [f64; N],
    bounds: &Bounds<N>,
    config: &FitConfig,
) -> FitResult<N> {
    assert_eq!(xs.len(), ys.len(), "xs and ys must have equal length");

    if xs.len() < N {
        return FitResult::fallback(initial, FitStatus::InsufficientSamples, 0, 0);
    }
    if !xs.iter().chain(ys).all(|v| v.is_finite()) {
        return FitResult::fallback(initial, FitStatus::NonFinite, 0, 0);
    }

    let run = optimize(model, xs, ys, initial, bounds, config);
    let finite = run.cost.is_finite() && run.params.iter().all(|p| p.is_finite());

    match (run.converged, finite) {
        (true, true) => FitResult {
            params: run.params,
            cost: run.cost,
            status: FitStatus::Converged,
            iterations: run.iterations,
            evaluations: run.evaluations,
        },
        (true, false) | (false, false) => FitResult::fallback(
            initial,
            FitStatus::NonFinite,
            run.iterations,
            run.evaluations,
        ),
        (false, true) => FitResult::fallback(
            initial,
            FitStatus::EvaluationLimit,
            run.iterations,
            run.evaluations,
        ),
    }
}

struct OptimizerRun<const N: usize> {
    params: [f64; N],
    cost: f64,
    converged: bool,
    iterations: usize,
    evaluations: usize,
}

fn optimize<const N: usize, M: CurveModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    initial: [f64; N],
    bounds: &Bounds<N>,
    config: &FitConfig,
) -> OptimizerRun<N> {
    let mut params = initial;
    bounds.project(&mut params);

    let mut cost = compute_cost(model, xs, ys, &params);
    let mut evaluations = 1;
    let mut iterations = 0;
    let mut lambda = config.initial_lambda;
    let mut converged = false;

    if !cost.is_finite() {
        return OptimizerRun {
            params,
            cost,
            converged,
            iterations,
            evaluations,
        };
    }

    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];
    let mut free = [true; N];
    let mut max_diag = 0.0f64;
    let mut stale = true;

    while evaluations < config.max_evaluations {
        iterations += 1;

        if stale {
            (hessian, gradient) = normal_equations(model, xs, ys, &params);
            evaluations += 1;
            stale = false;

            free = free_parameters(&params, &gradient, bounds);
            max_diag = (0..N)
                .filter(|&i| free[i])
                .map(|i| hessian[i][i])
                .fold(0.0f64, f64::max);

            // Exact fit, or nothing left to move.
            if cost == 0.0 || max_diag <= 0.0 {
                converged = true;
                break;
            }
        }

        let (system, rhs) = damped_system(&hessian, &gradient, &free, lambda, max_diag);

        let Some(delta) = solve(&system, &rhs) else {
            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                converged = true;
                break;
            }
            continue;
        };

        let mut trial = params;
        for (p, d) in trial.iter_mut().zip(delta.iter()) {
            *p += d;
        }
        bounds.project(&mut trial);

        let step = trial
            .iter()
            .zip(params.iter())
            .fold(0.0f64, |acc, (t, p)| acc.max((t - p).abs()));
        let step_limit = config.step_tolerance
            * (1.0 + params.iter().fold(0.0f64, |acc, p| acc.max(p.abs())));

        let trial_cost = compute_cost(model, xs, ys, &trial);
        evaluations += 1;

        if trial_cost < cost {
            let decrease = cost - trial_cost;
            params = trial;
            cost = trial_cost;
            lambda = (lambda * config.lambda_down).max(MIN_LAMBDA);
            stale = true;

            if step <= step_limit || decrease <= config.cost_tolerance * cost {
                converged = true;
                break;
            }
        } else {
            // Projection swallowed the whole step: stationary on the box.
            if step <= step_limit {
                converged = true;
                break;
            }
            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                converged = true;
                break;
            }
        }
    }

    OptimizerRun {
        params,
        cost,
        converged,
        iterations,
        evaluations,
    }
}

fn compute_cost<const N: usize, M: CurveModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    params: &[f64; N],
) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let residual = y - model.evaluate(x, params);
            residual * residual
        })
        .sum()
}

/// Hessian approximation `JᵀJ` and gradient `Jᵀr` with `r = y - f(x; θ)`.
/// Only the upper triangle is accumulated, then mirrored.
#[allow(clippy::needless_range_loop)]
fn normal_equations<const N: usize, M: CurveModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    params: &[f64; N],
) -> ([[f64; N]; N], [f64; N]) {
    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];

    for (&x, &y) in xs.iter().zip(ys) {
        let row = model.jacobian_row(x, params);
        let r = y - model.evaluate(x, params);
        for i in 0..N {
            gradient[i] += row[i] * r;
            for j in i..N {
                hessian[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 1..N {
        for j in 0..i {
            hessian[i][j] = hessian[j][i];
        }
    }

    (hessian, gradient)
}

/// Parameters sitting on a bound whose descent direction leaves the box are
/// held fixed for the next step.
fn free_parameters<const N: usize>(
    params: &[f64; N],
    gradient: &[f64; N],
    bounds: &Bounds<N>,
) -> [bool; N] {
    std::array::from_fn(|i| {
        let pinned_low = params[i] <= bounds.lower[i] && gradient[i] < 0.0;
        let pinned_high = params[i] >= bounds.upper[i] && gradient[i] > 0.0;
        !(pinned_low || pinned_high)
    })
}

#[allow(clippy::needless_range_loop)]
fn damped_system<const N: usize>(
    hessian: &[[f64; N]; N],
    gradient: &[f64; N],
    free: &[bool; N],
    lambda: f64,
    max_diag: f64,
) -> ([[f64; N]; N], [f64; N]) {
    let mut system = [[0.0f64; N]; N];
    let mut rhs = [0.0f64; N];
    let floor = DIAG_FLOOR * max_diag;

    for i in 0..N {
        if !free[i] {
            system[i][i] = max_diag;
            continue;
        }
        rhs[i] = gradient[i];
        for j in 0..N {
            if free[j] {
                system[i][j] = hessian[i][j];
            }
        }
        system[i][i] += lambda * hessian[i][i].max(floor);
    }

    (system, rhs)
}
