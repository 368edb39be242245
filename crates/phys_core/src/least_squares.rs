//! Nonlinear least squares by Levenberg-Marquardt iteration.
//!
//! Failing to converge is not an error: the result carries `success = false`
//! together with the best parameters reached, and a warning is logged.

use crate::error::{check_paired, PreconditionError};
use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MIN_DAMPING: f64 = 1e-15;
const MAX_DAMPING: f64 = 1e16;

/// Iteration limit and stopping tolerances for [`nonlinear_fit_with`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeastSquaresSettings {
    /// Upper bound on Jacobian evaluations (outer iterations).
    pub max_iterations: usize,
    /// Relative reduction of the sum of squares below which the fit is done.
    pub ftol: f64,
    /// Relative parameter step below which the fit is done.
    pub xtol: f64,
    /// Bound on the largest gradient component.
    pub gtol: f64,
    pub initial_damping: f64,
}

impl Default for LeastSquaresSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            initial_damping: 1e-3,
        }
    }
}

/// Why the solver stopped; the first four count as converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    ExactFit,
    GradientTolerance,
    FunctionTolerance,
    StepTolerance,
    MaxIterations,
    DampingOverflow,
    NonFiniteResidual,
}

impl Termination {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            Termination::ExactFit
                | Termination::GradientTolerance
                | Termination::FunctionTolerance
                | Termination::StepTolerance
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NonlinearFit {
    pub params: Vec<f64>,
    /// One-sigma errors from the covariance (J^T J)^-1 * SSE / (n - p).
    /// Infinite when the data do not determine the parameters.
    pub param_errors: Vec<f64>,
    pub success: bool,
    pub termination: Termination,
    pub iterations: usize,
    /// Number of full passes of the model over the data.
    pub evaluations: usize,
    pub residual_sum_of_squares: f64,
}

/// Fits `model(params, x)` to the data starting from `initial_params`.
pub fn nonlinear_fit<F>(
    model: F,
    initial_params: &[f64],
    x: &[f64],
    y: &[f64],
    max_iterations: usize,
) -> Result<NonlinearFit>
where
    F: Fn(&[f64], f64) -> f64,
{
    let settings = LeastSquaresSettings {
        max_iterations,
        ..LeastSquaresSettings::default()
    };
    nonlinear_fit_with(model, initial_params, x, y, &settings)
}

pub fn nonlinear_fit_with<F>(
    model: F,
    initial_params: &[f64],
    x: &[f64],
    y: &[f64],
    settings: &LeastSquaresSettings,
) -> Result<NonlinearFit>
where
    F: Fn(&[f64], f64) -> f64,
{
    check_paired(x, y, 1)?;
    validate_settings(initial_params, settings)?;

    let n = x.len();
    let m = initial_params.len();

    let mut params = initial_params.to_vec();
    let mut residual = DVector::zeros(n);
    evaluate_residuals(&model, &params, x, y, &mut residual);
    let mut evaluations = 1usize;
    let mut sse = residual.norm_squared();

    let mut jacobian = DMatrix::zeros(n, m);
    let mut trial_residual = DVector::zeros(n);
    let mut lambda = settings.initial_damping;
    let mut iterations = 0usize;

    let termination = loop {
        if !sse.is_finite() {
            break Termination::NonFiniteResidual;
        }
        if sse == 0.0 {
            break Termination::ExactFit;
        }
        if iterations >= settings.max_iterations {
            break Termination::MaxIterations;
        }
        iterations += 1;

        forward_jacobian(&model, &params, x, y, &residual, &mut jacobian);
        evaluations += m;
        let jtj = jacobian.transpose() * &jacobian;
        let gradient = jacobian.transpose() * &residual;
        if gradient.amax() <= settings.gtol {
            break Termination::GradientTolerance;
        }

        let outcome = loop {
            let mut damped = jtj.clone();
            for j in 0..m {
                let diag = jtj[(j, j)];
                damped[(j, j)] += lambda * if diag > 0.0 { diag } else { 1.0 };
            }

            let step = match solve_normal_equations(damped, &gradient) {
                Some(step) => step,
                None => {
                    lambda *= 10.0;
                    if lambda > MAX_DAMPING {
                        break Some(Termination::DampingOverflow);
                    }
                    continue;
                }
            };

            let trial: Vec<f64> = params
                .iter()
                .zip(step.iter())
                .map(|(p, d)| p + d)
                .collect();
            evaluate_residuals(&model, &trial, x, y, &mut trial_residual);
            evaluations += 1;
            let trial_sse = trial_residual.norm_squared();

            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();
            let step_small = step.norm() <= settings.xtol * (param_norm + settings.xtol);

            if trial_sse.is_finite() && trial_sse < sse {
                let reduction = sse - trial_sse;
                let previous = sse;
                params = trial;
                std::mem::swap(&mut residual, &mut trial_residual);
                sse = trial_sse;
                lambda = (lambda / 10.0).max(MIN_DAMPING);

                if reduction <= settings.ftol * previous {
                    break Some(Termination::FunctionTolerance);
                }
                if step_small {
                    break Some(Termination::StepTolerance);
                }
                break None;
            }

            if step_small {
                break Some(Termination::StepTolerance);
            }
            lambda *= 10.0;
            if lambda > MAX_DAMPING {
                break Some(Termination::DampingOverflow);
            }
        };

        if let Some(termination) = outcome {
            break termination;
        }
    };

    let param_errors = if sse.is_finite() {
        forward_jacobian(&model, &params, x, y, &residual, &mut jacobian);
        evaluations += m;
        parameter_errors(&jacobian, sse, n, m)
    } else {
        vec![f64::INFINITY; m]
    };

    let success = termination.is_success();
    if success {
        debug!(iterations, evaluations, sse, ?termination, "nonlinear fit converged");
    } else {
        warn!(
            iterations,
            evaluations,
            sse,
            ?termination,
            "nonlinear fit did not converge; returning best parameters found"
        );
    }

    Ok(NonlinearFit {
        params,
        param_errors,
        success,
        termination,
        iterations,
        evaluations,
        residual_sum_of_squares: sse,
    })
}

fn validate_settings(initial_params: &[f64], settings: &LeastSquaresSettings) -> Result<()> {
    if initial_params.is_empty() {
        bail!(PreconditionError::InvalidParameter(
            "At least one parameter is required.".to_string()
        ));
    }
    if settings.max_iterations == 0 {
        bail!(PreconditionError::InvalidParameter(
            "max_iterations must be greater than zero.".to_string()
        ));
    }
    for (name, value) in [
        ("ftol", settings.ftol),
        ("xtol", settings.xtol),
        ("gtol", settings.gtol),
    ] {
        if !(value >= 0.0) {
            bail!(PreconditionError::InvalidParameter(format!(
                "{name} must be non-negative, got {value}."
            )));
        }
    }
    if !(settings.initial_damping > 0.0) {
        bail!(PreconditionError::InvalidParameter(
            "initial_damping must be positive.".to_string()
        ));
    }
    Ok(())
}

/// r_i = y_i - model(params, x_i)
fn evaluate_residuals<F>(
    model: &F,
    params: &[f64],
    x: &[f64],
    y: &[f64],
    out: &mut DVector<f64>,
) where
    F: Fn(&[f64], f64) -> f64,
{
    for i in 0..x.len() {
        out[i] = y[i] - model(params, x[i]);
    }
}

/// J_ij = d model(params, x_i) / d params_j by forward differences.
fn forward_jacobian<F>(
    model: &F,
    params: &[f64],
    x: &[f64],
    y: &[f64],
    residual: &DVector<f64>,
    jacobian: &mut DMatrix<f64>,
) where
    F: Fn(&[f64], f64) -> f64,
{
    let sqrt_eps = f64::EPSILON.sqrt();
    let mut shifted = params.to_vec();
    for j in 0..params.len() {
        let h = sqrt_eps * params[j].abs().max(1.0);
        shifted[j] = params[j] + h;
        for i in 0..x.len() {
            let base = y[i] - residual[i];
            jacobian[(i, j)] = (model(&shifted, x[i]) - base) / h;
        }
        shifted[j] = params[j];
    }
}

fn solve_normal_equations(matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    let step = match matrix.clone().cholesky() {
        Some(chol) => chol.solve(rhs),
        None => matrix.lu().solve(rhs)?,
    };
    if step.iter().all(|v| v.is_finite()) {
        Some(step)
    } else {
        None
    }
}

fn parameter_errors(jacobian: &DMatrix<f64>, sse: f64, n: usize, m: usize) -> Vec<f64> {
    if n <= m {
        return vec![f64::INFINITY; m];
    }
    let variance = sse / (n - m) as f64;
    let jtj = jacobian.transpose() * jacobian;
    match jtj.try_inverse() {
        Some(inverse) => (0..m)
            .map(|j| {
                let var = inverse[(j, j)] * variance;
                if var >= 0.0 {
                    var.sqrt()
                } else {
                    f64::INFINITY
                }
            })
            .collect(),
        None => vec![f64::INFINITY; m],
    }
}
