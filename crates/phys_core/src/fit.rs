//! Ordinary least-squares straight-line fits.

use crate::error::check_paired;
use anyhow::Result;
use serde::Serialize;
use tracing::warn;

/// Result of [`linear_fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub slope_error: f64,
    pub intercept_error: f64,
    /// Coefficient of determination, 1 - SSE/SST.
    pub r_squared: f64,
    pub points: usize,
    pub residual_sum_of_squares: f64,
    /// SST - SSE, the variation explained by the line.
    pub regression_sum_of_squares: f64,
    /// Standard deviation of y about the line, sqrt(SSE / (n - 2)).
    pub residual_std: f64,
    pub rmse: f64,
}

impl LinearFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    pub fn evaluate_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }
}

/// Fits y = slope * x + intercept.
///
/// Requires equal lengths and at least two points. Two points are joined
/// exactly with zero reported error, since the general error formulas divide
/// by n - 2. Zero variance in `x` is not rejected: the slope comes out
/// infinite or NaN.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    check_paired(x, y, 2)?;
    let n = x.len();

    if n == 2 {
        let slope = (y[1] - y[0]) / (x[1] - x[0]);
        if !slope.is_finite() {
            warn!(x0 = x[0], x1 = x[1], "linear fit through coincident x values");
        }
        let intercept = y[0] - slope * x[0];
        let y_bar = 0.5 * (y[0] + y[1]);
        let total = (y[0] - y_bar).powi(2) + (y[1] - y_bar).powi(2);
        return Ok(LinearFit {
            slope,
            intercept,
            slope_error: 0.0,
            intercept_error: 0.0,
            r_squared: 1.0,
            points: n,
            residual_sum_of_squares: 0.0,
            regression_sum_of_squares: total,
            residual_std: 0.0,
            rmse: 0.0,
        });
    }

    let count = n as f64;
    let x_bar = mean(x);
    let y_bar = mean(y);

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    let mut ss_yy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_bar;
        let dy = yi - y_bar;
        ss_xx += dx * dx;
        ss_xy += dx * dy;
        ss_yy += dy * dy;
    }
    if ss_xx == 0.0 {
        warn!(points = n, "linear fit with zero variance in x; slope is not finite");
    }

    let slope = ss_xy / ss_xx;
    let intercept = y_bar - slope * x_bar;

    let ss_e: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();

    let variance = ss_e / (count - 2.0);
    let slope_error = (variance / ss_xx).sqrt();
    let intercept_error = (variance * (1.0 / count + x_bar * x_bar / ss_xx)).sqrt();

    Ok(LinearFit {
        slope,
        intercept,
        slope_error,
        intercept_error,
        r_squared: 1.0 - ss_e / ss_yy,
        points: n,
        residual_sum_of_squares: ss_e,
        regression_sum_of_squares: ss_yy - ss_e,
        residual_std: variance.sqrt(),
        rmse: (ss_e / count).sqrt(),
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
