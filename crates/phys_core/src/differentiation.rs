//! Finite-difference derivatives of scalar functions.
//!
//! The caller chooses the step and bears the truncation/rounding tradeoff.
//! Nothing is validated: if `y` is not defined around `t` the result is
//! meaningless.

use crate::traits::Scalar;
use serde::{Deserialize, Serialize};

/// Default step for [`forward_difference`].
pub const FORWARD_STEP: f64 = 1e-9;
/// Default step for [`central_difference`].
pub const CENTRAL_STEP: f64 = 1e-8;
/// Default step for [`extended_difference`].
pub const EXTENDED_STEP: f64 = 1e-3;

/// (y(t+h) - y(t)) / h, first-order accurate.
pub fn forward_difference<T, F>(y: F, t: T, h: T) -> T
where
    T: Scalar,
    F: Fn(T) -> T,
{
    (y(t + h) - y(t)) / h
}

/// (y(t+h/2) - y(t-h/2)) / h, second-order accurate.
pub fn central_difference<T, F>(y: F, t: T, h: T) -> T
where
    T: Scalar,
    F: Fn(T) -> T,
{
    let half = T::from_f64(0.5).unwrap() * h;
    (y(t + half) - y(t - half)) / h
}

/// Five-point stencil built from quarter and half steps, fourth-order accurate.
pub fn extended_difference<T, F>(y: F, t: T, h: T) -> T
where
    T: Scalar,
    F: Fn(T) -> T,
{
    let quarter = T::from_f64(0.25).unwrap() * h;
    let half = T::from_f64(0.5).unwrap() * h;
    let eight = T::from_f64(8.0).unwrap();
    let three = T::from_f64(3.0).unwrap();

    let inner = y(t + quarter) - y(t - quarter);
    let outer = y(t + half) - y(t - half);
    (eight * inner - outer) / (three * h)
}

/// Selects one of the stencils together with its default step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceScheme {
    Forward,
    Central,
    #[default]
    Extended,
}

impl DifferenceScheme {
    pub fn default_step(self) -> f64 {
        match self {
            DifferenceScheme::Forward => FORWARD_STEP,
            DifferenceScheme::Central => CENTRAL_STEP,
            DifferenceScheme::Extended => EXTENDED_STEP,
        }
    }

    /// Derivative of `y` at `t` using the scheme's default step.
    pub fn derivative<T, F>(self, y: F, t: T) -> T
    where
        T: Scalar,
        F: Fn(T) -> T,
    {
        let h = T::from_f64(self.default_step()).unwrap();
        self.derivative_with_step(y, t, h)
    }

    pub fn derivative_with_step<T, F>(self, y: F, t: T, h: T) -> T
    where
        T: Scalar,
        F: Fn(T) -> T,
    {
        match self {
            DifferenceScheme::Forward => forward_difference(y, t, h),
            DifferenceScheme::Central => central_difference(y, t, h),
            DifferenceScheme::Extended => extended_difference(y, t, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{central_difference, extended_difference, forward_difference, DifferenceScheme};

    fn sin(t: f64) -> f64 {
        t.sin()
    }

    #[test]
    fn central_difference_beats_forward_difference_at_fixed_step() {
        let exact = 1.0_f64.cos();
        for &h in &[1e-2, 1e-3, 1e-4, 1e-5] {
            let forward = (forward_difference(sin, 1.0, h) - exact).abs();
            let central = (central_difference(sin, 1.0, h) - exact).abs();
            assert!(
                central < forward,
                "h = {h}: central error {central} not below forward error {forward}"
            );
        }
    }

    #[test]
    fn forward_difference_error_is_first_order() {
        let exact = 1.0_f64.cos();
        let coarse = (forward_difference(sin, 1.0, 1e-2) - exact).abs();
        let fine = (forward_difference(sin, 1.0, 5e-3) - exact).abs();
        let ratio = coarse / fine;
        assert!((ratio - 2.0).abs() < 0.1, "ratio = {ratio}");
    }

    #[test]
    fn extended_difference_error_is_fourth_order() {
        let exact = 1.0_f64.cos();
        let coarse = (extended_difference(sin, 1.0, 0.1) - exact).abs();
        let fine = (extended_difference(sin, 1.0, 0.05) - exact).abs();
        let ratio = coarse / fine;
        assert!(ratio > 15.0 && ratio < 17.0, "ratio = {ratio}");
    }

    #[test]
    fn extended_difference_matches_stencil_leading_error_term() {
        // Truncation error is -h^4 y^(5)(t) / 7680.
        let h = 0.1;
        let exact = 1.0_f64.cos();
        let error = extended_difference(sin, 1.0, h) - exact;
        let predicted = -h.powi(4) * 1.0_f64.cos() / 7680.0;
        assert!((error - predicted).abs() < 1e-2 * predicted.abs());
    }

    #[test]
    fn default_steps_give_accurate_derivatives() {
        let exp = |t: f64| t.exp();
        let forward = DifferenceScheme::Forward.derivative(exp, 0.0);
        let central = DifferenceScheme::Central.derivative(exp, 0.0);
        let extended = DifferenceScheme::Extended.derivative(exp, 0.0);
        assert!((forward - 1.0).abs() < 1e-6);
        assert!((central - 1.0).abs() < 1e-6);
        assert!((extended - 1.0).abs() < 1e-9);
    }

    #[test]
    fn scheme_dispatch_matches_free_functions() {
        let cube = |t: f64| t * t * t;
        let h = 1e-2;
        assert_eq!(
            DifferenceScheme::Central.derivative_with_step(cube, 2.0, h),
            central_difference(cube, 2.0, h)
        );
        assert_eq!(
            DifferenceScheme::Forward.derivative_with_step(cube, 2.0, h),
            forward_difference(cube, 2.0, h)
        );
        assert_eq!(DifferenceScheme::default(), DifferenceScheme::Extended);
    }

    #[test]
    fn works_for_single_precision() {
        let square = |t: f32| t * t;
        let value = central_difference(square, 3.0_f32, 1e-2);
        assert!((value - 6.0).abs() < 1e-3);
    }
}
