use thiserror::Error;

/// Input validation failures shared by the integrator and the fitting routines.
///
/// Public entry points return `anyhow::Result`; these values travel inside the
/// `anyhow::Error` and can be recovered with `downcast_ref::<PreconditionError>()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("Dimension mismatch: {what}. Expected {expected}, got {actual}.")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Length mismatch: x has {x_len} values but y has {y_len}.")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("Insufficient data: need at least {required} points, got {actual}.")]
    InsufficientData { required: usize, actual: usize },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Checks that paired x/y sequences line up and carry enough points.
pub(crate) fn check_paired(x: &[f64], y: &[f64], required: usize) -> Result<(), PreconditionError> {
    if x.len() != y.len() {
        return Err(PreconditionError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < required {
        return Err(PreconditionError::InsufficientData {
            required,
            actual: x.len(),
        });
    }
    Ok(())
}
