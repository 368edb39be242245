pub mod differentiation;
pub mod error;
pub mod fit;
pub mod integrator;
pub mod least_squares;
pub mod solvers;
/// The `phys_core` crate provides the numerical core of a physics utility toolkit.
/// Everything is a pure, single-threaded computation over in-memory slices.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (position/velocity ODEs), `Steppable` (stepping rules).
/// - **Differentiation**: forward, central and five-point finite differences.
/// - **Solvers**: fixed-step Euler, RK2, RK4 and velocity Verlet.
/// - **Integrator**: `StepMethod` selection and the `integrate` loop producing a `Trajectory`.
/// - **Fit / Least Squares**: closed-form line fits and Levenberg-Marquardt parameter fits.
pub mod traits;

pub use error::PreconditionError;
pub use fit::{linear_fit, LinearFit};
pub use integrator::{
    integrate, integrate_with, IntegrationSettings, State, StepMethod, Trajectory,
};
pub use least_squares::{
    nonlinear_fit, nonlinear_fit_with, LeastSquaresSettings, NonlinearFit, Termination,
};
