use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the differentiators and integrators.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A second-order ODE written as a first-order system over (position, velocity).
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the position (and velocity) vectors.
    fn dimension(&self) -> usize;

    /// Evaluates the right-hand side f(t, state).
    /// position, velocity: current state
    /// d_position, d_velocity: buffers receiving dx/dt and dv/dt
    fn apply(
        &self,
        t: T,
        position: &[T],
        velocity: &[T],
        d_position: &mut [T],
        d_velocity: &mut [T],
    );
}

/// A trait for stepping rules that advance a system by one fixed step.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// position, velocity: current state (updated after step)
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        position: &mut [T],
        velocity: &mut [T],
        dt: T,
    );
}

/// Adapts a closure `f(t, x, v, dx, dv)` into a [`DynamicalSystem`].
pub struct FnSystem<F> {
    dimension: usize,
    rhs: F,
}

impl<F> FnSystem<F> {
    pub fn new(dimension: usize, rhs: F) -> Self {
        Self { dimension, rhs }
    }
}

impl<T, F> DynamicalSystem<T> for FnSystem<F>
where
    T: Scalar,
    F: Fn(T, &[T], &[T], &mut [T], &mut [T]),
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn apply(
        &self,
        t: T,
        position: &[T],
        velocity: &[T],
        d_position: &mut [T],
        d_velocity: &mut [T],
    ) {
        (self.rhs)(t, position, velocity, d_position, d_velocity)
    }
}
