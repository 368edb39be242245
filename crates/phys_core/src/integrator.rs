//! Fixed-step integration of (position, velocity) systems.
//!
//! The step size never adapts. When `t_max` is not a multiple of `h` the last
//! sample overshoots `t_max` by less than one step; it is not clamped.
//! Non-finite values produced by the right-hand side are carried into the
//! trajectory unchanged.

use crate::{
    error::PreconditionError,
    solvers::{Euler, VelocityVerlet, RK2, RK4},
    traits::{DynamicalSystem, Scalar, Steppable},
};
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stepping rule used to advance the state by one fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMethod {
    Euler,
    Rk2,
    #[default]
    Rk4,
    VelocityVerlet,
}

impl StepMethod {
    fn build<T: Scalar>(self, dim: usize) -> InternalStepper<T> {
        match self {
            StepMethod::Euler => InternalStepper::Euler(Euler::new(dim)),
            StepMethod::Rk2 => InternalStepper::Rk2(RK2::new(dim)),
            StepMethod::Rk4 => InternalStepper::Rk4(RK4::new(dim)),
            StepMethod::VelocityVerlet => {
                InternalStepper::VelocityVerlet(VelocityVerlet::new(dim))
            }
        }
    }

    /// Applies one step to `state` at time `t` and returns the new state.
    pub fn advance<T, S>(self, system: &S, t: T, state: &State<T>, h: T) -> Result<State<T>>
    where
        T: Scalar,
        S: DynamicalSystem<T>,
    {
        check_dimensions(system.dimension(), state.position.len(), state.velocity.len())?;
        let mut next = state.clone();
        let mut time = t;
        let mut stepper = self.build(state.position.len());
        stepper.step(
            system,
            &mut time,
            &mut next.position,
            &mut next.velocity,
            h,
        );
        Ok(next)
    }
}

enum InternalStepper<T: Scalar> {
    Euler(Euler<T>),
    Rk2(RK2<T>),
    Rk4(RK4<T>),
    VelocityVerlet(VelocityVerlet<T>),
}

impl<T: Scalar> InternalStepper<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        position: &mut [T],
        velocity: &mut [T],
        dt: T,
    ) {
        match self {
            InternalStepper::Euler(s) => s.step(system, t, position, velocity, dt),
            InternalStepper::Rk2(s) => s.step(system, t, position, velocity, dt),
            InternalStepper::Rk4(s) => s.step(system, t, position, velocity, dt),
            InternalStepper::VelocityVerlet(s) => s.step(system, t, position, velocity, dt),
        }
    }
}

/// Phase-space point of a second-order system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State<T> {
    pub position: Vec<T>,
    pub velocity: Vec<T>,
}

impl<T: Scalar> State<T> {
    pub fn new(position: Vec<T>, velocity: Vec<T>) -> Result<Self> {
        if position.len() != velocity.len() {
            bail!(PreconditionError::DimensionMismatch {
                what: "velocity length must equal position length",
                expected: position.len(),
                actual: velocity.len(),
            });
        }
        Ok(Self { position, velocity })
    }

    pub fn dimension(&self) -> usize {
        self.position.len()
    }
}

/// Samples recorded by [`integrate`]. Positions and velocities are stored
/// row-major, one row of `dimension` values per sample.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory<T> {
    dimension: usize,
    times: Vec<T>,
    positions: Vec<T>,
    velocities: Vec<T>,
}

impl<T: Scalar> Trajectory<T> {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of samples, i.e. steps + 1.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[T] {
        &self.times
    }

    pub fn time(&self, index: usize) -> T {
        self.times[index]
    }

    pub fn position(&self, index: usize) -> &[T] {
        &self.positions[index * self.dimension..(index + 1) * self.dimension]
    }

    pub fn velocity(&self, index: usize) -> &[T] {
        &self.velocities[index * self.dimension..(index + 1) * self.dimension]
    }

    /// One row per sample: the time followed by the position components.
    pub fn rows(&self) -> Vec<Vec<T>> {
        (0..self.len())
            .map(|i| {
                let mut row = Vec::with_capacity(self.dimension + 1);
                row.push(self.times[i]);
                row.extend_from_slice(self.position(i));
                row
            })
            .collect()
    }

    pub fn final_state(&self) -> State<T> {
        let last = self.len() - 1;
        State {
            position: self.position(last).to_vec(),
            velocity: self.velocity(last).to_vec(),
        }
    }
}

/// Step size, duration and stepping rule for [`integrate_with`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntegrationSettings {
    pub step_size: f64,
    pub t_max: f64,
    pub method: StepMethod,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            step_size: 1e-3,
            t_max: 1.0,
            method: StepMethod::Rk4,
        }
    }
}

/// Integrates from t = 0 to at least `t_max` with fixed step `h`.
///
/// Returns `ceil(t_max / h) + 1` samples; sample 0 is `(0, x0, v0)`.
pub fn integrate<T, S>(
    system: &S,
    x0: &[T],
    v0: &[T],
    h: T,
    t_max: T,
    method: StepMethod,
) -> Result<Trajectory<T>>
where
    T: Scalar,
    S: DynamicalSystem<T>,
{
    let dim = x0.len();
    check_dimensions(system.dimension(), dim, v0.len())?;
    if !h.is_finite() || h <= T::zero() {
        bail!(PreconditionError::InvalidParameter(format!(
            "Step size must be finite and positive, got {:?}.",
            h
        )));
    }
    if !t_max.is_finite() || t_max < T::zero() {
        bail!(PreconditionError::InvalidParameter(format!(
            "t_max must be finite and non-negative, got {:?}.",
            t_max
        )));
    }

    let steps = (t_max / h).ceil().to_usize().ok_or_else(|| {
        anyhow!(
            "Step count for t_max = {:?}, h = {:?} does not fit in usize.",
            t_max,
            h
        )
    })?;
    let samples = steps
        .checked_add(1)
        .and_then(|n| n.checked_mul(dim.max(1)))
        .ok_or_else(|| anyhow!("Trajectory of {} steps is too large to allocate.", steps))?;

    debug!(steps, dimension = dim, ?method, "integrating trajectory");

    let mut times = Vec::new();
    let mut positions = Vec::new();
    let mut velocities = Vec::new();
    times
        .try_reserve_exact(steps + 1)
        .and_then(|_| positions.try_reserve_exact(samples))
        .and_then(|_| velocities.try_reserve_exact(samples))
        .map_err(|_| anyhow!("Trajectory of {} steps is too large to allocate.", steps))?;

    let mut t = T::zero();
    let mut position = x0.to_vec();
    let mut velocity = v0.to_vec();
    times.push(t);
    positions.extend_from_slice(&position);
    velocities.extend_from_slice(&velocity);

    let mut stepper = method.build(dim);
    for _ in 0..steps {
        stepper.step(system, &mut t, &mut position, &mut velocity, h);
        times.push(t);
        positions.extend_from_slice(&position);
        velocities.extend_from_slice(&velocity);
    }

    Ok(Trajectory {
        dimension: dim,
        times,
        positions,
        velocities,
    })
}

fn check_dimensions(system_dim: usize, position_len: usize, velocity_len: usize) -> Result<()> {
    if velocity_len != position_len {
        bail!(PreconditionError::DimensionMismatch {
            what: "velocity length must equal position length",
            expected: position_len,
            actual: velocity_len,
        });
    }
    if system_dim != position_len {
        bail!(PreconditionError::DimensionMismatch {
            what: "state length must equal system dimension",
            expected: system_dim,
            actual: position_len,
        });
    }
    Ok(())
}

pub fn integrate_with<S>(
    system: &S,
    x0: &[f64],
    v0: &[f64],
    settings: &IntegrationSettings,
) -> Result<Trajectory<f64>>
where
    S: DynamicalSystem<f64>,
{
    integrate(
        system,
        x0,
        v0,
        settings.step_size,
        settings.t_max,
        settings.method,
    )
}
