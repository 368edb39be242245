use crate::traits::{DynamicalSystem, Scalar, Steppable};

fn zeros<T: Scalar>(dim: usize) -> Vec<T> {
    vec![T::from_f64(0.0).unwrap(); dim]
}

/// Forward Euler Solver
pub struct Euler<T: Scalar> {
    dx: Vec<T>,
    dv: Vec<T>,
}

impl<T: Scalar> Euler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            dx: zeros(dim),
            dv: zeros(dim),
        }
    }
}

impl<T: Scalar> Steppable<T> for Euler<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        position: &mut [T],
        velocity: &mut [T],
        dt: T,
    ) {
        let t0 = *t;
        system.apply(t0, position, velocity, &mut self.dx, &mut self.dv);

        for i in 0..position.len() {
            position[i] = position[i] + dt * self.dx[i];
            velocity[i] = velocity[i] + dt * self.dv[i];
        }

        *t = t0 + dt;
    }
}

/// Second Order Runge-Kutta (midpoint) Solver
pub struct RK2<T: Scalar> {
    k1x: Vec<T>,
    k1v: Vec<T>,
    k2x: Vec<T>,
    k2v: Vec<T>,
    tmp_x: Vec<T>,
    tmp_v: Vec<T>,
}

impl<T: Scalar> RK2<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1x: zeros(dim),
            k1v: zeros(dim),
            k2x: zeros(dim),
            k2v: zeros(dim),
            tmp_x: zeros(dim),
            tmp_v: zeros(dim),
        }
    }
}

impl<T: Scalar> Steppable<T> for RK2<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        position: &mut [T],
        velocity: &mut [T],
        dt: T,
    ) {
        let half = T::from_f64(0.5).unwrap();
        let t0 = *t;

        // k1 = f(t, y)
        system.apply(t0, position, velocity, &mut self.k1x, &mut self.k1v);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..position.len() {
            self.tmp_x[i] = position[i] + dt * self.k1x[i] * half;
            self.tmp_v[i] = velocity[i] + dt * self.k1v[i] * half;
        }
        system.apply(
            t0 + dt * half,
            &self.tmp_x,
            &self.tmp_v,
            &mut self.k2x,
            &mut self.k2v,
        );

        // y_next = y + dt*k2
        for i in 0..position.len() {
            position[i] = position[i] + dt * self.k2x[i];
            velocity[i] = velocity[i] + dt * self.k2v[i];
        }

        *t = t0 + dt;
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1x: Vec<T>,
    k1v: Vec<T>,
    k2x: Vec<T>,
    k2v: Vec<T>,
    k3x: Vec<T>,
    k3v: Vec<T>,
    k4x: Vec<T>,
    k4v: Vec<T>,
    tmp_x: Vec<T>,
    tmp_v: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1x: zeros(dim),
            k1v: zeros(dim),
            k2x: zeros(dim),
            k2v: zeros(dim),
            k3x: zeros(dim),
            k3v: zeros(dim),
            k4x: zeros(dim),
            k4v: zeros(dim),
            tmp_x: zeros(dim),
            tmp_v: zeros(dim),
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        position: &mut [T],
        velocity: &mut [T],
        dt: T,
    ) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();
        let n = position.len();

        let t0 = *t;

        // k1 = f(t, y)
        system.apply(t0, position, velocity, &mut self.k1x, &mut self.k1v);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..n {
            self.tmp_x[i] = position[i] + dt * self.k1x[i] * half;
            self.tmp_v[i] = velocity[i] + dt * self.k1v[i] * half;
        }
        system.apply(
            t0 + dt * half,
            &self.tmp_x,
            &self.tmp_v,
            &mut self.k2x,
            &mut self.k2v,
        );

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..n {
            self.tmp_x[i] = position[i] + dt * self.k2x[i] * half;
            self.tmp_v[i] = velocity[i] + dt * self.k2v[i] * half;
        }
        system.apply(
            t0 + dt * half,
            &self.tmp_x,
            &self.tmp_v,
            &mut self.k3x,
            &mut self.k3v,
        );

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..n {
            self.tmp_x[i] = position[i] + dt * self.k3x[i];
            self.tmp_v[i] = velocity[i] + dt * self.k3v[i];
        }
        system.apply(
            t0 + dt,
            &self.tmp_x,
            &self.tmp_v,
            &mut self.k4x,
            &mut self.k4v,
        );

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..n {
            position[i] = position[i]
                + dt * sixth
                    * (self.k1x[i] + two * self.k2x[i] + two * self.k3x[i] + self.k4x[i]);
            velocity[i] = velocity[i]
                + dt * sixth
                    * (self.k1v[i] + two * self.k2v[i] + two * self.k3v[i] + self.k4v[i]);
        }

        *t = t0 + dt;
    }
}

/// Velocity Verlet Solver
/// Symplectic for Hamiltonian systems. Only the velocity derivative
/// (acceleration) of the system is used; dx/dt is taken to be v.
pub struct VelocityVerlet<T: Scalar> {
    scratch_dx: Vec<T>,
    accel: Vec<T>,
}

impl<T: Scalar> VelocityVerlet<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            scratch_dx: zeros(dim),
            accel: zeros(dim),
        }
    }
}

impl<T: Scalar> Steppable<T> for VelocityVerlet<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        position: &mut [T],
        velocity: &mut [T],
        dt: T,
    ) {
        let half = T::from_f64(0.5).unwrap();
        let t0 = *t;

        // a(t, x, v)
        system.apply(t0, position, velocity, &mut self.scratch_dx, &mut self.accel);

        // v_half = v + dt/2 * a;  x_next = x + dt * v_half
        for i in 0..position.len() {
            velocity[i] = velocity[i] + dt * half * self.accel[i];
            position[i] = position[i] + dt * velocity[i];
        }

        // v_next = v_half + dt/2 * a(t + dt, x_next, v_half)
        system.apply(
            t0 + dt,
            position,
            velocity,
            &mut self.scratch_dx,
            &mut self.accel,
        );
        for i in 0..velocity.len() {
            velocity[i] = velocity[i] + dt * half * self.accel[i];
        }

        *t = t0 + dt;
    }
}

#[cfg(test)]
mod tests {
    use super::{Euler, VelocityVerlet, RK2, RK4};
    use crate::traits::{DynamicalSystem, Steppable};

    /// dx/dt = rate * x, velocity unused.
    struct Decay {
        rate: f64,
    }

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], _v: &[f64], dx: &mut [f64], dv: &mut [f64]) {
            dx[0] = self.rate * x[0];
            dv[0] = 0.0;
        }
    }

    /// x'' = -x
    struct Oscillator;

    impl DynamicalSystem<f64> for Oscillator {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], v: &[f64], dx: &mut [f64], dv: &mut [f64]) {
            dx[0] = v[0];
            dv[0] = -x[0];
        }
    }

    fn single_step(
        stepper: &mut impl Steppable<f64>,
        system: &impl DynamicalSystem<f64>,
    ) -> (f64, f64, f64) {
        let mut t = 0.0;
        let mut x = [1.0];
        let mut v = [0.0];
        stepper.step(system, &mut t, &mut x, &mut v, 0.1);
        (t, x[0], v[0])
    }

    #[test]
    fn euler_step_matches_hand_computation() {
        let (t, x, v) = single_step(&mut Euler::new(1), &Decay { rate: -1.0 });
        assert!((t - 0.1).abs() < 1e-15);
        assert!((x - 0.9).abs() < 1e-15);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn rk2_step_matches_truncated_taylor_series() {
        // Midpoint rule on dx/dt = -x gives 1 - h + h^2/2.
        let (_, x, _) = single_step(&mut RK2::new(1), &Decay { rate: -1.0 });
        assert!((x - 0.905).abs() < 1e-15);
    }

    #[test]
    fn rk4_step_matches_truncated_taylor_series() {
        let h: f64 = 0.1;
        let expected = 1.0 - h + h.powi(2) / 2.0 - h.powi(3) / 6.0 + h.powi(4) / 24.0;
        let (_, x, _) = single_step(&mut RK4::new(1), &Decay { rate: -1.0 });
        assert!((x - expected).abs() < 1e-15);
    }

    #[test]
    fn velocity_verlet_step_matches_hand_computation() {
        // v_half = -0.05, x = 0.995, v = -0.05 - 0.05 * 0.995
        let (t, x, v) = single_step(&mut VelocityVerlet::new(1), &Oscillator);
        assert!((t - 0.1).abs() < 1e-15);
        assert!((x - 0.995).abs() < 1e-15);
        assert!((v + 0.09975).abs() < 1e-15);
    }

    #[test]
    fn steppers_advance_time_by_dt() {
        let system = Oscillator;
        let mut t = 0.25;
        let mut x = [1.0];
        let mut v = [0.0];
        let mut rk2 = RK2::new(1);
        rk2.step(&system, &mut t, &mut x, &mut v, 0.5);
        let mut rk4 = RK4::new(1);
        rk4.step(&system, &mut t, &mut x, &mut v, 0.5);
        assert!((t - 1.25).abs() < 1e-15);
    }
}
