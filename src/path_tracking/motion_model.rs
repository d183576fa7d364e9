// Kinematic bicycle model
//
// Positive steering turns the vehicle clockwise (heading decreases), matching
// the simulator convention the controller talks to.

use crate::common::{Actuation, MotionModel, State, VehicleState};
use crate::reference::CubicPolynomial;

/// Kinematic bicycle with front-axle-to-CoG distance `lf`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBicycle {
    pub lf: f64,
}

impl KinematicBicycle {
    pub fn new(lf: f64) -> Self {
        Self { lf }
    }

    /// Heading change over `dt` for speed `v` and steering angle `steer`
    pub fn yaw_change(&self, v: f64, steer: f64, dt: f64) -> f64 {
        -v * steer / self.lf * dt
    }

    /// Advance a tracking state one step against the reference curve.
    ///
    /// The errors at t+1 are taken against the reference at x_t:
    /// cte' = f(x) - y + v sin(epsi) dt and epsi' = psi - atan f'(x) - v steer / lf dt.
    pub fn predict_tracking(
        &self,
        state: &State,
        actuation: &Actuation,
        reference: &CubicPolynomial,
        dt: f64,
    ) -> State {
        let (sin_psi, cos_psi) = state.psi.sin_cos();
        let yaw = self.yaw_change(state.v, actuation.steer, dt);
        State {
            x: state.x + state.v * cos_psi * dt,
            y: state.y + state.v * sin_psi * dt,
            psi: state.psi + yaw,
            v: state.v + actuation.throttle * dt,
            cte: reference.eval(state.x) - state.y + state.v * state.epsi.sin() * dt,
            epsi: state.psi - reference.tangent_angle(state.x) + yaw,
        }
    }

    /// Roll the tracking dynamics forward over an actuation sequence.
    ///
    /// Returns `actuations.len() + 1` states, starting with `initial`.
    pub fn rollout(
        &self,
        initial: &State,
        actuations: &[Actuation],
        reference: &CubicPolynomial,
        dt: f64,
    ) -> Vec<State> {
        let mut states = Vec::with_capacity(actuations.len() + 1);
        states.push(*initial);
        for actuation in actuations {
            let last = states[states.len() - 1];
            states.push(self.predict_tracking(&last, actuation, reference, dt));
        }
        states
    }
}

impl MotionModel for KinematicBicycle {
    type State = VehicleState;
    type Control = Actuation;

    fn propagate(&self, state: &VehicleState, control: &Actuation, dt: f64) -> VehicleState {
        let (sin_psi, cos_psi) = state.psi.sin_cos();
        VehicleState {
            x: state.x + state.v * cos_psi * dt,
            y: state.y + state.v * sin_psi * dt,
            psi: state.psi + self.yaw_change(state.v, control.steer, dt),
            v: state.v + control.throttle * dt,
        }
    }
}
