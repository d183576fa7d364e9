// Actuation latency compensation
//
// The command computed this cycle only reaches the actuators after the
// configured latency. The state handed to the optimizer is therefore the
// telemetry state projected forward over that interval, assuming the
// previous actuation stays applied. `ActuationDelay` is the matching plant
// side: a command issued now is held from `latency` later on.

use std::collections::VecDeque;

use crate::common::{Actuation, MpcError, MpcResult, State};
use crate::config::VehicleParams;
use crate::path_tracking::motion_model::KinematicBicycle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyCompensator {
    model: KinematicBicycle,
    latency: f64,
}

impl LatencyCompensator {
    pub fn new(lf: f64, latency: f64) -> Self {
        Self {
            model: KinematicBicycle::new(lf),
            latency,
        }
    }

    pub fn from_params(params: &VehicleParams) -> Self {
        Self::new(params.lf, params.latency)
    }

    /// Predict the state after the latency interval.
    ///
    /// For a state at the vehicle-frame origin this is
    /// x' = v dt, y' = 0, psi' = -v steer / lf dt, v' = v + throttle dt,
    /// cte' = cte + v sin(epsi) dt, epsi' = epsi - v steer / lf dt.
    pub fn predict(&self, state: &State, previous: &Actuation) -> MpcResult<State> {
        if !state.is_finite() || !previous.is_finite() {
            return Err(MpcError::InvalidInput(
                "latency compensation needs a finite state and actuation".to_string(),
            ));
        }

        let dt = self.latency;
        let (sin_psi, cos_psi) = state.psi.sin_cos();
        let yaw = self.model.yaw_change(state.v, previous.steer, dt);
        Ok(State {
            x: state.x + state.v * cos_psi * dt,
            y: state.y + state.v * sin_psi * dt,
            psi: state.psi + yaw,
            v: state.v + previous.throttle * dt,
            cte: state.cte + state.v * state.epsi.sin() * dt,
            epsi: state.epsi + yaw,
        })
    }
}

/// Actuator that puts each command into force a whole number of cycles after
/// it is issued
#[derive(Debug, Clone, PartialEq)]
pub struct ActuationDelay {
    delay_cycles: usize,
    held: Actuation,
    queued: VecDeque<Actuation>,
}

impl ActuationDelay {
    /// Delay of `latency` rounded to cycles of length `dt`
    pub fn new(latency: f64, dt: f64) -> Self {
        let delay_cycles = if dt > 0.0 { (latency / dt).round().max(0.0) as usize } else { 0 };
        Self {
            delay_cycles,
            held: Actuation::zero(),
            queued: std::iter::repeat(Actuation::zero())
                .take(delay_cycles.saturating_sub(1))
                .collect(),
        }
    }

    pub fn delay_cycles(&self) -> usize {
        self.delay_cycles
    }

    /// Actuation in force over the coming cycle. This is what telemetry reports
    /// and what the compensator must assume for the latency interval.
    pub fn held(&self) -> Actuation {
        self.held
    }

    /// Issue a command at the start of the current cycle.
    pub fn submit(&mut self, command: Actuation) {
        if self.delay_cycles == 0 {
            self.held = command;
        } else {
            self.queued.push_back(command);
        }
    }

    /// Advance to the next cycle.
    pub fn tick(&mut self) {
        if let Some(next) = self.queued.pop_front() {
            self.held = next;
        }
    }
}
