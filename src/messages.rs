// Payloads exchanged with the simulator channel
//
// Field names follow the simulator's telemetry and steer events so the
// channel can (de)serialize them without a mapping layer.

use serde::{Deserialize, Serialize};

use crate::common::{Actuation, MpcError, MpcResult, Path2D, Pose2D, Trajectory};

/// One telemetry event: world-frame waypoints, vehicle pose and the
/// actuation currently applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub ptsx: Vec<f64>,
    pub ptsy: Vec<f64>,
    pub x: f64,
    pub y: f64,
    /// Heading [rad]
    pub psi: f64,
    pub speed: f64,
    /// Steering angle currently applied [rad]
    pub steering_angle: f64,
    pub throttle: f64,
}

impl Telemetry {
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.psi)
    }

    pub fn previous_actuation(&self) -> Actuation {
        Actuation::new(self.steering_angle, self.throttle)
    }

    /// Reject mismatched waypoint lists and non-finite values.
    pub fn validate(&self) -> MpcResult<()> {
        if self.ptsx.len() != self.ptsy.len() {
            return Err(MpcError::InvalidInput(format!(
                "ptsx has {} entries, ptsy has {}",
                self.ptsx.len(),
                self.ptsy.len()
            )));
        }
        let scalars = [
            ("x", self.x),
            ("y", self.y),
            ("psi", self.psi),
            ("speed", self.speed),
            ("steering_angle", self.steering_angle),
            ("throttle", self.throttle),
        ];
        if let Some((name, value)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MpcError::InvalidInput(format!("{} is not finite ({})", name, value)));
        }
        if self.ptsx.iter().chain(self.ptsy.iter()).any(|v| !v.is_finite()) {
            return Err(MpcError::InvalidInput("waypoints contain non-finite values".to_string()));
        }
        Ok(())
    }
}

/// Command event sent back for each telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerCommand {
    /// Steering normalised by the steering bound, in [-1, 1]
    pub steering_angle: f64,
    pub throttle: f64,
    /// Predicted trajectory, vehicle frame
    pub mpc_x: Vec<f64>,
    pub mpc_y: Vec<f64>,
    /// Reference waypoints, vehicle frame
    pub next_x: Vec<f64>,
    pub next_y: Vec<f64>,
}

impl SteerCommand {
    /// Zero command issued on connection, before any telemetry arrives
    pub fn neutral() -> Self {
        Self::from_actuation(Actuation::zero(), 1.0)
    }

    /// Command without display data
    pub fn from_actuation(actuation: Actuation, max_steer: f64) -> Self {
        Self {
            steering_angle: (actuation.steer / max_steer).clamp(-1.0, 1.0),
            throttle: actuation.throttle,
            mpc_x: Vec::new(),
            mpc_y: Vec::new(),
            next_x: Vec::new(),
            next_y: Vec::new(),
        }
    }

    pub fn with_display(mut self, trajectory: &Trajectory, waypoints: &Path2D) -> Self {
        self.mpc_x = trajectory.x_coords();
        self.mpc_y = trajectory.y_coords();
        self.next_x = waypoints.x_coords();
        self.next_y = waypoints.y_coords();
        self
    }

    /// Steering angle in radians for a given steering bound
    pub fn steer_radians(&self, max_steer: f64) -> f64 {
        self.steering_angle * max_steer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn telemetry() -> Telemetry {
        Telemetry {
            ptsx: vec![0.0, 10.0, 20.0, 30.0],
            ptsy: vec![0.0, 0.5, 1.5, 3.0],
            x: 1.0,
            y: 2.0,
            psi: 0.1,
            speed: 15.0,
            steering_angle: -0.05,
            throttle: 0.2,
        }
    }

    #[test]
    fn test_valid_telemetry() {
        let t = telemetry();
        assert!(t.validate().is_ok());
        assert_eq!(t.previous_actuation(), Actuation::new(-0.05, 0.2));
        assert_eq!(t.pose(), Pose2D::new(1.0, 2.0, 0.1));
    }

    #[test]
    fn test_rejects_mismatched_waypoints() {
        let mut t = telemetry();
        t.ptsy.pop();
        let err = t.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: ptsx has 4 entries, ptsy has 3");
    }

    #[test]
    fn test_rejects_non_finite_fields() {
        let mut t = telemetry();
        t.speed = f64::NAN;
        assert!(matches!(t.validate(), Err(MpcError::InvalidInput(_))));

        let mut t = telemetry();
        t.ptsx[2] = f64::INFINITY;
        assert!(matches!(t.validate(), Err(MpcError::InvalidInput(_))));
    }

    #[test]
    fn test_telemetry_field_names() {
        let source = r#"
            ptsx = [1.0, 2.0]
            ptsy = [3.0, 4.0]
            x = 0.5
            y = -0.5
            psi = 3.1
            speed = 12.0
            steering_angle = 0.0
            throttle = 0.1
        "#;
        let t: Telemetry = toml::from_str(source).unwrap();
        assert_eq!(t.ptsy, vec![3.0, 4.0]);
        assert_eq!(t.psi, 3.1);
    }

    #[test]
    fn test_command_normalises_steering() {
        let max_steer = 25.0_f64.to_radians();
        let command = SteerCommand::from_actuation(Actuation::new(-max_steer / 2.0, 0.4), max_steer);
        assert_relative_eq!(command.steering_angle, -0.5, epsilon = 1e-12);
        assert_relative_eq!(command.steer_radians(max_steer), -max_steer / 2.0, epsilon = 1e-12);
        assert_eq!(command.throttle, 0.4);
    }

    #[test]
    fn test_neutral_command() {
        let command = SteerCommand::neutral();
        assert_eq!(command.steering_angle, 0.0);
        assert_eq!(command.throttle, 0.0);
        assert!(command.mpc_x.is_empty() && command.next_x.is_empty());
    }
}
