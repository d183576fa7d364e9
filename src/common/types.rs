//! Common types used throughout vehicle_mpc

use nalgebra::{Vector2, Vector4, Vector6};
use serde::{Deserialize, Serialize};

use crate::common::error::{MpcError, MpcResult};

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

/// Vehicle pose in the world frame (position + heading)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    /// Heading [rad]
    pub psi: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, psi: f64) -> Self {
        Self { x, y, psi }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, psi: 0.0 }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// World-frame vehicle state (pose + speed), as seen by a plant or simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub x: f64,
    pub y: f64,
    pub psi: f64,
    pub v: f64,
}

impl VehicleState {
    pub fn new(x: f64, y: f64, psi: f64, v: f64) -> Self {
        Self { x, y, psi, v }
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.psi)
    }

    pub fn to_vector(&self) -> Vector4<f64> {
        Vector4::new(self.x, self.y, self.psi, self.v)
    }
}

/// Tracking state in the vehicle-local frame.
///
/// `cte` is the cross-track error and `epsi` the heading error against the
/// fitted reference polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct State {
    pub x: f64,
    pub y: f64,
    pub psi: f64,
    pub v: f64,
    pub cte: f64,
    pub epsi: f64,
}

impl State {
    pub const DIM: usize = 6;

    pub fn new(x: f64, y: f64, psi: f64, v: f64, cte: f64, epsi: f64) -> Self {
        Self { x, y, psi, v, cte, epsi }
    }

    /// State at the vehicle-frame origin, as derived from fresh telemetry.
    pub fn at_origin(v: f64, cte: f64, epsi: f64) -> Self {
        Self { x: 0.0, y: 0.0, psi: 0.0, v, cte, epsi }
    }

    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(self.x, self.y, self.psi, self.v, self.cte, self.epsi)
    }

    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|c| c.is_finite())
    }
}

impl From<Vector6<f64>> for State {
    fn from(v: Vector6<f64>) -> Self {
        Self { x: v[0], y: v[1], psi: v[2], v: v[3], cte: v[4], epsi: v[5] }
    }
}

/// Actuation command: steering angle [rad] and throttle (acceleration)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Actuation {
    pub steer: f64,
    pub throttle: f64,
}

impl Actuation {
    pub fn new(steer: f64, throttle: f64) -> Self {
        Self { steer, throttle }
    }

    pub fn zero() -> Self {
        Self { steer: 0.0, throttle: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.steer.is_finite() && self.throttle.is_finite()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.steer, self.throttle)
    }
}

/// Path represented as a sequence of 2D points
#[derive(Debug, Clone, PartialEq)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

/// Predicted (x, y) sequence over the optimization horizon.
pub type Trajectory = Path2D;

impl Path2D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    /// Build a path from separate coordinate lists, which must have equal length.
    pub fn from_xy(x: &[f64], y: &[f64]) -> MpcResult<Self> {
        if x.len() != y.len() {
            return Err(MpcError::InvalidInput(format!(
                "coordinate lists differ in length ({} x values, {} y values)",
                x.len(),
                y.len()
            )));
        }
        let points = x.iter().zip(y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Ok(Self { points })
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

impl Default for Path2D {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point2d_distance() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_path2d_total_length() {
        let path = Path2D::from_xy(&[0.0, 1.0, 1.0], &[0.0, 0.0, 1.0]).unwrap();
        assert!((path.total_length() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_path2d_rejects_unequal_lists() {
        let result = Path2D::from_xy(&[0.0, 1.0], &[0.0]);
        assert!(matches!(result, Err(MpcError::InvalidInput(_))));
    }

    #[test]
    fn test_state_vector_conversion() {
        let state = State::new(1.0, 2.0, 0.1, 10.0, -0.5, 0.02);
        assert_eq!(State::from(state.to_vector()), state);
        assert!(state.is_finite());
        assert!(!State::at_origin(f64::NAN, 0.0, 0.0).is_finite());
    }
}
