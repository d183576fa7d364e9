//! vehicle_mpc - model predictive control for a kinematic ground vehicle
//!
//! Each telemetry cycle the controller transforms the upcoming waypoints into
//! the vehicle frame, fits a cubic reference, compensates actuation latency
//! and optimizes steering and throttle over a finite horizon.

// Core modules
pub mod common;
pub mod config;
pub mod messages;
pub mod utils;

// Algorithm modules
pub mod reference;
pub mod optimization;
pub mod path_tracking;

// Re-export common types for convenience
pub use common::{Actuation, Path2D, Point2D, Pose2D, State, Trajectory, VehicleState};
pub use common::{MotionModel, NlpProblem, NlpSolver, SolveStatus, SolverOutput};
pub use common::{MpcError, MpcResult};
pub use config::{FallbackPolicy, MpcConfig};
pub use messages::{SteerCommand, Telemetry};
pub use optimization::{HessianApproximation, SqpOptions, SqpSolver};
pub use path_tracking::{ControlOutput, ControlSession, CycleOutcome, MpcController, TrajectoryOptimizer};
pub use reference::CubicPolynomial;
