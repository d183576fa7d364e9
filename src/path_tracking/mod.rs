// Path tracking: bicycle model, latency compensation, horizon optimizer and cycle pipeline

pub mod motion_model;
pub mod latency;
pub mod mpc;
pub mod controller;

pub use motion_model::KinematicBicycle;
pub use latency::{ActuationDelay, LatencyCompensator};
pub use mpc::{MpcProblem, SolveResult, TrajectoryOptimizer, VariableLayout};
pub use controller::{ControlOutput, ControlSession, CycleOutcome, MpcController};
