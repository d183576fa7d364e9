//! Reference path processing
//!
//! Waypoints arrive in the world frame; the controller works in the vehicle
//! frame against a fitted cubic.
//!
//! - `frame`: world <-> vehicle frame transforms
//! - `polynomial`: least-squares polynomial fit and evaluation

pub mod frame;
pub mod polynomial;

pub use frame::{vehicle_to_world, world_to_vehicle};
pub use polynomial::{polyeval, polyfit, CubicPolynomial, FIT_DEGREE};
