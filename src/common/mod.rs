//! Common types, traits, and error definitions for vehicle_mpc
//!
//! This module provides the foundational building blocks shared by the
//! reference processing, the optimizer and the solver.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
