//! Error types for vehicle_mpc

use thiserror::Error;

use crate::common::traits::SolveStatus;

/// Main error type for the control pipeline
#[derive(Debug, Error)]
pub enum MpcError {
    /// Malformed or mismatched telemetry fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Too few or degenerate points for the reference curve fit
    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    /// The nonlinear solve stopped without reaching an acceptable solution
    #[error("Solver did not converge ({status:?} after {iterations} iterations)")]
    SolverNonConvergent { status: SolveStatus, iterations: usize },

    /// The nonlinear solve could not satisfy the constraints
    #[error("Solver reported infeasibility (constraint violation {violation:.3e} after {iterations} iterations)")]
    SolverInfeasible { violation: f64, iterations: usize },

    /// Configuration values out of their admissible range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read
    #[error("Cannot read the configuration file: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Cannot parse the configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl MpcError {
    /// True for failures raised at the solver boundary, as opposed to the
    /// input pipeline.
    pub fn is_solver_failure(&self) -> bool {
        matches!(
            self,
            MpcError::SolverNonConvergent { .. } | MpcError::SolverInfeasible { .. }
        )
    }
}

/// Result type alias for controller operations
pub type MpcResult<T> = Result<T, MpcError>;
