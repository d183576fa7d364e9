// Numerical optimization backends
//
// A dense line-search SQP method for equality-constrained problems with
// simple variable bounds. Its convex step QP is handed to Clarabel.

pub mod qp;
pub mod sqp;

use serde::{Deserialize, Serialize};

pub use qp::{QpError, QpProblem, QpSolution};
pub use sqp::{SqpOptions, SqpSolver};

/// Source of the curvature matrix used in each SQP step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HessianApproximation {
    /// Central differences of the Lagrangian gradient
    Lagrangian,
    /// Central differences of the objective gradient only; ignores constraint curvature
    GaussNewton,
}

impl Default for HessianApproximation {
    fn default() -> Self {
        HessianApproximation::Lagrangian
    }
}
