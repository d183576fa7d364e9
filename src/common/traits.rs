//! Common traits defining the seams between the controller and its collaborators

use std::time::Duration;

use nalgebra::{DMatrix, DVector};

/// A nonlinear program with equality constraints and simple variable bounds:
///
/// minimize f(x) subject to c(x) = 0 and lower <= x <= upper.
///
/// Implementors supply exact first derivatives; curvature is left to the solver.
pub trait NlpProblem {
    /// Number of decision variables
    fn num_variables(&self) -> usize;

    /// Number of equality constraints
    fn num_constraints(&self) -> usize;

    /// Lower and upper variable bounds. Use +-infinity for free variables.
    fn variable_bounds(&self) -> (DVector<f64>, DVector<f64>);

    /// Starting point for the solve
    fn initial_guess(&self) -> DVector<f64>;

    /// Objective value f(x)
    fn objective(&self, x: &DVector<f64>) -> f64;

    /// Objective gradient
    fn gradient(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Constraint residuals c(x)
    fn constraints(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Constraint Jacobian, one row per constraint
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64>;
}

/// Termination status of a nonlinear solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// KKT conditions satisfied to tolerance
    Converged,
    /// Iteration limit reached first
    MaxIterations,
    /// No acceptable step along the search direction
    LineSearchFailed,
    /// Constraints could not be satisfied
    Infeasible,
    /// Wall-clock budget exhausted
    DeadlineExceeded,
    /// Non-finite values or a singular linear system
    NumericalFailure,
}

impl SolveStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolveStatus::Converged)
    }
}

/// Raw result of a nonlinear solve
#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub x: DVector<f64>,
    pub status: SolveStatus,
    pub iterations: usize,
    pub objective: f64,
    /// Infinity norm of c(x) at the returned point
    pub constraint_violation: f64,
    pub elapsed: Duration,
}

/// Trait for nonlinear programming solvers
pub trait NlpSolver {
    /// Solve the problem starting from its initial guess.
    fn solve(&self, problem: &dyn NlpProblem) -> SolverOutput;
}

/// Trait for vehicle/robot motion models
pub trait MotionModel {
    /// State type
    type State;
    /// Control type
    type Control;

    /// Propagate state forward in time
    fn propagate(&self, state: &Self::State, control: &Self::Control, dt: f64) -> Self::State;
}

#[cfg(test)]
mod tests {
    use super::*;

    // min (x0 - 1)^2 + (x1 - 2)^2  s.t.  x0 + x1 = 1
    struct LinePlane;

    impl NlpProblem for LinePlane {
        fn num_variables(&self) -> usize { 2 }
        fn num_constraints(&self) -> usize { 1 }
        fn variable_bounds(&self) -> (DVector<f64>, DVector<f64>) {
            (DVector::from_element(2, f64::NEG_INFINITY), DVector::from_element(2, f64::INFINITY))
        }
        fn initial_guess(&self) -> DVector<f64> { DVector::zeros(2) }
        fn objective(&self, x: &DVector<f64>) -> f64 {
            (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2)
        }
        fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![2.0 * (x[0] - 1.0), 2.0 * (x[1] - 2.0)])
        }
        fn constraints(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[0] + x[1] - 1.0])
        }
        fn jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0])
        }
    }

    #[test]
    fn test_problem_trait_object() {
        let problem: &dyn NlpProblem = &LinePlane;
        let x = problem.initial_guess();
        assert_eq!(problem.num_variables(), 2);
        assert!((problem.objective(&x) - 5.0).abs() < 1e-12);
        assert!((problem.constraints(&x)[0] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_status_converged() {
        assert!(SolveStatus::Converged.is_converged());
        assert!(!SolveStatus::DeadlineExceeded.is_converged());
    }
}
