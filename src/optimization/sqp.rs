// Line-search SQP for equality-constrained problems with variable bounds
//
// Each iteration linearises the constraints, builds a curvature matrix by
// central differences, regularises it until it is positive definite (J'J
// augmentation first, then an identity shift), solves the resulting convex
// QP for a step and globalises it with an l1 exact-penalty
// merit function (Armijo backtracking plus one second-order correction).
// Iterates never leave the variable box.

use std::time::{Duration, Instant};

use log::trace;
use nalgebra::{DMatrix, DVector};

use super::qp::{self, max_abs, QpError, QpProblem};
use super::HessianApproximation;
use crate::common::{NlpProblem, NlpSolver, SolveStatus, SolverOutput};
use crate::config::SolverConfig;

const ARMIJO: f64 = 1e-4;
const MIN_STEP_LENGTH: f64 = 1e-8;
const PENALTY_FACTOR: f64 = 1.1;
const PENALTY_MARGIN: f64 = 1e-6;
/// Regularisation limits, relative to the largest Hessian diagonal entry
const MIN_AUGMENTATION: f64 = 1e-6;
const MAX_AUGMENTATION: f64 = 1e4;
const MIN_SHIFT: f64 = 1e-8;
const MAX_REGULARIZATIONS: usize = 48;
const ACTIVE_TOLERANCE: f64 = 1e-7;

/// Termination and curvature settings for [`SqpSolver`]
#[derive(Debug, Clone, PartialEq)]
pub struct SqpOptions {
    pub max_iterations: usize,
    /// Scaled stationarity tolerance
    pub tolerance: f64,
    /// Infinity-norm tolerance on c(x)
    pub constraint_tolerance: f64,
    /// Wall-clock budget; `None` means unbounded
    pub deadline: Option<Duration>,
    pub hessian: HessianApproximation,
}

impl Default for SqpOptions {
    fn default() -> Self {
        Self::from(&SolverConfig::default())
    }
}

impl From<&SolverConfig> for SqpOptions {
    fn from(config: &SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            constraint_tolerance: config.constraint_tolerance,
            deadline: config.max_solve_time_ms.map(Duration::from_millis),
            hessian: config.hessian,
        }
    }
}

/// Dense sequential quadratic programming solver
#[derive(Debug, Clone, Default)]
pub struct SqpSolver {
    options: SqpOptions,
}

impl SqpSolver {
    pub fn new(options: SqpOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SqpOptions {
        &self.options
    }

    fn hessian(&self, problem: &dyn NlpProblem, x: &DVector<f64>, multipliers: &DVector<f64>) -> DMatrix<f64> {
        match self.options.hessian {
            HessianApproximation::Lagrangian => {
                central_difference_hessian(x, |p| problem.gradient(p) + problem.jacobian(p).tr_mul(multipliers))
            }
            HessianApproximation::GaussNewton => central_difference_hessian(x, |p| problem.gradient(p)),
        }
    }

    /// Backtracking search on the l1 merit function. Returns the accepted point.
    #[allow(clippy::too_many_arguments)]
    fn line_search(
        &self,
        problem: &dyn NlpProblem,
        x: &DVector<f64>,
        step: &DVector<f64>,
        objective: f64,
        gradient: &DVector<f64>,
        residual: &DVector<f64>,
        jacobian: &DMatrix<f64>,
        active: &[bool],
        penalty: f64,
        bounds: (&DVector<f64>, &DVector<f64>),
    ) -> Option<DVector<f64>> {
        let (lower, upper) = bounds;
        let merit = |p: &DVector<f64>| problem.objective(p) + penalty * problem.constraints(p).lp_norm(1);

        let infeasibility = residual.lp_norm(1);
        let merit0 = objective + penalty * infeasibility;
        let slope = (gradient.dot(step) - penalty * infeasibility).min(0.0);
        let slack = 10.0 * f64::EPSILON * merit0.abs().max(1.0);
        let accepts = |value: f64, alpha: f64| value.is_finite() && value <= merit0 + ARMIJO * alpha * slope + slack;

        let full = clamp(&(x + step), lower, upper);
        if accepts(merit(&full), 1.0) {
            return Some(full);
        }

        if let Some(correction) = second_order_correction(problem, &full, jacobian, active) {
            let corrected = clamp(&(&full + correction), lower, upper);
            if accepts(merit(&corrected), 1.0) {
                trace!("sqp: accepted second-order correction");
                return Some(corrected);
            }
        }

        let mut alpha = 0.5;
        while alpha >= MIN_STEP_LENGTH {
            let trial = clamp(&(x + step * alpha), lower, upper);
            if accepts(merit(&trial), alpha) {
                return Some(trial);
            }
            alpha *= 0.5;
        }
        None
    }
}

impl NlpSolver for SqpSolver {
    fn solve(&self, problem: &dyn NlpProblem) -> SolverOutput {
        let start = Instant::now();
        let m = problem.num_constraints();
        let opts = &self.options;

        let (lower, upper) = problem.variable_bounds();
        let mut x = clamp(&problem.initial_guess(), &lower, &upper);
        let mut multipliers = DVector::zeros(m);
        let mut penalty = 0.0_f64;
        let mut regularization = Regularization::default();
        let mut iterations = 0;

        let status = loop {
            if let Some(deadline) = opts.deadline {
                if start.elapsed() >= deadline {
                    break SolveStatus::DeadlineExceeded;
                }
            }

            let objective = problem.objective(&x);
            let gradient = problem.gradient(&x);
            let residual = problem.constraints(&x);
            let jacobian = problem.jacobian(&x);
            if !objective.is_finite()
                || gradient.iter().chain(residual.iter()).chain(jacobian.iter()).any(|v| !v.is_finite())
            {
                break SolveStatus::NumericalFailure;
            }
            let violation = max_abs(&residual);

            let hessian = self.hessian(problem, &x, &multipliers);
            let (hessian, reg) = match convexify(&hessian, &jacobian, regularization) {
                Some(convex) => convex,
                None => break SolveStatus::NumericalFailure,
            };
            regularization = reg;

            let step_lower = &lower - &x;
            let step_upper = &upper - &x;
            let qp_problem = QpProblem {
                hessian: &hessian,
                gradient: &gradient,
                jacobian: &jacobian,
                residual: &residual,
                lower: &step_lower,
                upper: &step_upper,
            };
            let solution = match qp::solve(&qp_problem) {
                Ok(solution) => solution,
                Err(QpError::Infeasible) => break SolveStatus::Infeasible,
                Err(err) => {
                    trace!("sqp: step QP failed: {}", err);
                    break SolveStatus::NumericalFailure;
                }
            };
            // undo the J'J augmentation: H d + g + J'(z - rho c) = 0 when J d = -c
            multipliers = &solution.multipliers - &residual * regularization.augmentation;

            let stationarity = stationarity_error(&x, &gradient, &jacobian, &multipliers, &lower, &upper);
            trace!(
                "sqp: iter {} f {:.6e} |c| {:.3e} stationarity {:.3e} |d| {:.3e} reg {:?} qp iters {}",
                iterations,
                objective,
                violation,
                stationarity,
                max_abs(&solution.step),
                regularization,
                solution.iterations
            );
            if violation <= opts.constraint_tolerance
                && stationarity <= opts.tolerance * max_abs(&gradient).max(1.0)
            {
                break SolveStatus::Converged;
            }
            if iterations >= opts.max_iterations {
                break SolveStatus::MaxIterations;
            }

            penalty = penalty.max(PENALTY_FACTOR * max_abs(&multipliers) + PENALTY_MARGIN);
            match self.line_search(
                problem,
                &x,
                &solution.step,
                objective,
                &gradient,
                &residual,
                &jacobian,
                &solution.active,
                penalty,
                (&lower, &upper),
            ) {
                Some(next) => x = next,
                None => break SolveStatus::LineSearchFailed,
            }
            iterations += 1;
        };

        let objective = problem.objective(&x);
        let constraint_violation = max_abs(&problem.constraints(&x));
        SolverOutput {
            x,
            status,
            iterations,
            objective,
            constraint_violation,
            elapsed: start.elapsed(),
        }
    }
}

/// Terms added to the Hessian so the step QP is strictly convex
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Regularization {
    /// Weight of J'J. Leaves the QP minimiser unchanged on J d = -c.
    augmentation: f64,
    /// Multiple of the identity, used once augmentation alone is not enough
    shift: f64,
}

/// Find a regularisation that makes the Hessian positive definite, starting
/// below the augmentation accepted last time.
fn convexify(
    hessian: &DMatrix<f64>,
    jacobian: &DMatrix<f64>,
    previous: Regularization,
) -> Option<(DMatrix<f64>, Regularization)> {
    let n = hessian.nrows();
    let scale = hessian.diagonal().iter().fold(1.0_f64, |acc, h| acc.max(h.abs()));
    let gram = jacobian.tr_mul(jacobian);
    let has_constraints = jacobian.nrows() > 0;

    let mut reg = Regularization {
        augmentation: if has_constraints { previous.augmentation / 10.0 } else { 0.0 },
        shift: 0.0,
    };
    for _ in 0..MAX_REGULARIZATIONS {
        let regularized = hessian + &gram * reg.augmentation + DMatrix::<f64>::identity(n, n) * reg.shift;
        if regularized.clone().cholesky().is_some() {
            return Some((regularized, reg));
        }
        if has_constraints && reg.augmentation < MAX_AUGMENTATION * scale {
            reg.augmentation = if reg.augmentation < MIN_AUGMENTATION * scale {
                MIN_AUGMENTATION * scale
            } else {
                reg.augmentation * 10.0
            };
        } else {
            reg.shift = if reg.shift < MIN_SHIFT * scale { MIN_SHIFT * scale } else { reg.shift * 10.0 };
        }
    }
    None
}

/// Symmetrised central-difference Jacobian of a gradient map
fn central_difference_hessian<F>(x: &DVector<f64>, gradient: F) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let n = x.len();
    let base_step = f64::EPSILON.cbrt();
    let mut hessian = DMatrix::zeros(n, n);
    for j in 0..n {
        let h = base_step * x[j].abs().max(1.0);
        let mut forward = x.clone();
        forward[j] += h;
        let mut backward = x.clone();
        backward[j] -= h;
        let column = (gradient(&forward) - gradient(&backward)) / (2.0 * h);
        hessian.set_column(j, &column);
    }
    (&hessian + hessian.transpose()) * 0.5
}

/// Minimum-norm step over the variables off their bounds that removes the
/// constraint residual at `point` to first order.
fn second_order_correction(
    problem: &dyn NlpProblem,
    point: &DVector<f64>,
    jacobian: &DMatrix<f64>,
    active: &[bool],
) -> Option<DVector<f64>> {
    if jacobian.nrows() == 0 {
        return None;
    }
    let residual = problem.constraints(point);
    let mut free = jacobian.clone();
    for (i, &on_bound) in active.iter().enumerate() {
        if on_bound {
            free.column_mut(i).fill(0.0);
        }
    }
    let gram = &free * free.transpose();
    let weights = gram.lu().solve(&residual)?;
    let correction = -free.tr_mul(&weights);
    if correction.iter().all(|v| v.is_finite()) {
        Some(correction)
    } else {
        None
    }
}

/// Infinity norm of the Lagrangian gradient after crediting bound multipliers
/// with the admissible sign at active bounds.
fn stationarity_error(
    x: &DVector<f64>,
    gradient: &DVector<f64>,
    jacobian: &DMatrix<f64>,
    multipliers: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
) -> f64 {
    let lagrangian_gradient = gradient + jacobian.tr_mul(multipliers);
    let mut error = 0.0_f64;
    for i in 0..x.len() {
        let at_lower = lower[i].is_finite() && x[i] - lower[i] <= ACTIVE_TOLERANCE * lower[i].abs().max(1.0);
        let at_upper = upper[i].is_finite() && upper[i] - x[i] <= ACTIVE_TOLERANCE * upper[i].abs().max(1.0);
        let r = lagrangian_gradient[i];
        let residual = match (at_lower, at_upper) {
            (true, true) => 0.0,
            (true, false) => (-r).max(0.0),
            (false, true) => r.max(0.0),
            (false, false) => r.abs(),
        };
        error = error.max(residual);
    }
    error
}

fn clamp(x: &DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) -> DVector<f64> {
    x.zip_zip_map(lower, upper, |v, lo, hi| v.max(lo).min(hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// min (x0 - 2)^2 + (x1 - 2)^2  s.t.  x0^2 + x1^2 = 2, with optional box
    struct CircleProblem {
        lower: DVector<f64>,
        upper: DVector<f64>,
        start: DVector<f64>,
    }

    impl CircleProblem {
        fn unbounded() -> Self {
            Self {
                lower: DVector::from_element(2, f64::NEG_INFINITY),
                upper: DVector::from_element(2, f64::INFINITY),
                start: DVector::from_vec(vec![0.5, 1.0]),
            }
        }
    }

    impl NlpProblem for CircleProblem {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn variable_bounds(&self) -> (DVector<f64>, DVector<f64>) {
            (self.lower.clone(), self.upper.clone())
        }
        fn initial_guess(&self) -> DVector<f64> {
            self.start.clone()
        }
        fn objective(&self, x: &DVector<f64>) -> f64 {
            (x[0] - 2.0).powi(2) + (x[1] - 2.0).powi(2)
        }
        fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![2.0 * (x[0] - 2.0), 2.0 * (x[1] - 2.0)])
        }
        fn constraints(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - 2.0])
        }
        fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_row_slice(1, 2, &[2.0 * x[0], 2.0 * x[1]])
        }
    }

    /// min (x0 - 1)^2 + (x1 - 2)^2  s.t.  x0 + x1 = 1,  x1 <= cap
    struct CappedLine {
        cap: f64,
        poison: bool,
    }

    impl NlpProblem for CappedLine {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn variable_bounds(&self) -> (DVector<f64>, DVector<f64>) {
            (
                DVector::from_element(2, f64::NEG_INFINITY),
                DVector::from_vec(vec![f64::INFINITY, self.cap]),
            )
        }
        fn initial_guess(&self) -> DVector<f64> {
            DVector::zeros(2)
        }
        fn objective(&self, x: &DVector<f64>) -> f64 {
            if self.poison {
                return f64::NAN;
            }
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

    fn unlimited() -> SqpOptions {
        SqpOptions {
            deadline: None,
            ..SqpOptions::default()
        }
    }

    #[test]
    fn test_nonlinear_equality_converges() {
        let solver = SqpSolver::new(unlimited());
        let output = solver.solve(&CircleProblem::unbounded());

        assert_eq!(output.status, SolveStatus::Converged);
        assert_relative_eq!(output.x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(output.x[1], 1.0, epsilon = 1e-5);
        assert!(output.constraint_violation <= 1e-6);
        assert_relative_eq!(output.objective, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_linear_equality_without_active_bound() {
        let solver = SqpSolver::new(unlimited());
        let output = solver.solve(&CappedLine { cap: 10.0, poison: false });

        assert_eq!(output.status, SolveStatus::Converged);
        assert_relative_eq!(output.x[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(output.x[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_active_upper_bound() {
        let solver = SqpSolver::new(unlimited());
        let output = solver.solve(&CappedLine { cap: 0.5, poison: false });

        assert_eq!(output.status, SolveStatus::Converged);
        assert_relative_eq!(output.x[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(output.x[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_gauss_newton_on_bounded_problem() {
        let solver = SqpSolver::new(SqpOptions {
            hessian: HessianApproximation::GaussNewton,
            ..unlimited()
        });
        let output = solver.solve(&CappedLine { cap: 0.5, poison: false });

        assert_eq!(output.status, SolveStatus::Converged);
        assert!(output.x[1] <= 0.5);
    }

    #[test]
    fn test_iterates_stay_inside_box() {
        let problem = CircleProblem {
            lower: DVector::from_vec(vec![0.0, 0.0]),
            upper: DVector::from_vec(vec![1.2, 1.2]),
            start: DVector::from_vec(vec![1.2, 0.5]),
        };
        let output = SqpSolver::new(unlimited()).solve(&problem);

        assert_eq!(output.status, SolveStatus::Converged);
        assert!(output.x.iter().all(|&v| (0.0..=1.2).contains(&v)));
        assert_relative_eq!(output.x[0], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_deadline_aborts() {
        let solver = SqpSolver::new(SqpOptions {
            deadline: Some(Duration::from_millis(0)),
            ..SqpOptions::default()
        });
        let output = solver.solve(&CircleProblem::unbounded());

        assert_eq!(output.status, SolveStatus::DeadlineExceeded);
        assert_eq!(output.iterations, 0);
    }

    #[test]
    fn test_iteration_limit() {
        let solver = SqpSolver::new(SqpOptions {
            max_iterations: 1,
            ..unlimited()
        });
        let output = solver.solve(&CircleProblem::unbounded());

        assert_eq!(output.status, SolveStatus::MaxIterations);
        assert_eq!(output.iterations, 1);
    }

    #[test]
    fn test_non_finite_objective() {
        let output = SqpSolver::new(unlimited()).solve(&CappedLine { cap: 10.0, poison: true });
        assert_eq!(output.status, SolveStatus::NumericalFailure);
    }

    /// min x0^2 + x1^2  s.t.  x0 + x1 = 3 inside [0, 1]^2
    struct OutOfReach;

    impl NlpProblem for OutOfReach {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn variable_bounds(&self) -> (DVector<f64>, DVector<f64>) {
            (DVector::zeros(2), DVector::from_element(2, 1.0))
        }
        fn initial_guess(&self) -> DVector<f64> {
            DVector::from_element(2, 0.5)
        }
        fn objective(&self, x: &DVector<f64>) -> f64 {
            x.norm_squared()
        }
        fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            x * 2.0
        }
        fn constraints(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[0] + x[1] - 3.0])
        }
        fn jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0])
        }
    }

    #[test]
    fn test_infeasible_linearisation_is_certified() {
        let output = SqpSolver::new(unlimited()).solve(&OutOfReach);
        assert_eq!(output.status, SolveStatus::Infeasible);
        assert_eq!(output.iterations, 0);
    }

    #[test]
    fn test_convexify_keeps_positive_definite_matrix() {
        let hessian = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let jacobian = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let (convex, reg) = convexify(&hessian, &jacobian, Regularization::default()).unwrap();
        assert_eq!(reg, Regularization::default());
        assert_eq!(convex, hessian);
    }

    #[test]
    fn test_convexify_augments_along_constrained_directions() {
        // Negative curvature only in d1, which the constraint row pins
        let hessian = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, -1.0]);
        let jacobian = DMatrix::from_row_slice(1, 2, &[0.0, 1.0]);
        let (convex, reg) = convexify(&hessian, &jacobian, Regularization::default()).unwrap();
        assert_eq!(reg.shift, 0.0);
        assert!(reg.augmentation > 1.0 && reg.augmentation < 3.0);
        assert!(convex.cholesky().is_some());
    }

    #[test]
    fn test_convexify_shifts_when_reduced_curvature_is_negative() {
        // Negative curvature in d0, which no constraint touches
        let hessian = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 0.0, 4.0]);
        let jacobian = DMatrix::from_row_slice(1, 2, &[0.0, 1.0]);
        let (convex, reg) = convexify(&hessian, &jacobian, Regularization::default()).unwrap();
        assert!(reg.shift > 1.0 && reg.shift < 5.0);
        assert!(convex.cholesky().is_some());
    }

    #[test]
    fn test_augmentation_does_not_move_the_step() {
        // Same QP with and without J'J augmentation: the step is unchanged and
        // the recovered multiplier matches.
        let hessian = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 2.0]);
        let gradient = DVector::from_vec(vec![-2.0, -4.0]);
        let jacobian = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let residual = DVector::from_vec(vec![-1.0]);
        let (lower, upper) = (
            DVector::from_element(2, f64::NEG_INFINITY),
            DVector::from_element(2, f64::INFINITY),
        );
        let rho = 50.0;
        let augmented = &hessian + jacobian.tr_mul(&jacobian) * rho;

        let plain = qp::solve(&QpProblem {
            hessian: &hessian,
            gradient: &gradient,
            jacobian: &jacobian,
            residual: &residual,
            lower: &lower,
            upper: &upper,
        })
        .unwrap();
        let shifted = qp::solve(&QpProblem {
            hessian: &augmented,
            gradient: &gradient,
            jacobian: &jacobian,
            residual: &residual,
            lower: &lower,
            upper: &upper,
        })
        .unwrap();

        assert_relative_eq!(plain.step, shifted.step, epsilon = 1e-6);
        let recovered = shifted.multipliers[0] - rho * residual[0];
        assert_relative_eq!(recovered, plain.multipliers[0], epsilon = 1e-4);
    }

    #[test]
    fn test_unbounded_variables_need_true_stationarity() {
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let gradient = DVector::from_vec(vec![1.0, -2.0]);
        let jacobian = DMatrix::zeros(0, 2);
        let multipliers = DVector::zeros(0);
        let lower = DVector::from_element(2, f64::NEG_INFINITY);
        let upper = DVector::from_element(2, f64::INFINITY);
        let error = stationarity_error(&x, &gradient, &jacobian, &multipliers, &lower, &upper);
        assert_eq!(error, 2.0);

        // at a finite lower bound only a negative residual counts
        let lower = DVector::zeros(2);
        let error = stationarity_error(&x, &gradient, &jacobian, &multipliers, &lower, &upper);
        assert_eq!(error, 2.0);
        let gradient = DVector::from_vec(vec![1.0, 3.0]);
        let error = stationarity_error(&x, &gradient, &jacobian, &multipliers, &lower, &upper);
        assert_eq!(error, 0.0);
    }

    #[test]
    fn test_options_from_config() {
        let options = SqpOptions::from(&SolverConfig::default());
        assert_eq!(options.deadline, Some(Duration::from_millis(50)));
        assert_eq!(options.hessian, HessianApproximation::Lagrangian);
    }
}
