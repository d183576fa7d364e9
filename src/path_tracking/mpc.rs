// Receding-horizon trajectory optimizer
//
// Decision vector layout, N = horizon steps:
//   x[0..=N] y[0..=N] psi[0..=N] v[0..=N] cte[0..=N] epsi[0..=N]
//   steer[0..N) throttle[0..N)
//
// Constraint rows follow the state blocks: row k (N + 1) + t pins state k at
// step t, to the initial state for t = 0 and to the bicycle dynamics after.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::common::{
    Actuation, MpcError, MpcResult, NlpProblem, NlpSolver, Point2D, SolveStatus, SolverOutput, State, Trajectory,
};
use crate::config::MpcConfig;
use crate::optimization::{SqpOptions, SqpSolver};
use crate::path_tracking::motion_model::KinematicBicycle;
use crate::reference::CubicPolynomial;

/// Offsets of each block in the decision vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    pub steps: usize,
}

impl VariableLayout {
    pub fn new(steps: usize) -> Self {
        Self { steps }
    }

    pub fn x(&self, t: usize) -> usize {
        t
    }
    pub fn y(&self, t: usize) -> usize {
        (self.steps + 1) + t
    }
    pub fn psi(&self, t: usize) -> usize {
        2 * (self.steps + 1) + t
    }
    pub fn v(&self, t: usize) -> usize {
        3 * (self.steps + 1) + t
    }
    pub fn cte(&self, t: usize) -> usize {
        4 * (self.steps + 1) + t
    }
    pub fn epsi(&self, t: usize) -> usize {
        5 * (self.steps + 1) + t
    }
    pub fn steer(&self, t: usize) -> usize {
        State::DIM * (self.steps + 1) + t
    }
    pub fn throttle(&self, t: usize) -> usize {
        State::DIM * (self.steps + 1) + self.steps + t
    }

    pub fn num_variables(&self) -> usize {
        State::DIM * (self.steps + 1) + 2 * self.steps
    }

    pub fn num_constraints(&self) -> usize {
        State::DIM * (self.steps + 1)
    }

    pub fn state(&self, vars: &DVector<f64>, t: usize) -> State {
        State {
            x: vars[self.x(t)],
            y: vars[self.y(t)],
            psi: vars[self.psi(t)],
            v: vars[self.v(t)],
            cte: vars[self.cte(t)],
            epsi: vars[self.epsi(t)],
        }
    }

    pub fn actuation(&self, vars: &DVector<f64>, t: usize) -> Actuation {
        Actuation::new(vars[self.steer(t)], vars[self.throttle(t)])
    }

    fn write_state(&self, vars: &mut DVector<f64>, t: usize, state: &State) {
        vars[self.x(t)] = state.x;
        vars[self.y(t)] = state.y;
        vars[self.psi(t)] = state.psi;
        vars[self.v(t)] = state.v;
        vars[self.cte(t)] = state.cte;
        vars[self.epsi(t)] = state.epsi;
    }
}

/// Horizon optimization problem for one control cycle
pub struct MpcProblem<'a> {
    config: &'a MpcConfig,
    layout: VariableLayout,
    model: KinematicBicycle,
    reference: CubicPolynomial,
    initial: State,
    seed: Vec<Actuation>,
}

impl<'a> MpcProblem<'a> {
    /// `seed` supplies actuations for the initial guess; missing entries are zero.
    pub fn new(config: &'a MpcConfig, initial: State, reference: CubicPolynomial, seed: &[Actuation]) -> Self {
        let steps = config.horizon.steps;
        let seed = (0..steps)
            .map(|t| config.bounds.clamp(seed.get(t).copied().unwrap_or_default()))
            .collect();
        Self {
            config,
            layout: VariableLayout::new(steps),
            model: KinematicBicycle::new(config.vehicle.lf),
            reference,
            initial,
            seed,
        }
    }

    pub fn layout(&self) -> VariableLayout {
        self.layout
    }
}

impl<'a> NlpProblem for MpcProblem<'a> {
    fn num_variables(&self) -> usize {
        self.layout.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.layout.num_constraints()
    }

    fn variable_bounds(&self) -> (DVector<f64>, DVector<f64>) {
        let n = self.num_variables();
        let l = &self.layout;
        let b = &self.config.bounds;
        let mut lower = DVector::from_element(n, f64::NEG_INFINITY);
        let mut upper = DVector::from_element(n, f64::INFINITY);
        for t in 0..l.steps {
            lower[l.steer(t)] = -b.max_steer;
            upper[l.steer(t)] = b.max_steer;
            lower[l.throttle(t)] = b.throttle_min;
            upper[l.throttle(t)] = b.throttle_max;
        }
        (lower, upper)
    }

    fn initial_guess(&self) -> DVector<f64> {
        let l = &self.layout;
        let mut vars = DVector::zeros(self.num_variables());
        let states = self
            .model
            .rollout(&self.initial, &self.seed, &self.reference, self.config.horizon.dt);
        for (t, state) in states.iter().enumerate() {
            l.write_state(&mut vars, t, state);
        }
        for (t, actuation) in self.seed.iter().enumerate() {
            vars[l.steer(t)] = actuation.steer;
            vars[l.throttle(t)] = actuation.throttle;
        }
        vars
    }

    fn objective(&self, vars: &DVector<f64>) -> f64 {
        let l = &self.layout;
        let w = &self.config.weights;
        let v_ref = self.config.horizon.reference_speed;
        let mut cost = 0.0;

        for t in 0..=l.steps {
            cost += w.cte * vars[l.cte(t)].powi(2);
            cost += w.epsi * vars[l.epsi(t)].powi(2);
            cost += w.speed * (vars[l.v(t)] - v_ref).powi(2);
        }
        for t in 0..l.steps {
            cost += w.steer * vars[l.steer(t)].powi(2);
            cost += w.throttle * vars[l.throttle(t)].powi(2);
        }
        for t in 1..l.steps {
            cost += w.steer_rate * (vars[l.steer(t)] - vars[l.steer(t - 1)]).powi(2);
            cost += w.throttle_rate * (vars[l.throttle(t)] - vars[l.throttle(t - 1)]).powi(2);
        }
        cost
    }

    fn gradient(&self, vars: &DVector<f64>) -> DVector<f64> {
        let l = &self.layout;
        let w = &self.config.weights;
        let v_ref = self.config.horizon.reference_speed;
        let mut grad = DVector::zeros(self.num_variables());

        for t in 0..=l.steps {
            grad[l.cte(t)] = 2.0 * w.cte * vars[l.cte(t)];
            grad[l.epsi(t)] = 2.0 * w.epsi * vars[l.epsi(t)];
            grad[l.v(t)] = 2.0 * w.speed * (vars[l.v(t)] - v_ref);
        }
        for t in 0..l.steps {
            grad[l.steer(t)] = 2.0 * w.steer * vars[l.steer(t)];
            grad[l.throttle(t)] = 2.0 * w.throttle * vars[l.throttle(t)];
        }
        for t in 1..l.steps {
            let d_steer = 2.0 * w.steer_rate * (vars[l.steer(t)] - vars[l.steer(t - 1)]);
            grad[l.steer(t)] += d_steer;
            grad[l.steer(t - 1)] -= d_steer;
            let d_throttle = 2.0 * w.throttle_rate * (vars[l.throttle(t)] - vars[l.throttle(t - 1)]);
            grad[l.throttle(t)] += d_throttle;
            grad[l.throttle(t - 1)] -= d_throttle;
        }
        grad
    }

    fn constraints(&self, vars: &DVector<f64>) -> DVector<f64> {
        let l = &self.layout;
        let dt = self.config.horizon.dt;
        let mut c = DVector::zeros(self.num_constraints());

        let start = l.state(vars, 0);
        c[l.x(0)] = start.x - self.initial.x;
        c[l.y(0)] = start.y - self.initial.y;
        c[l.psi(0)] = start.psi - self.initial.psi;
        c[l.v(0)] = start.v - self.initial.v;
        c[l.cte(0)] = start.cte - self.initial.cte;
        c[l.epsi(0)] = start.epsi - self.initial.epsi;

        for t in 0..l.steps {
            let now = l.state(vars, t);
            let next = l.state(vars, t + 1);
            let predicted = self
                .model
                .predict_tracking(&now, &l.actuation(vars, t), &self.reference, dt);
            c[l.x(t + 1)] = next.x - predicted.x;
            c[l.y(t + 1)] = next.y - predicted.y;
            c[l.psi(t + 1)] = next.psi - predicted.psi;
            c[l.v(t + 1)] = next.v - predicted.v;
            c[l.cte(t + 1)] = next.cte - predicted.cte;
            c[l.epsi(t + 1)] = next.epsi - predicted.epsi;
        }
        c
    }

    fn jacobian(&self, vars: &DVector<f64>) -> DMatrix<f64> {
        let l = &self.layout;
        let dt = self.config.horizon.dt;
        let lf = self.config.vehicle.lf;
        let mut jac = DMatrix::zeros(self.num_constraints(), self.num_variables());

        for row in 0..State::DIM * (l.steps + 1) {
            jac[(row, row)] = 1.0;
        }

        for t in 0..l.steps {
            let s = l.state(vars, t);
            let steer = vars[l.steer(t)];
            let (sin_psi, cos_psi) = s.psi.sin_cos();
            let (sin_epsi, cos_epsi) = s.epsi.sin_cos();
            let slope = self.reference.derivative(s.x);
            let curvature = self.reference.second_derivative(s.x);

            let row = l.x(t + 1);
            jac[(row, l.x(t))] = -1.0;
            jac[(row, l.psi(t))] = s.v * sin_psi * dt;
            jac[(row, l.v(t))] = -cos_psi * dt;

            let row = l.y(t + 1);
            jac[(row, l.y(t))] = -1.0;
            jac[(row, l.psi(t))] = -s.v * cos_psi * dt;
            jac[(row, l.v(t))] = -sin_psi * dt;

            let row = l.psi(t + 1);
            jac[(row, l.psi(t))] = -1.0;
            jac[(row, l.v(t))] = steer * dt / lf;
            jac[(row, l.steer(t))] = s.v * dt / lf;

            let row = l.v(t + 1);
            jac[(row, l.v(t))] = -1.0;
            jac[(row, l.throttle(t))] = -dt;

            let row = l.cte(t + 1);
            jac[(row, l.x(t))] = -slope;
            jac[(row, l.y(t))] = 1.0;
            jac[(row, l.v(t))] = -sin_epsi * dt;
            jac[(row, l.epsi(t))] = -s.v * cos_epsi * dt;

            let row = l.epsi(t + 1);
            jac[(row, l.psi(t))] = -1.0;
            jac[(row, l.x(t))] = curvature / (1.0 + slope * slope);
            jac[(row, l.v(t))] = steer * dt / lf;
            jac[(row, l.steer(t))] = s.v * dt / lf;
        }
        jac
    }
}

/// Outcome of one horizon solve
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// First planned actuation, clamped into the configured bounds
    pub actuation: Actuation,
    /// Predicted (x, y) positions for steps 0..=N, vehicle frame
    pub trajectory: Trajectory,
    pub status: SolveStatus,
    /// Full planned actuation sequence
    pub plan: Vec<Actuation>,
    /// Full predicted state sequence
    pub states: Vec<State>,
    pub iterations: usize,
    pub objective: f64,
    pub constraint_violation: f64,
    pub elapsed: Duration,
}

impl SolveResult {
    fn from_output(config: &MpcConfig, layout: VariableLayout, output: SolverOutput) -> Self {
        let vars = &output.x;
        let states: Vec<State> = (0..=layout.steps).map(|t| layout.state(vars, t)).collect();
        let plan: Vec<Actuation> = (0..layout.steps).map(|t| layout.actuation(vars, t)).collect();
        let trajectory = Trajectory::from_points(states.iter().map(|s| Point2D::new(s.x, s.y)).collect());
        let actuation = config.bounds.clamp(plan.first().copied().unwrap_or_default());
        Self {
            actuation,
            trajectory,
            status: output.status,
            plan,
            states,
            iterations: output.iterations,
            objective: output.objective,
            constraint_violation: output.constraint_violation,
            elapsed: output.elapsed,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }

    /// Pass converged results through; turn every other status into an error.
    pub fn ensure_converged(self) -> MpcResult<Self> {
        match self.status {
            SolveStatus::Converged => Ok(self),
            SolveStatus::Infeasible => Err(MpcError::SolverInfeasible {
                violation: self.constraint_violation,
                iterations: self.iterations,
            }),
            status => Err(MpcError::SolverNonConvergent {
                status,
                iterations: self.iterations,
            }),
        }
    }

    /// Plan shifted one step ahead, repeating the last actuation to keep the length.
    pub fn shifted_plan(&self) -> Vec<Actuation> {
        let mut shifted: Vec<Actuation> = self.plan.iter().skip(1).copied().collect();
        if let Some(&last) = self.plan.last() {
            shifted.push(last);
        }
        shifted
    }
}

/// Builds and solves the horizon problem; holds no per-cycle state
pub struct TrajectoryOptimizer<S = SqpSolver> {
    config: Arc<MpcConfig>,
    solver: S,
}

impl TrajectoryOptimizer<SqpSolver> {
    pub fn new(config: Arc<MpcConfig>) -> Self {
        let solver = SqpSolver::new(SqpOptions::from(&config.solver));
        Self { config, solver }
    }
}

impl<S: NlpSolver> TrajectoryOptimizer<S> {
    pub fn with_solver(config: Arc<MpcConfig>, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &MpcConfig {
        &self.config
    }

    /// Solve the horizon problem and report the result whatever the status.
    pub fn optimize(&self, initial: &State, reference: &CubicPolynomial, seed: &[Actuation]) -> MpcResult<SolveResult> {
        if !initial.is_finite() {
            return Err(MpcError::InvalidInput("initial state is not finite".to_string()));
        }
        if !reference.is_finite() {
            return Err(MpcError::InvalidInput("reference coefficients are not finite".to_string()));
        }

        let problem = MpcProblem::new(&self.config, *initial, *reference, seed);
        let output = self.solver.solve(&problem);
        debug!(
            "mpc solve: {:?} after {} iterations, cost {:.4}, violation {:.2e}, {:.2} ms",
            output.status,
            output.iterations,
            output.objective,
            output.constraint_violation,
            output.elapsed.as_secs_f64() * 1e3
        );
        Ok(SolveResult::from_output(&self.config, problem.layout(), output))
    }

    /// Solve the horizon problem; only a converged solve yields a result.
    pub fn solve(&self, initial: &State, reference: &CubicPolynomial, seed: &[Actuation]) -> MpcResult<SolveResult> {
        self.optimize(initial, reference, seed)?.ensure_converged()
    }
}
