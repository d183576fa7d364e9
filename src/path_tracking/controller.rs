// Per-cycle control pipeline and fail-safe session
//
// telemetry -> vehicle frame -> cubic fit -> latency compensation -> horizon solve
//
// `MpcController` runs the pipeline and reports every failure as an error.
// `ControlSession` owns one vehicle's cycle history and turns those errors
// into bounded fallback commands.

use std::sync::Arc;

use log::{debug, warn};

use crate::common::{Actuation, MpcError, MpcResult, NlpSolver, Path2D, State};
use crate::config::{FallbackPolicy, MpcConfig};
use crate::messages::{SteerCommand, Telemetry};
use crate::optimization::SqpSolver;
use crate::path_tracking::latency::LatencyCompensator;
use crate::path_tracking::mpc::{SolveResult, TrajectoryOptimizer};
use crate::reference::{world_to_vehicle, CubicPolynomial};

/// Everything a successful cycle produced
#[derive(Debug, Clone)]
pub struct ControlOutput {
    pub command: SteerCommand,
    pub solve: SolveResult,
    /// Reference waypoints in the vehicle frame
    pub waypoints: Path2D,
    pub reference: CubicPolynomial,
    /// Latency-compensated state the horizon started from
    pub initial_state: State,
}

impl ControlOutput {
    pub fn actuation(&self) -> Actuation {
        self.solve.actuation
    }
}

pub struct MpcController<S = SqpSolver> {
    config: Arc<MpcConfig>,
    compensator: LatencyCompensator,
    optimizer: TrajectoryOptimizer<S>,
}

impl MpcController<SqpSolver> {
    pub fn new(config: Arc<MpcConfig>) -> MpcResult<Self> {
        config.validate()?;
        let optimizer = TrajectoryOptimizer::new(Arc::clone(&config));
        Ok(Self::assemble(config, optimizer))
    }
}

impl<S: NlpSolver> MpcController<S> {
    pub fn with_solver(config: Arc<MpcConfig>, solver: S) -> MpcResult<Self> {
        config.validate()?;
        let optimizer = TrajectoryOptimizer::with_solver(Arc::clone(&config), solver);
        Ok(Self::assemble(config, optimizer))
    }

    fn assemble(config: Arc<MpcConfig>, optimizer: TrajectoryOptimizer<S>) -> Self {
        Self {
            compensator: LatencyCompensator::from_params(&config.vehicle),
            config,
            optimizer,
        }
    }

    pub fn config(&self) -> &MpcConfig {
        &self.config
    }

    /// Run one cycle with a cold start.
    pub fn compute(&self, telemetry: &Telemetry) -> MpcResult<ControlOutput> {
        self.compute_with_seed(telemetry, &[])
    }

    /// Run one cycle, seeding the solver with `seed` actuations.
    pub fn compute_with_seed(&self, telemetry: &Telemetry, seed: &[Actuation]) -> MpcResult<ControlOutput> {
        telemetry.validate()?;

        let waypoints = world_to_vehicle(&telemetry.pose(), &telemetry.ptsx, &telemetry.ptsy)?;
        let reference = CubicPolynomial::fit(&waypoints)?;

        let measured = State::at_origin(telemetry.speed, reference.cte_at_origin(), reference.epsi_at_origin());
        let initial_state = self.compensator.predict(&measured, &telemetry.previous_actuation())?;

        let solve = self.optimizer.solve(&initial_state, &reference, seed)?;
        let command = SteerCommand::from_actuation(solve.actuation, self.config.bounds.max_steer)
            .with_display(&solve.trajectory, &waypoints);

        Ok(ControlOutput {
            command,
            solve,
            waypoints,
            reference,
            initial_state,
        })
    }
}

/// Result of one session cycle. A command is always present.
#[derive(Debug)]
pub enum CycleOutcome {
    Solved(ControlOutput),
    Fallback {
        command: SteerCommand,
        actuation: Actuation,
        policy: FallbackPolicy,
        error: MpcError,
    },
}

impl CycleOutcome {
    pub fn command(&self) -> &SteerCommand {
        match self {
            CycleOutcome::Solved(output) => &output.command,
            CycleOutcome::Fallback { command, .. } => command,
        }
    }

    pub fn actuation(&self) -> Actuation {
        match self {
            CycleOutcome::Solved(output) => output.actuation(),
            CycleOutcome::Fallback { actuation, .. } => *actuation,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CycleOutcome::Fallback { .. })
    }
}

/// Cycle loop for one vehicle. `&mut self` keeps a single solve in flight.
pub struct ControlSession<S = SqpSolver> {
    controller: MpcController<S>,
    last_actuation: Option<Actuation>,
    consecutive_failures: u32,
    warm_start: Vec<Actuation>,
    cycles: u64,
}

impl ControlSession<SqpSolver> {
    pub fn new(config: Arc<MpcConfig>) -> MpcResult<Self> {
        Ok(Self::from_controller(MpcController::new(config)?))
    }
}

impl<S: NlpSolver> ControlSession<S> {
    pub fn from_controller(controller: MpcController<S>) -> Self {
        Self {
            controller,
            last_actuation: None,
            consecutive_failures: 0,
            warm_start: Vec::new(),
            cycles: 0,
        }
    }

    pub fn controller(&self) -> &MpcController<S> {
        &self.controller
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Shifted plan that seeds the next solve when warm starting is enabled
    pub fn warm_start_plan(&self) -> &[Actuation] {
        &self.warm_start
    }

    /// Run one cycle and always produce a command within the actuation bounds.
    pub fn step(&mut self, telemetry: &Telemetry) -> CycleOutcome {
        self.cycles += 1;
        let warm_start = self.controller.config().solver.warm_start;
        let seed: &[Actuation] = if warm_start { &self.warm_start } else { &[] };

        match self.controller.compute_with_seed(telemetry, seed) {
            Ok(output) => {
                self.consecutive_failures = 0;
                self.last_actuation = Some(output.actuation());
                if warm_start {
                    self.warm_start = output.solve.shifted_plan();
                }
                debug!(
                    "cycle {}: steer {:.4} rad, throttle {:.3}",
                    self.cycles,
                    output.actuation().steer,
                    output.actuation().throttle
                );
                CycleOutcome::Solved(output)
            }
            Err(error) => {
                self.consecutive_failures += 1;
                self.warm_start.clear();
                let (policy, actuation) = self.fallback_actuation(telemetry);
                self.last_actuation = Some(actuation);
                let stage = if error.is_solver_failure() { "solve" } else { "pipeline" };
                warn!(
                    "cycle {}: {} error: {} (failure {} in a row), issuing {:?} command steer {:.4} throttle {:.3}",
                    self.cycles,
                    stage,
                    error,
                    self.consecutive_failures,
                    policy,
                    actuation.steer,
                    actuation.throttle
                );
                let command = SteerCommand::from_actuation(actuation, self.controller.config().bounds.max_steer);
                CycleOutcome::Fallback {
                    command,
                    actuation,
                    policy,
                    error,
                }
            }
        }
    }

    /// Actuation to apply after a failed cycle.
    ///
    /// Holding falls back to braking once more than `max_hold_cycles`
    /// consecutive cycles have failed.
    fn fallback_actuation(&self, telemetry: &Telemetry) -> (FallbackPolicy, Actuation) {
        let config = self.controller.config();
        let previous = self
            .last_actuation
            .or_else(|| Some(telemetry.previous_actuation()).filter(Actuation::is_finite))
            .unwrap_or_default();

        let policy = match config.fallback.policy {
            FallbackPolicy::HoldPrevious if self.consecutive_failures > config.fallback.max_hold_cycles => {
                FallbackPolicy::Brake
            }
            policy => policy,
        };
        let actuation = match policy {
            FallbackPolicy::HoldPrevious => previous,
            FallbackPolicy::Brake => Actuation::new(previous.steer, config.fallback.brake_throttle),
        };
        (policy, config.bounds.clamp(actuation))
    }
}
