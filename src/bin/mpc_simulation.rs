//
// Closed-loop simulation of the receding-horizon controller on a winding road.
//
// The plant is the same kinematic bicycle the controller predicts with. Each
// command takes effect the configured latency after it is computed, and the
// telemetry reports the command the plant holds over that interval.
//
use std::path::Path;
use std::sync::Arc;

use itertools::{izip, Itertools};
use log::{info, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use vehicle_mpc::common::MotionModel;
use vehicle_mpc::path_tracking::{ActuationDelay, KinematicBicycle};
use vehicle_mpc::reference::vehicle_to_world;
use vehicle_mpc::utils::{signal_plot, Visualizer};
use vehicle_mpc::{ControlSession, CycleOutcome, MpcConfig, Path2D, Point2D, Telemetry, VehicleState};

const CONFIG_PATH: &str = "config/mpc.toml";
const SIM_TIME: f64 = 40.0;
const WAYPOINT_SPACING: f64 = 8.0;
const WAYPOINTS_AHEAD: usize = 6;
const SPEED_NOISE_STD: f64 = 0.2;
const HORIZON_PLOT_EVERY: usize = 25;

fn winding_road() -> Path2D {
    let xs: Vec<f64> = (0..150).map(|i| i as f64 * WAYPOINT_SPACING).collect();
    let ys: Vec<f64> = xs.iter().map(|x| 40.0 * (x / 150.0).sin() + 0.0004 * x * x).collect();
    Path2D::from_points(izip!(xs, ys).map(|(x, y)| Point2D::new(x, y)).collect())
}

/// Nearest waypoint at or after `from`, searching a short window forward
fn nearest_waypoint(road: &Path2D, position: Point2D, from: usize) -> usize {
    (from..road.len().min(from + 20))
        .min_by_key(|&i| OrderedFloat(road.points[i].distance(&position)))
        .unwrap_or(from)
}

fn load_config() -> MpcConfig {
    if !Path::new(CONFIG_PATH).exists() {
        info!("{} not found, using default tuning", CONFIG_PATH);
        return MpcConfig::default();
    }
    match MpcConfig::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            warn!("failed to load {}: {}, using default tuning", CONFIG_PATH, e);
            MpcConfig::default()
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(load_config());
    let dt = config.horizon.dt;
    let plant = KinematicBicycle::new(config.vehicle.lf);
    let mut actuator = ActuationDelay::new(config.vehicle.latency, dt);

    let mut session = match ControlSession::new(Arc::clone(&config)) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("invalid controller configuration: {}", e);
            std::process::exit(1);
        }
    };

    let road = winding_road();
    let mut rng = StdRng::seed_from_u64(7);
    let speed_noise = Normal::new(0.0, SPEED_NOISE_STD).unwrap();

    let start = &road.points[0];
    let heading = (road.points[1].y - start.y).atan2(road.points[1].x - start.x);
    let mut vehicle = VehicleState::new(start.x, start.y - 2.0, heading, 10.0);

    let mut driven = Path2D::new();
    let mut fallbacks = Vec::new();
    let mut horizons = Vec::new();
    let (mut times, mut speeds, mut steering) = (Vec::new(), Vec::new(), Vec::new());
    let mut nearest = 0;
    let mut time = 0.0;

    while time < SIM_TIME {
        nearest = nearest_waypoint(&road, vehicle.pose().position(), nearest);
        if nearest + WAYPOINTS_AHEAD >= road.len() {
            info!("reached the end of the road at t = {:.1} s", time);
            break;
        }

        let (ptsx, ptsy): (Vec<f64>, Vec<f64>) = road.points[nearest..nearest + WAYPOINTS_AHEAD]
            .iter()
            .map(|p| (p.x, p.y))
            .unzip();
        let held = actuator.held();
        let telemetry = Telemetry {
            ptsx,
            ptsy,
            x: vehicle.x,
            y: vehicle.y,
            psi: vehicle.psi,
            speed: vehicle.v + speed_noise.sample(&mut rng),
            steering_angle: held.steer,
            throttle: held.throttle,
        };

        let outcome = session.step(&telemetry);
        match &outcome {
            CycleOutcome::Solved(output) if times.len() % HORIZON_PLOT_EVERY == 0 => {
                horizons.push(vehicle_to_world(&vehicle.pose(), &output.solve.trajectory));
            }
            CycleOutcome::Fallback { .. } => fallbacks.push(vehicle.pose().position()),
            _ => {}
        }

        actuator.submit(outcome.actuation());
        let applied = actuator.held();

        driven.push(vehicle.pose().position());
        times.push(time);
        speeds.push(vehicle.v);
        steering.push(applied.steer.to_degrees());

        vehicle = plant.propagate(&vehicle, &applied, dt);
        actuator.tick();
        time += dt;
    }

    let mean_speed = speeds.iter().sum::<f64>() / speeds.len().max(1) as f64;
    info!(
        "{} cycles, {} fallbacks, mean speed {:.2}, max |steer| {:.2} deg",
        session.cycles(),
        fallbacks.len(),
        mean_speed,
        steering.iter().map(|s| s.abs()).fold(0.0, f64::max)
    );
    if let Some((a, b)) = speeds.iter().tuple_windows().map(|(a, b)| (b - a) / dt).minmax().into_option() {
        info!("acceleration range [{:.2}, {:.2}]", a, b);
    }

    let mut vis = Visualizer::new();
    vis.set_title("Receding-horizon tracking").plot_waypoints(&road).plot_driven_path(&driven);
    for horizon in &horizons {
        vis.plot_horizon(horizon);
    }
    vis.plot_fallbacks(&fallbacks).plot_vehicle(&vehicle.pose(), 6.0);

    std::fs::create_dir_all("img").ok();
    if let Err(e) = vis.save_svg("img/mpc_tracking.svg", 800, 600) {
        warn!("could not save tracking plot: {}", e);
    }
    let signals = signal_plot(&times, &speeds, &steering, "Speed and steering");
    if let Err(e) = signals.save_svg("img/mpc_signals.svg", 800, 400) {
        warn!("could not save signal plot: {}", e);
    }
    println!("Plots saved to img/mpc_tracking.svg and img/mpc_signals.svg");
}
