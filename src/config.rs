//! Controller configuration
//!
//! Every tunable of the controller lives in one immutable [`MpcConfig`]
//! value, built once at start-up (from defaults or a TOML file) and shared
//! read-only by all control sessions.

use std::f64::consts::PI;
use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{Actuation, MpcError, MpcResult};
use crate::optimization::HessianApproximation;

/// Hardware steering limit; configured bounds may be tighter, never wider.
pub const STEER_ANGLE_LIMIT: f64 = 25.0 * PI / 180.0;

/// Horizon discretisation and tracking target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    /// Number of future steps N
    pub steps: usize,
    /// Timestep [s]
    pub dt: f64,
    /// Reference speed tracked by the speed cost term
    pub reference_speed: f64,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            dt: 0.1,
            reference_speed: 40.0,
        }
    }
}

/// Cost weights, one per objective term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub cte: f64,
    pub epsi: f64,
    pub speed: f64,
    pub steer: f64,
    pub throttle: f64,
    pub steer_rate: f64,
    pub throttle_rate: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            cte: 2000.0,
            epsi: 2000.0,
            speed: 1.0,
            steer: 5.0,
            throttle: 5.0,
            steer_rate: 200.0,
            throttle_rate: 10.0,
        }
    }
}

/// Actuation bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuationBounds {
    /// Symmetric steering bound [rad]
    pub max_steer: f64,
    pub throttle_min: f64,
    pub throttle_max: f64,
}

impl ActuationBounds {
    pub fn contains(&self, actuation: &Actuation) -> bool {
        actuation.steer.abs() <= self.max_steer
            && actuation.throttle >= self.throttle_min
            && actuation.throttle <= self.throttle_max
    }

    /// Saturate an actuation into the bounds. Non-finite components become zero
    /// before saturation.
    pub fn clamp(&self, actuation: Actuation) -> Actuation {
        let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
        Actuation {
            steer: finite_or_zero(actuation.steer).clamp(-self.max_steer, self.max_steer),
            throttle: finite_or_zero(actuation.throttle).clamp(self.throttle_min, self.throttle_max),
        }
    }
}

impl Default for ActuationBounds {
    fn default() -> Self {
        Self {
            max_steer: STEER_ANGLE_LIMIT,
            throttle_min: -1.0,
            throttle_max: 1.0,
        }
    }
}

/// Vehicle geometry and actuation latency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    /// Distance from the front axle to the center of gravity [m]
    pub lf: f64,
    /// Assumed actuation latency [s]
    pub latency: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self { lf: 2.67, latency: 0.1 }
    }
}

/// Nonlinear solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Scaled stationarity tolerance
    pub tolerance: f64,
    /// Infinity-norm tolerance on the dynamics residuals
    pub constraint_tolerance: f64,
    /// Solve-time watchdog; `None` disables it
    pub max_solve_time_ms: Option<u64>,
    pub hessian: HessianApproximation,
    /// Seed each solve with the previous cycle's shifted actuation plan
    pub warm_start: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            constraint_tolerance: 1e-6,
            max_solve_time_ms: Some(50),
            hessian: HessianApproximation::Lagrangian,
            warm_start: false,
        }
    }
}

/// What to command when a cycle fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Repeat the previous actuation, escalating to braking after
    /// `max_hold_cycles` consecutive failures
    HoldPrevious,
    /// Keep the previous steering and apply `brake_throttle`
    Brake,
}

/// Fail-safe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub policy: FallbackPolicy,
    pub brake_throttle: f64,
    pub max_hold_cycles: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            policy: FallbackPolicy::HoldPrevious,
            brake_throttle: -0.3,
            max_hold_cycles: 1,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MpcConfig {
    pub horizon: HorizonConfig,
    pub weights: CostWeights,
    pub bounds: ActuationBounds,
    pub vehicle: VehicleParams,
    pub solver: SolverConfig,
    pub fallback: FallbackConfig,
}

impl MpcConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> MpcResult<Self> {
        let config: MpcConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> MpcResult<Self> {
        let source = read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> MpcResult<()> {
        let h = &self.horizon;
        if h.steps < 2 {
            return Err(invalid(format!("horizon.steps must be at least 2, got {}", h.steps)));
        }
        if !(h.dt.is_finite() && h.dt > 0.0) {
            return Err(invalid(format!("horizon.dt must be positive, got {}", h.dt)));
        }
        if !h.reference_speed.is_finite() {
            return Err(invalid("horizon.reference_speed must be finite".to_string()));
        }

        let w = &self.weights;
        let all_weights = [
            ("cte", w.cte),
            ("epsi", w.epsi),
            ("speed", w.speed),
            ("steer", w.steer),
            ("throttle", w.throttle),
            ("steer_rate", w.steer_rate),
            ("throttle_rate", w.throttle_rate),
        ];
        for (name, value) in all_weights.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(invalid(format!("weights.{} must be finite and non-negative, got {}", name, value)));
            }
        }
        if w.steer <= 0.0 || w.throttle <= 0.0 {
            return Err(invalid("weights.steer and weights.throttle must be positive".to_string()));
        }

        let b = &self.bounds;
        if !(b.max_steer > 0.0 && b.max_steer <= STEER_ANGLE_LIMIT) {
            return Err(invalid(format!(
                "bounds.max_steer must lie in (0, {:.6}] rad, got {}",
                STEER_ANGLE_LIMIT, b.max_steer
            )));
        }
        if !(b.throttle_min >= -1.0 && b.throttle_max <= 1.0 && b.throttle_min < b.throttle_max) {
            return Err(invalid(format!(
                "bounds.throttle must satisfy -1 <= min < max <= 1, got [{}, {}]",
                b.throttle_min, b.throttle_max
            )));
        }

        let v = &self.vehicle;
        if !(v.lf.is_finite() && v.lf > 0.0) {
            return Err(invalid(format!("vehicle.lf must be positive, got {}", v.lf)));
        }
        if !(v.latency.is_finite() && v.latency >= 0.0) {
            return Err(invalid(format!("vehicle.latency must be non-negative, got {}", v.latency)));
        }

        let s = &self.solver;
        if s.max_iterations == 0 {
            return Err(invalid("solver.max_iterations must be positive".to_string()));
        }
        if !(s.tolerance > 0.0 && s.constraint_tolerance > 0.0) {
            return Err(invalid("solver tolerances must be positive".to_string()));
        }
        if s.max_solve_time_ms == Some(0) {
            return Err(invalid("solver.max_solve_time_ms must be positive when set".to_string()));
        }

        let f = &self.fallback;
        if !(f.brake_throttle >= b.throttle_min && f.brake_throttle <= 0.0) {
            return Err(invalid(format!(
                "fallback.brake_throttle must lie in [{}, 0], got {}",
                b.throttle_min, f.brake_throttle
            )));
        }

        Ok(())
    }
}

fn invalid(message: String) -> MpcError {
    MpcError::InvalidConfig(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MpcConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config = MpcConfig::from_toml_str(
            r#"
            [horizon]
            steps = 8
            reference_speed = 15.0

            [weights]
            cte = 500.0

            [fallback]
            policy = "brake"
            brake_throttle = -0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.horizon.steps, 8);
        assert_eq!(config.horizon.dt, 0.1);
        assert_eq!(config.weights.cte, 500.0);
        assert_eq!(config.weights.epsi, 2000.0);
        assert_eq!(config.fallback.policy, FallbackPolicy::Brake);
        assert_eq!(config.solver.hessian, HessianApproximation::Lagrangian);
    }

    #[test]
    fn test_rejects_short_horizon() {
        let mut config = MpcConfig::default();
        config.horizon.steps = 1;
        assert!(matches!(config.validate(), Err(MpcError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_steering_bound_above_limit() {
        let mut config = MpcConfig::default();
        config.bounds.max_steer = 40.0_f64.to_radians();
        assert!(matches!(config.validate(), Err(MpcError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_throttle_bounds() {
        let mut config = MpcConfig::default();
        config.bounds.throttle_min = 0.5;
        config.bounds.throttle_max = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = MpcConfig::from_toml_str("[horizon]\nsteps = \"ten\"\n");
        assert!(matches!(result, Err(MpcError::ConfigParse(_))));
    }

    #[test]
    fn test_shipped_config_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/mpc.toml");
        let config = MpcConfig::load(path).unwrap();
        assert_eq!(config, MpcConfig::default());
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = ActuationBounds::default();
        let clamped = bounds.clamp(Actuation::new(1.0, f64::NAN));
        assert_eq!(clamped.steer, bounds.max_steer);
        assert_eq!(clamped.throttle, 0.0);
        assert!(bounds.contains(&clamped));
    }
}
