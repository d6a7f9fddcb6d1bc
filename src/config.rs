//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::agents::population::{PopulationGenerator, RandomPopulation};
use crate::error::Result as MarketResult;
use crate::market::coordinator::MarketCoordinator;
use crate::market::types::{DayResetPolicy, MarketConfig};
use crate::market::window::PowerWindow;
use crate::solver::InteriorPoint;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
///
/// # Examples
///
/// ```
/// use dr_market_sim::config::ScenarioConfig;
///
/// let cfg = ScenarioConfig::from_toml_str("[simulation]\nusers = 3\n").expect("valid TOML");
/// assert_eq!(cfg.simulation.users, 3);
/// assert!(cfg.validate().is_empty());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Population size, horizon, and run length.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Price rule parameters.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Appliance counts and power bounds.
    #[serde(default)]
    pub appliances: ApplianceConfig,
    /// Storage limits.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Grid power availability.
    #[serde(default)]
    pub grid: GridConfig,
    /// Best-response solver settings.
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Population size, horizon, and run length.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of users (must be > 0).
    pub users: usize,
    /// Hours per simulated day (must be > 0).
    pub hours_per_day: usize,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
    /// Day reset policy: `"keep_history"` or `"restore_initial"`.
    pub day_reset: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            users: 5,
            hours_per_day: 24,
            days: 3,
            seed: 42,
            day_reset: "keep_history".to_string(),
        }
    }
}

/// Price rule parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    /// Coefficient `g` of `price = g * load²` (must be >= 0).
    pub price_gain: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { price_gain: 0.001 }
    }
}

/// Appliance counts and power bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplianceConfig {
    /// Fewest appliances a generated user owns.
    pub min_count: usize,
    /// Most appliances a generated user owns (inclusive).
    pub max_count: usize,
    /// Minimum consumption of an active appliance.
    pub p_min: f64,
    /// Maximum consumption of an active appliance.
    pub p_max: f64,
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            min_count: 3,
            max_count: 6,
            p_min: 0.0,
            p_max: 10.0,
        }
    }
}

/// Storage limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage magnitude limit per hour.
    pub v_max: f64,
    /// Allowed storage drift below zero over the horizon.
    pub s_max: f64,
    /// Weight of the squared shortfall past `s_max` (must be >= 0).
    pub drift_penalty: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            v_max: 5.0,
            s_max: 50.0,
            drift_penalty: 10.0,
        }
    }
}

/// Grid power availability.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Inclusive `[lo, hi]` hours with grid power, bounds in either order.
    /// Drawn at random when absent.
    pub power_window: Option<(usize, usize)>,
}

/// Best-response solver settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Feasibility tolerance (must be > 0).
    pub tolerance: f64,
    /// Interior-point iteration cap (must be > 0).
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.hours_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the outage preset: grid power only during the day, so users
    /// must self-balance from storage overnight.
    pub fn outage() -> Self {
        Self {
            grid: GridConfig {
                power_window: Some((6, 18)),
            },
            storage: StorageConfig {
                v_max: 8.0,
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the peak-pricing preset: more users and a steeper price rule.
    pub fn peak_pricing() -> Self {
        Self {
            simulation: SimulationConfig {
                users: 12,
                ..SimulationConfig::default()
            },
            pricing: PricingConfig { price_gain: 0.01 },
            grid: GridConfig {
                power_window: Some((0, 23)),
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "outage", "peak_pricing"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "outage" => Ok(Self::outage()),
            "peak_pricing" => Ok(Self::peak_pricing()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Parsed day reset policy, if the name is known.
    pub fn day_reset_policy(&self) -> Option<DayResetPolicy> {
        match self.simulation.day_reset.as_str() {
            "keep_history" => Some(DayResetPolicy::KeepHistory),
            "restore_initial" => Some(DayResetPolicy::RestoreInitial),
            _ => None,
        }
    }

    /// Core market parameters of this scenario.
    pub fn market_config(&self) -> MarketConfig {
        MarketConfig {
            hours_per_day: self.simulation.hours_per_day,
            price_gain: self.pricing.price_gain,
            p_min: self.appliances.p_min,
            p_max: self.appliances.p_max,
            v_max: self.storage.v_max,
            s_max: self.storage.s_max,
            drift_penalty: self.storage.drift_penalty,
            tolerance: self.solver.tolerance,
            max_iterations: self.solver.max_iterations,
            day_reset: self.day_reset_policy().unwrap_or_default(),
        }
    }

    /// Configured power window, if one is fixed.
    pub fn power_window(&self) -> Option<PowerWindow> {
        self.grid.power_window.map(PowerWindow::from)
    }

    /// Seeded population generator of this scenario.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `appliances.min_count` exceeds
    /// `appliances.max_count`.
    pub fn population(&self) -> MarketResult<RandomPopulation> {
        RandomPopulation::new(
            self.appliances.min_count..=self.appliances.max_count,
            self.simulation.seed,
        )
    }

    /// Builds the market described by this scenario.
    ///
    /// Users are drawn from [`ScenarioConfig::population`]. The power window
    /// is the configured one, or drawn from the same generator when absent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the market parameters are invalid.
    pub fn build_market(&self) -> MarketResult<MarketCoordinator<InteriorPoint>> {
        let config = self.market_config();
        config.validate()?;
        let mut generator = self.population()?;
        let users = generator.population(self.simulation.users, config.hours_per_day)?;
        let power_window = self
            .power_window()
            .unwrap_or_else(|| generator.power_window(config.hours_per_day));
        let solver = InteriorPoint::new(config.max_iterations);
        MarketCoordinator::new(config, users, power_window, solver)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.users == 0 {
            errors.push(ConfigError::new("simulation.users", "must be > 0"));
        }
        if s.hours_per_day == 0 {
            errors.push(ConfigError::new("simulation.hours_per_day", "must be > 0"));
        }
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        if self.day_reset_policy().is_none() {
            errors.push(ConfigError::new(
                "simulation.day_reset",
                format!(
                    "must be \"keep_history\" or \"restore_initial\", got \"{}\"",
                    s.day_reset
                ),
            ));
        }

        if !self.pricing.price_gain.is_finite() || self.pricing.price_gain < 0.0 {
            errors.push(ConfigError::new("pricing.price_gain", "must be finite and >= 0"));
        }

        let a = &self.appliances;
        if a.min_count > a.max_count {
            errors.push(ConfigError::new(
                "appliances.min_count",
                "must be <= appliances.max_count",
            ));
        }
        if !a.p_min.is_finite() || !a.p_max.is_finite() {
            errors.push(ConfigError::new("appliances.p_min", "bounds must be finite"));
        } else if a.p_min > a.p_max {
            errors.push(ConfigError::new("appliances.p_min", "must be <= appliances.p_max"));
        }

        let st = &self.storage;
        if !st.v_max.is_finite() || st.v_max < 0.0 {
            errors.push(ConfigError::new("storage.v_max", "must be finite and >= 0"));
        }
        if !st.s_max.is_finite() || st.s_max < 0.0 {
            errors.push(ConfigError::new("storage.s_max", "must be finite and >= 0"));
        }
        if !st.drift_penalty.is_finite() || st.drift_penalty < 0.0 {
            errors.push(ConfigError::new("storage.drift_penalty", "must be finite and >= 0"));
        }

        if let Some((lo, hi)) = self.grid.power_window {
            if lo >= s.hours_per_day || hi >= s.hours_per_day {
                errors.push(ConfigError::new(
                    "grid.power_window",
                    "bounds must be < simulation.hours_per_day",
                ));
            }
        }

        let sol = &self.solver;
        if !sol.tolerance.is_finite() || sol.tolerance <= 0.0 {
            errors.push(ConfigError::new("solver.tolerance", "must be finite and > 0"));
        }
        if sol.max_iterations == 0 {
            errors.push(ConfigError::new("solver.max_iterations", "must be > 0"));
        }

        errors
    }
}
