//! Core market types: configuration and per-user hourly records.

use std::fmt;

use crate::error::{MarketError, Result};

/// What happens to user state when a day completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DayResetPolicy {
    /// Only the hour cursor restarts; consumption and storage carry over.
    #[default]
    KeepHistory,
    /// Users are restored to the state they had when the market was built.
    RestoreInitial,
}

/// Parameters of the market core.
///
/// # Examples
///
/// ```
/// use dr_market_sim::market::types::MarketConfig;
///
/// let cfg = MarketConfig::default();
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.hours_per_day, 24);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    /// Number of hours in a simulated day (H).
    pub hours_per_day: usize,
    /// Coefficient `g` of the quadratic price rule.
    pub price_gain: f64,
    /// Minimum consumption of an active appliance.
    pub p_min: f64,
    /// Maximum consumption of an active appliance.
    pub p_max: f64,
    /// Storage magnitude limit per hour.
    pub v_max: f64,
    /// Allowed storage drift below zero over the horizon.
    pub s_max: f64,
    /// Weight of the squared shortfall when the storage drift bound is exceeded.
    pub drift_penalty: f64,
    /// Solver feasibility tolerance.
    pub tolerance: f64,
    /// Solver iteration cap.
    pub max_iterations: usize,
    pub day_reset: DayResetPolicy,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 24,
            price_gain: 0.001,
            p_min: 0.0,
            p_max: 10.0,
            v_max: 5.0,
            s_max: 50.0,
            drift_penalty: 10.0,
            tolerance: 1e-6,
            max_iterations: 100,
            day_reset: DayResetPolicy::KeepHistory,
        }
    }
}

impl MarketConfig {
    /// Checks every parameter.
    ///
    /// # Errors
    ///
    /// Returns the first [`MarketError::Configuration`] found.
    pub fn validate(&self) -> Result<()> {
        if self.hours_per_day == 0 {
            return Err(MarketError::config("hours_per_day", "must be > 0"));
        }
        let finite = [
            ("price_gain", self.price_gain),
            ("p_min", self.p_min),
            ("p_max", self.p_max),
            ("v_max", self.v_max),
            ("s_max", self.s_max),
            ("drift_penalty", self.drift_penalty),
            ("tolerance", self.tolerance),
        ];
        if let Some((field, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MarketError::config(*field, "must be finite"));
        }
        if self.price_gain < 0.0 {
            return Err(MarketError::config("price_gain", "must be >= 0"));
        }
        if self.p_min > self.p_max {
            return Err(MarketError::config("p_min", "must be <= p_max"));
        }
        if self.v_max < 0.0 {
            return Err(MarketError::config("v_max", "must be >= 0"));
        }
        if self.s_max < 0.0 {
            return Err(MarketError::config("s_max", "must be >= 0"));
        }
        if self.drift_penalty < 0.0 {
            return Err(MarketError::config("drift_penalty", "must be >= 0"));
        }
        if self.tolerance <= 0.0 {
            return Err(MarketError::config("tolerance", "must be > 0"));
        }
        if self.max_iterations == 0 {
            return Err(MarketError::config("max_iterations", "must be > 0"));
        }
        Ok(())
    }
}

/// Record of one user's best-response resolution at one hour.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStepRecord {
    pub day: usize,
    pub hour: usize,
    /// Index of the user in the market's list.
    pub user: usize,
    /// Running-load price seen by this user.
    pub price: f64,
    pub power_available: bool,
    pub usage_mask: Vec<bool>,
    /// Strategy before optimization (consumption then storage).
    pub strategy_before: Vec<f64>,
    /// Strategy after optimization; equal to `strategy_before` on failure.
    pub strategy_after: Vec<f64>,
    pub billing_share: f64,
    pub discomfort: f64,
    pub cost: f64,
    /// Whether the solver converged and the strategy was applied.
    pub converged: bool,
    /// Whether the applied strategy differs from the previous one.
    pub changed: bool,
}

impl UserStepRecord {
    /// Consumption plus storage after optimization.
    pub fn load_after(&self) -> f64 {
        self.strategy_after.iter().sum()
    }
}

impl fmt::Display for UserStepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (consumption, storage) = self
            .strategy_after
            .split_at(self.strategy_after.len().saturating_sub(1));
        let mask: String = self
            .usage_mask
            .iter()
            .map(|&on| if on { '1' } else { '0' })
            .collect();
        write!(
            f,
            "day={:>2} hour={:>2} user={:>2} | price={:>8.4} power={} mask={} | \
             x=[{}] s={:>6.3} | cost={:.4} (bill={:.4}, discomfort={:.4}){}",
            self.day,
            self.hour,
            self.user,
            self.price,
            if self.power_available { "on " } else { "off" },
            mask,
            consumption
                .iter()
                .map(|v| format!("{v:.3}"))
                .collect::<Vec<_>>()
                .join(", "),
            storage.first().copied().unwrap_or(0.0),
            self.cost,
            self.billing_share,
            self.discomfort,
            if self.converged { "" } else { " NOT CONVERGED" },
        )
    }
}
