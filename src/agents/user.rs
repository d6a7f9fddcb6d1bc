use crate::error::{MarketError, Result};
use crate::market::window::ApplianceWindow;
use crate::solver::QuadraticObjective;

/// One market participant: a household with schedulable appliances and a
/// storage device.
///
/// Strategy vectors passed to [`UserAgent::cost`] and
/// [`UserAgent::apply_strategy`] hold one consumption value per appliance
/// followed by a single storage value.
///
/// # Sign Convention
/// - Positive storage: charging (drawn from the grid)
/// - Negative storage: discharging (supplies the user's own appliances)
#[derive(Debug, Clone, PartialEq)]
pub struct UserAgent {
    /// Preference weight per appliance (non-negative).
    preference_weights: Vec<f64>,

    /// Chosen consumption, `hours × appliances`.
    consumption: Vec<Vec<f64>>,

    /// Preferred consumption, `hours × appliances`.
    schedule: Vec<Vec<f64>>,

    /// Net storage per hour.
    storage: Vec<f64>,

    /// Usage window per appliance.
    windows: Vec<ApplianceWindow>,
}

impl UserAgent {
    /// Creates a user from pre-built state.
    ///
    /// # Arguments
    ///
    /// * `preference_weights` - One non-negative weight per appliance
    /// * `consumption` - Initial consumption matrix (`hours × appliances`)
    /// * `schedule` - Preferred consumption matrix (`hours × appliances`)
    /// * `storage` - Initial storage per hour
    /// * `windows` - Usage window per appliance, bounds in `[0, hours)`
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Configuration`] if any shape disagrees with
    /// the others, a weight is negative, or a window bound is out of range.
    pub fn new(
        preference_weights: Vec<f64>,
        consumption: Vec<Vec<f64>>,
        schedule: Vec<Vec<f64>>,
        storage: Vec<f64>,
        windows: Vec<ApplianceWindow>,
    ) -> Result<Self> {
        let hours = storage.len();
        let appliances = preference_weights.len();

        if hours == 0 {
            return Err(MarketError::config("user.storage", "must cover at least one hour"));
        }
        if preference_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(MarketError::config(
                "user.preference_weights",
                "must be finite and >= 0",
            ));
        }
        if windows.len() != appliances {
            return Err(MarketError::config(
                "user.windows",
                format!("expected {appliances} windows, got {}", windows.len()),
            ));
        }
        if let Some(w) = windows.iter().find(|w| w.start >= hours || w.end >= hours) {
            return Err(MarketError::config(
                "user.windows",
                format!("window ({}, {}) outside [0, {hours})", w.start, w.end),
            ));
        }
        for (field, matrix) in [("user.consumption", &consumption), ("user.schedule", &schedule)] {
            if matrix.len() != hours || matrix.iter().any(|row| row.len() != appliances) {
                return Err(MarketError::config(
                    field,
                    format!("must be {hours} x {appliances}"),
                ));
            }
        }

        Ok(Self {
            preference_weights,
            consumption,
            schedule,
            storage,
            windows,
        })
    }

    pub fn hours(&self) -> usize {
        self.storage.len()
    }

    pub fn appliance_count(&self) -> usize {
        self.preference_weights.len()
    }

    /// Length of a strategy vector for this user.
    pub fn strategy_len(&self) -> usize {
        self.appliance_count() + 1
    }

    pub fn preference_weights(&self) -> &[f64] {
        &self.preference_weights
    }

    pub fn consumption(&self) -> &[Vec<f64>] {
        &self.consumption
    }

    pub fn schedule(&self) -> &[Vec<f64>] {
        &self.schedule
    }

    pub fn storage(&self) -> &[f64] {
        &self.storage
    }

    pub fn windows(&self) -> &[ApplianceWindow] {
        &self.windows
    }

    /// Returns `true` when `appliance` may be used at `hour`.
    pub fn is_appliance_active(&self, appliance: usize, hour: usize) -> bool {
        self.windows
            .get(appliance)
            .is_some_and(|window| window.contains(hour))
    }

    /// Usage flag for every appliance at `hour`.
    pub fn usage_mask(&self, hour: usize) -> Vec<bool> {
        (0..self.appliance_count())
            .map(|appliance| self.is_appliance_active(appliance, hour))
            .collect()
    }

    /// Consumption plus storage at `hour`; this user's contribution to the
    /// aggregate load.
    pub fn load_at(&self, hour: usize) -> f64 {
        self.consumption[hour].iter().sum::<f64>() + self.storage[hour]
    }

    /// Sum of the whole consumption matrix.
    pub fn total_consumption(&self) -> f64 {
        self.consumption.iter().flatten().sum()
    }

    /// Sum of storage over every hour.
    pub fn total_storage(&self) -> f64 {
        self.storage.iter().sum()
    }

    /// Sum of storage over every hour except `hour`.
    pub fn storage_excluding(&self, hour: usize) -> f64 {
        self.total_storage() - self.storage[hour]
    }

    /// Current strategy at `hour`: consumption row followed by storage.
    pub fn strategy_at(&self, hour: usize) -> Vec<f64> {
        let mut strategy = self.consumption[hour].clone();
        strategy.push(self.storage[hour]);
        strategy
    }

    /// Share of the hourly bill attributed to strategy `x`.
    ///
    /// The normalizer is the user's total consumption plus storage over the
    /// whole horizon, recomputed on every call. A vanishing normalizer is
    /// replaced by 1.
    pub fn billing_share(&self, price: f64, x: &[f64]) -> f64 {
        price * x.iter().sum::<f64>() / self.billing_normalizer()
    }

    fn billing_normalizer(&self) -> f64 {
        let normalizer = self.total_consumption() + self.total_storage();
        if normalizer.abs() < f64::EPSILON {
            1.0
        } else {
            normalizer
        }
    }

    /// Weighted squared deviation of the consumption part of `x` from the
    /// preferred schedule at `hour`. Storage does not contribute.
    pub fn discomfort(&self, hour: usize, x: &[f64]) -> f64 {
        self.preference_weights
            .iter()
            .zip(&self.schedule[hour])
            .zip(x)
            .map(|((w, preferred), chosen)| w * (chosen - preferred).powi(2))
            .sum()
    }

    /// Total cost of strategy `x` at `hour` under `price`.
    pub fn cost(&self, hour: usize, price: f64, x: &[f64]) -> f64 {
        self.billing_share(price, x) + self.discomfort(hour, x)
    }

    /// [`UserAgent::cost`] at `hour` under `price` as a separable quadratic.
    ///
    /// Expanding `w (x - p)²` gives Hessian `2w` and linear term `-2wp` per
    /// appliance; the billing share adds `price / normalizer` to every
    /// component, storage included.
    pub fn cost_objective(&self, hour: usize, price: f64) -> QuadraticObjective {
        let unit_bill = price / self.billing_normalizer();
        let weights = &self.preference_weights;
        let preferred = &self.schedule[hour];

        let mut hessian_diagonal: Vec<f64> = weights.iter().map(|w| 2.0 * w).collect();
        hessian_diagonal.push(0.0);
        let mut linear: Vec<f64> = weights
            .iter()
            .zip(preferred)
            .map(|(w, p)| unit_bill - 2.0 * w * p)
            .collect();
        linear.push(unit_bill);

        QuadraticObjective {
            hessian_diagonal,
            linear,
            constant: weights.iter().zip(preferred).map(|(w, p)| w * p * p).sum(),
        }
    }

    /// Returns `true` if `x` differs from the strategy at `hour` by more than
    /// `epsilon` in any component.
    pub fn strategy_changed(&self, hour: usize, x: &[f64], epsilon: f64) -> bool {
        self.strategy_at(hour)
            .iter()
            .zip(x)
            .any(|(old, new)| (old - new).abs() > epsilon)
    }

    /// Records strategy `x` at `hour`.
    ///
    /// Consumption of appliances inactive at `hour` is stored as exactly 0.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidStrategyShape`] if `x` does not hold
    /// `appliance_count + 1` components.
    pub fn apply_strategy(&mut self, hour: usize, x: &[f64]) -> Result<()> {
        if x.len() != self.strategy_len() {
            return Err(MarketError::InvalidStrategyShape {
                expected: self.strategy_len(),
                actual: x.len(),
            });
        }

        let mask = self.usage_mask(hour);
        let (consumption, storage) = x.split_at(self.appliance_count());
        for ((slot, value), active) in self.consumption[hour].iter_mut().zip(consumption).zip(mask) {
            *slot = if active { *value } else { 0.0 };
        }
        self.storage[hour] = storage[0];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_appliance_user() -> UserAgent {
        UserAgent::new(
            vec![1.0, 2.0],
            vec![vec![1.0, 2.0]; 4],
            vec![vec![3.0, 0.0], vec![3.0, 0.0], vec![0.0, 4.0], vec![0.0, 4.0]],
            vec![0.5; 4],
            vec![ApplianceWindow::new(0, 1), ApplianceWindow::new(2, 3)],
        )
        .expect("valid user")
    }

    #[test]
    fn rejects_mismatched_windows() {
        let err = UserAgent::new(
            vec![1.0],
            vec![vec![0.0]; 2],
            vec![vec![0.0]; 2],
            vec![0.0; 2],
            vec![],
        );
        assert!(matches!(err, Err(MarketError::Configuration { .. })));
    }

    #[test]
    fn rejects_window_outside_horizon() {
        let err = UserAgent::new(
            vec![1.0],
            vec![vec![0.0]; 2],
            vec![vec![0.0]; 2],
            vec![0.0; 2],
            vec![ApplianceWindow::new(0, 2)],
        );
        assert!(matches!(err, Err(MarketError::Configuration { .. })));
    }

    #[test]
    fn rejects_negative_weight() {
        let err = UserAgent::new(
            vec![-1.0],
            vec![vec![0.0]; 2],
            vec![vec![0.0]; 2],
            vec![0.0; 2],
            vec![ApplianceWindow::new(0, 1)],
        );
        assert!(matches!(err, Err(MarketError::Configuration { .. })));
    }

    #[test]
    fn usage_mask_follows_windows() {
        let user = two_appliance_user();
        assert_eq!(user.usage_mask(0), vec![true, false]);
        assert_eq!(user.usage_mask(2), vec![false, true]);
    }

    #[test]
    fn cost_splits_into_billing_and_discomfort() {
        let user = two_appliance_user();
        // totals: consumption 4 * 3 = 12, storage 4 * 0.5 = 2
        let x = [0.0, 4.0, 1.0];
        let billing = user.billing_share(7.0, &x);
        assert!((billing - 7.0 * 5.0 / 14.0).abs() < 1e-12);
        // schedule at hour 2 is [0, 4]: zero deviation
        assert_eq!(user.discomfort(2, &x), 0.0);
        // at hour 0 schedule is [3, 0]: 1 * 9 + 2 * 16
        assert_eq!(user.discomfort(0, &x), 41.0);
        assert!((user.cost(0, 7.0, &x) - (billing + 41.0)).abs() < 1e-12);
    }

    #[test]
    fn cost_objective_matches_cost() {
        let user = two_appliance_user();
        for (hour, x) in [(0, [0.0, 4.0, 1.0]), (2, [2.5, 1.0, -3.0]), (3, [0.0, 0.0, 0.0])] {
            let objective = user.cost_objective(hour, 7.0);
            assert_eq!(objective.dimension(), user.strategy_len());
            assert!((objective.value(&x) - user.cost(hour, 7.0, &x)).abs() < 1e-12);
        }
    }

    #[test]
    fn billing_share_survives_zero_normalizer() {
        let user = UserAgent::new(
            vec![1.0],
            vec![vec![0.0]; 2],
            vec![vec![0.0]; 2],
            vec![0.0; 2],
            vec![ApplianceWindow::new(0, 1)],
        )
        .expect("valid user");
        assert_eq!(user.billing_share(2.0, &[1.5, 0.5]), 4.0);
    }

    #[test]
    fn apply_strategy_zeroes_inactive_appliances() {
        let mut user = two_appliance_user();
        user.apply_strategy(2, &[1e-9, 6.0, -1.0]).expect("shape matches");
        assert_eq!(user.consumption()[2], vec![0.0, 6.0]);
        assert_eq!(user.storage()[2], -1.0);
        // other rows untouched
        assert_eq!(user.consumption()[1], vec![1.0, 2.0]);
        assert_eq!(user.storage()[1], 0.5);
    }

    #[test]
    fn apply_strategy_rejects_wrong_length() {
        let mut user = two_appliance_user();
        let err = user.apply_strategy(0, &[1.0, 2.0]);
        assert_eq!(
            err,
            Err(MarketError::InvalidStrategyShape {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn strategy_changed_uses_epsilon() {
        let user = two_appliance_user();
        assert!(!user.strategy_changed(0, &[1.0, 2.0 + 1e-9, 0.5], 1e-6));
        assert!(user.strategy_changed(0, &[1.0, 2.1, 0.5], 1e-6));
    }
}
