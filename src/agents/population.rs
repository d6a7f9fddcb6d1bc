use std::ops::RangeInclusive;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::agents::user::UserAgent;
use crate::error::{MarketError, Result};
use crate::market::window::{ApplianceWindow, PowerWindow};

/// Upper bound (exclusive) of randomly drawn consumption values.
const MAX_RANDOM_KW: f64 = 10.0;

/// Source of user populations for a market.
pub trait PopulationGenerator {
    /// Produces `users` users over a day of `hours` steps.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the generated state is inconsistent.
    fn population(&mut self, users: usize, hours: usize) -> Result<Vec<UserAgent>>;

    /// Produces the grid power window for a day of `hours` steps.
    fn power_window(&mut self, hours: usize) -> PowerWindow;
}

/// Seeded random population generator.
///
/// Draws preference weights in `[0, 1)`, initial consumption in `[0, 10)`,
/// initial storage in `[0, 1)` and appliance windows uniformly over the day.
/// The preferred schedule is drawn in `[0, 10)` inside each appliance window
/// and is zero outside it.
///
/// # Examples
///
/// ```
/// use dr_market_sim::agents::population::{PopulationGenerator, RandomPopulation};
///
/// let mut generator = RandomPopulation::new(3..=6, 42).expect("non-empty range");
/// let users = generator.population(4, 24).expect("generated state is valid");
/// assert_eq!(users.len(), 4);
/// assert!(users.iter().all(|u| (3..=6).contains(&u.appliance_count())));
/// ```
#[derive(Debug, Clone)]
pub struct RandomPopulation {
    /// Inclusive range of appliance counts per user
    appliance_counts: RangeInclusive<usize>,

    rng: StdRng,
}

impl RandomPopulation {
    /// Creates a generator.
    ///
    /// # Arguments
    ///
    /// * `appliance_counts` - Inclusive range each user's appliance count is drawn from
    /// * `seed` - Random seed for reproducible populations
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Configuration`] if `appliance_counts` is empty.
    pub fn new(appliance_counts: RangeInclusive<usize>, seed: u64) -> Result<Self> {
        if appliance_counts.is_empty() {
            return Err(MarketError::config(
                "appliance_counts",
                format!(
                    "range {}..={} is empty",
                    appliance_counts.start(),
                    appliance_counts.end()
                ),
            ));
        }
        Ok(Self {
            appliance_counts,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Generates one user with `appliances` appliances.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `hours` is zero.
    pub fn user(&mut self, hours: usize, appliances: usize) -> Result<UserAgent> {
        let rng = &mut self.rng;
        let weights: Vec<f64> = (0..appliances).map(|_| rng.random::<f64>()).collect();
        let consumption: Vec<Vec<f64>> = (0..hours)
            .map(|_| {
                (0..appliances)
                    .map(|_| rng.random::<f64>() * MAX_RANDOM_KW)
                    .collect()
            })
            .collect();
        let storage: Vec<f64> = (0..hours).map(|_| rng.random::<f64>()).collect();

        let windows: Vec<ApplianceWindow> = if hours == 0 {
            Vec::new()
        } else {
            (0..appliances)
                .map(|_| ApplianceWindow::new(rng.random_range(0..hours), rng.random_range(0..hours)))
                .collect()
        };

        let mut schedule = vec![vec![0.0; appliances]; hours];
        for (hour, row) in schedule.iter_mut().enumerate() {
            for (slot, window) in row.iter_mut().zip(&windows) {
                if window.contains(hour) {
                    *slot = rng.random::<f64>() * MAX_RANDOM_KW;
                }
            }
        }

        UserAgent::new(weights, consumption, schedule, storage, windows)
    }
}

impl PopulationGenerator for RandomPopulation {
    fn population(&mut self, users: usize, hours: usize) -> Result<Vec<UserAgent>> {
        (0..users)
            .map(|_| {
                let appliances = self.rng.random_range(self.appliance_counts.clone());
                self.user(hours, appliances)
            })
            .collect()
    }

    fn power_window(&mut self, hours: usize) -> PowerWindow {
        if hours == 0 {
            return PowerWindow::new(0, 0);
        }
        PowerWindow::new(
            self.rng.random_range(0..hours),
            self.rng.random_range(0..hours),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_users_respect_shapes() {
        let mut generator = RandomPopulation::new(3..=6, 7).expect("non-empty range");
        let users = generator.population(10, 24).expect("valid population");
        for user in &users {
            assert_eq!(user.hours(), 24);
            assert!((3..=6).contains(&user.appliance_count()));
            assert!(user.preference_weights().iter().all(|w| (0.0..1.0).contains(w)));
            assert!(user.storage().iter().all(|s| (0.0..1.0).contains(s)));
        }
    }

    #[test]
    fn schedule_is_zero_outside_windows() {
        let mut generator = RandomPopulation::new(4..=4, 11).expect("non-empty range");
        let user = generator.user(12, 4).expect("valid user");
        for hour in 0..12 {
            for appliance in 0..4 {
                if !user.is_appliance_active(appliance, hour) {
                    assert_eq!(user.schedule()[hour][appliance], 0.0);
                }
            }
        }
    }

    #[test]
    fn empty_appliance_range_is_rejected() {
        let result = RandomPopulation::new(6..=3, 1);
        assert!(matches!(
            result,
            Err(MarketError::Configuration { field, .. }) if field == "appliance_counts"
        ));
    }

    #[test]
    fn same_seed_same_population() {
        let a = RandomPopulation::new(3..=6, 99).and_then(|mut g| g.population(3, 8));
        let b = RandomPopulation::new(3..=6, 99).and_then(|mut g| g.population(3, 8));
        assert_eq!(a, b);
    }

    #[test]
    fn power_window_within_day() {
        let mut generator = RandomPopulation::new(3..=6, 5).expect("non-empty range");
        for _ in 0..20 {
            let window = generator.power_window(6);
            assert!(window.lo < 6 && window.hi < 6);
        }
    }
}
