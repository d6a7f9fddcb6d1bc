//! Market coordinator: owns the population, prices each hour and resolves
//! every user's best response.

use tracing::{debug, warn};

use crate::agents::population::PopulationGenerator;
use crate::agents::user::UserAgent;
use crate::error::{MarketError, Result};
use crate::solver::{ConstraintBuilder, NonlinearSolver, Problem};

use super::clock::{HorizonClock, HourTick};
use super::pricing::{aggregate_load, running_prices};
use super::report::ReportSink;
use super::types::{DayResetPolicy, MarketConfig, UserStepRecord};
use super::window::PowerWindow;

/// Coordinator of one market.
///
/// Generic over `S: NonlinearSolver` for static dispatch. User membership
/// is fixed for the lifetime of the market.
#[derive(Debug, Clone)]
pub struct MarketCoordinator<S: NonlinearSolver> {
    config: MarketConfig,
    users: Vec<UserAgent>,
    /// Snapshot restored by [`DayResetPolicy::RestoreInitial`].
    initial_users: Vec<UserAgent>,
    power_window: PowerWindow,
    clock: HorizonClock,
    solver: S,
}

impl<S: NonlinearSolver> MarketCoordinator<S> {
    /// Creates a coordinator from pre-built users.
    ///
    /// # Arguments
    ///
    /// * `config` - Market parameters
    /// * `users` - Population, in pricing order
    /// * `power_window` - Hours with grid power
    /// * `solver` - Best-response solver
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Configuration`] if the configuration is invalid,
    /// a user's horizon differs from `config.hours_per_day`, or the power
    /// window lies outside the day.
    pub fn new(
        config: MarketConfig,
        users: Vec<UserAgent>,
        power_window: PowerWindow,
        solver: S,
    ) -> Result<Self> {
        config.validate()?;
        let hours = config.hours_per_day;
        if let Some(index) = users.iter().position(|u| u.hours() != hours) {
            return Err(MarketError::config(
                format!("users[{index}]"),
                format!("horizon must be {hours} hours"),
            ));
        }
        if power_window.lo >= hours || power_window.hi >= hours {
            return Err(MarketError::config(
                "power_window",
                format!("bounds must lie in [0, {hours})"),
            ));
        }

        Ok(Self {
            clock: HorizonClock::new(hours),
            initial_users: users.clone(),
            config,
            users,
            power_window,
            solver,
        })
    }

    /// Creates a coordinator with a generated population and power window.
    ///
    /// # Errors
    ///
    /// Same as [`MarketCoordinator::new`].
    pub fn generate(
        config: MarketConfig,
        user_count: usize,
        generator: &mut impl PopulationGenerator,
        solver: S,
    ) -> Result<Self> {
        config.validate()?;
        let users = generator.population(user_count, config.hours_per_day)?;
        let power_window = generator.power_window(config.hours_per_day);
        Self::new(config, users, power_window, solver)
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn users(&self) -> &[UserAgent] {
        &self.users
    }

    pub fn power_window(&self) -> PowerWindow {
        self.power_window
    }

    pub fn clock(&self) -> &HorizonClock {
        &self.clock
    }

    /// Returns `true` when grid power is available at `hour`.
    pub fn is_power_available(&self, hour: usize) -> bool {
        self.power_window.contains(hour)
    }

    /// Advances the clock and, if an hour remains, resolves it.
    ///
    /// # Returns
    ///
    /// * `HourTick::Hour(hour)` - The hour that was priced and resolved
    /// * `HourTick::DayComplete` - The day is over; call [`Self::reset_day`]
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidStrategyShape`] if the solver hands
    /// back a strategy of the wrong dimension.
    pub fn advance_hour(&mut self, day: usize, sink: &mut dyn ReportSink) -> Result<HourTick> {
        let tick = self.clock.advance();
        if let HourTick::Hour(hour) = tick {
            self.resolve_hour(day, hour, sink)?;
        }
        Ok(tick)
    }

    /// Prices `hour` and resolves every user's best response in list order.
    ///
    /// All prices are fixed before the first user optimizes.
    pub fn resolve_hour(
        &mut self,
        day: usize,
        hour: usize,
        sink: &mut dyn ReportSink,
    ) -> Result<()> {
        let prices = running_prices(&self.users, hour, self.config.price_gain);
        let power_available = self.is_power_available(hour);

        for (index, price) in prices.into_iter().enumerate() {
            let record = self.best_response(day, hour, index, price, power_available)?;
            sink.record(&record);
        }
        debug!(
            day,
            hour,
            load = aggregate_load(&self.users, hour),
            "hour resolved"
        );
        Ok(())
    }

    /// Restarts the day.
    ///
    /// Resets the clock and applies the configured [`DayResetPolicy`].
    /// Calling it repeatedly without advancing has the same effect as
    /// calling it once.
    pub fn reset_day(&mut self) {
        self.clock.reset();
        if self.config.day_reset == DayResetPolicy::RestoreInitial {
            self.users.clone_from(&self.initial_users);
        }
    }

    fn best_response(
        &mut self,
        day: usize,
        hour: usize,
        index: usize,
        price: f64,
        power_available: bool,
    ) -> Result<UserStepRecord> {
        let tolerance = self.config.tolerance;
        let user = &self.users[index];
        let usage_mask = user.usage_mask(hour);
        let strategy_before = user.strategy_at(hour);
        let constraints = ConstraintBuilder::new(&self.config).build(user, hour, power_available);

        let problem = Problem {
            objective: user.cost_objective(hour, price),
            initial_guess: strategy_before.clone(),
            constraints,
            tolerance,
        };
        let outcome = self.solver.minimize(&problem);

        let user = &mut self.users[index];
        let (converged, changed) = match outcome {
            Ok(solution) => {
                let changed = user.strategy_changed(hour, &solution.x, tolerance);
                user.apply_strategy(hour, &solution.x)?;
                debug!(
                    day,
                    hour,
                    user = index,
                    price,
                    iterations = solution.iterations,
                    objective = solution.objective,
                    "best response applied"
                );
                (true, changed)
            }
            Err(err) => {
                warn!(day, hour, user = index, %err, "keeping previous strategy");
                (false, false)
            }
        };

        let strategy_after = user.strategy_at(hour);
        Ok(UserStepRecord {
            day,
            hour,
            user: index,
            price,
            power_available,
            usage_mask,
            billing_share: user.billing_share(price, &strategy_after),
            discomfort: user.discomfort(hour, &strategy_after),
            cost: user.cost(hour, price, &strategy_after),
            strategy_before,
            strategy_after,
            converged,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::report::NullSink;
    use crate::market::window::ApplianceWindow;
    use crate::solver::{InteriorPoint, Solution, SolverError};

    /// Solver that always fails.
    struct Stubborn;

    impl NonlinearSolver for Stubborn {
        fn minimize(&self, _problem: &Problem) -> std::result::Result<Solution, SolverError> {
            Err(SolverError::NonConvergence {
                status: "MaxIterations".to_string(),
                iterations: 0,
            })
        }
    }

    /// Solver that returns a vector one component too short.
    struct Truncating;

    impl NonlinearSolver for Truncating {
        fn minimize(&self, problem: &Problem) -> std::result::Result<Solution, SolverError> {
            let mut x = problem.initial_guess.clone();
            x.pop();
            Ok(Solution {
                x,
                objective: 0.0,
                iterations: 1,
            })
        }
    }

    fn config() -> MarketConfig {
        MarketConfig {
            hours_per_day: 3,
            ..MarketConfig::default()
        }
    }

    fn user() -> UserAgent {
        UserAgent::new(
            vec![1.0, 0.5],
            vec![vec![2.0, 2.0]; 3],
            vec![vec![1.0, 3.0]; 3],
            vec![0.5; 3],
            vec![ApplianceWindow::new(0, 2), ApplianceWindow::new(1, 1)],
        )
        .expect("valid user")
    }

    #[test]
    fn rejects_user_with_other_horizon() {
        let cfg = MarketConfig {
            hours_per_day: 4,
            ..MarketConfig::default()
        };
        let result = MarketCoordinator::new(cfg, vec![user()], PowerWindow::new(0, 2), Stubborn);
        assert!(matches!(result, Err(MarketError::Configuration { .. })));
    }

    #[test]
    fn rejects_power_window_outside_day() {
        let result = MarketCoordinator::new(config(), vec![user()], PowerWindow::new(0, 3), Stubborn);
        assert!(result.is_err());
    }

    #[test]
    fn non_convergence_keeps_previous_strategy() {
        let mut market =
            MarketCoordinator::new(config(), vec![user()], PowerWindow::new(0, 2), Stubborn)
                .expect("valid market");
        let mut records = Vec::new();
        let tick = market.advance_hour(0, &mut records).expect("no fatal error");
        assert_eq!(tick, HourTick::Hour(0));
        assert_eq!(records.len(), 1);
        assert!(!records[0].converged);
        assert!(!records[0].changed);
        assert_eq!(records[0].strategy_before, records[0].strategy_after);
        assert_eq!(market.users()[0], user());
    }

    #[test]
    fn wrong_strategy_shape_is_fatal() {
        let mut market =
            MarketCoordinator::new(config(), vec![user()], PowerWindow::new(0, 2), Truncating)
                .expect("valid market");
        let result = market.advance_hour(0, &mut NullSink);
        assert_eq!(
            result,
            Err(MarketError::InvalidStrategyShape {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn restore_initial_policy_rewinds_users() {
        let cfg = MarketConfig {
            day_reset: DayResetPolicy::RestoreInitial,
            ..config()
        };
        let mut market = MarketCoordinator::new(
            cfg,
            vec![user()],
            PowerWindow::new(0, 2),
            InteriorPoint::default(),
        )
        .expect("valid market");
        market.advance_hour(0, &mut NullSink).expect("hour resolves");
        assert_ne!(market.users()[0], user());
        market.reset_day();
        assert_eq!(market.users()[0], user());
    }

    #[test]
    fn keep_history_policy_only_resets_clock() {
        let mut market = MarketCoordinator::new(
            config(),
            vec![user()],
            PowerWindow::new(0, 2),
            InteriorPoint::default(),
        )
        .expect("valid market");
        market.advance_hour(0, &mut NullSink).expect("hour resolves");
        let after_hour = market.users()[0].clone();
        market.reset_day();
        assert_eq!(market.users()[0], after_hour);
        assert_eq!(market.clock().current(), 0);
    }

    #[test]
    fn all_prices_fixed_before_optimizing() {
        let mut market = MarketCoordinator::new(
            config(),
            vec![user(), user()],
            PowerWindow::new(0, 2),
            InteriorPoint::default(),
        )
        .expect("valid market");
        let expected = running_prices(market.users(), 0, market.config().price_gain);
        let mut records = Vec::new();
        market.advance_hour(0, &mut records).expect("hour resolves");
        let seen: Vec<f64> = records.iter().map(|r| r.price).collect();
        assert_eq!(seen, expected);
    }
}
