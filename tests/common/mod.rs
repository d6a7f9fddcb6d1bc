//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use dr_market_sim::agents::user::UserAgent;
use dr_market_sim::config::ScenarioConfig;
use dr_market_sim::market::coordinator::MarketCoordinator;
use dr_market_sim::market::types::MarketConfig;
use dr_market_sim::market::window::{ApplianceWindow, PowerWindow};
use dr_market_sim::solver::InteriorPoint;

/// Loose feasibility tolerance for checking solver output.
pub const FEASIBILITY_TOL: f64 = 1e-3;

/// Four-hour market parameters (`p_min` 0, `p_max` 10, `v_max` 5).
pub fn four_hour_config() -> MarketConfig {
    MarketConfig {
        hours_per_day: 4,
        p_min: 0.0,
        p_max: 10.0,
        v_max: 5.0,
        ..MarketConfig::default()
    }
}

/// One user over four hours with appliance 0 in window `(0,1)` and
/// appliance 1 in window `(2,3)`.
///
/// Every hour starts from consumption `[1, 2]` and storage 0.5, with
/// preferred schedule `[3, 4]` inside each window and 0 outside.
pub fn two_appliance_user() -> UserAgent {
    let windows = vec![ApplianceWindow::new(0, 1), ApplianceWindow::new(2, 3)];
    let schedule = (0..4)
        .map(|h| {
            vec![
                if windows[0].contains(h) { 3.0 } else { 0.0 },
                if windows[1].contains(h) { 4.0 } else { 0.0 },
            ]
        })
        .collect();
    UserAgent::new(
        vec![1.0, 0.5],
        vec![vec![1.0, 2.0]; 4],
        schedule,
        vec![0.5; 4],
        windows,
    )
    .expect("fixture user is valid")
}

/// Market of [`two_appliance_user`] with the given power window.
pub fn single_user_market(power_window: PowerWindow) -> MarketCoordinator<InteriorPoint> {
    let config = four_hour_config();
    let solver = InteriorPoint::new(config.max_iterations);
    MarketCoordinator::new(config, vec![two_appliance_user()], power_window, solver)
        .expect("fixture market is valid")
}

/// Small generated scenario (3 users, 6 hours, 2 days) with a short outage.
pub fn small_outage_scenario() -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.users = 3;
    cfg.simulation.hours_per_day = 6;
    cfg.simulation.days = 2;
    cfg.storage.v_max = 8.0;
    cfg.grid.power_window = Some((1, 3));
    cfg
}
