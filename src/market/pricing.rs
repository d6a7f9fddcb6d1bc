use crate::agents::user::UserAgent;

/// Quadratic price of a load: `gain * load²`.
pub fn quadratic_price(gain: f64, load: f64) -> f64 {
    gain * load * load
}

/// Per-user prices for `hour` under sequential load accumulation.
///
/// Users are visited in list order; each user's consumption and storage at
/// `hour` is added to a running load, and that user's price is the quadratic
/// price of the running load including its own contribution. The last entry
/// is therefore the price of the full hourly load.
pub fn running_prices(users: &[UserAgent], hour: usize, gain: f64) -> Vec<f64> {
    users
        .iter()
        .scan(0.0, |running_load, user| {
            *running_load += user.load_at(hour);
            Some(quadratic_price(gain, *running_load))
        })
        .collect()
}

/// Aggregate load of all users at `hour`.
pub fn aggregate_load(users: &[UserAgent], hour: usize) -> f64 {
    users.iter().map(|user| user.load_at(hour)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::window::ApplianceWindow;

    fn user_with_load(consumption: f64, storage: f64) -> UserAgent {
        UserAgent::new(
            vec![1.0],
            vec![vec![consumption]; 2],
            vec![vec![0.0]; 2],
            vec![storage; 2],
            vec![ApplianceWindow::new(0, 1)],
        )
        .expect("valid user")
    }

    #[test]
    fn prices_accumulate_in_list_order() {
        let users = vec![user_with_load(1.0, 1.0), user_with_load(3.0, 0.0), user_with_load(0.5, -0.5)];
        let prices = running_prices(&users, 0, 0.5);
        // running loads 2, 5, 5
        assert_eq!(prices, vec![2.0, 12.5, 12.5]);
    }

    #[test]
    fn last_price_matches_aggregate() {
        let users = vec![user_with_load(2.0, 0.25), user_with_load(1.0, 0.75)];
        let prices = running_prices(&users, 1, 2.0);
        let total = aggregate_load(&users, 1);
        assert_eq!(prices.last().copied(), Some(quadratic_price(2.0, total)));
    }

    #[test]
    fn order_changes_individual_prices() {
        let a = user_with_load(1.0, 0.0);
        let b = user_with_load(4.0, 0.0);
        let forward = running_prices(&[a.clone(), b.clone()], 0, 1.0);
        let backward = running_prices(&[b, a], 0, 1.0);
        assert_eq!(forward, vec![1.0, 25.0]);
        assert_eq!(backward, vec![16.0, 25.0]);
    }

    #[test]
    fn empty_market_has_no_prices() {
        assert!(running_prices(&[], 0, 1.0).is_empty());
    }
}
