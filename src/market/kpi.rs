//! Post-hoc KPI computation from market records.

use std::collections::BTreeMap;
use std::fmt;

use super::types::UserStepRecord;

/// Aggregate key performance indicators of a complete run.
///
/// Computed post-hoc from the record vector so reported metrics always
/// agree with the exported rows.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// Sum of every user's cost over every resolved hour.
    pub total_cost: f64,
    /// Mean price seen by users.
    pub mean_price: f64,
    /// Highest price seen by any user.
    pub peak_price: f64,
    /// Highest aggregate (all users) load of any resolved hour.
    pub peak_load: f64,
    /// Mean aggregate load per resolved hour.
    pub mean_load: f64,
    /// Peak-to-average ratio of the aggregate load.
    pub peak_to_average: f64,
    /// Number of best responses where the solver did not converge.
    pub non_converged: usize,
    /// Number of best responses that changed a strategy.
    pub changed: usize,
    /// Last day on which any strategy changed, if any did.
    pub last_changed_day: Option<usize>,
}

impl KpiReport {
    /// Computes all KPIs from the complete record vector.
    pub fn from_records(records: &[UserStepRecord]) -> Self {
        if records.is_empty() {
            return Self {
                total_cost: 0.0,
                mean_price: 0.0,
                peak_price: 0.0,
                peak_load: 0.0,
                mean_load: 0.0,
                peak_to_average: 0.0,
                non_converged: 0,
                changed: 0,
                last_changed_day: None,
            };
        }

        let mut total_cost = 0.0_f64;
        let mut price_sum = 0.0_f64;
        let mut peak_price = f64::MIN;
        let mut non_converged = 0_usize;
        let mut changed = 0_usize;
        let mut last_changed_day = None;
        let mut hourly_load: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for r in records {
            total_cost += r.cost;
            price_sum += r.price;
            peak_price = peak_price.max(r.price);
            if !r.converged {
                non_converged += 1;
            }
            if r.changed {
                changed += 1;
                last_changed_day = last_changed_day.max(Some(r.day));
            }
            *hourly_load.entry((r.day, r.hour)).or_insert(0.0) += r.load_after();
        }

        let peak_load = hourly_load.values().copied().fold(f64::MIN, f64::max);
        let mean_load = hourly_load.values().sum::<f64>() / hourly_load.len() as f64;
        let peak_to_average = if mean_load.abs() > f64::EPSILON {
            peak_load / mean_load
        } else {
            0.0
        };

        Self {
            total_cost,
            mean_price: price_sum / records.len() as f64,
            peak_price,
            peak_load,
            mean_load,
            peak_to_average,
            non_converged,
            changed,
            last_changed_day,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Total user cost:       {:.4}", self.total_cost)?;
        writeln!(f, "Mean price:            {:.4}", self.mean_price)?;
        writeln!(f, "Peak price:            {:.4}", self.peak_price)?;
        writeln!(f, "Peak hourly load:      {:.3}", self.peak_load)?;
        writeln!(f, "Mean hourly load:      {:.3}", self.mean_load)?;
        writeln!(f, "Peak-to-average ratio: {:.3}", self.peak_to_average)?;
        writeln!(f, "Non-converged solves:  {}", self.non_converged)?;
        writeln!(f, "Strategy changes:      {}", self.changed)?;
        match self.last_changed_day {
            Some(day) => write!(f, "Last change on day:    {day}"),
            None => write!(f, "Last change on day:    none"),
        }
    }
}
