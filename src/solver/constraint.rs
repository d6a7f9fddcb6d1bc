use crate::agents::user::UserAgent;
use crate::market::types::MarketConfig;

/// Whether a constraint must be exactly zero or non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// `value(x) = 0`
    Equality,
    /// `value(x) >= 0`
    Inequality,
    /// `value(x) >= 0` where a shortfall `t` costs `penalty * t²` instead
    /// of making the problem infeasible.
    Soft { penalty: f64 },
}

impl ConstraintKind {
    /// Returns `true` for constraints a solution must satisfy.
    pub fn is_hard(self) -> bool {
        !matches!(self, ConstraintKind::Soft { .. })
    }
}

/// A labelled linear constraint `coefficients · x + offset`.
///
/// Constraints are plain data: everything they depend on is copied in when
/// they are built, so evaluating them later never observes mutated state.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub label: String,
    pub coefficients: Vec<f64>,
    pub offset: f64,
}

impl Constraint {
    pub fn equality(label: impl Into<String>, coefficients: Vec<f64>, offset: f64) -> Self {
        Self {
            kind: ConstraintKind::Equality,
            label: label.into(),
            coefficients,
            offset,
        }
    }

    pub fn inequality(label: impl Into<String>, coefficients: Vec<f64>, offset: f64) -> Self {
        Self {
            kind: ConstraintKind::Inequality,
            label: label.into(),
            coefficients,
            offset,
        }
    }

    pub fn soft(label: impl Into<String>, coefficients: Vec<f64>, offset: f64, penalty: f64) -> Self {
        Self {
            kind: ConstraintKind::Soft { penalty },
            label: label.into(),
            coefficients,
            offset,
        }
    }

    pub fn value(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .map(|(c, v)| c * v)
            .sum::<f64>()
            + self.offset
    }

    /// Distance from feasibility at `x` (0 when satisfied).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let value = self.value(x);
        match self.kind {
            ConstraintKind::Equality => value.abs(),
            ConstraintKind::Inequality | ConstraintKind::Soft { .. } => (-value).max(0.0),
        }
    }

    pub fn is_satisfied(&self, x: &[f64], tolerance: f64) -> bool {
        self.violation(x) <= tolerance
    }
}

/// Builds the constraint set for one user at one hour.
///
/// The strategy layout is one component per appliance followed by the
/// storage component.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintBuilder<'a> {
    config: &'a MarketConfig,
}

impl<'a> ConstraintBuilder<'a> {
    pub fn new(config: &'a MarketConfig) -> Self {
        Self { config }
    }

    /// Constraints for `user` at `hour`.
    ///
    /// # Arguments
    ///
    /// * `user` - The user whose strategy is being optimized
    /// * `hour` - Hour being resolved
    /// * `power_available` - Whether grid power is available at `hour`
    pub fn build(&self, user: &UserAgent, hour: usize, power_available: bool) -> Vec<Constraint> {
        let appliances = user.appliance_count();
        let dim = appliances + 1;
        let storage = appliances;
        let unit = |index: usize, sign: f64| {
            let mut coefficients = vec![0.0; dim];
            coefficients[index] = sign;
            coefficients
        };

        let mut constraints = Vec::with_capacity(2 * dim + 3);
        for (appliance, active) in user.usage_mask(hour).into_iter().enumerate() {
            if active {
                constraints.push(Constraint::inequality(
                    format!("appliance {appliance} >= p_min"),
                    unit(appliance, 1.0),
                    -self.config.p_min,
                ));
                constraints.push(Constraint::inequality(
                    format!("appliance {appliance} <= p_max"),
                    unit(appliance, -1.0),
                    self.config.p_max,
                ));
            } else {
                constraints.push(Constraint::equality(
                    format!("appliance {appliance} off"),
                    unit(appliance, 1.0),
                    0.0,
                ));
            }
        }

        constraints.push(Constraint::inequality(
            "storage >= -v_max",
            unit(storage, 1.0),
            self.config.v_max,
        ));
        constraints.push(Constraint::inequality(
            "storage <= v_max",
            unit(storage, -1.0),
            self.config.v_max,
        ));

        if !power_available {
            constraints.push(Constraint::inequality(
                "storage discharge only",
                unit(storage, -1.0),
                0.0,
            ));
            constraints.push(Constraint::equality("self balance", vec![1.0; dim], 0.0));
        }

        constraints.push(Constraint::soft(
            "storage drift",
            unit(storage, 1.0),
            user.storage_excluding(hour) + self.config.s_max,
            self.config.drift_penalty,
        ));

        constraints
    }
}
