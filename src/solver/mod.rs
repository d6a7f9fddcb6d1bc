//! Constrained minimization used to resolve each user's best response.

/// Constraint data and the per-hour constraint builder.
pub mod constraint;
/// Default interior-point QP solver backed by `clarabel`.
pub mod interior_point;

use thiserror::Error;

pub use constraint::{Constraint, ConstraintBuilder, ConstraintKind};
pub use interior_point::InteriorPoint;

/// Separable quadratic `½ Σ hᵢxᵢ² + Σ qᵢxᵢ + c`.
///
/// # Examples
///
/// ```
/// use dr_market_sim::solver::QuadraticObjective;
///
/// // (x - 3)² = x² - 6x + 9
/// let f = QuadraticObjective {
///     hessian_diagonal: vec![2.0],
///     linear: vec![-6.0],
///     constant: 9.0,
/// };
/// assert_eq!(f.value(&[3.0]), 0.0);
/// assert_eq!(f.value(&[1.0]), 4.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticObjective {
    /// Diagonal of the Hessian; entries must be non-negative.
    pub hessian_diagonal: Vec<f64>,
    pub linear: Vec<f64>,
    pub constant: f64,
}

impl QuadraticObjective {
    pub fn dimension(&self) -> usize {
        self.linear.len()
    }

    pub fn value(&self, x: &[f64]) -> f64 {
        self.hessian_diagonal
            .iter()
            .zip(&self.linear)
            .zip(x)
            .map(|((h, q), v)| 0.5 * h * v * v + q * v)
            .sum::<f64>()
            + self.constant
    }
}

/// A constrained minimization problem handed to a [`NonlinearSolver`].
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Function to minimize.
    pub objective: QuadraticObjective,
    /// Current strategy; same dimension as the objective.
    pub initial_guess: Vec<f64>,
    /// Hard constraints must hold within `tolerance`; soft ones are penalized.
    pub constraints: Vec<Constraint>,
    /// Feasibility tolerance.
    pub tolerance: f64,
}

impl Problem {
    /// Largest hard-constraint violation at `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        self.constraints
            .iter()
            .filter(|c| c.kind.is_hard())
            .map(|c| c.violation(x))
            .fold(0.0, f64::max)
    }
}

/// A converged solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Minimizer, same length as the initial guess.
    pub x: Vec<f64>,
    /// Objective value at `x`, without soft-constraint penalties.
    pub objective: f64,
    pub iterations: usize,
}

/// Failure to produce a feasible minimizer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolverError {
    #[error("solver stopped with status {status} after {iterations} iterations")]
    NonConvergence { status: String, iterations: usize },
    #[error("solution violates hard constraints by {violation:.3e}")]
    Infeasible { violation: f64 },
    #[error("solver setup failed: {0}")]
    Setup(String),
}

/// Minimizes an objective subject to equality and inequality constraints.
///
/// Implementations must return a vector of the same dimension as the
/// initial guess satisfying every hard constraint within the problem
/// tolerance, or an error.
pub trait NonlinearSolver {
    /// # Errors
    ///
    /// Returns a [`SolverError`] when no acceptable minimizer was found.
    fn minimize(&self, problem: &Problem) -> Result<Solution, SolverError>;
}
