use clarabel::algebra::*;
use clarabel::solver::*;

use super::{Constraint, ConstraintKind, NonlinearSolver, Problem, Solution, SolverError};

/// Best-response solver backed by the `clarabel` interior-point QP solver.
///
/// Equalities map to the zero cone and inequalities to the non-negative
/// cone. Each soft constraint gets a slack variable `t >= 0` that relaxes it
/// and adds `penalty * t²` to the objective, so soft constraints never make
/// a problem infeasible.
///
/// A solve is accepted when clarabel reports `Solved` or `AlmostSolved` and
/// the hard constraints hold within `sqrt(tolerance)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorPoint {
    /// Cap on interior-point iterations.
    pub max_iterations: usize,
}

impl InteriorPoint {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Default for InteriorPoint {
    fn default() -> Self {
        Self::new(100)
    }
}

impl NonlinearSolver for InteriorPoint {
    fn minimize(&self, problem: &Problem) -> Result<Solution, SolverError> {
        let n = problem.objective.dimension();
        let soft: Vec<(&Constraint, f64)> = problem
            .constraints
            .iter()
            .filter_map(|c| match c.kind {
                ConstraintKind::Soft { penalty } => Some((c, penalty)),
                _ => None,
            })
            .collect();
        let dim = n + soft.len();

        let mut hessian = problem.objective.hessian_diagonal.clone();
        hessian.extend(soft.iter().map(|(_, penalty)| 2.0 * penalty));
        let mut q = problem.objective.linear.clone();
        q.resize(dim, 0.0);

        // Rows are `a · z + s = b` with `s` in the cone of their block.
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut b: Vec<f64> = Vec::new();
        let padded = |coefficients: &[f64], sign: f64| {
            let mut row: Vec<f64> = coefficients.iter().map(|c| sign * c).collect();
            row.resize(dim, 0.0);
            row
        };

        for c in problem.constraints.iter().filter(|c| c.kind == ConstraintKind::Equality) {
            rows.push(padded(&c.coefficients, 1.0));
            b.push(-c.offset);
        }
        let equalities = rows.len();

        for c in problem.constraints.iter().filter(|c| c.kind == ConstraintKind::Inequality) {
            rows.push(padded(&c.coefficients, -1.0));
            b.push(c.offset);
        }
        for (j, (c, _)) in soft.iter().enumerate() {
            let mut row = padded(&c.coefficients, -1.0);
            row[n + j] = -1.0;
            rows.push(row);
            b.push(c.offset);

            let mut slack = vec![0.0; dim];
            slack[n + j] = -1.0;
            rows.push(slack);
            b.push(0.0);
        }
        let inequalities = rows.len() - equalities;

        let mut cones = Vec::with_capacity(2);
        if equalities > 0 {
            cones.push(SupportedConeT::ZeroConeT(equalities));
        }
        if inequalities > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(inequalities));
        }

        let settings = DefaultSettingsBuilder::<f64>::default()
            .verbose(false)
            .max_iter(u32::try_from(self.max_iterations).unwrap_or(u32::MAX))
            .build()
            .map_err(|e| SolverError::Setup(e.to_string()))?;

        let p = diagonal_csc(&hessian);
        let a = dense_csc(&rows, dim);
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let solution = &solver.solution;
        let iterations = solution.iterations as usize;
        if !matches!(solution.status, SolverStatus::Solved | SolverStatus::AlmostSolved) {
            return Err(SolverError::NonConvergence {
                status: format!("{:?}", solution.status),
                iterations,
            });
        }

        let x = solution.x[..n].to_vec();
        let violation = problem.max_violation(&x);
        if violation > problem.tolerance.sqrt() {
            return Err(SolverError::Infeasible { violation });
        }

        Ok(Solution {
            objective: problem.objective.value(&x),
            x,
            iterations,
        })
    }
}

/// Upper-triangular CSC matrix holding `diagonal`, zeros omitted.
fn diagonal_csc(diagonal: &[f64]) -> CscMatrix<f64> {
    let n = diagonal.len();
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for (i, &d) in diagonal.iter().enumerate() {
        if d != 0.0 {
            rowval.push(i);
            nzval.push(d);
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(n, n, colptr, rowval, nzval)
}

/// CSC matrix of the dense `rows`, each of length `cols`.
fn dense_csc(rows: &[Vec<f64>], cols: usize) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(cols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for col in 0..cols {
        for (r, row) in rows.iter().enumerate() {
            if row[col] != 0.0 {
                rowval.push(r);
                nzval.push(row[col]);
            }
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(rows.len(), cols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::QuadraticObjective;

    fn problem(objective: QuadraticObjective, constraints: Vec<Constraint>) -> Problem {
        Problem {
            initial_guess: vec![0.0; objective.dimension()],
            objective,
            constraints,
            tolerance: 1e-6,
        }
    }

    /// `Σ (xᵢ - targetᵢ)²`
    fn distance_to(target: &[f64]) -> QuadraticObjective {
        QuadraticObjective {
            hessian_diagonal: vec![2.0; target.len()],
            linear: target.iter().map(|t| -2.0 * t).collect(),
            constant: target.iter().map(|t| t * t).sum(),
        }
    }

    #[test]
    fn interior_minimum_ignores_slack_bound() {
        let constraints = vec![Constraint::inequality("x <= 10", vec![-1.0, 0.0], 10.0)];
        let solution = InteriorPoint::default()
            .minimize(&problem(distance_to(&[3.0, -1.0]), constraints))
            .expect("converges");
        assert!((solution.x[0] - 3.0).abs() < 1e-5);
        assert!((solution.x[1] + 1.0).abs() < 1e-5);
        assert!(solution.objective.abs() < 1e-8);
    }

    #[test]
    fn active_upper_bound() {
        // minimum at 5 but x <= 2
        let constraints = vec![Constraint::inequality("x <= 2", vec![-1.0], 2.0)];
        let solution = InteriorPoint::default()
            .minimize(&problem(distance_to(&[5.0]), constraints))
            .expect("converges");
        assert!((solution.x[0] - 2.0).abs() < 1e-5);
        assert!((solution.objective - 9.0).abs() < 1e-5);
    }

    #[test]
    fn equality_with_linear_objective() {
        // minimize x + 2y subject to x + y = 1, 0 <= x <= 1, 0 <= y <= 1
        let objective = QuadraticObjective {
            hessian_diagonal: vec![0.0, 0.0],
            linear: vec![1.0, 2.0],
            constant: 0.0,
        };
        let constraints = vec![
            Constraint::equality("sum", vec![1.0, 1.0], -1.0),
            Constraint::inequality("x >= 0", vec![1.0, 0.0], 0.0),
            Constraint::inequality("x <= 1", vec![-1.0, 0.0], 1.0),
            Constraint::inequality("y >= 0", vec![0.0, 1.0], 0.0),
            Constraint::inequality("y <= 1", vec![0.0, -1.0], 1.0),
        ];
        let p = problem(objective, constraints);
        let solution = InteriorPoint::default().minimize(&p).expect("converges");
        assert!((solution.x[0] - 1.0).abs() < 1e-5);
        assert!(solution.x[1].abs() < 1e-5);
        assert!(p.max_violation(&solution.x) <= 1e-6);
    }

    #[test]
    fn infeasible_problem_reports_non_convergence() {
        let constraints = vec![
            Constraint::inequality("x >= 1", vec![1.0], -1.0),
            Constraint::inequality("x <= -1", vec![-1.0], -1.0),
        ];
        let result = InteriorPoint::default().minimize(&problem(distance_to(&[0.0]), constraints));
        assert!(matches!(result, Err(SolverError::NonConvergence { .. })));
    }

    #[test]
    fn soft_constraint_yields_instead_of_failing() {
        // x >= 1 is hard, x <= -1 is soft with penalty 1: minimize
        // x² + (x + 1)² over x >= 1 gives x = 1.
        let constraints = vec![
            Constraint::inequality("x >= 1", vec![1.0], -1.0),
            Constraint::soft("x <= -1", vec![-1.0], -1.0, 1.0),
        ];
        let solution = InteriorPoint::default()
            .minimize(&problem(distance_to(&[0.0]), constraints))
            .expect("soft constraints never make a problem infeasible");
        assert!((solution.x[0] - 1.0).abs() < 1e-5);
        assert_eq!(solution.x.len(), 1);
    }

    #[test]
    fn soft_penalty_trades_off_against_objective() {
        // minimize (x - 4)² + 3·max(0, x - 1)²  =>  x = 1.75
        let constraints = vec![Constraint::soft("x <= 1", vec![-1.0], 1.0, 3.0)];
        let solution = InteriorPoint::default()
            .minimize(&problem(distance_to(&[4.0]), constraints))
            .expect("converges");
        assert!((solution.x[0] - 1.75).abs() < 1e-5);
    }

    #[test]
    fn csc_layout_is_column_major() {
        let a = dense_csc(&[vec![1.0, 0.0], vec![2.0, 3.0]], 2);
        assert_eq!(a.colptr, vec![0, 2, 3]);
        assert_eq!(a.rowval, vec![0, 1, 1]);
        assert_eq!(a.nzval, vec![1.0, 2.0, 3.0]);
        let p = diagonal_csc(&[2.0, 0.0, 4.0]);
        assert_eq!(p.colptr, vec![0, 1, 1, 2]);
        assert_eq!(p.rowval, vec![0, 2]);
    }
}
