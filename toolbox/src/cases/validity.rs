//! Linear-programming validity tests for cases.
//!
//! Strict feasibility of `U.y + zeta >= 0` is decided with a slack column:
//! minimize `lambda >= -1` subject to `-(U.y) - lambda <= zeta`. The region
//! has an interior point exactly when the solve is feasible with a negative
//! objective.

use crate::cases::case::{Case, ConstraintBlock};
use crate::lp::{ColumnBound, LpEnvironment, LpProblem, LpStatus, RowBound};
use crate::math::matrix::Matrix;
use crate::primitives::consts::{LP_TOLERANCE, SLACK_LOWER_BOUND};
use crate::symbols::variable::VariablePool;
use tracing::warn;

/// Builds the strict-feasibility problem for a boundary block.
pub(crate) fn feasibility_problem(block: &ConstraintBlock) -> LpProblem {
    let rows = block.zeta.rows();
    let xi_count = block.u.cols();
    let mut coefficients = Matrix::new(rows, xi_count + 1);
    for i in 0..rows {
        for j in 0..xi_count {
            coefficients.set(i, j, -block.u.value(i, j));
        }
        coefficients.set(i, xi_count, -1.0);
    }
    let mut problem = LpProblem::new(coefficients);
    for i in 0..rows {
        problem.set_row_bound(i, RowBound::Upper(block.zeta.value(i, 0)));
    }
    problem.set_col_bound(xi_count, ColumnBound::Lower(SLACK_LOWER_BOUND));
    problem.set_objective(xi_count, 1.0);
    problem
}

/// Decides strict (or closed, when `strict` is false) feasibility of a
/// block with per-column bounds already applied to `problem`.
pub(crate) fn block_is_feasible(
    env: &mut LpEnvironment,
    problem: &LpProblem,
    strict: bool,
) -> bool {
    let solution = env.solve(problem);
    if solution.status != LpStatus::Optimal {
        return false;
    }
    if strict {
        solution.objective < 0.0
    } else {
        solution.objective <= LP_TOLERANCE
    }
}

/// Classified bound for one independent variable of a slice.
pub(crate) fn bounds_for_slice(
    case: &Case,
    lower: &VariablePool,
    upper: &VariablePool,
) -> Vec<(usize, ColumnBound)> {
    let mut bounds = Vec::new();
    for low_variable in lower.variables() {
        let name = low_variable.name();
        let high = match upper.value_for_variable_with_name(name) {
            Some(value) => value,
            None => {
                warn!(name, "variable bounds are not consistent");
                continue;
            }
        };
        let low = low_variable.value();
        if low > high {
            warn!(name, "variable bounds are not consistent");
            continue;
        }
        let index = match case.xi().index_of_variable_with_name(name) {
            Some(index) => index,
            None => continue,
        };
        let log_low = low.log10();
        let log_high = high.log10();
        let bound = match (log_low.is_finite(), log_high.is_finite()) {
            (false, false) => ColumnBound::Free,
            (true, false) => ColumnBound::Lower(log_low),
            (false, true) => ColumnBound::Upper(log_high),
            (true, true) => {
                if low == high {
                    ColumnBound::Fixed(log_low)
                } else {
                    ColumnBound::Double(log_low, log_high)
                }
            }
        };
        bounds.push((index, bound));
    }
    bounds
}

/// Number of slice variables that stay free (not pinned) after
/// classification.
pub(crate) fn free_variables_for_slice(
    case: &Case,
    lower: &VariablePool,
    upper: &VariablePool,
) -> usize {
    bounds_for_slice(case, lower, upper)
        .iter()
        .filter(|(_, bound)| !matches!(bound, ColumnBound::Fixed(_)))
        .count()
}

impl Case {
    /// True when the case's boundary system is strictly feasible.
    pub fn is_valid(&self) -> bool {
        self.is_valid_in(&mut LpEnvironment::new())
    }

    pub(crate) fn is_valid_in(&self, env: &mut LpEnvironment) -> bool {
        self.is_valid_strictness(env, true)
    }

    pub(crate) fn is_valid_strictness(&self, env: &mut LpEnvironment, strict: bool) -> bool {
        let block = match self.boundaries() {
            Some(block) => block,
            None => return false,
        };
        let problem = feasibility_problem(block);
        block_is_feasible(env, &problem, strict)
    }

    /// Evaluates validity at a fully pinned point; every independent
    /// variable must appear in `values`. No linear program is needed.
    pub fn is_valid_at_point(&self, values: &VariablePool) -> bool {
        if !self.has_solution() {
            return false;
        }
        let xi_count = self.xi().number_of_variables();
        if values.number_of_variables() != xi_count {
            warn!(
                expected = xi_count,
                got = values.number_of_variables(),
                "point must pin every independent variable"
            );
            return false;
        }
        if xi_count == 0 {
            warn!("case has no independent variables; falling back to the feasibility test");
            return self.is_valid();
        }
        match self.boundaries_at_point(values) {
            Ok(residuals) => (0..residuals.rows()).all(|i| residuals.value(i, 0) >= 0.0),
            Err(error) => {
                warn!(%error, "point evaluation failed");
                false
            }
        }
    }

    /// Decides validity over an axis-aligned box; each variable may be
    /// fixed, bounded on either side, both, or free.
    pub fn is_valid_at_slice(&self, lower: &VariablePool, upper: &VariablePool) -> bool {
        self.is_valid_at_slice_in(&mut LpEnvironment::new(), lower, upper, true)
    }

    /// Closed-region slice validity; boundary-only intersections count.
    pub fn is_valid_at_slice_non_strict(&self, lower: &VariablePool, upper: &VariablePool) -> bool {
        self.is_valid_at_slice_in(&mut LpEnvironment::new(), lower, upper, false)
    }

    pub(crate) fn is_valid_at_slice_in(
        &self,
        env: &mut LpEnvironment,
        lower: &VariablePool,
        upper: &VariablePool,
        strict: bool,
    ) -> bool {
        let block = match self.boundaries() {
            Some(block) => block,
            None => return false,
        };
        if lower.number_of_variables() != upper.number_of_variables() {
            warn!("slice bound pools must have matching variable counts");
            return false;
        }
        let mut problem = feasibility_problem(block);
        for (index, bound) in bounds_for_slice(self, lower, upper) {
            problem.set_col_bound(index, bound);
        }
        block_is_feasible(env, &problem, strict)
    }

    /// Strict feasibility of the full condition system
    /// `Cd.log Xd + Ci.log Xi + delta >= 0` over both variable groups.
    pub fn conditions_are_valid(&self) -> bool {
        let joint = match self.cd().append_right(self.ci()) {
            Ok(joint) => joint,
            Err(error) => {
                warn!(%error, "condition matrices are inconsistent");
                return false;
            }
        };
        let block = ConstraintBlock {
            u: joint,
            zeta: self.delta().clone(),
        };
        let problem = feasibility_problem(&block);
        block_is_feasible(&mut LpEnvironment::new(), &problem, true)
    }
}
