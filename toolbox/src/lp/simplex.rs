//! Dense two-phase primal simplex with Bland's rule.
//!
//! Small and deterministic: the problems solved here have tens of rows, and
//! identical input must produce identical output on every thread.

use super::{ColumnBound, LpProblem, LpSolution, LpStatus, RowBound};
use crate::primitives::consts::{LP_MAX_ITERATIONS, LP_TOLERANCE};
use tracing::warn;

/// Reusable buffers for one environment.
#[derive(Default)]
pub(crate) struct Workspace {
    rows: Vec<Vec<f64>>,
    cost: Vec<f64>,
}

/// One expanded column: `x_src` receives `sign * u` on top of its shift.
struct Part {
    src: usize,
    sign: f64,
}

pub(crate) fn solve(problem: &LpProblem, scratch: &mut Workspace) -> LpSolution {
    let n_struct = problem.cols();

    // Shift and split structural columns so every simplex variable is
    // nonnegative: x = shift + sum(sign * u).
    let mut parts: Vec<Part> = Vec::new();
    let mut shifts = vec![0.0f64; n_struct];
    let mut upper_rows: Vec<(usize, f64)> = Vec::new();
    for (j, bound) in problem.col_bounds().iter().enumerate() {
        match *bound {
            ColumnBound::Free => {
                parts.push(Part { src: j, sign: 1.0 });
                parts.push(Part { src: j, sign: -1.0 });
            }
            ColumnBound::Lower(low) => {
                shifts[j] = low;
                parts.push(Part { src: j, sign: 1.0 });
            }
            ColumnBound::Upper(up) => {
                shifts[j] = up;
                parts.push(Part { src: j, sign: -1.0 });
            }
            ColumnBound::Double(low, up) => {
                shifts[j] = low;
                upper_rows.push((parts.len(), up - low));
                parts.push(Part { src: j, sign: 1.0 });
            }
            ColumnBound::Fixed(value) => {
                shifts[j] = value;
            }
        }
    }

    let n_exp = parts.len();
    let m = problem.rows() + upper_rows.len();

    // Row layout: expanded coefficients, slack block, artificial block, rhs.
    let mut is_eq = vec![false; m];
    let mut base_rows: Vec<(Vec<f64>, f64)> = Vec::with_capacity(m);
    for i in 0..problem.rows() {
        let mut coeffs = vec![0.0f64; n_exp];
        let mut shift_term = 0.0f64;
        for j in 0..n_struct {
            let a = problem.coefficients().value(i, j);
            if a != 0.0 {
                shift_term += a * shifts[j];
            }
        }
        for (k, part) in parts.iter().enumerate() {
            let a = problem.coefficients().value(i, part.src);
            if a != 0.0 {
                coeffs[k] += a * part.sign;
            }
        }
        let rhs = match problem.row_bounds()[i] {
            RowBound::Upper(b) => b - shift_term,
            RowBound::Fixed(b) => {
                is_eq[i] = true;
                b - shift_term
            }
        };
        base_rows.push((coeffs, rhs));
    }
    for (offset, &(col, ub)) in upper_rows.iter().enumerate() {
        let mut coeffs = vec![0.0f64; n_exp];
        coeffs[col] = 1.0;
        is_eq[problem.rows() + offset] = false;
        base_rows.push((coeffs, ub));
    }

    let n_slack = is_eq.iter().filter(|&&eq| !eq).count();
    // A row needs an artificial when it is an equality, or when negating a
    // `<=` row (to keep the rhs nonnegative) flips its slack to -1.
    let needs_artificial: Vec<bool> = base_rows
        .iter()
        .zip(&is_eq)
        .map(|((_, rhs), &eq)| eq || *rhs < 0.0)
        .collect();
    let n_art = needs_artificial.iter().filter(|&&x| x).count();
    let total = n_exp + n_slack + n_art;

    // Assemble the tableau.
    let rows = &mut scratch.rows;
    rows.clear();
    let mut basis = vec![usize::MAX; m];
    let mut slack_cursor = n_exp;
    let mut art_cursor = n_exp + n_slack;
    for (i, (coeffs, rhs)) in base_rows.into_iter().enumerate() {
        let mut row = vec![0.0f64; total + 1];
        row[..n_exp].copy_from_slice(&coeffs);
        row[total] = rhs;
        let mut slack = usize::MAX;
        if !is_eq[i] {
            slack = slack_cursor;
            row[slack] = 1.0;
            slack_cursor += 1;
        }
        if row[total] < 0.0 {
            row.iter_mut().for_each(|v| *v = -*v);
        }
        if needs_artificial[i] {
            let art = art_cursor;
            row[art] = 1.0;
            basis[i] = art;
            art_cursor += 1;
        } else {
            basis[i] = slack;
        }
        rows.push(row);
    }

    // Phase 1: drive the artificials to zero.
    if n_art > 0 {
        let cost = &mut scratch.cost;
        cost.clear();
        cost.resize(total + 1, 0.0);
        for j in n_exp + n_slack..total {
            cost[j] = 1.0;
        }
        for (i, &b) in basis.iter().enumerate() {
            if b >= n_exp + n_slack {
                for j in 0..=total {
                    cost[j] -= rows[i][j];
                }
            }
        }
        match pivot_until_optimal(rows, cost, &mut basis, total, total) {
            PivotOutcome::Optimal => {}
            PivotOutcome::Unbounded | PivotOutcome::Stalled => {
                return failed_solution(n_struct);
            }
        }
        let phase_one_value = -scratch.cost[total];
        if phase_one_value > LP_TOLERANCE {
            return LpSolution {
                status: LpStatus::Infeasible,
                objective: 0.0,
                columns: vec![0.0; n_struct],
            };
        }
        // Pivot surviving artificials out of the basis where the row has
        // any structural or slack support; rows without support are
        // redundant and stay inert.
        for i in 0..m {
            if basis[i] < n_exp + n_slack {
                continue;
            }
            if let Some(col) = (0..n_exp + n_slack)
                .find(|&j| rows[i][j].abs() > LP_TOLERANCE)
            {
                pivot(rows, &mut basis, i, col, total);
            }
        }
    }

    // Phase 2: minimize the real objective, artificial columns barred.
    let cost = &mut scratch.cost;
    cost.clear();
    cost.resize(total + 1, 0.0);
    for (k, part) in parts.iter().enumerate() {
        cost[k] += problem.objective()[part.src] * part.sign;
    }
    for (i, &b) in basis.iter().enumerate() {
        if b < total && cost[b] != 0.0 {
            let factor = cost[b];
            for j in 0..=total {
                cost[j] -= factor * rows[i][j];
            }
        }
    }
    let enter_limit = n_exp + n_slack;
    match pivot_until_optimal(rows, cost, &mut basis, enter_limit, total) {
        PivotOutcome::Optimal => {}
        PivotOutcome::Unbounded => {
            return LpSolution {
                status: LpStatus::Unbounded,
                objective: f64::NEG_INFINITY,
                columns: vec![0.0; n_struct],
            };
        }
        PivotOutcome::Stalled => return failed_solution(n_struct),
    }

    // Recover structural values and the true objective.
    let mut expanded = vec![0.0f64; total];
    for (i, &b) in basis.iter().enumerate() {
        if b < total {
            expanded[b] = rows[i][total];
        }
    }
    let mut columns = shifts;
    for (k, part) in parts.iter().enumerate() {
        columns[part.src] += part.sign * expanded[k];
    }
    let objective = problem
        .objective()
        .iter()
        .zip(&columns)
        .map(|(c, x)| c * x)
        .sum();
    LpSolution {
        status: LpStatus::Optimal,
        objective,
        columns,
    }
}

enum PivotOutcome {
    Optimal,
    Unbounded,
    Stalled,
}

/// Runs Bland-rule pivots until no reduced cost is negative.
fn pivot_until_optimal(
    rows: &mut [Vec<f64>],
    cost: &mut [f64],
    basis: &mut [usize],
    enter_limit: usize,
    total: usize,
) -> PivotOutcome {
    for _ in 0..LP_MAX_ITERATIONS {
        let entering = (0..enter_limit).find(|&j| cost[j] < -LP_TOLERANCE);
        let entering = match entering {
            Some(j) => j,
            None => return PivotOutcome::Optimal,
        };
        let mut leaving: Option<usize> = None;
        let mut best_ratio = f64::INFINITY;
        for (i, row) in rows.iter().enumerate() {
            let a = row[entering];
            if a <= LP_TOLERANCE {
                continue;
            }
            let ratio = row[total] / a;
            let better = ratio < best_ratio - LP_TOLERANCE
                || ((ratio - best_ratio).abs() <= LP_TOLERANCE
                    && leaving.is_some_and(|r| basis[i] < basis[r]));
            if leaving.is_none() || better {
                best_ratio = ratio;
                leaving = Some(i);
            }
        }
        let leaving = match leaving {
            Some(i) => i,
            None => return PivotOutcome::Unbounded,
        };
        pivot(rows, basis, leaving, entering, total);
        let factor = cost[entering];
        if factor != 0.0 {
            for j in 0..=total {
                cost[j] -= factor * rows[leaving][j];
            }
        }
    }
    warn!("simplex hit its iteration cap");
    PivotOutcome::Stalled
}

fn pivot(rows: &mut [Vec<f64>], basis: &mut [usize], r: usize, c: usize, total: usize) {
    let divisor = rows[r][c];
    for j in 0..=total {
        rows[r][j] /= divisor;
    }
    let pivot_row = rows[r].clone();
    for (i, row) in rows.iter_mut().enumerate() {
        if i == r {
            continue;
        }
        let factor = row[c];
        if factor == 0.0 {
            continue;
        }
        for j in 0..=total {
            row[j] -= factor * pivot_row[j];
        }
    }
    basis[r] = c;
}

fn failed_solution(n_struct: usize) -> LpSolution {
    LpSolution {
        status: LpStatus::Infeasible,
        objective: 0.0,
        columns: vec![0.0; n_struct],
    }
}
