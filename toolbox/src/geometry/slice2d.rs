//! Vertex enumeration on a two-variable slice.
//!
//! Every pair of boundary rows is forced to equality in turn; minimizing x
//! over the remaining region lands on the candidate intersection point,
//! and the second coordinate is back-solved from whichever of the two rows
//! carries a usable y coefficient.

use crate::cases::case::{Case, ConstraintBlock};
use crate::cases::validity::{bounds_for_slice, free_variables_for_slice};
use crate::errors::{Error, Result};
use crate::geometry::vertices::Vertices;
use crate::lp::{ColumnBound, LpEnvironment, LpProblem, RowBound};
use crate::math::matrix::Matrix;
use crate::primitives::consts::ZERO_TOLERANCE;
use crate::symbols::variable::VariablePool;
use itertools::Itertools;

/// Enumerates the polygon of a case (or a composed block) restricted to
/// the plane of `x_name` and `y_name`, all other independent variables
/// pinned by the slice.
pub fn vertices_for_2d_slice(
    case: &Case,
    block_override: Option<&ConstraintBlock>,
    lower: &VariablePool,
    upper: &VariablePool,
    x_name: &str,
    y_name: &str,
) -> Result<Vertices> {
    let block = match block_override {
        Some(block) => block,
        None => case.boundaries().ok_or(Error::SingularSystem)?,
    };
    if free_variables_for_slice(case, lower, upper) != 2 {
        return Err(Error::WrongShapeOrDomain(
            "a 2D slice needs exactly two free variables".into(),
        ));
    }
    let xi = case.xi();
    let x_index = xi
        .index_of_variable_with_name(x_name)
        .ok_or_else(|| Error::NotFound(format!("variable `{x_name}`")))?;
    let y_index = xi
        .index_of_variable_with_name(y_name)
        .ok_or_else(|| Error::NotFound(format!("variable `{y_name}`")))?;

    // Append the four box rows of the x/y window to the boundary system.
    let xi_count = xi.number_of_variables();
    let mut box_rows = Matrix::new(4, xi_count);
    box_rows.set(0, x_index, 1.0);
    box_rows.set(1, x_index, -1.0);
    box_rows.set(2, y_index, 1.0);
    box_rows.set(3, y_index, -1.0);
    let x_low = bound_value(lower, x_name)?;
    let x_high = bound_value(upper, x_name)?;
    let y_low = bound_value(lower, y_name)?;
    let y_high = bound_value(upper, y_name)?;
    let box_zeta = Matrix::column(&[
        -x_low.log10(),
        x_high.log10(),
        -y_low.log10(),
        y_high.log10(),
    ]);
    let u = block.u.append_below(&box_rows)?;
    let zeta = block.zeta.append_below(&box_zeta)?;
    let boundary_count = u.rows();

    // The linear problem carries rows -(U.y) <= zeta.
    let mut negated = u.clone();
    negated.scale(-1.0);
    let mut problem = LpProblem::new(negated);
    let bounds = bounds_for_slice(case, lower, upper);
    for &(index, bound) in &bounds {
        problem.set_col_bound(index, bound);
    }
    for index in [x_index, y_index] {
        if matches!(problem.col_bound(index), ColumnBound::Fixed(_)) {
            return Err(Error::WrongShapeOrDomain(
                "slice variables must not be fixed".into(),
            ));
        }
    }
    problem.set_objective(x_index, 1.0);

    let mut env = LpEnvironment::new();
    let mut vertices = Vertices::new(2);
    for (first, second) in (0..boundary_count).tuple_combinations() {
        // The y coordinate comes from whichever pinned row has a usable
        // y coefficient.
        let active = if u.value(first, y_index).abs() >= ZERO_TOLERANCE {
            first
        } else if u.value(second, y_index).abs() >= ZERO_TOLERANCE {
            second
        } else {
            continue;
        };
        for row in 0..boundary_count {
            let value = zeta.value(row, 0);
            if row == first || row == second {
                problem.set_row_bound(row, RowBound::Fixed(value));
            } else {
                problem.set_row_bound(row, RowBound::Upper(value));
            }
        }
        let solution = env.solve(&problem);
        if !solution.is_feasible() {
            continue;
        }
        let x_value = solution.columns[x_index];
        let mut y_value = -zeta.value(active, 0);
        for k in 0..xi_count {
            if k == y_index {
                continue;
            }
            let coefficient = u.value(active, k);
            if coefficient == 0.0 {
                continue;
            }
            let variable = if k == x_index {
                x_value
            } else {
                solution.columns[k]
            };
            y_value -= coefficient * variable;
        }
        y_value /= u.value(active, y_index);
        vertices.add_vertex(&[x_value, y_value]);
    }
    vertices.order_2d();
    Ok(vertices)
}

fn bound_value(pool: &VariablePool, name: &str) -> Result<f64> {
    pool.value_for_variable_with_name(name)
        .ok_or_else(|| Error::NotFound(format!("variable `{name}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::gma::GmaSystem;

    fn toggle_case() -> Case {
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = a1 - b1*X1", "dX2/dt = a2 - b2*X2"],
            None,
        )
        .unwrap();
        Case::from_gma(&gma, &[1, 1, 1, 1], None, None).unwrap()
    }

    #[test]
    fn unconstrained_case_yields_the_window_corners() {
        // The single case has no conditions; the polygon is the box.
        let case = toggle_case();
        let lower =
            VariablePool::by_parsing_string("a1 : 1e-2, a2 : 1e-2, b1 : 1, b2 : 1").unwrap();
        let upper =
            VariablePool::by_parsing_string("a1 : 1e2, a2 : 1e2, b1 : 1, b2 : 1").unwrap();
        let vertices =
            vertices_for_2d_slice(&case, None, &lower, &upper, "a1", "a2").unwrap();
        assert_eq!(vertices.len(), 4);
        // Starts at maximal x and runs counter-clockwise (positive area).
        assert_eq!(vertices.vertex(0)[0], 2.0);
        let mut twice_area = 0.0;
        for i in 0..4 {
            let a = vertices.vertex(i);
            let b = vertices.vertex((i + 1) % 4);
            twice_area += a[0] * b[1] - b[0] * a[1];
        }
        assert!(twice_area > 0.0);
        for corner in [[2.0, 2.0], [2.0, -2.0], [-2.0, 2.0], [-2.0, -2.0]] {
            assert!(vertices.iter().any(|v| v == corner));
        }
    }

    #[test]
    fn every_vertex_satisfies_the_boundaries() {
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = a + X2^2 - b*X1", "dX2/dt = a + X1^2 - X2"],
            None,
        )
        .unwrap();
        let case = Case::from_gma(&gma, &[1, 1, 1, 1], None, None).unwrap();
        let lower = VariablePool::by_parsing_string("a : 1e-3, b : 1e-3").unwrap();
        let upper = VariablePool::by_parsing_string("a : 1e3, b : 1e3").unwrap();
        let vertices =
            vertices_for_2d_slice(&case, None, &lower, &upper, "a", "b").unwrap();
        assert!(vertices.len() >= 3);
        let block = case.boundaries().unwrap();
        for vertex in vertices.iter() {
            let mut point = Matrix::new(2, 1);
            let a_index = case.xi().index_of_variable_with_name("a").unwrap();
            let b_index = case.xi().index_of_variable_with_name("b").unwrap();
            point.set(a_index, 0, vertex[0]);
            point.set(b_index, 0, vertex[1]);
            let residuals = block.residuals(&point).unwrap();
            for i in 0..residuals.rows() {
                assert!(
                    residuals.value(i, 0) >= -1e-12,
                    "vertex {vertex:?} violates boundary {i}"
                );
            }
        }
    }

    #[test]
    fn wrong_free_count_is_rejected() {
        let case = toggle_case();
        let lower =
            VariablePool::by_parsing_string("a1 : 1e-2, a2 : 1e-2, b1 : 1e-2, b2 : 1").unwrap();
        let upper =
            VariablePool::by_parsing_string("a1 : 1e2, a2 : 1e2, b1 : 1e2, b2 : 1").unwrap();
        // Three variables stay free, one too many for a plane.
        assert!(vertices_for_2d_slice(&case, None, &lower, &upper, "a1", "a2").is_err());
    }
}
