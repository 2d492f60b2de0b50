//! Exact vertex enumeration for slices of any dimension.
//!
//! Boundary entries are approximated by small rationals (the denominator
//! cap keeps multi-precision pivoting fast) and the slice box contributes
//! two bound rows per free variable. A first feasible basis seeds a
//! depth-first search over adjacent bases: each edge leaves one tight
//! constraint and runs an exact ratio test to the next. Every basis emits
//! its vertex together with the cobasis of constraints defining it.

use crate::cases::case::Case;
use crate::configs::opts::EnumerationOpts;
use crate::errors::{Error, Result};
use crate::geometry::vertices::Vertices;
use crate::math::matrix::Matrix;
use crate::math::rational::rational_approximation;
use crate::symbols::variable::VariablePool;
use hashbrown::HashSet;
use itertools::Itertools;
use num::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use tracing::debug;

/// One inequality `constant + coeffs . y >= 0` over the free variables.
#[derive(Debug, Clone)]
struct Inequality {
    constant: BigRational,
    coeffs: Vec<BigRational>,
}

impl Inequality {
    fn residual(&self, point: &[BigRational]) -> BigRational {
        let mut value = self.constant.clone();
        for (c, y) in self.coeffs.iter().zip(point) {
            value += c * y;
        }
        value
    }
}

/// The result of an exact enumeration: vertices in log10 coordinates and,
/// per vertex, the 1-based indices of the constraints meeting there.
#[derive(Debug, Clone)]
pub struct VertexEnumeration {
    free_names: Vec<String>,
    vertices: Vec<Vec<BigRational>>,
    cobases: Vec<Vec<usize>>,
}

impl VertexEnumeration {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Names of the free variables, one per coordinate.
    pub fn free_names(&self) -> &[String] {
        &self.free_names
    }

    /// Vertex coordinates, one row per vertex.
    pub fn vertex_matrix(&self) -> Matrix {
        let n = self.free_names.len();
        let mut out = Matrix::new(self.vertices.len(), n);
        for (i, vertex) in self.vertices.iter().enumerate() {
            for (j, value) in vertex.iter().enumerate() {
                out.set(i, j, value.to_f64().unwrap_or(f64::NAN));
            }
        }
        out
    }

    /// Defining constraint indices, one row per vertex, matching the
    /// vertex matrix row for row.
    pub fn cobasis_matrix(&self) -> Matrix {
        let n = self.free_names.len();
        let mut out = Matrix::new(self.cobases.len(), n);
        for (i, cobasis) in self.cobases.iter().enumerate() {
            for (j, &index) in cobasis.iter().enumerate() {
                out.set(i, j, index as f64);
            }
        }
        out
    }

    /// The vertex set in double precision.
    pub fn to_vertices(&self) -> Vertices {
        let n = self.free_names.len();
        let mut vertices = Vertices::new(n);
        let matrix = self.vertex_matrix();
        for i in 0..matrix.rows() {
            vertices.add_vertex(matrix.row(i));
        }
        vertices
    }
}

/// Enumerates the vertices of a case's region restricted to a slice.
/// Variables pinned by the slice are substituted away; every remaining
/// variable contributes one coordinate.
pub fn enumerate_vertices(
    case: &Case,
    lower: &VariablePool,
    upper: &VariablePool,
    opts: &EnumerationOpts,
) -> Result<VertexEnumeration> {
    let block = case.boundaries().ok_or(Error::SingularSystem)?;
    if lower.number_of_variables() != upper.number_of_variables() {
        return Err(Error::WrongShapeOrDomain(
            "slice bound pools must have matching variable counts".into(),
        ));
    }
    let cap = opts.denominator_limit;
    let xi = case.xi();

    // Split the independent pool into pinned and free coordinates.
    let mut fixed_log = vec![None::<f64>; xi.number_of_variables()];
    let mut free_names = Vec::new();
    let mut free_indices = Vec::new();
    let mut free_bounds = Vec::new();
    for (index, variable) in xi.variables().iter().enumerate() {
        let name = variable.name();
        let low = lower.value_for_variable_with_name(name);
        let high = upper.value_for_variable_with_name(name);
        match (low, high) {
            (Some(low), Some(high)) if low == high => {
                fixed_log[index] = Some(low.log10());
            }
            _ => {
                free_names.push(name.to_string());
                free_indices.push(index);
                free_bounds.push((
                    low.map(f64::log10).filter(|v| v.is_finite()),
                    high.map(f64::log10).filter(|v| v.is_finite()),
                ));
            }
        }
    }
    let n = free_names.len();
    if n == 0 {
        return Err(Error::WrongShapeOrDomain(
            "enumeration needs at least one free variable".into(),
        ));
    }

    // Case boundaries with the pinned coordinates folded into the
    // constant, then the box rows.
    let mut rows = Vec::with_capacity(block.u.rows() + 2 * n);
    for i in 0..block.u.rows() {
        let mut constant = block.zeta.value(i, 0);
        for (k, pinned) in fixed_log.iter().enumerate() {
            if let Some(value) = pinned {
                constant += block.u.value(i, k) * value;
            }
        }
        rows.push(Inequality {
            constant: rational_approximation(constant, cap).to_big(),
            coeffs: free_indices
                .iter()
                .map(|&k| rational_approximation(block.u.value(i, k), cap).to_big())
                .collect(),
        });
    }
    for (j, (low, high)) in free_bounds.iter().enumerate() {
        if let Some(low) = low {
            let mut coeffs = vec![BigRational::zero(); n];
            coeffs[j] = BigRational::from_integer(1.into());
            rows.push(Inequality {
                constant: rational_approximation(-low, cap).to_big(),
                coeffs,
            });
        }
        if let Some(high) = high {
            let mut coeffs = vec![BigRational::zero(); n];
            coeffs[j] = BigRational::from_integer((-1).into());
            rows.push(Inequality {
                constant: rational_approximation(*high, cap).to_big(),
                coeffs,
            });
        }
    }

    let mut enumeration = VertexEnumeration {
        free_names,
        vertices: Vec::new(),
        cobases: Vec::new(),
    };

    // Without a first feasible basis the region is empty.
    let first = match first_vertex(&rows, n) {
        Some(point) => point,
        None => {
            debug!("no feasible basis; region is empty");
            return Ok(enumeration);
        }
    };

    let mut seen: HashSet<Vec<BigRational>> = HashSet::new();
    let mut pending = vec![first.clone()];
    seen.insert(first);
    while let Some(point) = pending.pop() {
        let active: Vec<usize> = (0..rows.len())
            .filter(|&i| rows[i].residual(&point).is_zero())
            .collect();
        enumeration.cobases.push(cobasis_of(&rows, &active, n));
        enumeration.vertices.push(point.clone());

        // Leave one tight constraint at a time and walk the edge to the
        // next blocking constraint.
        for kept in active.iter().copied().combinations(n - 1) {
            let direction = match edge_direction(&rows, &kept, n) {
                Some(direction) => direction,
                None => continue,
            };
            for sign in [1i32, -1] {
                let step: Vec<BigRational> = direction
                    .iter()
                    .map(|d| {
                        if sign < 0 {
                            -d.clone()
                        } else {
                            d.clone()
                        }
                    })
                    .collect();
                if let Some(next) = walk_edge(&rows, &point, &step) {
                    if seen.insert(next.clone()) {
                        pending.push(next);
                    }
                }
            }
        }
    }
    Ok(enumeration)
}

/// Scans bases until one yields a feasible intersection point.
fn first_vertex(rows: &[Inequality], n: usize) -> Option<Vec<BigRational>> {
    for combo in (0..rows.len()).combinations(n) {
        if let Some(point) = intersection_point(rows, &combo) {
            if rows.iter().all(|row| !row.residual(&point).is_negative()) {
                return Some(point);
            }
        }
    }
    None
}

/// Solves the square system of `combo`'s tight constraints exactly.
fn intersection_point(rows: &[Inequality], combo: &[usize]) -> Option<Vec<BigRational>> {
    let n = combo.len();
    let mut work: Vec<Vec<BigRational>> = combo
        .iter()
        .map(|&i| {
            let mut row = rows[i].coeffs.clone();
            row.push(-rows[i].constant.clone());
            row
        })
        .collect();
    for col in 0..n {
        let pivot = (col..n).find(|&r| !work[r][col].is_zero())?;
        work.swap(col, pivot);
        let divisor = work[col][col].clone();
        for value in work[col].iter_mut() {
            *value /= divisor.clone();
        }
        for r in 0..n {
            if r == col || work[r][col].is_zero() {
                continue;
            }
            let factor = work[r][col].clone();
            for c in 0..=n {
                let delta = &factor * &work[col][c];
                work[r][c] -= delta;
            }
        }
    }
    Some(work.into_iter().map(|mut row| row.pop().expect("rhs")).collect())
}

/// The direction of the edge along which every row of `kept` stays tight,
/// or `None` when those rows do not have rank `n - 1`.
fn edge_direction(rows: &[Inequality], kept: &[usize], n: usize) -> Option<Vec<BigRational>> {
    let mut work: Vec<Vec<BigRational>> = kept.iter().map(|&i| rows[i].coeffs.clone()).collect();
    let mut pivot_cols = Vec::with_capacity(kept.len());
    let mut lead = 0usize;
    for col in 0..n {
        let pivot = (lead..work.len()).find(|&r| !work[r][col].is_zero());
        let pivot = match pivot {
            Some(row) => row,
            None => continue,
        };
        work.swap(lead, pivot);
        let divisor = work[lead][col].clone();
        for value in work[lead].iter_mut() {
            *value /= divisor.clone();
        }
        for r in 0..work.len() {
            if r == lead || work[r][col].is_zero() {
                continue;
            }
            let factor = work[r][col].clone();
            for c in 0..n {
                let delta = &factor * &work[lead][c];
                work[r][c] -= delta;
            }
        }
        pivot_cols.push(col);
        lead += 1;
        if lead == work.len() {
            break;
        }
    }
    if pivot_cols.len() != kept.len() {
        // Rank-deficient: the kept rows do not define an edge.
        return None;
    }
    let free_col = (0..n).find(|c| !pivot_cols.contains(c))?;
    let mut direction = vec![BigRational::zero(); n];
    direction[free_col] = BigRational::from_integer(1.into());
    for (r, &col) in pivot_cols.iter().enumerate() {
        direction[col] = -work[r][free_col].clone();
    }
    Some(direction)
}

/// Exact ratio test from `point` along `step`; `None` when the edge is a
/// ray or the first block is at the point itself.
fn walk_edge(
    rows: &[Inequality],
    point: &[BigRational],
    step: &[BigRational],
) -> Option<Vec<BigRational>> {
    let mut best: Option<BigRational> = None;
    for row in rows {
        let slope: BigRational = row
            .coeffs
            .iter()
            .zip(step)
            .map(|(c, d)| c * d)
            .sum();
        if !slope.is_negative() {
            continue;
        }
        let limit = -row.residual(point) / slope;
        if best.as_ref().map_or(true, |b| limit < *b) {
            best = Some(limit);
        }
    }
    let t = best?;
    if t.is_zero() {
        return None;
    }
    Some(
        point
            .iter()
            .zip(step)
            .map(|(y, d)| y + d * t.clone())
            .collect(),
    )
}

/// A deterministic full-rank subset of the active constraints, 1-based.
fn cobasis_of(rows: &[Inequality], active: &[usize], n: usize) -> Vec<usize> {
    let mut chosen: Vec<usize> = Vec::with_capacity(n);
    let mut basis_rows: Vec<Vec<BigRational>> = Vec::with_capacity(n);
    for &candidate in active {
        if chosen.len() == n {
            break;
        }
        let mut trial = basis_rows.clone();
        trial.push(rows[candidate].coeffs.clone());
        if rank(&trial) == trial.len() {
            basis_rows = trial;
            chosen.push(candidate + 1);
        }
    }
    chosen.resize(n, 0);
    chosen
}

fn rank(rows: &[Vec<BigRational>]) -> usize {
    if rows.is_empty() {
        return 0;
    }
    let n = rows[0].len();
    let mut work = rows.to_vec();
    let mut lead = 0usize;
    for col in 0..n {
        let pivot = (lead..work.len()).find(|&r| !work[r][col].is_zero());
        let pivot = match pivot {
            Some(row) => row,
            None => continue,
        };
        work.swap(lead, pivot);
        let divisor = work[lead][col].clone();
        for value in work[lead].iter_mut() {
            *value /= divisor.clone();
        }
        for r in 0..work.len() {
            if r == lead || work[r][col].is_zero() {
                continue;
            }
            let factor = work[r][col].clone();
            for c in 0..n {
                let delta = &factor * &work[lead][c];
                work[r][c] -= delta;
            }
        }
        lead += 1;
        if lead == work.len() {
            break;
        }
    }
    lead
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vertices::{active_boundaries, connectivity_matrix};
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
    fn a_box_has_its_corner_vertices() {
        let case = toggle_case();
        let lower = VariablePool::by_parsing_string(
            "a1 : 1e-2, b1 : 1e-2, a2 : 1e-2, b2 : 1e-2",
        )
        .unwrap();
        let upper =
            VariablePool::by_parsing_string("a1 : 1e2, b1 : 1e2, a2 : 1e2, b2 : 1e2").unwrap();
        let enumeration =
            enumerate_vertices(&case, &lower, &upper, &EnumerationOpts::default()).unwrap();
        // Four free dimensions, no conditions: the 16 corners of the box.
        assert_eq!(enumeration.len(), 16);
        let vertices = enumeration.vertex_matrix();
        for i in 0..vertices.rows() {
            for j in 0..vertices.cols() {
                assert!((vertices.value(i, j).abs() - 2.0).abs() < 1e-12);
            }
        }
        // Every vertex lies on n boundaries.
        let cobasis = enumeration.cobasis_matrix();
        for i in 0..cobasis.rows() {
            for j in 0..cobasis.cols() {
                assert!(cobasis.value(i, j) >= 1.0);
            }
        }
    }

    #[test]
    fn conditions_cut_the_box() {
        // Case 1 of the bistable pair restricts to a <= 1 (log a <= 0):
        // with the slice 1e-2..1e2 the segment is [-2, 0].
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"],
            None,
        )
        .unwrap();
        let case = Case::from_gma(&gma, &[1, 1, 1, 1], None, None).unwrap();
        let lower = VariablePool::by_parsing_string("a : 1e-2").unwrap();
        let upper = VariablePool::by_parsing_string("a : 1e2").unwrap();
        let enumeration =
            enumerate_vertices(&case, &lower, &upper, &EnumerationOpts::default()).unwrap();
        assert_eq!(enumeration.len(), 2);
        let mut values: Vec<f64> = (0..2)
            .map(|i| enumeration.vertex_matrix().value(i, 0))
            .collect();
        values.sort_by(f64::total_cmp);
        assert!((values[0] + 2.0).abs() < 1e-12);
        assert!(values[1].abs() < 1e-12);
    }

    #[test]
    fn empty_regions_enumerate_nothing() {
        // Contradictory extra conditions (a >= 10 and a <= 0.1) leave a
        // region with no points at all, so no first basis exists.
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"],
            None,
        )
        .unwrap();
        let cd = Matrix::new(2, 2);
        let mut ci = Matrix::new(2, 1);
        ci.set(0, 0, 1.0);
        ci.set(1, 0, -1.0);
        let mut delta = Matrix::new(2, 1);
        delta.set(0, 0, -1.0);
        delta.set(1, 0, -1.0);
        let case =
            Case::from_gma(&gma, &[1, 1, 1, 1], Some((&cd, &ci, &delta)), None).unwrap();
        let lower = VariablePool::by_parsing_string("a : 1e-2").unwrap();
        let upper = VariablePool::by_parsing_string("a : 1e2").unwrap();
        let enumeration =
            enumerate_vertices(&case, &lower, &upper, &EnumerationOpts::default()).unwrap();
        assert!(enumeration.is_empty());
    }

    #[test]
    fn adjacent_vertices_share_enough_boundaries() {
        let case = toggle_case();
        let lower = VariablePool::by_parsing_string(
            "a1 : 1e-1, b1 : 1e-1, a2 : 1, b2 : 1",
        )
        .unwrap();
        let upper =
            VariablePool::by_parsing_string("a1 : 1e1, b1 : 1e1, a2 : 1, b2 : 1").unwrap();
        let enumeration =
            enumerate_vertices(&case, &lower, &upper, &EnumerationOpts::default()).unwrap();
        assert_eq!(enumeration.len(), 4);
        let actives: Vec<Vec<bool>> = enumeration
            .to_vertices()
            .iter()
            .map(|v| {
                active_boundaries(
                    &case,
                    &lower,
                    &upper,
                    enumeration.free_names(),
                    v,
                )
                .unwrap()
            })
            .collect();
        let connectivity = connectivity_matrix(&actives, 2);
        // A rectangle: every vertex touches exactly two others.
        for i in 0..4 {
            let degree: f64 = (0..4).map(|j| connectivity.value(i, j)).sum();
            assert_eq!(degree, 2.0);
        }
    }
}
