use crate::cases::case::Case;
use crate::errors::{Error, Result};
use crate::math::matrix::Matrix;
use crate::math::matrix_array::MatrixArray;
use crate::primitives::consts::{VERTEX_TOLERANCE, ZERO_TOLERANCE};
use crate::symbols::variable::VariablePool;

/// A set of d-dimensional vertices with tolerance-based identity: points
/// closer than the tolerance in every coordinate are one vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertices {
    dimensions: usize,
    vertices: Vec<Vec<f64>>,
}

impl Vertices {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vertices: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, index: usize) -> &[f64] {
        &self.vertices[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.vertices.iter().map(|v| v.as_slice())
    }

    /// Adds a vertex unless an equal one is already present. Returns
    /// whether the point was new.
    pub fn add_vertex(&mut self, coordinates: &[f64]) -> bool {
        debug_assert_eq!(coordinates.len(), self.dimensions);
        let duplicate = self.vertices.iter().any(|existing| {
            existing
                .iter()
                .zip(coordinates)
                .all(|(a, b)| (a - b).abs() < VERTEX_TOLERANCE)
        });
        if duplicate {
            return false;
        }
        self.vertices.push(coordinates.to_vec());
        true
    }

    /// One row per vertex.
    pub fn to_matrix(&self) -> Matrix {
        let mut out = Matrix::new(self.vertices.len(), self.dimensions);
        for (i, vertex) in self.vertices.iter().enumerate() {
            for (j, &coordinate) in vertex.iter().enumerate() {
                out.set(i, j, coordinate);
            }
        }
        out
    }

    /// Orders a 2D vertex set counter-clockwise, starting at the vertex of
    /// maximal x.
    ///
    /// The walk is monotone per quadrant: ascending the right side it takes
    /// the neighbor of steepest slope, crossing the top the shallowest,
    /// mirrored back down the left side and across the bottom. On a convex
    /// vertex set this visits each point once, deterministically.
    pub fn order_2d(&mut self) {
        if self.dimensions != 2 || self.vertices.len() < 3 {
            return;
        }
        let points = &self.vertices;
        let count = points.len();
        let mut index_max_x = 0usize;
        let mut index_min_x = 0usize;
        let mut index_max_y = 0usize;
        let mut index_min_y = 0usize;
        for i in 1..count {
            if points[i][0] > points[index_max_x][0] {
                index_max_x = i;
            }
            if points[i][0] <= points[index_min_x][0] {
                index_min_x = i;
            }
            if points[i][1] > points[index_max_y][1] {
                index_max_y = i;
            }
            if points[i][1] <= points[index_min_y][1] {
                index_min_y = i;
            }
        }

        let slope = |a: usize, b: usize| -> f64 {
            let dx = points[a][0] - points[b][0];
            let dy = points[a][1] - points[b][1];
            if dx == 0.0 {
                f64::INFINITY
            } else {
                dy / dx
            }
        };

        let mut ordered: Vec<usize> = vec![index_max_x];
        let mut current = index_max_x;

        // Up the right side, steepest first.
        while current != index_max_y && ordered.len() < count {
            let mut next = index_max_y;
            for i in 0..count {
                if i == current || points[i][1] <= points[current][1] {
                    continue;
                }
                if slope(next, current).abs() < slope(i, current).abs() {
                    next = i;
                }
            }
            current = next;
            if ordered.contains(&current) {
                break;
            }
            ordered.push(current);
        }
        // Across the top, shallowest first.
        while current != index_min_x && ordered.len() < count {
            let mut next = index_min_x;
            for i in 0..count {
                if i == current || points[i][0] >= points[current][0] {
                    continue;
                }
                if slope(next, current).abs() > slope(i, current).abs() {
                    next = i;
                }
            }
            current = next;
            if ordered.contains(&current) {
                break;
            }
            ordered.push(current);
        }
        // Down the left side.
        while current != index_min_y && ordered.len() < count {
            let mut next = index_min_y;
            for i in 0..count {
                if i == current || points[i][1] >= points[current][1] {
                    continue;
                }
                if slope(next, current).abs() < slope(i, current).abs() {
                    next = i;
                }
            }
            current = next;
            if ordered.contains(&current) {
                break;
            }
            ordered.push(current);
        }
        // Back across the bottom to the start.
        while ordered.len() < count {
            let mut next = index_max_x;
            let mut found = false;
            for i in 0..count {
                if i == current || points[i][0] <= points[current][0] {
                    continue;
                }
                if !found || slope(next, current).abs() > slope(i, current).abs() {
                    next = i;
                    found = true;
                }
            }
            if !found || next == index_max_x || ordered.contains(&next) {
                break;
            }
            current = next;
            ordered.push(current);
        }

        let reordered: Vec<Vec<f64>> = ordered.into_iter().map(|i| points[i].clone()).collect();
        self.vertices = reordered;
    }
}

/// Activity pattern of one vertex: the case's boundary rows followed by
/// the 2n box rows of the free variables, true where the residual
/// vanishes within tolerance.
pub fn active_boundaries(
    case: &Case,
    lower: &VariablePool,
    upper: &VariablePool,
    free_names: &[String],
    vertex: &[f64],
) -> Result<Vec<bool>> {
    let block = case.boundaries().ok_or(Error::SingularSystem)?;
    if free_names.len() != vertex.len() {
        return Err(Error::WrongShapeOrDomain(
            "vertex dimension does not match the free variables".into(),
        ));
    }
    let xi = case.xi();
    let mut log_values = Matrix::new(xi.number_of_variables(), 1);
    for variable in xi.variables() {
        let name = variable.name();
        let index = xi.index_of_variable_with_name(name).expect("own pool");
        if let Some(position) = free_names.iter().position(|n| n == name) {
            log_values.set(index, 0, vertex[position]);
        } else if let Some(value) = lower.value_for_variable_with_name(name) {
            log_values.set(index, 0, value.log10());
        } else {
            return Err(Error::NotFound(format!("variable `{name}`")));
        }
    }
    let residuals = block.residuals(&log_values)?;
    let mut active: Vec<bool> = (0..residuals.rows())
        .map(|i| residuals.value(i, 0).abs() < ZERO_TOLERANCE)
        .collect();
    for (position, name) in free_names.iter().enumerate() {
        let low = lower
            .value_for_variable_with_name(name)
            .ok_or_else(|| Error::NotFound(format!("variable `{name}`")))?;
        let high = upper
            .value_for_variable_with_name(name)
            .ok_or_else(|| Error::NotFound(format!("variable `{name}`")))?;
        active.push((vertex[position] - low.log10()).abs() < ZERO_TOLERANCE);
        active.push((vertex[position] - high.log10()).abs() < ZERO_TOLERANCE);
    }
    Ok(active)
}

/// Adjacency of vertices by shared active boundaries: entry `(i, j)` is 1
/// when the two vertices lie on at least `dimensions - 1` common
/// boundaries.
pub fn connectivity_matrix(actives: &[Vec<bool>], dimensions: usize) -> Matrix {
    let count = actives.len();
    let mut connectivity = Matrix::new(count, count);
    for i in 0..count {
        for j in i + 1..count {
            let shared = actives[i]
                .iter()
                .zip(&actives[j])
                .filter(|(a, b)| **a && **b)
                .count();
            let connected = if shared + 1 >= dimensions { 1.0 } else { 0.0 };
            connectivity.set(i, j, connected);
            connectivity.set(j, i, connected);
        }
    }
    connectivity
}

/// Faces of a 3D vertex set, one closed loop per boundary carrying at
/// least one vertex. Each face matrix lists its vertices in walking
/// order, the first repeated at the end.
pub fn faces_3d(
    case: &Case,
    vertices: &Vertices,
    lower: &VariablePool,
    upper: &VariablePool,
    free_names: &[String],
) -> Result<MatrixArray> {
    if vertices.dimensions() != 3 || free_names.len() != 3 {
        return Err(Error::WrongShapeOrDomain(
            "faces require a three-variable slice".into(),
        ));
    }
    let actives: Vec<Vec<bool>> = vertices
        .iter()
        .map(|v| active_boundaries(case, lower, upper, free_names, v))
        .collect::<Result<_>>()?;
    let connectivity = connectivity_matrix(&actives, 3);
    let boundary_count = actives.first().map_or(0, |a| a.len());

    let mut faces = MatrixArray::new();
    for boundary in 0..boundary_count {
        let members: Vec<usize> = (0..vertices.len())
            .filter(|&v| actives[v][boundary])
            .collect();
        if members.is_empty() {
            continue;
        }
        let mut face = Matrix::new(members.len() + 1, 3);
        // Walk adjacent members; remembering the previous index prevents
        // an immediate backtrack.
        let mut at = 0usize;
        let mut previous = members.len();
        for row in 0..members.len() {
            let vertex = vertices.vertex(members[at]);
            for k in 0..3 {
                face.set(row, k, vertex[k]);
            }
            for (candidate, &member) in members.iter().enumerate() {
                if candidate == at || candidate == previous {
                    continue;
                }
                if connectivity.value(members[at], member) == 1.0 {
                    previous = at;
                    at = candidate;
                    break;
                }
            }
        }
        let first = vertices.vertex(members[0]);
        for k in 0..3 {
            face.set(members.len(), k, first[k]);
        }
        faces.push(face);
    }
    Ok(faces)
}
