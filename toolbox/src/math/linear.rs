use crate::math::matrix::Matrix;
use crate::primitives::consts::SINGULAR_TOLERANCE;

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when `a` is singular within tolerance; callers treat a
/// singular reduced system as a cyclical-case candidate, not as a bug.
pub fn solve(a: &Matrix, b: &Matrix) -> Option<Matrix> {
    let n = a.rows();
    if n != a.cols() || b.rows() != n {
        return None;
    }
    let width = b.cols();
    let mut work = a.append_right(b).ok()?;

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot = work.value(col, col).abs();
        for row in col + 1..n {
            let candidate = work.value(row, col).abs();
            if candidate > pivot {
                pivot = candidate;
                pivot_row = row;
            }
        }
        if pivot < SINGULAR_TOLERANCE {
            return None;
        }
        if pivot_row != col {
            swap_rows(&mut work, pivot_row, col);
        }
        let diagonal = work.value(col, col);
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = work.value(row, col) / diagonal;
            if factor == 0.0 {
                continue;
            }
            for k in col..n + width {
                let v = work.value(row, k) - factor * work.value(col, k);
                work.set(row, k, v);
            }
        }
    }

    let mut out = Matrix::new(n, width);
    for row in 0..n {
        let diagonal = work.value(row, row);
        for k in 0..width {
            out.set(row, k, work.value(row, n + k) / diagonal);
        }
    }
    Some(out)
}

/// The inverse of a square matrix, or `None` when singular.
pub fn invert(a: &Matrix) -> Option<Matrix> {
    solve(a, &Matrix::identity(a.rows()))
}

/// A basis of the left null space of `a` (vectors `v` with `v^T a = 0`),
/// returned as rows. Empty when `a` has full row rank.
pub fn left_null_space(a: &Matrix) -> Vec<Vec<f64>> {
    // Row-reduce [a | I]; a zero row of the reduced `a` records, in the
    // identity half, the row combination that produced it, and those
    // combinations span the left null space.
    let m = a.rows();
    let n = a.cols();
    let mut work = a.append_right(&Matrix::identity(m)).expect("shape");

    let mut lead = 0usize;
    for col in 0..n {
        let mut pivot_row = lead;
        let mut pivot = 0.0f64;
        for row in lead..m {
            let candidate = work.value(row, col).abs();
            if candidate > pivot {
                pivot = candidate;
                pivot_row = row;
            }
        }
        if pivot < SINGULAR_TOLERANCE {
            continue;
        }
        if pivot_row != lead {
            swap_rows(&mut work, pivot_row, lead);
        }
        let diagonal = work.value(lead, col);
        for row in 0..m {
            if row == lead {
                continue;
            }
            let factor = work.value(row, col) / diagonal;
            if factor == 0.0 {
                continue;
            }
            for k in 0..n + m {
                let v = work.value(row, k) - factor * work.value(lead, k);
                work.set(row, k, v);
            }
        }
        lead += 1;
        if lead == m {
            break;
        }
    }

    let mut basis = Vec::new();
    for row in lead..m {
        let vector: Vec<f64> = (0..m).map(|k| work.value(row, n + k)).collect();
        basis.push(vector);
    }
    basis
}

fn swap_rows(matrix: &mut Matrix, a: usize, b: usize) {
    for col in 0..matrix.cols() {
        let tmp = matrix.value(a, col);
        matrix.set(a, col, matrix.value(b, col));
        matrix.set(b, col, tmp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_small_system() {
        let a = Matrix::from_rows(&[&[2.0, 1.0], &[1.0, 3.0]]).unwrap();
        let b = Matrix::column(&[5.0, 10.0]);
        let x = solve(&a, &b).unwrap();
        assert!((x.value(0, 0) - 1.0).abs() < 1e-12);
        assert!((x.value(1, 0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_times_original_is_identity() {
        let a = Matrix::from_rows(&[&[4.0, 7.0], &[2.0, 6.0]]).unwrap();
        let inv = invert(&a).unwrap();
        let product = a.times(&inv).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product.value(i, j) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn singular_matrix_is_detected() {
        let a = Matrix::from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]).unwrap();
        assert!(invert(&a).is_none());
        let basis = left_null_space(&a);
        assert_eq!(basis.len(), 1);
        let v = &basis[0];
        // v^T a = 0
        assert!((v[0] * 1.0 + v[1] * 2.0).abs() < 1e-9);
        assert!((v[0] * 2.0 + v[1] * 4.0).abs() < 1e-9);
    }

    #[test]
    fn full_rank_has_empty_left_null_space() {
        let a = Matrix::from_rows(&[&[1.0, 0.0], &[0.0, 1.0]]).unwrap();
        assert!(left_null_space(&a).is_empty());
    }

    #[test]
    fn left_null_space_captures_row_dependencies() {
        // Row 1 is twice row 0; the columns are independent, so only the
        // row relation (2, -1, 0) may appear.
        let a = Matrix::from_rows(&[&[1.0, 0.0], &[2.0, 0.0], &[0.0, 1.0]]).unwrap();
        let basis = left_null_space(&a);
        assert_eq!(basis.len(), 1);
        let v = &basis[0];
        for col in 0..2 {
            let dot: f64 = (0..3).map(|row| v[row] * a.value(row, col)).sum();
            assert!(dot.abs() < 1e-9);
        }
        assert!(v[2].abs() < 1e-9);
        assert!(v[0].abs() > 1e-9);
    }
}
