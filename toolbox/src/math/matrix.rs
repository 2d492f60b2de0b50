use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dense row-major matrix of doubles.
///
/// All boundary and exponent arithmetic of the toolbox runs through this
/// type; rows and columns are indexed from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// A `rows x cols` matrix of zeros.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    /// Builds a matrix from a row-major value buffer.
    pub fn from_values(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(Error::WrongShapeOrDomain(format!(
                "value buffer of length {} cannot fill a {}x{} matrix",
                values.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, values })
    }

    /// Builds a matrix from row slices; every row must have the same width.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        let mut values = Vec::with_capacity(height * width);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(Error::WrongShapeOrDomain(
                    "rows of unequal width".to_string(),
                ));
            }
            values.extend_from_slice(row);
        }
        Ok(Self {
            rows: height,
            cols: width,
            values,
        })
    }

    /// A column vector with the given entries.
    pub fn column(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            values: values.to_vec(),
        }
    }

    /// The identity matrix of dimension `n`.
    pub fn identity(n: usize) -> Self {
        let mut out = Self::new(n, n);
        for i in 0..n {
            out.set(i, i, 1.0);
        }
        out
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols);
        self.values[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols);
        self.values[row * self.cols + col] = value;
    }

    /// Borrows one row as a slice.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sets every entry to `value`.
    pub fn fill(&mut self, value: f64) {
        self.values.iter_mut().for_each(|v| *v = value);
    }

    /// Multiplies every entry by `factor` in place.
    pub fn scale(&mut self, factor: f64) {
        self.values.iter_mut().for_each(|v| *v *= factor);
    }

    /// Adds `other` entry-wise in place.
    pub fn add_assign_matrix(&mut self, other: &Matrix) -> Result<()> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(Error::WrongShapeOrDomain(format!(
                "cannot add {}x{} to {}x{}",
                other.rows, other.cols, self.rows, self.cols
            )));
        }
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        Ok(())
    }

    /// Matrix product `self * other`.
    pub fn times(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::WrongShapeOrDomain(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Matrix::new(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let lhs = self.value(i, k);
                if lhs == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    let v = out.value(i, j) + lhs * other.value(k, j);
                    out.set(i, j, v);
                }
            }
        }
        Ok(out)
    }

    /// Stacks `other` below `self`. Column counts must agree.
    pub fn append_below(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.cols {
            return Err(Error::WrongShapeOrDomain(format!(
                "cannot stack {} columns under {} columns",
                other.cols, self.cols
            )));
        }
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Ok(Matrix {
            rows: self.rows + other.rows,
            cols: self.cols,
            values,
        })
    }

    /// Places `other` to the right of `self`. Row counts must agree.
    pub fn append_right(&self, other: &Matrix) -> Result<Matrix> {
        if self.rows != other.rows {
            return Err(Error::WrongShapeOrDomain(format!(
                "cannot join {} rows beside {} rows",
                other.rows, self.rows
            )));
        }
        let mut out = Matrix::new(self.rows, self.cols + other.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(i, j, self.value(i, j));
            }
            for j in 0..other.cols {
                out.set(i, self.cols + j, other.value(i, j));
            }
        }
        Ok(out)
    }

    /// Copies the listed rows and columns, in the order given.
    pub fn submatrix(&self, rows: &[usize], cols: &[usize]) -> Result<Matrix> {
        for &r in rows {
            if r >= self.rows {
                return Err(Error::WrongShapeOrDomain(format!(
                    "row {} outside {}x{}",
                    r, self.rows, self.cols
                )));
            }
        }
        for &c in cols {
            if c >= self.cols {
                return Err(Error::WrongShapeOrDomain(format!(
                    "column {} outside {}x{}",
                    c, self.rows, self.cols
                )));
            }
        }
        let mut out = Matrix::new(rows.len(), cols.len());
        for (i, &r) in rows.iter().enumerate() {
            for (j, &c) in cols.iter().enumerate() {
                out.set(i, j, self.value(r, c));
            }
        }
        Ok(out)
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::new(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(j, i, self.value(i, j));
            }
        }
        out
    }

    /// True when every entry of `row` is below `tolerance` in magnitude.
    pub fn row_is_zero(&self, row: usize, tolerance: f64) -> bool {
        self.row(row).iter().all(|v| v.abs() <= tolerance)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{}", self.value(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_matches_hand_computation() {
        let a = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[&[5.0, 6.0], &[7.0, 8.0]]).unwrap();
        let c = a.times(&b).unwrap();
        assert_eq!(c.row(0), &[19.0, 22.0]);
        assert_eq!(c.row(1), &[43.0, 50.0]);
    }

    #[test]
    fn append_below_and_right() {
        let a = Matrix::from_rows(&[&[1.0, 2.0]]).unwrap();
        let b = Matrix::from_rows(&[&[3.0, 4.0]]).unwrap();
        let stacked = a.append_below(&b).unwrap();
        assert_eq!(stacked.rows(), 2);
        assert_eq!(stacked.row(1), &[3.0, 4.0]);

        let joined = a.append_right(&b).unwrap();
        assert_eq!(joined.cols(), 4);
        assert_eq!(joined.row(0), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let a = Matrix::new(2, 3);
        let b = Matrix::new(2, 2);
        assert!(a.append_below(&b).is_err());
        assert!(a.times(&b).is_err());
    }

    #[test]
    fn submatrix_reorders() {
        let a = Matrix::from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
        let s = a.submatrix(&[1, 0], &[2, 0]).unwrap();
        assert_eq!(s.row(0), &[6.0, 4.0]);
        assert_eq!(s.row(1), &[3.0, 1.0]);
    }
}
