use crate::math::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// An ordered collection of matrices addressable as `array[i][(j, k)]`.
///
/// The exponent tensors of a GMA system are ragged (one matrix per
/// equation, each with its own row count), which is why they are stored
/// here instead of in one three-dimensional block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixArray {
    matrices: Vec<Matrix>,
}

impl MatrixArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, matrix: Matrix) {
        self.matrices.push(matrix);
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn matrix(&self, index: usize) -> &Matrix {
        &self.matrices[index]
    }

    /// The scalar at matrix `i`, row `j`, column `k`.
    pub fn value(&self, i: usize, j: usize, k: usize) -> f64 {
        self.matrices[i].value(j, k)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Matrix> {
        self.matrices.iter()
    }
}

impl Index<usize> for MatrixArray {
    type Output = Matrix;

    fn index(&self, index: usize) -> &Matrix {
        &self.matrices[index]
    }
}

impl FromIterator<Matrix> for MatrixArray {
    fn from_iter<T: IntoIterator<Item = Matrix>>(iter: T) -> Self {
        Self {
            matrices: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_access() {
        let mut array = MatrixArray::new();
        array.push(Matrix::from_rows(&[&[1.0, 2.0]]).unwrap());
        array.push(Matrix::from_rows(&[&[3.0], &[4.0]]).unwrap());
        assert_eq!(array.len(), 2);
        assert_eq!(array.value(0, 0, 1), 2.0);
        assert_eq!(array[1].value(1, 0), 4.0);
    }
}
