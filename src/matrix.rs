//! Dense f64 matrix with row-major storage.
//!
//! `Matrix` is the numeric workhorse of this crate. It keeps its elements in
//! a single contiguous buffer (`data.len() == rows * cols`) and exposes two
//! kinds of operations:
//!
//! - Queries (`row`, `columns`, `sum`, `determinant`, ...) return fresh
//!   values and never alias the source buffer.
//! - Commands (`add`, `multiply`, `transpose`, `append_*`, ...) mutate the
//!   receiver in place and return `&mut Self` so calls can be chained.
//!
//! Shape-sensitive commands validate their operands and return
//! [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) instead of
//! producing wrong-shaped output.
//!
//! Matrix-matrix products route through the crate's GEMM kernel, which uses
//! `matrixmultiply` when that feature is enabled and a portable triple loop
//! otherwise; both produce the same results.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::matmul;
use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Builds a matrix from nested rows.
    ///
    /// An empty slice yields a 0x0 matrix. Every row must have the same
    /// length as the first one.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let row_count = rows.len();
        let col_count = if row_count > 0 { rows[0].len() } else { 0 };

        let mut data = Vec::with_capacity(row_count * col_count);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != col_count {
                return Err(Error::DimensionMismatch(format!(
                    "row {i} has {} columns, expected {col_count}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            data,
            rows: row_count,
            cols: col_count,
        })
    }

    /// Builds a matrix from a flat row-major buffer with shape `(rows, cols)`.
    pub fn from_flat(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::DimensionMismatch(format!(
                "buffer of length {} cannot hold a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Self { data, rows, cols })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![1.0; rows * cols],
            rows,
            cols,
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut data = vec![0.0; size * size];
        for i in 0..size {
            data[i * size + i] = 1.0;
        }
        Self {
            data,
            rows: size,
            cols: size,
        }
    }

    /// Builds a single-column matrix from a slice of elements.
    pub fn column_vector(elements: &[f64]) -> Self {
        Self {
            data: elements.to_vec(),
            rows: elements.len(),
            cols: 1,
        }
    }

    /// Builds a matrix with elements drawn uniformly from `[-epsilon, epsilon)`.
    ///
    /// Pass a seed for deterministic output.
    pub fn rand(rows: usize, cols: usize, epsilon: f64, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                Self::rand_with_rng(rows, cols, epsilon, &mut rng)
            }
            None => Self::rand_with_rng(rows, cols, epsilon, &mut rand::rng()),
        }
    }

    /// Builds a uniformly random matrix using the provided RNG.
    pub fn rand_with_rng<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        epsilon: f64,
        rng: &mut R,
    ) -> Self {
        let data = (0..rows * cols)
            .map(|_| rng.random::<f64>() * 2.0 * epsilon - epsilon)
            .collect();
        Self { data, rows, cols }
    }

    /* Queries */

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.cols
    }

    /// Returns the element at `(row, col)` using row-major indexing.
    ///
    /// Bounds are checked by a debug assertion only; release builds trust
    /// the caller.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    /// Returns the underlying row-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Exports the matrix as nested rows (pure, non-mutating).
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.cols.max(1)).map(<[f64]>::to_vec).collect()
    }

    /// Returns row `row` as a new 1xC matrix (copy, never aliased).
    ///
    /// Panics if `row` is out of range; so do the other row/column range
    /// queries below.
    pub fn row(&self, row: usize) -> Self {
        let start = row * self.cols;
        Self {
            data: self.data[start..start + self.cols].to_vec(),
            rows: 1,
            cols: self.cols,
        }
    }

    /// Returns the listed rows, in the given order, as a new matrix.
    pub fn rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &row in indices {
            let start = row * self.cols;
            data.extend_from_slice(&self.data[start..start + self.cols]);
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Returns the contiguous row range `range` as a new matrix.
    pub fn slice_rows(&self, range: std::ops::Range<usize>) -> Self {
        let start = range.start * self.cols;
        let end = range.end * self.cols;
        Self {
            data: self.data[start..end].to_vec(),
            rows: range.len(),
            cols: self.cols,
        }
    }

    /// Returns column `col` as a new Rx1 matrix.
    pub fn column(&self, col: usize) -> Self {
        self.columns(col..col + 1)
    }

    /// Returns the contiguous column range `range` as a new matrix.
    pub fn columns(&self, range: std::ops::Range<usize>) -> Self {
        let new_cols = range.len();
        let mut data = Vec::with_capacity(self.rows * new_cols);
        for row in 0..self.rows {
            let start = row * self.cols + range.start;
            data.extend_from_slice(&self.data[start..start + new_cols]);
        }
        Self {
            data,
            rows: self.rows,
            cols: new_cols,
        }
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Largest element, or negative infinity for an empty matrix.
    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest element, or positive infinity for an empty matrix.
    pub fn min_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Per-row argmax: an Rx1 matrix holding, for each row, the column index
    /// of its largest element. Ties resolve to the lowest column index.
    /// A row with no columns yields -1.
    pub fn max_row_indices(&self) -> Self {
        let mut data = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let mut max_value = f64::NEG_INFINITY;
            let mut max_index = -1.0;
            for col in 0..self.cols {
                let value = self.data[row * self.cols + col];
                if value > max_value {
                    max_value = value;
                    max_index = col as f64;
                }
            }
            data.push(max_index);
        }
        Self {
            data,
            rows: self.rows,
            cols: 1,
        }
    }

    /// Determinant by Laplace expansion along the first row.
    ///
    /// This is exponential in the matrix size and intended for small
    /// matrices only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a non-square matrix.
    pub fn determinant(&self) -> Result<f64> {
        if self.rows != self.cols {
            return Err(Error::DimensionMismatch(format!(
                "cannot compute the determinant of a {}x{} matrix; it must be square",
                self.rows, self.cols
            )));
        }
        Ok(self.det_square())
    }

    /// Inverse via the adjoint: transpose of the cofactor matrix, scaled by
    /// `1 / determinant`. Same small-matrix caveat as [`Matrix::determinant`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a non-square matrix and
    /// [`Error::SingularMatrix`] when the determinant is exactly zero.
    pub fn inverse(&self) -> Result<Self> {
        if self.rows != self.cols {
            return Err(Error::DimensionMismatch(format!(
                "cannot invert a {}x{} matrix; it must be square",
                self.rows, self.cols
            )));
        }

        let determinant = self.det_square();
        if determinant == 0.0 {
            return Err(Error::SingularMatrix(format!(
                "cannot invert a {}x{} matrix with a zero determinant",
                self.rows, self.cols
            )));
        }

        // adjoint[j][i] = cofactor(i, j)
        let size = self.rows;
        let mut adjoint = Self::zeros(size, size);
        for i in 0..size {
            for j in 0..size {
                adjoint.set(j, i, self.cofactor(i, j));
            }
        }
        adjoint.multiply_scalar(1.0 / determinant);
        Ok(adjoint)
    }

    /* Commands */

    /// Writes `value` at `(row, col)` and returns the receiver.
    ///
    /// Bounds are checked by a debug assertion only; release builds trust
    /// the caller.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> &mut Self {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
        self
    }

    /// Concatenates `other`'s columns to the left of the receiver's.
    ///
    /// A 0-row receiver adopts `other`'s shape and data; otherwise the row
    /// counts must match.
    pub fn append_left(&mut self, other: &Matrix) -> Result<&mut Self> {
        if self.rows == 0 {
            *self = other.clone();
            return Ok(self);
        }
        if self.rows != other.rows {
            return Err(Error::DimensionMismatch(format!(
                "cannot append a matrix with {} rows beside a matrix with {} rows",
                other.rows, self.rows
            )));
        }

        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for row in 0..self.rows {
            let other_start = row * other.cols;
            let this_start = row * self.cols;
            data.extend_from_slice(&other.data[other_start..other_start + other.cols]);
            data.extend_from_slice(&self.data[this_start..this_start + self.cols]);
        }

        self.data = data;
        self.cols = cols;
        Ok(self)
    }

    /// Concatenates `other`'s columns to the right of the receiver's.
    ///
    /// A 0-row receiver adopts `other`'s shape and data; otherwise the row
    /// counts must match.
    pub fn append_right(&mut self, other: &Matrix) -> Result<&mut Self> {
        if self.rows == 0 {
            *self = other.clone();
            return Ok(self);
        }
        if self.rows != other.rows {
            return Err(Error::DimensionMismatch(format!(
                "cannot append a matrix with {} rows beside a matrix with {} rows",
                other.rows, self.rows
            )));
        }

        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for row in 0..self.rows {
            let this_start = row * self.cols;
            let other_start = row * other.cols;
            data.extend_from_slice(&self.data[this_start..this_start + self.cols]);
            data.extend_from_slice(&other.data[other_start..other_start + other.cols]);
        }

        self.data = data;
        self.cols = cols;
        Ok(self)
    }

    /// Stacks `other`'s rows above the receiver's.
    ///
    /// A 0-row receiver adopts `other`'s shape and data; otherwise the column
    /// counts must match.
    pub fn append_top(&mut self, other: &Matrix) -> Result<&mut Self> {
        if self.rows == 0 {
            *self = other.clone();
            return Ok(self);
        }
        if self.cols != other.cols {
            return Err(Error::DimensionMismatch(format!(
                "cannot stack a matrix with {} columns onto a matrix with {} columns",
                other.cols, self.cols
            )));
        }

        let mut data = Vec::with_capacity((self.rows + other.rows) * self.cols);
        data.extend_from_slice(&other.data);
        data.extend_from_slice(&self.data);

        self.data = data;
        self.rows += other.rows;
        Ok(self)
    }

    /// Stacks `other`'s rows below the receiver's.
    ///
    /// A 0-row receiver adopts `other`'s shape and data; otherwise the column
    /// counts must match.
    pub fn append_bottom(&mut self, other: &Matrix) -> Result<&mut Self> {
        if self.rows == 0 {
            *self = other.clone();
            return Ok(self);
        }
        if self.cols != other.cols {
            return Err(Error::DimensionMismatch(format!(
                "cannot stack a matrix with {} columns onto a matrix with {} columns",
                other.cols, self.cols
            )));
        }

        self.data.extend_from_slice(&other.data);
        self.rows += other.rows;
        Ok(self)
    }

    /// Deletes the listed rows, preserving the order of the remaining rows.
    ///
    /// The indices must be in range and free of duplicates; both faults are
    /// rejected before anything is mutated.
    pub fn delete_rows(&mut self, indices: &[usize]) -> Result<&mut Self> {
        self.check_row_indices(indices)?;

        let mut data = Vec::with_capacity((self.rows - indices.len()) * self.cols);
        for row in 0..self.rows {
            if indices.contains(&row) {
                continue;
            }
            let start = row * self.cols;
            data.extend_from_slice(&self.data[start..start + self.cols]);
        }

        self.rows -= indices.len();
        self.data = data;
        Ok(self)
    }

    /// Removes the listed rows and returns them as a new matrix, in the
    /// given index order. Same index requirements as
    /// [`Matrix::delete_rows`].
    pub fn remove_rows(&mut self, indices: &[usize]) -> Result<Matrix> {
        self.check_row_indices(indices)?;
        let removed = self.rows(indices);
        self.delete_rows(indices)?;
        Ok(removed)
    }

    /// Transposes in place: buffer and dimensions are both replaced.
    pub fn transpose(&mut self) -> &mut Self {
        let mut data = vec![0.0; self.data.len()];
        for row in 0..self.rows {
            for col in 0..self.cols {
                data[col * self.rows + row] = self.data[row * self.cols + col];
            }
        }

        self.data = data;
        std::mem::swap(&mut self.rows, &mut self.cols);
        self
    }

    /// Elementwise sum with a same-shape matrix.
    pub fn add(&mut self, other: &Matrix) -> Result<&mut Self> {
        self.check_same_shape(other, "add")?;
        for (value, &operand) in self.data.iter_mut().zip(&other.data) {
            *value += operand;
        }
        Ok(self)
    }

    /// Adds `scalar` to every element.
    pub fn add_scalar(&mut self, scalar: f64) -> &mut Self {
        for value in &mut self.data {
            *value += scalar;
        }
        self
    }

    /// Elementwise difference with a same-shape matrix.
    pub fn subtract(&mut self, other: &Matrix) -> Result<&mut Self> {
        self.check_same_shape(other, "subtract")?;
        for (value, &operand) in self.data.iter_mut().zip(&other.data) {
            *value -= operand;
        }
        Ok(self)
    }

    /// Subtracts `scalar` from every element.
    pub fn subtract_scalar(&mut self, scalar: f64) -> &mut Self {
        self.add_scalar(-scalar)
    }

    /// Matrix product: replaces the receiver with `self * other`.
    ///
    /// The receiver's buffer is reallocated and its column count becomes
    /// `other.column_count()`. Inner dimensions must agree.
    pub fn multiply(&mut self, other: &Matrix) -> Result<&mut Self> {
        if self.cols != other.rows {
            return Err(Error::DimensionMismatch(format!(
                "cannot multiply a {}x{} matrix by a {}x{} matrix",
                self.rows, self.cols, other.rows, other.cols
            )));
        }

        let mut data = vec![0.0; self.rows * other.cols];
        if self.rows > 0 && other.cols > 0 && self.cols > 0 {
            matmul::gemm_f64(
                self.rows,
                other.cols,
                self.cols,
                1.0,
                &self.data,
                self.cols,
                1,
                &other.data,
                other.cols,
                1,
                0.0,
                &mut data,
                other.cols,
                1,
            );
        }

        self.data = data;
        self.cols = other.cols;
        Ok(self)
    }

    /// Scales every element by `scalar`.
    pub fn multiply_scalar(&mut self, scalar: f64) -> &mut Self {
        for value in &mut self.data {
            *value *= scalar;
        }
        self
    }

    /// Hadamard product with a same-shape matrix.
    pub fn multiply_element_wise(&mut self, other: &Matrix) -> Result<&mut Self> {
        self.check_same_shape(other, "multiply element-wise")?;
        for (value, &operand) in self.data.iter_mut().zip(&other.data) {
            *value *= operand;
        }
        Ok(self)
    }

    /// Applies `f(value, row, col)` to every element in place, traversing in
    /// row-major order.
    pub fn transform<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(f64, usize, usize) -> f64,
    {
        let mut index = 0;
        for row in 0..self.rows {
            for col in 0..self.cols {
                self.data[index] = f(self.data[index], row, col);
                index += 1;
            }
        }
        self
    }

    /* Helpers */

    fn check_row_indices(&self, indices: &[usize]) -> Result<()> {
        for (i, &row) in indices.iter().enumerate() {
            if row >= self.rows {
                return Err(Error::DimensionMismatch(format!(
                    "row index {row} out of range for a {}x{} matrix",
                    self.rows, self.cols
                )));
            }
            if indices[..i].contains(&row) {
                return Err(Error::InvalidData(format!("duplicate row index {row}")));
            }
        }
        Ok(())
    }

    fn check_same_shape(&self, other: &Matrix, operation: &str) -> Result<()> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(Error::DimensionMismatch(format!(
                "cannot {operation} a {}x{} matrix and a {}x{} matrix",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(())
    }

    // Determinant of a matrix already known to be square.
    fn det_square(&self) -> f64 {
        match self.rows {
            0 => 0.0,
            1 => self.data[0],
            2 => self.data[0] * self.data[3] - self.data[1] * self.data[2],
            _ => (0..self.cols)
                .map(|col| self.data[col] * self.cofactor(0, col))
                .sum(),
        }
    }

    fn cofactor(&self, row: usize, col: usize) -> f64 {
        let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
        sign * self.minor(row, col)
    }

    // Determinant of the submatrix formed by deleting `row` and `col`.
    fn minor(&self, row: usize, col: usize) -> f64 {
        if self.rows == 1 {
            return 1.0;
        }

        let size = self.rows - 1;
        let mut data = Vec::with_capacity(size * size);
        for i in 0..self.rows {
            if i == row {
                continue;
            }
            for j in 0..self.cols {
                if j == col {
                    continue;
                }
                data.push(self.data[i * self.cols + j]);
            }
        }

        let submatrix = Self {
            data,
            rows: size,
            cols: size,
        };
        submatrix.det_square()
    }
}
