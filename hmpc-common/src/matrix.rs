use crate::field::{batch_inverse, FieldElement, MersennePrime};
use itertools::izip;
use num_traits::{One, Zero};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Index, IndexMut, Neg, Sub, SubAssign};

/// Row-major matrix of field elements. All batched protocol state (shares,
/// opened secrets, bit decompositions) lives in this type; the flat `data`
/// vector doubles as the wire representation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Matrix<T: MersennePrime> {
    rows: usize,
    cols: usize,
    data: Vec<FieldElement<T>>,
}

impl<T: MersennePrime> Matrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![FieldElement::zero(); rows * cols],
        }
    }

    pub fn constant(rows: usize, cols: usize, value: FieldElement<T>) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::constant(rows, cols, FieldElement::one())
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<FieldElement<T>>) -> Self {
        assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> FieldElement<T>) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Self
    where
        Standard: Distribution<T>,
    {
        let data = (0..rows * cols)
            .map(|_| FieldElement::random(rng))
            .collect();
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[FieldElement<T>] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [FieldElement<T>] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<FieldElement<T>> {
        self.data
    }

    pub fn row(&self, i: usize) -> &[FieldElement<T>] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [FieldElement<T>] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Contiguous view of `n_rows` rows starting at `start`, used to pack
    /// row blocks onto the wire without copying.
    pub fn row_block(&self, start: usize, n_rows: usize) -> &[FieldElement<T>] {
        &self.data[start * self.cols..(start + n_rows) * self.cols]
    }

    pub fn set_row_block(&mut self, start: usize, block: &[FieldElement<T>]) {
        debug_assert_eq!(block.len() % self.cols.max(1), 0);
        self.data[start * self.cols..start * self.cols + block.len()].copy_from_slice(block);
    }

    pub fn col(&self, j: usize) -> Vec<FieldElement<T>> {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    pub fn set_col(&mut self, j: usize, values: &[FieldElement<T>]) {
        debug_assert_eq!(values.len(), self.rows);
        for (i, v) in values.iter().enumerate() {
            self[(i, j)] = *v;
        }
    }

    /// Copy of columns `start..end`.
    pub fn col_range(&self, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= self.cols);
        Self::from_fn(self.rows, end - start, |i, j| self[(i, start + j)])
    }

    /// Horizontal concatenation.
    pub fn hcat(&self, rhs: &Self) -> Self {
        assert_eq!(self.rows, rhs.rows);
        Self::from_fn(self.rows, self.cols + rhs.cols, |i, j| {
            if j < self.cols {
                self[(i, j)]
            } else {
                rhs[(i, j - self.cols)]
            }
        })
    }

    /// Vertical concatenation.
    pub fn vcat(&self, rhs: &Self) -> Self {
        assert_eq!(self.cols, rhs.cols);
        let mut data = self.data.clone();
        data.extend_from_slice(&rhs.data);
        Self::from_vec(self.rows + rhs.rows, self.cols, data)
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self[(j, i)])
    }

    pub fn reverse_cols(&self) -> Self {
        Self::from_fn(self.rows, self.cols, |i, j| self[(i, self.cols - 1 - j)])
    }

    pub fn map(&self, f: impl Fn(FieldElement<T>) -> FieldElement<T>) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&e| f(e)).collect(),
        }
    }

    /// Matrix product.
    pub fn matmul(&self, rhs: &Self) -> Self {
        assert_eq!(self.cols, rhs.rows);
        let mut out = Self::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self[(i, k)];
                if a.is_zero() {
                    continue;
                }
                for j in 0..rhs.cols {
                    out[(i, j)] += a * rhs[(k, j)];
                }
            }
        }
        out
    }

    /// Elementwise product.
    pub fn hadamard(&self, rhs: &Self) -> Self {
        assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        let data = izip!(&self.data, &rhs.data).map(|(&a, &b)| a * b).collect();
        Self {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    pub fn scale(&self, factor: FieldElement<T>) -> Self {
        self.map(|e| e * factor)
    }

    pub fn add_scalar(&self, value: FieldElement<T>) -> Self {
        self.map(|e| e + value)
    }

    /// Dot product of two equal-length element slices.
    pub fn dot(a: &[FieldElement<T>], b: &[FieldElement<T>]) -> FieldElement<T> {
        debug_assert_eq!(a.len(), b.len());
        izip!(a, b).fold(FieldElement::zero(), |acc, (&x, &y)| acc + x * y)
    }

    /// Signed truncation of every entry by `d` bits.
    pub fn truncate_each(&self, d: u32) -> Self {
        self.map(|e| e.truncate(d))
    }

    /// Sign bit of every entry as a 0/1 field element.
    pub fn msb_each(&self) -> Self {
        self.map(|e| e.msb())
    }

    /// Batched inversion of every entry; entries must be non-zero.
    pub fn batch_inverse(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: batch_inverse(&self.data),
        }
    }

    /// Running products along each row: out[i][j] = prod_{k<=j} self[i][k].
    pub fn prefix_products(&self) -> Self {
        let mut out = self.clone();
        for i in 0..self.rows {
            let row = out.row_mut(i);
            for j in 1..row.len() {
                row[j] = row[j - 1] * row[j];
            }
        }
        out
    }

    /// LSB-first binary decomposition of each entry of a column vector into
    /// `bit_len` columns of 0/1 elements.
    pub fn decompose_bits(values: &[FieldElement<T>], bit_len: u32) -> Self {
        Self::from_fn(values.len(), bit_len as usize, |i, j| {
            values[i].bit(j as u32)
        })
    }

    /// Weights `[1, 2, 4, ..., 2^(bit_len-1)]` as a column vector, the
    /// recomposition dual of [`Self::decompose_bits`].
    pub fn bit_weights(bit_len: u32) -> Self {
        let mut w = FieldElement::<T>::one();
        Self::from_fn(bit_len as usize, 1, |_, _| {
            let cur = w;
            w = w + w;
            cur
        })
    }
}

impl<T: MersennePrime> Index<(usize, usize)> for Matrix<T> {
    type Output = FieldElement<T>;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[i * self.cols + j]
    }
}

impl<T: MersennePrime> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        debug_assert!(i < self.rows && j < self.cols);
        &mut self.data[i * self.cols + j]
    }
}

impl<T: MersennePrime> Add<&Matrix<T>> for &Matrix<T> {
    type Output = Matrix<T>;

    fn add(self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        let data = izip!(&self.data, &rhs.data).map(|(&a, &b)| a + b).collect();
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

impl<T: MersennePrime> Sub<&Matrix<T>> for &Matrix<T> {
    type Output = Matrix<T>;

    fn sub(self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        let data = izip!(&self.data, &rhs.data).map(|(&a, &b)| a - b).collect();
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

impl<T: MersennePrime> AddAssign<&Matrix<T>> for Matrix<T> {
    fn add_assign(&mut self, rhs: &Matrix<T>) {
        assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        for (a, b) in izip!(&mut self.data, &rhs.data) {
            *a += b;
        }
    }
}

impl<T: MersennePrime> SubAssign<&Matrix<T>> for Matrix<T> {
    fn sub_assign(&mut self, rhs: &Matrix<T>) {
        assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        for (a, b) in izip!(&mut self.data, &rhs.data) {
            *a -= b;
        }
    }
}

impl<T: MersennePrime> Neg for &Matrix<T> {
    type Output = Matrix<T>;

    fn neg(self) -> Matrix<T> {
        self.map(|e| -e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type F = FieldElement<u64>;

    fn ints(values: &[i64]) -> Vec<F> {
        values.iter().map(|&v| F::from_int(v)).collect()
    }

    #[test]
    fn matmul_and_hadamard() {
        let a = Matrix::from_vec(2, 2, ints(&[1, 2, 3, 4]));
        let b = Matrix::from_vec(2, 2, ints(&[5, 6, 7, 8]));
        assert_eq!(a.matmul(&b), Matrix::from_vec(2, 2, ints(&[19, 22, 43, 50])));
        assert_eq!(a.hadamard(&b), Matrix::from_vec(2, 2, ints(&[5, 12, 21, 32])));
        assert_eq!(&a + &b, Matrix::from_vec(2, 2, ints(&[6, 8, 10, 12])));
        assert_eq!(&b - &a, Matrix::from_vec(2, 2, ints(&[4, 4, 4, 4])));
        assert_eq!(a.transpose(), Matrix::from_vec(2, 2, ints(&[1, 3, 2, 4])));
    }

    #[test]
    fn bit_decomposition_roundtrip() {
        let values = ints(&[0, 1, 6, 127, 1 << 20]);
        let bits = Matrix::<u64>::decompose_bits(&values, 61);
        for e in bits.data() {
            assert!(e.is_zero() || *e == F::from_int(1));
        }
        let weights = Matrix::<u64>::bit_weights(61);
        let recomposed = bits.matmul(&weights);
        assert_eq!(recomposed.into_data(), values);
    }

    #[test]
    fn prefix_products_run_along_rows() {
        let m = Matrix::from_vec(2, 3, ints(&[2, 3, 4, 1, 5, 7]));
        let p = m.prefix_products();
        assert_eq!(p, Matrix::from_vec(2, 3, ints(&[2, 6, 24, 1, 5, 35])));
        assert_eq!(
            m.reverse_cols(),
            Matrix::from_vec(2, 3, ints(&[4, 3, 2, 7, 5, 1]))
        );
    }

    #[test]
    fn row_blocks_pack_and_unpack() {
        let m = Matrix::from_vec(3, 2, ints(&[1, 2, 3, 4, 5, 6]));
        let block = m.row_block(1, 2).to_vec();
        let mut out = Matrix::zeros(3, 2);
        out.set_row_block(1, &block);
        assert_eq!(out.row(0), ints(&[0, 0]).as_slice());
        assert_eq!(out.row(1), ints(&[3, 4]).as_slice());
        assert_eq!(out.row(2), ints(&[5, 6]).as_slice());
    }

    #[test]
    fn batch_inverse_matches_scalar_inverse() {
        let m = Matrix::from_vec(2, 2, ints(&[2, 3, 5, 7]));
        let inv = m.batch_inverse();
        for (a, b) in m.data().iter().zip(inv.data()) {
            assert_eq!(*a * *b, F::from_int(1));
        }
    }
}
