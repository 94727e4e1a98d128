use hmpc_common::{FieldElement, Matrix, MersennePrime};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Degree of the sharing polynomial. Secrets live at degree t; raw products
/// of two degree-t sharings live at degree 2t until reduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Degree {
    T,
    TwoT,
}

impl Degree {
    /// Polynomial degree for a given threshold.
    pub fn size(self, threshold: usize) -> usize {
        match self {
            Degree::T => threshold,
            Degree::TwoT => 2 * threshold,
        }
    }

    pub fn doubled(self) -> Degree {
        debug_assert_eq!(self, Degree::T);
        Degree::TwoT
    }

    pub fn halved(self) -> Degree {
        debug_assert_eq!(self, Degree::TwoT);
        Degree::T
    }
}

/// One party's shares of a `rows x cols` matrix of secrets.
///
/// Linear operations are local: sums of sharings, and sums and products
/// with public constants, act entrywise on the share matrix. Entrywise
/// products of two degree-t bundles are local too but land at degree 2t.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ShareBundle<T: MersennePrime> {
    pub shares: Matrix<T>,
    pub degree: Degree,
}

impl<T: MersennePrime> ShareBundle<T> {
    pub fn zeros(rows: usize, cols: usize, degree: Degree) -> Self {
        ShareBundle {
            shares: Matrix::zeros(rows, cols),
            degree,
        }
    }

    pub fn from_parts(shares: Matrix<T>, degree: Degree) -> Self {
        ShareBundle { shares, degree }
    }

    pub fn rows(&self) -> usize {
        self.shares.rows()
    }

    pub fn cols(&self) -> usize {
        self.shares.cols()
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Entrywise product of two degree-t bundles; the result carries
    /// degree 2t and must be reduced before further multiplication.
    pub fn mul_local(&self, rhs: &Self) -> Self {
        debug_assert_eq!(rhs.degree, Degree::T);
        ShareBundle {
            shares: self.shares.hadamard(&rhs.shares),
            degree: self.degree.doubled(),
        }
    }

    /// Entrywise square, landing at degree 2t.
    pub fn square_local(&self) -> Self {
        ShareBundle {
            shares: self.shares.hadamard(&self.shares),
            degree: self.degree.doubled(),
        }
    }

    /// Adds a public constant matrix; every party applies it.
    pub fn add_public(&self, constants: &Matrix<T>) -> Self {
        ShareBundle {
            shares: &self.shares + constants,
            degree: self.degree,
        }
    }

    pub fn add_public_scalar(&self, constant: FieldElement<T>) -> Self {
        ShareBundle {
            shares: self.shares.add_scalar(constant),
            degree: self.degree,
        }
    }

    /// Entrywise product with a public constant matrix.
    pub fn mul_public(&self, constants: &Matrix<T>) -> Self {
        ShareBundle {
            shares: self.shares.hadamard(constants),
            degree: self.degree,
        }
    }

    pub fn scale(&self, factor: FieldElement<T>) -> Self {
        ShareBundle {
            shares: self.shares.scale(factor),
            degree: self.degree,
        }
    }

    /// Copy of a column range as its own bundle.
    pub fn col_range(&self, start: usize, end: usize) -> Self {
        ShareBundle {
            shares: self.shares.col_range(start, end),
            degree: self.degree,
        }
    }

    pub fn vcat(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.degree, rhs.degree);
        ShareBundle {
            shares: self.shares.vcat(&rhs.shares),
            degree: self.degree,
        }
    }

    pub fn hcat(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.degree, rhs.degree);
        ShareBundle {
            shares: self.shares.hcat(&rhs.shares),
            degree: self.degree,
        }
    }
}

impl<T: MersennePrime> Add<&ShareBundle<T>> for &ShareBundle<T> {
    type Output = ShareBundle<T>;

    fn add(self, rhs: &ShareBundle<T>) -> ShareBundle<T> {
        debug_assert_eq!(self.degree, rhs.degree);
        ShareBundle {
            shares: &self.shares + &rhs.shares,
            degree: self.degree,
        }
    }
}

impl<T: MersennePrime> Sub<&ShareBundle<T>> for &ShareBundle<T> {
    type Output = ShareBundle<T>;

    fn sub(self, rhs: &ShareBundle<T>) -> ShareBundle<T> {
        debug_assert_eq!(self.degree, rhs.degree);
        ShareBundle {
            shares: &self.shares - &rhs.shares,
            degree: self.degree,
        }
    }
}

impl<T: MersennePrime> AddAssign<&ShareBundle<T>> for ShareBundle<T> {
    fn add_assign(&mut self, rhs: &ShareBundle<T>) {
        debug_assert_eq!(self.degree, rhs.degree);
        self.shares += &rhs.shares;
    }
}

impl<T: MersennePrime> SubAssign<&ShareBundle<T>> for ShareBundle<T> {
    fn sub_assign(&mut self, rhs: &ShareBundle<T>) {
        debug_assert_eq!(self.degree, rhs.degree);
        self.shares -= &rhs.shares;
    }
}

impl<T: MersennePrime> Neg for &ShareBundle<T> {
    type Output = ShareBundle<T>;

    fn neg(self) -> ShareBundle<T> {
        ShareBundle {
            shares: -&self.shares,
            degree: self.degree,
        }
    }
}

/// A bundle whose secrets are all 0 or 1. The wrapper only documents the
/// invariant; the bit protocols in [`crate::protocol`] preserve it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BitBundle<T: MersennePrime>(pub ShareBundle<T>);

impl<T: MersennePrime> BitBundle<T> {
    pub fn rows(&self) -> usize {
        self.0.rows()
    }

    pub fn cols(&self) -> usize {
        self.0.cols()
    }

    /// `1 - [b]`, the complement of each bit.
    pub fn complement(&self) -> Self {
        BitBundle(ShareBundle {
            shares: self.0.shares.map(|s| FieldElement::from_int(1) - s),
            degree: self.0.degree,
        })
    }

    pub fn col_range(&self, start: usize, end: usize) -> Self {
        BitBundle(self.0.col_range(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(values: &[i64], degree: Degree) -> ShareBundle<u64> {
        let shares = Matrix::from_vec(
            1,
            values.len(),
            values.iter().map(|&v| FieldElement::from_int(v)).collect(),
        );
        ShareBundle::from_parts(shares, degree)
    }

    #[test]
    fn linear_ops_are_entrywise() {
        let a = bundle(&[1, 2, 3], Degree::T);
        let b = bundle(&[10, 20, 30], Degree::T);
        assert_eq!(&a + &b, bundle(&[11, 22, 33], Degree::T));
        assert_eq!(&b - &a, bundle(&[9, 18, 27], Degree::T));
        assert_eq!(a.scale(FieldElement::from_int(-2)), bundle(&[-2, -4, -6], Degree::T));
    }

    #[test]
    fn local_products_double_the_degree() {
        let a = bundle(&[2, 3, 4], Degree::T);
        let b = bundle(&[5, 6, 7], Degree::T);
        let prod = a.mul_local(&b);
        assert_eq!(prod, bundle(&[10, 18, 28], Degree::TwoT));
        assert_eq!(a.square_local().degree, Degree::TwoT);
    }
}
