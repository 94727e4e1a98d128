use crate::shares::bundle::{Degree, ShareBundle};
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// One party's share of a single secret. Scalar protocol operations wrap
/// the 1x1 bundle path so both forms stay in lockstep.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Sharing<T: MersennePrime> {
    pub share: FieldElement<T>,
    pub degree: Degree,
}

impl<T: MersennePrime> Sharing<T> {
    pub fn new(share: FieldElement<T>, degree: Degree) -> Self {
        Sharing { share, degree }
    }

    pub fn into_bundle(self) -> ShareBundle<T> {
        ShareBundle::from_parts(Matrix::from_vec(1, 1, vec![self.share]), self.degree)
    }

    pub fn from_bundle(bundle: &ShareBundle<T>) -> Self {
        debug_assert_eq!(bundle.len(), 1);
        Sharing {
            share: bundle.shares.data()[0],
            degree: bundle.degree,
        }
    }

    /// Local product with another degree-t sharing, landing at degree 2t.
    pub fn mul_local(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.degree, Degree::T);
        debug_assert_eq!(rhs.degree, Degree::T);
        Sharing {
            share: self.share * rhs.share,
            degree: Degree::TwoT,
        }
    }

    pub fn add_public(&self, constant: FieldElement<T>) -> Self {
        Sharing {
            share: self.share + constant,
            degree: self.degree,
        }
    }

    pub fn scale(&self, factor: FieldElement<T>) -> Self {
        Sharing {
            share: self.share * factor,
            degree: self.degree,
        }
    }
}

impl<T: MersennePrime> Add for Sharing<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        debug_assert_eq!(self.degree, rhs.degree);
        Sharing {
            share: self.share + rhs.share,
            degree: self.degree,
        }
    }
}

impl<T: MersennePrime> Sub for Sharing<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        debug_assert_eq!(self.degree, rhs.degree);
        Sharing {
            share: self.share - rhs.share,
            degree: self.degree,
        }
    }
}

impl<T: MersennePrime> AddAssign for Sharing<T> {
    fn add_assign(&mut self, rhs: Self) {
        debug_assert_eq!(self.degree, rhs.degree);
        self.share += rhs.share;
    }
}

impl<T: MersennePrime> SubAssign for Sharing<T> {
    fn sub_assign(&mut self, rhs: Self) {
        debug_assert_eq!(self.degree, rhs.degree);
        self.share -= rhs.share;
    }
}

impl<T: MersennePrime> Neg for Sharing<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Sharing {
            share: -self.share,
            degree: self.degree,
        }
    }
}
