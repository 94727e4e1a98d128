use hmpc_common::{FieldElement, Matrix, MersennePrime};
use crate::shares::bundle::{Degree, ShareBundle};

/// A Beaver triple in the masked form produced by the two-layer
/// multiplication fusion: `x = u - [a]` and `y = v - [b]` with `u, v`
/// public and `[c] = [a * b]`, so `[x * y]` finishes locally as
/// `u*v - u*[b] - v*[a] + [c]`.
#[derive(Clone, Debug)]
pub struct BeaverTriple<T: MersennePrime> {
    pub a: Matrix<T>,
    pub b: Matrix<T>,
    pub c: Matrix<T>,
    pub u: Matrix<T>,
    pub v: Matrix<T>,
}

impl<T: MersennePrime> BeaverTriple<T> {
    pub fn rows(&self) -> usize {
        self.a.rows()
    }

    pub fn cols(&self) -> usize {
        self.a.cols()
    }

    /// Rewrites the triple for `k * x`: scales `u`, `[a]` and `[c]`.
    pub fn x_times(&mut self, k: FieldElement<T>) -> &mut Self {
        self.u = self.u.scale(k);
        self.a = self.a.scale(k);
        self.c = self.c.scale(k);
        self
    }

    /// Rewrites the triple for `x + k`: only the public part moves.
    pub fn x_plus(&mut self, k: FieldElement<T>) -> &mut Self {
        self.u = self.u.add_scalar(k);
        self
    }

    pub fn y_times(&mut self, k: FieldElement<T>) -> &mut Self {
        self.v = self.v.scale(k);
        self.b = self.b.scale(k);
        self.c = self.c.scale(k);
        self
    }

    pub fn y_plus(&mut self, k: FieldElement<T>) -> &mut Self {
        self.v = self.v.add_scalar(k);
        self
    }

    /// Local finish of the multiplication, a degree-t sharing of `x * y`.
    pub fn mult(&self) -> ShareBundle<T> {
        let mut shares = self.u.hadamard(&self.v);
        shares -= &self.u.hadamard(&self.b);
        shares -= &self.v.hadamard(&self.a);
        shares += &self.c;
        ShareBundle::from_parts(shares, Degree::T)
    }
}
