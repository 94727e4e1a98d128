pub mod field;
pub mod matrix;

pub use field::{FieldElement, MersennePrime, F31, F61};
pub use matrix::Matrix;
