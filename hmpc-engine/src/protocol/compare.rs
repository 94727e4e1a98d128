//! Bitwise comparison over LSB-first bit vectors.

use crate::{
    execution::session::MpcContext,
    protocol::{bits, mult, prefix},
    shares::{BitBundle, Degree, ShareBundle},
};
use eyre::Result;
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use num_traits::One;
use rand::distributions::{Distribution, Standard};

/// `[a < b]` for public `a` and bit-shared `b`, both given LSB-first as
/// `num x l` bit matrices; the result is a `num x 1` bit column.
///
/// The XOR with the public bits is local; a postfix product over the
/// complements isolates the highest differing bit as a shared one-hot
/// vector, whose dot product with `b` decides the comparison.
pub async fn less_than<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    public_bits: &Matrix<T>,
    shared_bits: &BitBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(
        (public_bits.rows(), public_bits.cols()),
        (shared_bits.rows(), shared_bits.cols())
    );
    let xored = bits::xor_public(shared_bits, public_bits);
    pick_at_highest_difference(ctx, &xored.0.shares, shared_bits).await
}

/// `[a < b]` for two bit-shared vectors. The XOR costs one extra reduction
/// over [`less_than`]; the rest of the pipeline is shared.
pub async fn less_than_shared<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    a: &BitBundle<T>,
    b: &BitBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
    let xored = bits::xor(ctx, a, b).await?;
    pick_at_highest_difference(ctx, &xored.0.shares, b).await
}

/// Common tail: given `[a XOR b]` at degree t, isolates the highest
/// differing bit and picks `b` there. At that bit `a < b` iff `b = 1`.
async fn pick_at_highest_difference<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    xor_bits: &Matrix<T>,
    b: &BitBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    let (num, l) = (b.rows(), b.cols());
    let one = FieldElement::one();

    let y = Matrix::from_fn(num, l, |i, j| one - xor_bits[(i, j)]);
    let post = prefix::postfix_mult(ctx, &ShareBundle::from_parts(y, Degree::T)).await?;

    // One-hot at the highest differing bit: delta_j = post_{j+1} - post_j
    // with post_l = 1.
    let delta = Matrix::from_fn(num, l, |i, j| {
        if j + 1 < l {
            post.shares[(i, j + 1)] - post.shares[(i, j)]
        } else {
            one - post.shares[(i, j)]
        }
    });
    let products = delta.hadamard(&b.0.shares);
    let summed = products.matmul(&Matrix::ones(l, 1));
    let reduced =
        mult::reduce_degree(ctx, &ShareBundle::from_parts(summed, Degree::TwoT)).await?;
    Ok(BitBundle(reduced))
}
