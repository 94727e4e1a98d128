//! Arithmetic bit operators over shared 0/1 values.

use crate::{
    execution::session::MpcContext,
    protocol::mult,
    shares::{BitBundle, Degree, ShareBundle},
};
use eyre::Result;
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use rand::distributions::{Distribution, Standard};

/// XOR with a public 0/1 matrix, entirely local: `a + b - 2ab` collapses
/// to `b` or `1 - b` per entry.
pub fn xor_public<T: MersennePrime>(bits: &BitBundle<T>, mask: &Matrix<T>) -> BitBundle<T> {
    debug_assert_eq!((bits.rows(), bits.cols()), (mask.rows(), mask.cols()));
    let two = FieldElement::from_int(2);
    let shares = Matrix::from_fn(bits.rows(), bits.cols(), |i, j| {
        let a = mask[(i, j)];
        let b = bits.0.shares[(i, j)];
        a + b - two * a * b
    });
    BitBundle(ShareBundle::from_parts(shares, bits.0.degree))
}

/// `[a XOR b] = [a] + [b] - 2[a][b]`, one reduction round.
pub async fn xor<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    a: &BitBundle<T>,
    b: &BitBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    let two = FieldElement::from_int(2);
    let prod = a.0.mul_local(&b.0);
    let shares = &(&a.0.shares + &b.0.shares) - &prod.shares.scale(two);
    let reduced = mult::reduce_degree(ctx, &ShareBundle::from_parts(shares, Degree::TwoT)).await?;
    Ok(BitBundle(reduced))
}

/// `[a AND b] = [a][b]`, one reduction round.
pub async fn and<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    a: &BitBundle<T>,
    b: &BitBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    Ok(BitBundle(mult::mul(ctx, &a.0, &b.0).await?))
}

/// `[a OR b] = [a] + [b] - [a][b]`, one reduction round.
pub async fn or<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    a: &BitBundle<T>,
    b: &BitBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    let prod = a.0.mul_local(&b.0);
    let shares = &(&a.0.shares + &b.0.shares) - &prod.shares;
    let reduced = mult::reduce_degree(ctx, &ShareBundle::from_parts(shares, Degree::TwoT)).await?;
    Ok(BitBundle(reduced))
}

/// Oblivious selection: `[cond ? a : b] = [b] + [cond]([a] - [b])`.
pub async fn if_else<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    cond: &BitBundle<T>,
    a: &ShareBundle<T>,
    b: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
    let diff = a - b;
    let sel = cond.0.mul_local(&diff);
    let combined = ShareBundle::from_parts(&sel.shares + &b.shares, Degree::TwoT);
    mult::reduce_degree(ctx, &combined).await
}
