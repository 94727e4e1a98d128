//! Sign extraction and the rectifier built on it.
//!
//! The low bit of a shared value is recovered by masking with a random
//! value whose bit decomposition is shared, opening the sum and patching
//! the modular wraparound with a bitwise comparison. The sign bit is the
//! low bit of the doubled value, since doubling modulo a Mersenne prime
//! rotates the bit pattern.

use crate::{
    execution::session::MpcContext,
    protocol::{compare, mult, sharing},
    shares::{BitBundle, Degree, ShareBundle},
};
use eyre::Result;
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use rand::distributions::{Distribution, Standard};

/// The cheap half of the LSB: a degree-t sharing of `(c0 XOR r0) - wrap`,
/// a value in `{-1, 0, 1}` whose square is the low bit. Callers square it
/// locally and either reduce or feed the product into a fused reduction.
pub async fn lsb_impaired<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(x.degree, Degree::T);
    let (rows, cols) = (x.rows(), x.cols());
    let num = x.len();
    let l = FieldElement::<T>::bit_length();

    let bit_shares = ctx.take_random_bits(num * l as usize).await?;
    let bits = Matrix::from_vec(num, l as usize, bit_shares);
    let r = bits.matmul(ctx.bit_weights());

    let flat = Matrix::from_vec(num, 1, x.shares.data().to_vec());
    let masked = ShareBundle::from_parts(&flat + &r, Degree::T);
    let opened = sharing::reveal_to_all(ctx, &masked).await?;

    // c = x + r wrapped iff c < r; the patch is a public-vs-shared compare.
    let c_bits = Matrix::decompose_bits(opened.data(), l);
    let r_bits = BitBundle(ShareBundle::from_parts(bits, Degree::T));
    let wrap = compare::less_than(ctx, &c_bits, &r_bits).await?;

    let two = FieldElement::from_int(2);
    let shares = Matrix::from_fn(num, 1, |i, _| {
        let c0 = c_bits[(i, 0)];
        let r0 = r_bits.0.shares[(i, 0)];
        c0 + r0 - two * c0 * r0 - wrap.0.shares[(i, 0)]
    });
    Ok(ShareBundle::from_parts(
        Matrix::from_vec(rows, cols, shares.into_data()),
        Degree::T,
    ))
}

/// `[lsb(x)]` as a bit bundle.
pub async fn lsb<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    let impaired = lsb_impaired(ctx, x).await?;
    let reduced = mult::reduce_degree(ctx, &impaired.square_local()).await?;
    Ok(BitBundle(reduced))
}

/// Impaired sign value: its square is `[msb(x)]`.
pub async fn msb_impaired<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    lsb_impaired(ctx, &x.scale(FieldElement::from_int(2))).await
}

/// `[msb(x)]`, i.e. `1` iff the encoded value is negative.
pub async fn msb<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    lsb(ctx, &x.scale(FieldElement::from_int(2))).await
}

/// The rectifier's derivative: `[x >= 0]` as a bit bundle.
pub async fn drelu<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    Ok(msb(ctx, x).await?.complement())
}

/// `[max(x, 0)]` via the derivative, two reduction rounds after the sign.
pub async fn relu<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let cond = drelu(ctx, x).await?;
    mult::reduce_degree(ctx, &x.mul_local(&cond.0)).await
}

/// `([x >= 0], [max(x, 0)])` with the sign reduction and the final product
/// fused into one opening: the squared impaired sign goes through
/// [`mult::reduce_degree_first_layer`] against `x`, and the returned
/// triple is rewritten from `msb * x` to `(1 - msb) * x`.
pub async fn relu_fused<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<(BitBundle<T>, ShareBundle<T>)>
where
    Standard: Distribution<T>,
{
    let impaired = msb_impaired(ctx, x).await?;
    let sign_2t = impaired.square_local();
    let (sign, mut triples) = mult::reduce_degree_first_layer(ctx, &sign_2t, &[x]).await?;
    let cond = BitBundle(sign).complement();
    let mut triple = triples.pop().ok_or_else(|| eyre::eyre!("missing triple"))?;
    let value = triple
        .x_times(FieldElement::from_int(-1))
        .x_plus(FieldElement::from_int(1))
        .mult();
    Ok((cond, value))
}
