//! Unbounded fan-in products along bundle rows in a single round.
//!
//! Each entry is blinded with the chained half of an unbounded pair and
//! opened; the clear running products then telescope so that multiplying
//! by `[b_j]` recovers the shared prefix product. Chains are row-wise, so
//! the pairs must have been generated for exactly this row length.

use crate::{
    execution::session::MpcContext,
    protocol::sharing,
    shares::{Degree, ShareBundle},
};
use eyre::Result;
use hmpc_common::{Matrix, MersennePrime};
use rand::distributions::{Distribution, Standard};

/// `out[i][j] = prod_{k <= j} x[i][k]` at degree t, one opening round for
/// any row length.
pub async fn prefix_mult<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(x.degree, Degree::T);
    let (rows, cols) = (x.rows(), x.cols());
    let pairs = ctx.take_unbounded_pairs(rows, cols).await?;
    let b = Matrix::from_vec(rows, cols, pairs.iter().map(|p| p.0).collect());
    let aux = Matrix::from_vec(rows, cols, pairs.iter().map(|p| p.1).collect());

    let masked = ShareBundle::from_parts(x.shares.hadamard(&aux), Degree::TwoT);
    let opened = sharing::reveal_to_all(ctx, &masked).await?;
    // prod_{k <= j} (x_k * b_{k-1} / b_k) = P_j / b_j, so P_j = M_j * b_j.
    let m = opened.prefix_products();
    Ok(ShareBundle::from_parts(b.hadamard(&m), Degree::T))
}

/// Fan-in product of every row, a `rows x 1` bundle holding
/// `prod_k x[i][k]`. One opening round like the prefix form.
pub async fn mult_all<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let prefixed = prefix_mult(ctx, x).await?;
    Ok(prefixed.col_range(x.cols() - 1, x.cols()))
}

/// `out[i][j] = prod_{k >= j} x[i][k]`, the mirrored prefix product.
pub async fn postfix_mult<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let reversed = ShareBundle::from_parts(x.shares.reverse_cols(), x.degree);
    let prefixed = prefix_mult(ctx, &reversed).await?;
    Ok(ShareBundle::from_parts(
        prefixed.shares.reverse_cols(),
        Degree::T,
    ))
}
