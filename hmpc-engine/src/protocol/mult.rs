//! Multiplication, degree reduction and probabilistic truncation.
//!
//! A product of two degree-t bundles is local but lands at degree 2t;
//! [`reduce_degree`] brings it back with one dispersed opening of the
//! masked values followed by a dispersed re-share. Truncation piggybacks
//! on the same opening, shifting the masked values in the clear.

use crate::{
    execution::session::MpcContext,
    protocol::sharing,
    shares::{BeaverTriple, Degree, ShareBundle},
};
use eyre::Result;
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use num_traits::One;
use rand::distributions::{Distribution, Standard};

/// Reduces a degree-2t bundle to degree t. The bundle is masked with the
/// 2t half of a reduced pair, opened block-wise to the block owners,
/// re-shared at degree t and unmasked with the t half.
pub async fn reduce_degree<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    bundle: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(bundle.degree, Degree::TwoT);
    let (rows, cols) = (bundle.rows(), bundle.cols());
    let pairs = ctx.take_reduced_pairs(bundle.len()).await?;
    let r_t = Matrix::from_vec(rows, cols, pairs.iter().map(|p| p.0).collect());
    let r_2t = Matrix::from_vec(rows, cols, pairs.iter().map(|p| p.1).collect());

    let masked = ShareBundle::from_parts(&bundle.shares + &r_2t, Degree::TwoT);
    let my_block = sharing::reveal_own_block(ctx, &masked).await?;
    let reshared = sharing::input_blocks(ctx, &my_block, rows, cols).await?;
    Ok(ShareBundle::from_parts(
        &reshared.shares - &r_t,
        bundle.degree.halved(),
    ))
}

/// Entrywise product of two degree-t bundles, reduced back to degree t.
pub async fn mul<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    a: &ShareBundle<T>,
    b: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    reduce_degree(ctx, &a.mul_local(b)).await
}

/// Entrywise square, reduced back to degree t.
pub async fn square<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    a: &ShareBundle<T>,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    reduce_degree(ctx, &a.square_local()).await
}

/// Probabilistic truncation of every entry by `d` fractional bits.
///
/// The values are masked with the full half of a truncation triple plus
/// the encoding offset, opened with the shift applied in the clear, and
/// unmasked with the truncated half. A wraparound past the prime is
/// detected from the opened sign bit and the shared `msb(r)` and patched
/// with the truncation gap. The low bit of the result is off by at most
/// one, which the fixed-point encoding absorbs.
pub async fn truncate<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    bundle: &ShareBundle<T>,
    d: u32,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(bundle.degree, Degree::T);
    let (rows, cols) = (bundle.rows(), bundle.cols());
    let triples = ctx.take_truncated_triples(bundle.len()).await?;
    let r_trunc = Matrix::from_vec(rows, cols, triples.iter().map(|t| t.truncated).collect());
    let r_full = Matrix::from_vec(rows, cols, triples.iter().map(|t| t.full).collect());
    let r_msb = Matrix::from_vec(rows, cols, triples.iter().map(|t| t.msb).collect());

    let masked = ShareBundle::from_parts(
        (&bundle.shares + &r_full).add_scalar(FieldElement::encode_offset()),
        Degree::T,
    );
    let opened = sharing::reveal_to_all_truncated(ctx, &masked, d).await?;
    Ok(unmask_truncated(&opened, &r_trunc, &r_msb))
}

/// Fused degree reduction and truncation of a degree-2t bundle, one
/// opening for both. Uses triples whose full half is shared at degree 2t.
pub async fn reduce_truncate<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    bundle: &ShareBundle<T>,
    d: u32,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(bundle.degree, Degree::TwoT);
    let (rows, cols) = (bundle.rows(), bundle.cols());
    let triples = ctx.take_reduced_truncated_triples(bundle.len()).await?;
    let r_trunc = Matrix::from_vec(rows, cols, triples.iter().map(|t| t.truncated).collect());
    let r_full = Matrix::from_vec(rows, cols, triples.iter().map(|t| t.full).collect());
    let r_msb = Matrix::from_vec(rows, cols, triples.iter().map(|t| t.msb).collect());

    let masked = ShareBundle::from_parts(
        (&bundle.shares + &r_full).add_scalar(FieldElement::encode_offset()),
        Degree::TwoT,
    );
    let opened = sharing::reveal_to_all_truncated(ctx, &masked, d).await?;
    Ok(unmask_truncated(&opened, &r_trunc, &r_msb))
}

fn unmask_truncated<T: MersennePrime>(
    opened: &Matrix<T>,
    r_trunc: &Matrix<T>,
    r_msb: &Matrix<T>,
) -> ShareBundle<T> {
    let gap = FieldElement::truncation_gap();
    let decode = FieldElement::decode_offset();
    // overflow = (1 - [msb(r)]) * msb(opened); the opened sign is public.
    let overflow = Matrix::from_fn(opened.rows(), opened.cols(), |i, j| {
        (FieldElement::one() - r_msb[(i, j)]) * opened[(i, j)].msb()
    });
    let shares = Matrix::from_fn(opened.rows(), opened.cols(), |i, j| {
        opened[(i, j)] - r_trunc[(i, j)] + gap * overflow[(i, j)] - decode
    });
    ShareBundle::from_parts(shares, Degree::T)
}

/// Fuses the reduction of a fresh product `x` (degree 2t) with the setup
/// for its multiplication by each bundle in `ys`: one dispersed opening
/// yields the reduced `[x]_t` and a masked Beaver triple per `y`, each of
/// which finishes `[x * y]_t` locally via [`BeaverTriple::mult`].
pub async fn reduce_degree_first_layer<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    x: &ShareBundle<T>,
    ys: &[&ShareBundle<T>],
) -> Result<(ShareBundle<T>, Vec<BeaverTriple<T>>)>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(x.degree, Degree::TwoT);
    let (rows, cols) = (x.rows(), x.cols());
    let num = x.len();
    for y in ys {
        debug_assert_eq!((y.rows(), y.cols(), y.degree), (rows, cols, Degree::T));
    }

    let pairs = ctx.take_reduced_pairs(num * (1 + ys.len())).await?;
    let chunk = |idx: usize| -> (Matrix<T>, Matrix<T>) {
        let slice = &pairs[idx * num..(idx + 1) * num];
        (
            Matrix::from_vec(rows, cols, slice.iter().map(|p| p.0).collect()),
            Matrix::from_vec(rows, cols, slice.iter().map(|p| p.1).collect()),
        )
    };
    let (rx_t, rx_2t) = chunk(0);

    // One stacked bundle: the masked x on top, then one masked cross
    // product per y, all at degree 2t.
    let mut combined = &x.shares + &rx_2t;
    let mut aux_t = Vec::with_capacity(ys.len());
    for (i, y) in ys.iter().enumerate() {
        let (r_t, r_2t) = chunk(1 + i);
        let block = &rx_t.hadamard(&(-&y.shares)) + &r_2t;
        combined = combined.vcat(&block);
        aux_t.push(r_t);
    }
    let opened = sharing::reveal_to_all(
        ctx,
        &ShareBundle::from_parts(combined, Degree::TwoT),
    )
    .await?;

    let block_at = |idx: usize| -> Matrix<T> {
        Matrix::from_vec(rows, cols, opened.row_block(idx * rows, rows).to_vec())
    };
    let top = block_at(0);
    let x_reduced = ShareBundle::from_parts(&top - &rx_t, Degree::T);

    let triples = ys
        .iter()
        .enumerate()
        .map(|(i, y)| BeaverTriple {
            a: rx_t.clone(),
            b: -&y.shares,
            c: &block_at(1 + i) - &aux_t[i],
            u: top.clone(),
            v: Matrix::zeros(rows, cols),
        })
        .collect();
    Ok((x_reduced, triples))
}
