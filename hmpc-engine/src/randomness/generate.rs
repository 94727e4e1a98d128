//! Preprocessing generators for every correlated-randomness family.
//!
//! All generators follow the extraction pattern: every party deals
//! sharings of its own uniform secrets, and the transposed Vandermonde
//! extractor turns the `n` crude sharings into `n - t` sharings of
//! secrets no coalition of `t` parties knows. Derived families (bits,
//! truncation triples, unbounded pairs) are built on top of the queues
//! they consume, so a single call may refill several of them.

use crate::{
    execution::{player::Role, session::MpcContext},
    protocol::{mult, sharing},
    randomness::TruncationTriple,
    shares::{Degree, ShareBundle},
};
use eyre::Result;
use futures::future::try_join_all;
use hmpc_common::{field::batch_inverse, FieldElement, Matrix, MersennePrime};
use itertools::izip;
use num_traits::{One, Zero};
use rand::distributions::{Distribution, Standard};

/// Refills the queue of random degree-t sharings with at least `count`.
pub async fn random_sharings<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    count: usize,
) -> Result<()>
where
    Standard: Distribution<T>,
{
    let n = ctx.n_parties();
    let t = ctx.threshold();
    let num = count.div_ceil(n - t);
    let me = ctx.role().0;

    let mut pendings = Vec::with_capacity(n);
    for d in 0..n {
        let secrets = if me == d {
            Some(ctx.sample_local(1, num))
        } else {
            None
        };
        pendings.push(sharing::request_input(
            ctx,
            Role(d),
            secrets.as_ref(),
            1,
            num,
            Degree::T,
        )?);
    }
    let bundles = try_join_all(pendings.into_iter().map(|p| p.wait())).await?;
    let mut crude = Matrix::zeros(n, num);
    for (d, bundle) in bundles.iter().enumerate() {
        crude.set_row_block(d, bundle.shares.data());
    }

    let extracted = ctx.tables.extractor.matmul(&crude);
    ctx.store.push_sharings(extracted.into_data());
    ctx.phase.produced.sharings += (n - t) * num;
    tracing::debug!(produced = (n - t) * num, "generated random sharings");
    Ok(())
}

/// Refills the queue of reduced pairs: the same uniform secret shared at
/// degree t and degree 2t. Uses the PRG-assisted dealings when the party
/// layout allows them, which makes the 2t half communication-free.
pub async fn reduced_pairs<T: MersennePrime>(ctx: &mut MpcContext<T>, count: usize) -> Result<()>
where
    Standard: Distribution<T>,
{
    let n = ctx.n_parties();
    let t = ctx.threshold();
    let num = count.div_ceil(n - t);
    let me = ctx.role().0;
    let prg = ctx.config().supports_prg_sharing();

    let mut crude_t = Matrix::zeros(n, num);
    let mut crude_2t = Matrix::zeros(n, num);
    for d in 0..n {
        let secrets = if me == d {
            Some(ctx.sample_local(1, num))
        } else {
            None
        };
        let (low, high) = if prg {
            (
                sharing::input_bundle_prg(ctx, Role(d), secrets.as_ref(), 1, num).await?,
                sharing::input_bundle_prg_2t(ctx, Role(d), secrets.as_ref(), 1, num)?,
            )
        } else {
            (
                sharing::input_bundle(ctx, Role(d), secrets.as_ref(), 1, num, Degree::T).await?,
                sharing::input_bundle(ctx, Role(d), secrets.as_ref(), 1, num, Degree::TwoT)
                    .await?,
            )
        };
        crude_t.set_row_block(d, low.shares.data());
        crude_2t.set_row_block(d, high.shares.data());
    }

    let ext_t = ctx.tables.extractor.matmul(&crude_t);
    let ext_2t = ctx.tables.extractor.matmul(&crude_2t);
    ctx.store
        .push_reduced_pairs(ext_t.into_data().into_iter().zip(ext_2t.into_data()));
    ctx.phase.produced.reduced_pairs += (n - t) * num;
    tracing::debug!(produced = (n - t) * num, "generated reduced pairs");
    Ok(())
}

/// Refills the queue of shared uniform bits. A random sharing is squared
/// and opened; the canonical square root then normalizes the sign so that
/// `(r / sqrt(r^2) + 1) / 2` is a fair bit. Openings of zero reveal
/// nothing usable and are resampled.
pub async fn random_bits<T: MersennePrime>(ctx: &mut MpcContext<T>, count: usize) -> Result<()>
where
    Standard: Distribution<T>,
{
    let two_inverse = FieldElement::two_inverse();
    let mut produced = 0;
    while produced < count {
        let need = count - produced;
        let r = Matrix::from_vec(need, 1, ctx.take_random_sharings(need).await?);
        let squared = ShareBundle::from_parts(r.hadamard(&r), Degree::TwoT);
        let opened = sharing::reveal_to_all(ctx, &squared).await?;

        let survivors: Vec<usize> = (0..need)
            .filter(|&k| !opened.data()[k].is_zero())
            .collect();
        let roots: Vec<FieldElement<T>> =
            survivors.iter().map(|&k| opened.data()[k].sqrt()).collect();
        let inverses = batch_inverse(&roots);
        let bits = izip!(&survivors, &inverses)
            .map(|(&k, &inv)| (r.data()[k] * inv + FieldElement::one()) * two_inverse);
        produced += survivors.len();
        ctx.store.push_bits(bits);
    }
    ctx.phase.produced.bits += count;
    tracing::debug!(produced = count, "generated random bits");
    Ok(())
}

fn solved_triples<T: MersennePrime>(
    ctx: &MpcContext<T>,
    bits: &Matrix<T>,
    full: &Matrix<T>,
) -> Vec<TruncationTriple<T>>
where
    Standard: Distribution<T>,
{
    let l = FieldElement::<T>::bit_length() as usize;
    let d = FieldElement::<T>::fixed_precision() as usize;
    let int_precision = FieldElement::<T>::int_precision() as usize;
    // Shifted bits with the sign bit filling the top, a shared arithmetic
    // right shift of the recomposed value.
    let shifted = Matrix::from_fn(bits.rows(), l, |i, j| {
        if j < int_precision {
            bits[(i, j + d)]
        } else {
            bits[(i, l - 1)]
        }
    });
    let truncated = shifted.matmul(ctx.bit_weights());
    (0..bits.rows())
        .map(|k| TruncationTriple {
            truncated: truncated[(k, 0)],
            full: full[(k, 0)],
            msb: bits[(k, l - 1)],
        })
        .collect()
}

/// Refills the truncation-triple queue: `([r >> d], [r], [msb(r)])` with
/// all components at degree t, assembled locally from shared bits.
pub async fn truncated_triples<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    count: usize,
) -> Result<()>
where
    Standard: Distribution<T>,
{
    let l = FieldElement::<T>::bit_length() as usize;
    let bits = Matrix::from_vec(count, l, ctx.take_random_bits(count * l).await?);
    let full = bits.matmul(ctx.bit_weights());
    let triples = solved_triples(ctx, &bits, &full);
    ctx.store.push_truncated(triples);
    ctx.phase.produced.truncated_triples += count;
    tracing::debug!(produced = count, "generated truncation triples");
    Ok(())
}

/// Like [`truncated_triples`], but the full value is recomposed from the
/// squared bit shares, giving a degree-2t sharing for the fused
/// reduce-truncate at no extra communication.
pub async fn reduced_truncated_triples<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    count: usize,
) -> Result<()>
where
    Standard: Distribution<T>,
{
    let l = FieldElement::<T>::bit_length() as usize;
    let bits = Matrix::from_vec(count, l, ctx.take_random_bits(count * l).await?);
    let full_2t = bits.hadamard(&bits).matmul(ctx.bit_weights());
    let triples = solved_triples(ctx, &bits, &full_2t);
    ctx.store.push_reduced_truncated(triples);
    ctx.phase.produced.reduced_truncated_triples += count;
    tracing::debug!(produced = count, "generated reduced truncation triples");
    Ok(())
}

/// Refills the unbounded-pair queue with `rows` chains of length `cols`:
/// `([b_j], [b_{j-1} * b_j^{-1}])` with `aux_0 = [b_0^{-1}]`, built from
/// two fresh sharing matrices per chain. Rows whose masking products open
/// to zero cannot be inverted and are regenerated.
pub async fn unbounded_pairs<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    rows: usize,
    cols: usize,
) -> Result<()>
where
    Standard: Distribution<T>,
{
    eyre::ensure!(cols > 0, "unbounded pairs need a positive chain length");
    let mut pairs = Vec::with_capacity(rows * cols);
    while pairs.len() < rows * cols {
        let remaining = rows - pairs.len() / cols;
        let x = Matrix::from_vec(
            remaining,
            cols,
            ctx.take_random_sharings(remaining * cols).await?,
        );
        let y = Matrix::from_vec(
            remaining,
            cols,
            ctx.take_random_sharings(remaining * cols).await?,
        );
        let products = ShareBundle::from_parts(x.hadamard(&y), Degree::TwoT);
        let opened = sharing::reveal_to_all(ctx, &products).await?;

        // Chain numerators x_{j-1} * y_j; dividing by the opened x_j * y_j
        // leaves b_{j-1} * b_j^{-1}. Reduced so the stored shares are degree t.
        let chain = if cols > 1 {
            let raw = Matrix::from_fn(remaining, cols - 1, |i, j| x[(i, j)] * y[(i, j + 1)]);
            mult::reduce_degree(ctx, &ShareBundle::from_parts(raw, Degree::TwoT))
                .await?
                .shares
        } else {
            Matrix::zeros(remaining, 0)
        };

        for i in 0..remaining {
            if opened.row(i).iter().any(|e| e.is_zero()) {
                continue;
            }
            let inverses = batch_inverse(opened.row(i));
            for j in 0..cols {
                let aux = if j == 0 {
                    y[(i, 0)] * inverses[0]
                } else {
                    chain[(i, j - 1)] * inverses[j]
                };
                pairs.push((x[(i, j)], aux));
            }
        }
    }
    ctx.store.push_unbounded(cols, pairs);
    ctx.phase.produced.unbounded_pairs += rows * cols;
    tracing::debug!(produced = rows * cols, cols, "generated unbounded pairs");
    Ok(())
}
