//! Oblivious maximum over bundle rows, returning both the value and a
//! shared one-hot vector marking the winning column.

use crate::{
    execution::session::MpcContext,
    protocol::{mult, relu},
    shares::{BitBundle, Degree, ShareBundle},
};
use eyre::Result;
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use num_traits::One;
use rand::distributions::{Distribution, Standard};

/// Tournament maximum: columns are compared pairwise per level, so the
/// depth is logarithmic. Ties resolve towards the lower column index. The
/// winner selection and the one-hot update share a single reduction per
/// level.
pub async fn maxpool<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    values: &ShareBundle<T>,
) -> Result<(ShareBundle<T>, BitBundle<T>)>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(values.degree, Degree::T);
    let rows = values.rows();
    let width = values.cols();
    eyre::ensure!(width >= 1, "maxpool needs at least one column");

    let mut cur = values.shares.clone();
    let mut onehot = Matrix::ones(rows, width);
    // Which original columns each surviving column still represents.
    let mut blocks: Vec<(usize, usize)> = (0..width).map(|j| (j, j + 1)).collect();

    while cur.cols() > 1 {
        let w = cur.cols();
        let groups = w / 2;
        let next_w = groups + (w % 2);

        let diffs = Matrix::from_fn(rows, groups, |i, g| cur[(i, 2 * g)] - cur[(i, 2 * g + 1)]);
        let cond = relu::drelu(ctx, &ShareBundle::from_parts(diffs.clone(), Degree::T)).await?;
        let cond = &cond.0.shares;

        // cond * winner + (1 - cond) * loser = cond * diff + loser; the odd
        // trailing column passes through untouched.
        let max_2t = Matrix::from_fn(rows, next_w, |i, g| {
            if g < groups {
                cond[(i, g)] * diffs[(i, g)] + cur[(i, 2 * g + 1)]
            } else {
                cur[(i, w - 1)]
            }
        });

        let mut factor = Matrix::ones(rows, width);
        for g in 0..groups {
            let (ws, we) = blocks[2 * g];
            let (ls, le) = blocks[2 * g + 1];
            for i in 0..rows {
                for j in ws..we {
                    factor[(i, j)] = cond[(i, g)];
                }
                for j in ls..le {
                    factor[(i, j)] = FieldElement::one() - cond[(i, g)];
                }
            }
        }
        let onehot_2t = onehot.hadamard(&factor);

        let combined = ShareBundle::from_parts(max_2t.hcat(&onehot_2t), Degree::TwoT);
        let reduced = mult::reduce_degree(ctx, &combined).await?;
        cur = reduced.shares.col_range(0, next_w);
        onehot = reduced.shares.col_range(next_w, next_w + width);

        let mut merged = Vec::with_capacity(next_w);
        for g in 0..groups {
            merged.push((blocks[2 * g].0, blocks[2 * g + 1].1));
        }
        if w % 2 == 1 {
            merged.push(blocks[w - 1]);
        }
        blocks = merged;
    }

    Ok((
        ShareBundle::from_parts(cur, Degree::T),
        BitBundle(ShareBundle::from_parts(onehot, Degree::T)),
    ))
}

/// Tournament maximum with the two-layer multiplication fusion applied to
/// each level: the sign reduction, the winner selection and the one-hot
/// update all come out of a single combined opening, where [`maxpool`]
/// spends one reduction on the sign and another on the products. Same
/// result and tie-breaking as the plain tournament.
pub async fn maxpool_fused<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    values: &ShareBundle<T>,
) -> Result<(ShareBundle<T>, BitBundle<T>)>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(values.degree, Degree::T);
    let rows = values.rows();
    let width = values.cols();
    eyre::ensure!(width >= 1, "maxpool needs at least one column");

    let mut cur = values.shares.clone();
    let mut onehot = Matrix::ones(rows, width);
    let mut blocks: Vec<(usize, usize)> = (0..width).map(|j| (j, j + 1)).collect();

    while cur.cols() > 1 {
        let w = cur.cols();
        let groups = w / 2;
        let next_w = groups + (w % 2);
        // Original columns under comparison this level; the odd trailing
        // block keeps its one-hot entries untouched.
        let covered = blocks[2 * groups - 1].1;

        // Group owning each covered column, and whether the column sits in
        // the winner half of its pair.
        let mut owner = vec![0usize; covered];
        let mut in_winner = vec![false; covered];
        for g in 0..groups {
            let (ws, we) = blocks[2 * g];
            let (ls, le) = blocks[2 * g + 1];
            for j in ws..we {
                owner[j] = g;
                in_winner[j] = true;
            }
            for j in ls..le {
                owner[j] = g;
            }
        }

        let diffs = Matrix::from_fn(rows, groups, |i, g| cur[(i, 2 * g)] - cur[(i, 2 * g + 1)]);
        let impaired =
            relu::msb_impaired(ctx, &ShareBundle::from_parts(diffs.clone(), Degree::T)).await?;
        let sign_2t = impaired.square_local().shares;

        // One stacked fusion: the sign against each diff, and each covered
        // column's group sign against its one-hot entry.
        let x_big = Matrix::from_fn(rows, groups + covered, |i, j| {
            if j < groups {
                sign_2t[(i, j)]
            } else {
                sign_2t[(i, owner[j - groups])]
            }
        });
        let y_big = Matrix::from_fn(rows, groups + covered, |i, j| {
            if j < groups {
                diffs[(i, j)]
            } else {
                onehot[(i, j - groups)]
            }
        });
        let (_, mut triples) = mult::reduce_degree_first_layer(
            ctx,
            &ShareBundle::from_parts(x_big, Degree::TwoT),
            &[&ShareBundle::from_parts(y_big, Degree::T)],
        )
        .await?;
        let triple = triples.pop().ok_or_else(|| eyre::eyre!("missing triple"))?;
        let products = triple.mult().shares;

        // cond * diff + loser = diff - sign * diff + loser.
        let next = Matrix::from_fn(rows, next_w, |i, g| {
            if g < groups {
                diffs[(i, g)] - products[(i, g)] + cur[(i, 2 * g + 1)]
            } else {
                cur[(i, w - 1)]
            }
        });
        onehot = Matrix::from_fn(rows, width, |i, j| {
            if j >= covered {
                onehot[(i, j)]
            } else if in_winner[j] {
                // cond * onehot = onehot - sign * onehot.
                onehot[(i, j)] - products[(i, groups + j)]
            } else {
                products[(i, groups + j)]
            }
        });
        cur = next;

        let mut merged = Vec::with_capacity(next_w);
        for g in 0..groups {
            merged.push((blocks[2 * g].0, blocks[2 * g + 1].1));
        }
        if w % 2 == 1 {
            merged.push(blocks[w - 1]);
        }
        blocks = merged;
    }

    Ok((
        ShareBundle::from_parts(cur, Degree::T),
        BitBundle(ShareBundle::from_parts(onehot, Degree::T)),
    ))
}

/// Running maximum, one comparison per column. Linear depth, but each
/// round carries less data than the tournament; ties resolve towards the
/// lower index like [`maxpool`].
pub async fn maxpool_sequential<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    values: &ShareBundle<T>,
) -> Result<(ShareBundle<T>, BitBundle<T>)>
where
    Standard: Distribution<T>,
{
    debug_assert_eq!(values.degree, Degree::T);
    let rows = values.rows();
    let width = values.cols();
    eyre::ensure!(width >= 1, "maxpool needs at least one column");

    let mut max = values.shares.col_range(0, 1);
    let mut onehot = Matrix::ones(rows, 1);
    for j in 1..width {
        let col = values.shares.col_range(j, j + 1);
        let diff = &max - &col;
        let cond = relu::drelu(ctx, &ShareBundle::from_parts(diff.clone(), Degree::T)).await?;
        let cond = &cond.0.shares;

        let max_2t = Matrix::from_fn(rows, 1, |i, _| cond[(i, 0)] * diff[(i, 0)] + col[(i, 0)]);
        let kept = Matrix::from_fn(rows, j, |i, k| onehot[(i, k)] * cond[(i, 0)]);
        let taken = Matrix::from_fn(rows, 1, |i, _| FieldElement::one() - cond[(i, 0)]);

        let combined =
            ShareBundle::from_parts(max_2t.hcat(&kept).hcat(&taken), Degree::TwoT);
        let reduced = mult::reduce_degree(ctx, &combined).await?;
        max = reduced.shares.col_range(0, 1);
        onehot = reduced.shares.col_range(1, j + 2);
    }

    Ok((
        ShareBundle::from_parts(max, Degree::T),
        BitBundle(ShareBundle::from_parts(onehot, Degree::T)),
    ))
}
