//! Secret input and reconstruction.
//!
//! Dealing follows Shamir over the party points `1..=n` with the secret at
//! 0. Reconstruction always opens towards the first `degree + 1` parties
//! cyclically from the king; bundle-wide openings are dispersed, with every
//! party reconstructing its own row block and broadcasting the result.

use crate::{
    execution::{player::Role, session::MpcContext},
    shares::{Degree, ShareBundle, Sharing},
};
use eyre::{bail, ensure, eyre, Result};
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use num_traits::Zero;
use rand::distributions::{Distribution, Standard};
use tokio::task::JoinHandle;

/// Dealer-side share computation: one flat share vector per party.
pub(crate) fn compute_sharings<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    secrets: &Matrix<T>,
    degree: Degree,
) -> Vec<Vec<FieldElement<T>>>
where
    Standard: Distribution<T>,
{
    let num = secrets.len();
    let coeffs = ctx.sample_local(num, ctx.degree_size(degree));
    (0..ctx.n_parties())
        .map(|p| {
            let powers = ctx.vander(degree).row(p);
            secrets
                .data()
                .iter()
                .enumerate()
                .map(|(k, &s)| s + Matrix::dot(coeffs.row(k), powers))
                .collect()
        })
        .collect()
}

/// An input round in flight: the dealer's outstanding sends, or the
/// receiver's pending share vector. [`PendingInput::wait`] completes it.
pub struct PendingInput<T: MersennePrime> {
    sends: Vec<JoinHandle<Result<()>>>,
    recv: Option<JoinHandle<Result<Vec<FieldElement<T>>>>>,
    local: Option<Vec<FieldElement<T>>>,
    rows: usize,
    cols: usize,
    degree: Degree,
}

impl<T: MersennePrime> PendingInput<T> {
    pub async fn wait(self) -> Result<ShareBundle<T>> {
        let data = match (self.local, self.recv) {
            (Some(data), _) => data,
            (None, Some(handle)) => handle.await??,
            (None, None) => bail!("input round holds neither local nor pending shares"),
        };
        ensure!(
            data.len() == self.rows * self.cols,
            "share vector length mismatch: got {}, expected {}",
            data.len(),
            self.rows * self.cols
        );
        for handle in self.sends {
            handle.await??;
        }
        Ok(ShareBundle::from_parts(
            Matrix::from_vec(self.rows, self.cols, data),
            self.degree,
        ))
    }
}

/// Starts dealing `rows x cols` secrets from `dealer` to all parties.
/// Only the dealer passes `secrets`; everyone else passes `None`.
pub fn request_input<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    dealer: Role,
    secrets: Option<&Matrix<T>>,
    rows: usize,
    cols: usize,
    degree: Degree,
) -> Result<PendingInput<T>>
where
    Standard: Distribution<T>,
{
    if ctx.role() == dealer {
        let secrets = secrets.ok_or_else(|| eyre!("the dealer must provide the secrets"))?;
        ensure!(secrets.len() == rows * cols, "secret shape mismatch");
        let per_party = compute_sharings(ctx, secrets, degree);
        let mut sends = Vec::with_capacity(ctx.n_parties() - 1);
        let mut local = None;
        for (p, shares) in per_party.into_iter().enumerate() {
            if p == ctx.role().0 {
                local = Some(shares);
            } else {
                sends.push(ctx.request_send_elements(Role(p), &shares)?);
            }
        }
        Ok(PendingInput {
            sends,
            recv: None,
            local,
            rows,
            cols,
            degree,
        })
    } else {
        Ok(PendingInput {
            sends: Vec::new(),
            recv: Some(ctx.request_receive_elements(dealer)?),
            local: None,
            rows,
            cols,
            degree,
        })
    }
}

pub async fn input_bundle<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    dealer: Role,
    secrets: Option<&Matrix<T>>,
    rows: usize,
    cols: usize,
    degree: Degree,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    request_input(ctx, dealer, secrets, rows, cols, degree)?
        .wait()
        .await
}

/// Deals a single secret; the scalar form of [`input_bundle`].
pub async fn input_scalar<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    dealer: Role,
    secret: Option<FieldElement<T>>,
    degree: Degree,
) -> Result<Sharing<T>>
where
    Standard: Distribution<T>,
{
    let secrets = secret.map(|s| Matrix::from_vec(1, 1, vec![s]));
    let bundle = input_bundle(ctx, dealer, secrets.as_ref(), 1, 1, degree).await?;
    Ok(Sharing::from_bundle(&bundle))
}

/// Opens a scalar sharing to everyone.
pub async fn open_scalar<T: MersennePrime>(
    ctx: &MpcContext<T>,
    sharing: Sharing<T>,
) -> Result<FieldElement<T>>
where
    Standard: Distribution<T>,
{
    let opened = reveal_to_all(ctx, &sharing.into_bundle()).await?;
    Ok(opened.data()[0])
}

/// Input round where the dealer samples the secrets itself from its local
/// generator. The other parties learn nothing beyond their shares.
pub async fn input_random<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    dealer: Role,
    rows: usize,
    cols: usize,
    degree: Degree,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let secrets = (ctx.role() == dealer).then(|| ctx.sample_local(rows, cols));
    input_bundle(ctx, dealer, secrets.as_ref(), rows, cols, degree).await
}

/// Degree-t input where the shares of parties `1..=t` come from the agreed
/// PRNG: the dealer only interpolates and sends the remaining `t + 1`
/// shares, dropping the round's traffic from `n - 1` to `t` messages.
/// Requires `n = 2t + 1`; all parties must call this in lockstep so the
/// agreed stream stays synchronized.
pub async fn input_bundle_prg<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    dealer: Role,
    secrets: Option<&Matrix<T>>,
    rows: usize,
    cols: usize,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let t = ctx.threshold();
    let num = rows * cols;
    let prg = ctx.sample_agreed(t, num);
    let me = ctx.role().0;
    let mut targets: Vec<usize> = (t + 1..=2 * t).collect();
    targets.push(0);

    let data: Vec<FieldElement<T>> = if me == dealer.0 {
        let secrets = secrets.ok_or_else(|| eyre!("the dealer must provide the secrets"))?;
        ensure!(secrets.len() == num, "secret shape mismatch");
        let table = ctx
            .tables
            .with_secret_t
            .as_ref()
            .ok_or_else(|| eyre!("pseudorandom sharing requires n = 2t + 1"))?;
        let stacked = Matrix::from_vec(1, num, secrets.data().to_vec()).vcat(&prg);
        let sharings = table.matmul(&stacked);
        let mut sends = Vec::with_capacity(targets.len());
        for (row, &p) in targets.iter().enumerate() {
            if p != me {
                sends.push(ctx.request_send_elements(Role(p), sharings.row(row))?);
            }
        }
        let own = if (1..=t).contains(&me) {
            prg.row(me - 1).to_vec()
        } else if me == 0 {
            sharings.row(t).to_vec()
        } else {
            sharings.row(me - t - 1).to_vec()
        };
        for handle in sends {
            handle.await??;
        }
        own
    } else if (1..=t).contains(&me) {
        prg.row(me - 1).to_vec()
    } else {
        ctx.receive_elements_from(dealer).await?
    };
    ensure!(data.len() == num, "share vector length mismatch");
    Ok(ShareBundle::from_parts(
        Matrix::from_vec(rows, cols, data),
        Degree::T,
    ))
}

/// Degree-2t input with zero communication: every share except the
/// dealer's own is read off the agreed PRNG, and the dealer interpolates
/// its share so the polynomial passes through the secret at 0. Requires
/// `n = 2t + 1` and lockstep calls like [`input_bundle_prg`].
pub fn input_bundle_prg_2t<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    dealer: Role,
    secrets: Option<&Matrix<T>>,
    rows: usize,
    cols: usize,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let t = ctx.threshold();
    let num = rows * cols;
    let prg = ctx.sample_agreed(2 * t, num);
    let me = ctx.role().0;

    let data: Vec<FieldElement<T>> = if me == dealer.0 {
        let secrets = secrets.ok_or_else(|| eyre!("the dealer must provide the secrets"))?;
        ensure!(secrets.len() == num, "secret shape mismatch");
        let table = ctx
            .tables
            .with_secret_2t
            .as_ref()
            .ok_or_else(|| eyre!("pseudorandom sharing requires n = 2t + 1"))?;
        let row = table.row(me);
        (0..num)
            .map(|k| {
                let mut acc = row[0] * secrets.data()[k];
                for (j, &coeff) in row.iter().enumerate().skip(1) {
                    acc += coeff * prg[(j - 1, k)];
                }
                acc
            })
            .collect()
    } else {
        let idx = if me > dealer.0 { me - 1 } else { me };
        prg.row(idx).to_vec()
    };
    Ok(ShareBundle::from_parts(
        Matrix::from_vec(rows, cols, data),
        Degree::TwoT,
    ))
}

/// Opens a bundle towards `target` only. Returns `Some` secrets at the
/// target and `None` elsewhere.
pub async fn reveal_to<T: MersennePrime>(
    ctx: &MpcContext<T>,
    bundle: &ShareBundle<T>,
    target: Role,
) -> Result<Option<Matrix<T>>>
where
    Standard: Distribution<T>,
{
    let recon = ctx.reconstruction_roles(bundle.degree);
    let me = ctx.role();
    let mut sends = Vec::new();
    if me != target && recon.contains(&me) {
        sends.push(ctx.request_send_elements(target, bundle.shares.data())?);
    }
    let opened = if me == target {
        let coeffs = ctx.recon_vector(bundle.degree).to_vec();
        let mut acc = vec![FieldElement::zero(); bundle.len()];
        let mut recvs = Vec::new();
        for (idx, &r) in recon.iter().enumerate() {
            if r == me {
                for (a, &s) in acc.iter_mut().zip(bundle.shares.data()) {
                    *a += coeffs[idx] * s;
                }
            } else {
                recvs.push((idx, ctx.request_receive_elements(r)?));
            }
        }
        for (idx, handle) in recvs {
            let data = handle.await??;
            ensure!(data.len() == bundle.len(), "share vector length mismatch");
            for (a, &s) in acc.iter_mut().zip(&data) {
                *a += coeffs[idx] * s;
            }
        }
        Some(Matrix::from_vec(bundle.rows(), bundle.cols(), acc))
    } else {
        None
    };
    for handle in sends {
        handle.await??;
    }
    Ok(opened)
}

/// First half of a dispersed opening: reconstruction-set members scatter
/// their shares row-block-wise, and every party reconstructs the clear
/// values of its own block.
pub(crate) async fn reveal_own_block<T: MersennePrime>(
    ctx: &MpcContext<T>,
    bundle: &ShareBundle<T>,
) -> Result<Matrix<T>>
where
    Standard: Distribution<T>,
{
    let parts = ctx.partition_rows(bundle.rows());
    let cols = bundle.cols();
    let recon = ctx.reconstruction_roles(bundle.degree);
    let me = ctx.role();

    let mut sends = Vec::new();
    if recon.contains(&me) {
        for p in 0..ctx.n_parties() {
            if p == me.0 {
                continue;
            }
            let (start, len) = parts[p];
            sends.push(ctx.request_send_elements(Role(p), bundle.shares.row_block(start, len))?);
        }
    }

    let (my_start, my_len) = parts[me.0];
    let coeffs = ctx.recon_vector(bundle.degree).to_vec();
    let mut acc = vec![FieldElement::zero(); my_len * cols];
    let mut recvs = Vec::new();
    for (idx, &r) in recon.iter().enumerate() {
        if r == me {
            for (a, &s) in acc.iter_mut().zip(bundle.shares.row_block(my_start, my_len)) {
                *a += coeffs[idx] * s;
            }
        } else {
            recvs.push((idx, ctx.request_receive_elements(r)?));
        }
    }
    for (idx, handle) in recvs {
        let data = handle.await??;
        ensure!(data.len() == my_len * cols, "block length mismatch");
        for (a, &s) in acc.iter_mut().zip(&data) {
            *a += coeffs[idx] * s;
        }
    }
    for handle in sends {
        handle.await??;
    }
    Ok(Matrix::from_vec(my_len, cols, acc))
}

/// Second half of a dispersed opening: all-to-all exchange of the clear
/// blocks, reassembled into the full secrets matrix.
pub(crate) async fn broadcast_blocks<T: MersennePrime>(
    ctx: &MpcContext<T>,
    my_block: &Matrix<T>,
    rows: usize,
    cols: usize,
) -> Result<Matrix<T>>
where
    Standard: Distribution<T>,
{
    let parts = ctx.partition_rows(rows);
    let me = ctx.role().0;
    debug_assert_eq!(my_block.rows(), parts[me].1);

    let sends = ctx.request_send_all(my_block.data())?;
    let mut out = Matrix::zeros(rows, cols);
    out.set_row_block(parts[me].0, my_block.data());
    let mut recvs = Vec::new();
    for p in 0..ctx.n_parties() {
        if p != me {
            recvs.push((p, ctx.request_receive_elements(Role(p))?));
        }
    }
    for (p, handle) in recvs {
        let data = handle.await??;
        ensure!(data.len() == parts[p].1 * cols, "block length mismatch");
        out.set_row_block(parts[p].0, &data);
    }
    for handle in sends {
        handle.await??;
    }
    Ok(out)
}

/// Opens a bundle to everyone via the dispersed two-round exchange.
pub async fn reveal_to_all<T: MersennePrime>(
    ctx: &MpcContext<T>,
    bundle: &ShareBundle<T>,
) -> Result<Matrix<T>>
where
    Standard: Distribution<T>,
{
    let block = reveal_own_block(ctx, bundle).await?;
    broadcast_blocks(ctx, &block, bundle.rows(), bundle.cols()).await
}

/// Dispersed opening where each block owner truncates its block in the
/// clear before the broadcast, so the second round carries the already
/// truncated values.
pub async fn reveal_to_all_truncated<T: MersennePrime>(
    ctx: &MpcContext<T>,
    bundle: &ShareBundle<T>,
    d: u32,
) -> Result<Matrix<T>>
where
    Standard: Distribution<T>,
{
    let block = reveal_own_block(ctx, bundle).await?.truncate_each(d);
    broadcast_blocks(ctx, &block, bundle.rows(), bundle.cols()).await
}

/// Re-shares dispersed clear blocks at degree t: every party deals its own
/// block and the results are reassembled into one bundle. Uses the
/// PRG-assisted dealing when the party layout supports it.
pub async fn input_blocks<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    my_block: &Matrix<T>,
    rows: usize,
    cols: usize,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    if ctx.config().supports_prg_sharing() {
        input_blocks_prg(ctx, my_block, rows, cols).await
    } else {
        input_blocks_plain(ctx, my_block, rows, cols).await
    }
}

async fn input_blocks_plain<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    my_block: &Matrix<T>,
    rows: usize,
    cols: usize,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let parts = ctx.partition_rows(rows);
    let me = ctx.role().0;
    let mut shares = Matrix::zeros(rows, cols);
    let per_party = compute_sharings(ctx, my_block, Degree::T);
    let mut sends = Vec::with_capacity(ctx.n_parties() - 1);
    for (p, data) in per_party.into_iter().enumerate() {
        if p == me {
            shares.set_row_block(parts[me].0, &data);
        } else {
            sends.push(ctx.request_send_elements(Role(p), &data)?);
        }
    }
    let mut recvs = Vec::new();
    for p in 0..ctx.n_parties() {
        if p != me {
            recvs.push((p, ctx.request_receive_elements(Role(p))?));
        }
    }
    for (p, handle) in recvs {
        let data = handle.await??;
        ensure!(data.len() == parts[p].1 * cols, "block length mismatch");
        shares.set_row_block(parts[p].0, &data);
    }
    for handle in sends {
        handle.await??;
    }
    Ok(ShareBundle::from_parts(shares, Degree::T))
}

async fn input_blocks_prg<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    my_block: &Matrix<T>,
    rows: usize,
    cols: usize,
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let t = ctx.threshold();
    let parts = ctx.partition_rows(rows);
    let me = ctx.role().0;
    let mut targets: Vec<usize> = (t + 1..=2 * t).collect();
    targets.push(0);

    let mut shares = Matrix::zeros(rows, cols);
    let mut sends = Vec::new();
    let mut recvs = Vec::new();
    // Dealers advance the agreed stream in role order so it stays in sync.
    for d in 0..ctx.n_parties() {
        let num = parts[d].1 * cols;
        let prg = ctx.sample_agreed(t, num);
        if d == me {
            let table = ctx
                .tables
                .with_secret_t
                .as_ref()
                .ok_or_else(|| eyre!("pseudorandom sharing requires n = 2t + 1"))?;
            let stacked = Matrix::from_vec(1, num, my_block.data().to_vec()).vcat(&prg);
            let sharings = table.matmul(&stacked);
            for (row, &p) in targets.iter().enumerate() {
                if p != me {
                    sends.push(ctx.request_send_elements(Role(p), sharings.row(row))?);
                }
            }
            let own = if (1..=t).contains(&me) {
                prg.row(me - 1).to_vec()
            } else if me == 0 {
                sharings.row(t).to_vec()
            } else {
                sharings.row(me - t - 1).to_vec()
            };
            shares.set_row_block(parts[d].0, &own);
        } else if (1..=t).contains(&me) {
            shares.set_row_block(parts[d].0, prg.row(me - 1));
        } else {
            recvs.push((d, ctx.request_receive_elements(Role(d))?));
        }
    }
    for (d, handle) in recvs {
        let data = handle.await??;
        ensure!(data.len() == parts[d].1 * cols, "block length mismatch");
        shares.set_row_block(parts[d].0, &data);
    }
    for handle in sends {
        handle.await??;
    }
    Ok(ShareBundle::from_parts(shares, Degree::T))
}
