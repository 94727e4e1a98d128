use crate::{
    error::Error,
    execution::player::{Identity, Role},
    network::{value, Networking},
    phase::{CommStats, PhaseConfig, RandomnessBudget},
    randomness::{generate, RandomKind, RandomStore, TruncationTriple},
    shares::Degree,
};
use aes_prng::AesRng;
use eyre::Result;
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use num_traits::Zero;
use rand::{
    distributions::{Distribution, Standard},
    SeedableRng,
};
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin, sync::Arc};
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        SessionId(id)
    }
}

/// Static parameters of an MPC session, injected into every
/// [`MpcContext`] instead of living in process-wide state.
#[derive(Clone, Debug)]
pub struct MpcConfig {
    pub n_parties: usize,
    pub threshold: usize,
    pub king: Role,
    pub session_id: SessionId,
    /// Seed of the PRNG shared by all parties, used for the
    /// low-communication PRG sharing variants.
    pub agreed_seed: [u8; 16],
    /// When set, all randomness must be preprocessed up front and the
    /// online phase fails instead of generating on demand.
    pub true_offline: bool,
}

impl MpcConfig {
    pub fn new(n_parties: usize, threshold: usize) -> Result<Self, Error> {
        if threshold == 0 || n_parties < 2 * threshold + 1 {
            return Err(Error::InvalidPartyCount {
                n: n_parties,
                t: threshold,
            });
        }
        Ok(MpcConfig {
            n_parties,
            threshold,
            king: Role(0),
            session_id: SessionId(0),
            agreed_seed: *b"hmpc agreed seed",
            true_offline: false,
        })
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_king(mut self, king: Role) -> Self {
        self.king = king;
        self
    }

    pub fn with_agreed_seed(mut self, seed: [u8; 16]) -> Self {
        self.agreed_seed = seed;
        self
    }

    pub fn with_true_offline(mut self, true_offline: bool) -> Self {
        self.true_offline = true_offline;
        self
    }

    /// The zero- and low-communication PRG sharings interpolate over all
    /// `n + 1` points and therefore need `n = 2t + 1` exactly.
    pub fn supports_prg_sharing(&self) -> bool {
        self.n_parties == 2 * self.threshold + 1
    }
}

fn vandermonde<T: MersennePrime>(n: usize, degree: usize) -> Matrix<T> {
    let mut m = Matrix::zeros(n, degree);
    for i in 0..n {
        let x = Role(i).point::<T>();
        let mut power = x;
        for j in 0..degree {
            m[(i, j)] = power;
            power = power * x;
        }
    }
    m
}

/// Lagrange coefficients evaluating a polynomial at `target` from its
/// values at the `known` points.
fn lagrange_row<T: MersennePrime>(
    known: &[FieldElement<T>],
    target: FieldElement<T>,
) -> Vec<FieldElement<T>> {
    known
        .iter()
        .enumerate()
        .map(|(i, &xi)| {
            let mut num = FieldElement::from_int(1);
            let mut den = FieldElement::from_int(1);
            for (j, &xj) in known.iter().enumerate() {
                if j != i {
                    num *= xj - target;
                    den *= xj - xi;
                }
            }
            num * den.inverse()
        })
        .collect()
}

/// Interpolation tables fixed by `(n, t, king)`, computed once per context.
#[derive(Clone, Debug)]
pub(crate) struct ShamirTables<T: MersennePrime> {
    /// `n x t` Vandermonde (no constant column) for degree-t sharing.
    pub vander_t: Matrix<T>,
    /// `n x 2t` Vandermonde for degree-2t sharing.
    pub vander_2t: Matrix<T>,
    /// `(n - t) x n` randomness extractor, `Van(n, n-t)` transposed.
    pub extractor: Matrix<T>,
    /// Lagrange vector opening a degree-t sharing from the reconstruction
    /// set `king..king+t`, ordered by distance from the king.
    pub recon_t: Vec<FieldElement<T>>,
    pub recon_2t: Vec<FieldElement<T>>,
    /// Row `i`: dealer `i` interpolates its own degree-2t share from the
    /// secret and the 2t pseudorandom shares of the other parties.
    pub with_secret_2t: Option<Matrix<T>>,
    /// Rows for parties `t+1..2t` and `0`: their degree-t shares computed
    /// from the secret and the pseudorandom shares of parties `1..t`.
    pub with_secret_t: Option<Matrix<T>>,
    /// `[1, 2, 4, ..., 2^(l-1)]` column for bit recomposition.
    pub bit_weights: Matrix<T>,
}

impl<T: MersennePrime> ShamirTables<T> {
    fn new(n: usize, t: usize, king: Role) -> Self {
        let recon = |degree: usize| -> Vec<FieldElement<T>> {
            let points: Vec<_> = (0..=degree)
                .map(|r| Role((king.0 + r) % n).point())
                .collect();
            lagrange_row(&points, FieldElement::zero())
        };

        let (with_secret_2t, with_secret_t) = if n == 2 * t + 1 {
            let mut m2 = Matrix::zeros(n, 2 * t + 1);
            for i in 0..n {
                let mut known = vec![FieldElement::zero()];
                known.extend((0..n).filter(|&k| k != i).map(|k| Role(k).point()));
                m2.row_mut(i)
                    .copy_from_slice(&lagrange_row(&known, Role(i).point()));
            }

            let mut known = vec![FieldElement::zero()];
            known.extend((1..=t).map(|k| Role(k).point()));
            let mut targets: Vec<Role> = (t + 1..=2 * t).map(Role).collect();
            targets.push(Role(0));
            let mut mt = Matrix::zeros(n - t, t + 1);
            for (row, target) in targets.iter().enumerate() {
                mt.row_mut(row)
                    .copy_from_slice(&lagrange_row(&known, target.point()));
            }
            (Some(m2), Some(mt))
        } else {
            (None, None)
        };

        ShamirTables {
            vander_t: vandermonde(n, t),
            vander_2t: vandermonde(n, 2 * t),
            extractor: vandermonde(n, n - t).transpose(),
            recon_t: recon(t),
            recon_2t: recon(2 * t),
            with_secret_2t,
            with_secret_t,
            bit_weights: Matrix::bit_weights(T::EXP),
        }
    }
}

/// Per-party protocol state: config, transport, PRNGs, interpolation
/// tables, randomness queues and the phase controller. Every protocol
/// function takes the context as its first argument.
pub struct MpcContext<T: MersennePrime> {
    config: MpcConfig,
    role: Role,
    identities: Arc<Vec<Identity>>,
    networking: Arc<dyn Networking>,
    comm: Arc<CommStats>,
    /// Private randomness for sharing coefficients and dealt secrets.
    pub(crate) prng: AesRng,
    /// Shared-seed randomness; all parties must consume it in lockstep.
    pub(crate) prng_agreed: AesRng,
    pub(crate) tables: ShamirTables<T>,
    pub(crate) store: RandomStore<T>,
    pub(crate) phase: PhaseConfig,
}

impl<T: MersennePrime> MpcContext<T>
where
    Standard: Distribution<T>,
{
    pub fn new(
        config: MpcConfig,
        role: Role,
        identities: Vec<Identity>,
        networking: Arc<dyn Networking>,
    ) -> Result<Self, Error> {
        if identities.len() != config.n_parties {
            return Err(Error::InvalidPartyCount {
                n: identities.len(),
                t: config.threshold,
            });
        }
        if role.0 >= config.n_parties {
            return Err(Error::Id(role.0));
        }
        let tables = ShamirTables::new(config.n_parties, config.threshold, config.king);
        let phase = PhaseConfig::new(config.true_offline);
        Ok(MpcContext {
            prng: AesRng::from_entropy(),
            prng_agreed: AesRng::from_seed(config.agreed_seed),
            tables,
            store: RandomStore::default(),
            phase,
            comm: Arc::new(CommStats::default()),
            config,
            role,
            identities: Arc::new(identities),
            networking,
        })
    }

    pub fn n_parties(&self) -> usize {
        self.config.n_parties
    }

    pub fn threshold(&self) -> usize {
        self.config.threshold
    }

    pub fn king(&self) -> Role {
        self.config.king
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn session_id(&self) -> SessionId {
        self.config.session_id
    }

    pub fn config(&self) -> &MpcConfig {
        &self.config
    }

    pub fn own_identity(&self) -> &Identity {
        &self.identities[self.role.0]
    }

    pub fn identity(&self, role: Role) -> Result<&Identity, Error> {
        self.identities.get(role.0).ok_or(Error::Id(role.0))
    }

    pub fn degree_size(&self, degree: Degree) -> usize {
        degree.size(self.config.threshold)
    }

    /// Parties holding the shares opened during reconstruction: the first
    /// `degree + 1` parties cyclically from the king.
    pub fn reconstruction_roles(&self, degree: Degree) -> Vec<Role> {
        let size = self.degree_size(degree);
        (0..=size)
            .map(|r| Role((self.config.king.0 + r) % self.config.n_parties))
            .collect()
    }

    pub fn is_in_reconstruction_set(&self, degree: Degree) -> bool {
        self.role.relative_to(self.config.king, self.config.n_parties)
            <= self.degree_size(degree)
    }

    pub(crate) fn recon_vector(&self, degree: Degree) -> &[FieldElement<T>] {
        match degree {
            Degree::T => &self.tables.recon_t,
            Degree::TwoT => &self.tables.recon_2t,
        }
    }

    pub(crate) fn vander(&self, degree: Degree) -> &Matrix<T> {
        match degree {
            Degree::T => &self.tables.vander_t,
            Degree::TwoT => &self.tables.vander_2t,
        }
    }

    pub fn bit_weights(&self) -> &Matrix<T> {
        &self.tables.bit_weights
    }

    /// Row ranges `(start, len)` owned by each party when a bundle is
    /// dispersed over all parties; the first party takes the remainder.
    pub fn partition_rows(&self, rows: usize) -> Vec<(usize, usize)> {
        let n = self.config.n_parties;
        let block = rows / n;
        let first = rows - block * (n - 1);
        let mut parts = Vec::with_capacity(n);
        parts.push((0, first));
        for i in 1..n {
            parts.push((first + (i - 1) * block, block));
        }
        parts
    }

    pub fn sample_local(&mut self, rows: usize, cols: usize) -> Matrix<T> {
        Matrix::random(rows, cols, &mut self.prng)
    }

    pub fn sample_agreed(&mut self, rows: usize, cols: usize) -> Matrix<T> {
        Matrix::random(rows, cols, &mut self.prng_agreed)
    }

    // --- point-to-point I/O --------------------------------------------

    pub async fn send_elements_to(
        &self,
        receiver: Role,
        elements: &[FieldElement<T>],
    ) -> Result<()> {
        let bytes = value::encode_elements(elements)?;
        self.comm.record(bytes.len());
        self.networking
            .send(bytes, self.identity(receiver)?, &self.config.session_id)
            .await
    }

    pub async fn receive_elements_from(&self, sender: Role) -> Result<Vec<FieldElement<T>>> {
        let bytes = self
            .networking
            .receive(self.identity(sender)?, &self.config.session_id)
            .await?;
        value::decode_elements(&bytes)
    }

    /// Issues a send without waiting for it; the returned handle resolves
    /// when the transfer completes. Pair with `request_receive_elements`
    /// to overlap the I/O of a whole communication round.
    pub fn request_send_elements(
        &self,
        receiver: Role,
        elements: &[FieldElement<T>],
    ) -> Result<JoinHandle<Result<()>>> {
        let bytes = value::encode_elements(elements)?;
        self.comm.record(bytes.len());
        let networking = Arc::clone(&self.networking);
        let identity = self.identity(receiver)?.clone();
        let session_id = self.config.session_id;
        Ok(tokio::spawn(async move {
            networking.send(bytes, &identity, &session_id).await
        }))
    }

    pub fn request_receive_elements(
        &self,
        sender: Role,
    ) -> Result<JoinHandle<Result<Vec<FieldElement<T>>>>> {
        let networking = Arc::clone(&self.networking);
        let identity = self.identity(sender)?.clone();
        let session_id = self.config.session_id;
        Ok(tokio::spawn(async move {
            let bytes = networking.receive(&identity, &session_id).await?;
            value::decode_elements(&bytes)
        }))
    }

    /// Broadcasts the same payload to every other party.
    pub fn request_send_all(
        &self,
        elements: &[FieldElement<T>],
    ) -> Result<Vec<JoinHandle<Result<()>>>> {
        let mut handles = Vec::with_capacity(self.config.n_parties - 1);
        for p in 0..self.config.n_parties {
            if p != self.role.0 {
                handles.push(self.request_send_elements(Role(p), elements)?);
            }
        }
        Ok(handles)
    }

    // --- randomness accessors ------------------------------------------

    /// Tops up a randomness queue, switching to the offline phase for the
    /// detour when generation on demand is allowed.
    fn ensure(
        &mut self,
        kind: RandomKind,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let available = self.store.available(kind);
            if available >= count {
                return Ok(());
            }
            if self.phase.true_offline() {
                return Err(Error::InsufficientRandomness {
                    kind,
                    requested: count,
                    available,
                }
                .into());
            }
            let deficit = count - available;
            let was_online = self.phase.is_online();
            if was_online {
                self.phase.switch_to_offline(&self.comm)?;
            }
            // Generators consume other randomness kinds through these same
            // accessors; box the future to keep its type finite.
            let generation: Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> = match kind {
                RandomKind::Sharing => Box::pin(generate::random_sharings(self, deficit)),
                RandomKind::ReducedPair => Box::pin(generate::reduced_pairs(self, deficit)),
                RandomKind::Bit => Box::pin(generate::random_bits(self, deficit)),
                RandomKind::TruncatedTriple => Box::pin(generate::truncated_triples(self, deficit)),
                RandomKind::ReducedTruncatedTriple => {
                    Box::pin(generate::reduced_truncated_triples(self, deficit))
                }
                RandomKind::UnboundedPair => {
                    unreachable!("unbounded pairs are ensured with an explicit chain length")
                }
            };
            generation.await?;
            if was_online {
                self.phase.switch_to_online(&self.comm)?;
            }
            Ok(())
        })
    }

    pub async fn take_random_sharings(&mut self, count: usize) -> Result<Vec<FieldElement<T>>> {
        self.ensure(RandomKind::Sharing, count).await?;
        Ok(self.store.pop_sharings(count)?)
    }

    pub async fn take_reduced_pairs(
        &mut self,
        count: usize,
    ) -> Result<Vec<(FieldElement<T>, FieldElement<T>)>> {
        self.ensure(RandomKind::ReducedPair, count).await?;
        Ok(self.store.pop_reduced_pairs(count)?)
    }

    pub async fn take_random_bits(&mut self, count: usize) -> Result<Vec<FieldElement<T>>> {
        self.ensure(RandomKind::Bit, count).await?;
        Ok(self.store.pop_bits(count)?)
    }

    pub async fn take_truncated_triples(
        &mut self,
        count: usize,
    ) -> Result<Vec<TruncationTriple<T>>> {
        self.ensure(RandomKind::TruncatedTriple, count).await?;
        Ok(self.store.pop_truncated(count)?)
    }

    pub async fn take_reduced_truncated_triples(
        &mut self,
        count: usize,
    ) -> Result<Vec<TruncationTriple<T>>> {
        self.ensure(RandomKind::ReducedTruncatedTriple, count).await?;
        Ok(self.store.pop_reduced_truncated(count)?)
    }

    pub async fn take_unbounded_pairs(
        &mut self,
        rows: usize,
        cols: usize,
    ) -> Result<Vec<(FieldElement<T>, FieldElement<T>)>> {
        let needed = rows * cols;
        let available = match self.store.unbounded_cols() {
            Some(generated) if generated == cols => {
                self.store.available(RandomKind::UnboundedPair)
            }
            Some(_) => 0,
            None => 0,
        };
        if available < needed {
            if self.phase.true_offline() {
                return Err(Error::InsufficientRandomness {
                    kind: RandomKind::UnboundedPair,
                    requested: needed,
                    available,
                }
                .into());
            }
            let deficit_rows = (needed - available).div_ceil(cols);
            let was_online = self.phase.is_online();
            if was_online {
                self.phase.switch_to_offline(&self.comm)?;
            }
            let generation: Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> =
                Box::pin(generate::unbounded_pairs(self, deficit_rows, cols));
            generation.await?;
            if was_online {
                self.phase.switch_to_online(&self.comm)?;
            }
        }
        Ok(self.store.pop_unbounded(rows, cols)?)
    }

    pub fn randomness_available(&self, kind: RandomKind) -> usize {
        self.store.available(kind)
    }

    // --- phase control ---------------------------------------------------

    pub fn start_offline(&mut self) -> Result<(), Error> {
        self.phase.start_offline(&self.comm)
    }

    pub fn end_offline(&mut self) -> Result<(), Error> {
        self.phase.end_offline(&self.comm)
    }

    pub fn start_online(&mut self) -> Result<(), Error> {
        self.phase.start_online(&self.comm)
    }

    pub fn end_online(&mut self) -> Result<(), Error> {
        self.phase.end_online(&self.comm)
    }

    pub fn phase(&self) -> &PhaseConfig {
        &self.phase
    }

    pub fn report_stats(&self) {
        self.phase.report(self.role.0);
    }

    /// Bulk preprocessing for true-offline runs; call inside the offline
    /// phase before any online work.
    pub async fn preprocess(&mut self, budget: RandomnessBudget) -> Result<()> {
        if budget.sharings > 0 {
            generate::random_sharings(self, budget.sharings).await?;
        }
        if budget.reduced_pairs > 0 {
            generate::reduced_pairs(self, budget.reduced_pairs).await?;
        }
        if budget.bits > 0 {
            generate::random_bits(self, budget.bits).await?;
        }
        if budget.truncated_triples > 0 {
            generate::truncated_triples(self, budget.truncated_triples).await?;
        }
        if budget.reduced_truncated_triples > 0 {
            generate::reduced_truncated_triples(self, budget.reduced_truncated_triples).await?;
        }
        if budget.unbounded_rows > 0 {
            generate::unbounded_pairs(self, budget.unbounded_rows, budget.unbounded_cols).await?;
        }
        Ok(())
    }
}
