pub mod generate;

use crate::error::Error;
use hmpc_common::{FieldElement, MersennePrime};
use std::{collections::VecDeque, fmt};

/// Families of correlated randomness held by [`RandomStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RandomKind {
    /// A degree-t sharing of a uniform secret.
    Sharing,
    /// The same uniform secret shared at degree t and degree 2t.
    ReducedPair,
    /// A degree-t sharing of a uniform bit.
    Bit,
    /// `([r / 2^d]_t, [r]_t, [msb(r)]_t)` for probabilistic truncation.
    TruncatedTriple,
    /// `([r / 2^d]_t, [r]_2t, [msb(r)]_t)` for fused reduce-truncate.
    ReducedTruncatedTriple,
    /// Chained `([b_j], [b_{j-1} * b_j^{-1}])` for unbounded fan-in products.
    UnboundedPair,
}

impl fmt::Display for RandomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RandomKind::Sharing => "sharing",
            RandomKind::ReducedPair => "reduced-pair",
            RandomKind::Bit => "bit",
            RandomKind::TruncatedTriple => "truncated-triple",
            RandomKind::ReducedTruncatedTriple => "reduced-truncated-triple",
            RandomKind::UnboundedPair => "unbounded-pair",
        };
        f.write_str(name)
    }
}

/// `([r / 2^d], [r], [msb(r)])`; the middle component is a degree-t sharing
/// for [`RandomKind::TruncatedTriple`] and degree-2t for
/// [`RandomKind::ReducedTruncatedTriple`].
#[derive(Clone, Copy, Debug)]
pub struct TruncationTriple<T: MersennePrime> {
    pub truncated: FieldElement<T>,
    pub full: FieldElement<T>,
    pub msb: FieldElement<T>,
}

/// Typed FIFO queues of preprocessed randomness, one per family. Popping
/// more than is available is a hard error; refilling is the caller's
/// responsibility (on-demand or via a [`crate::phase::RandomnessBudget`]).
#[derive(Debug)]
pub struct RandomStore<T: MersennePrime> {
    sharings: VecDeque<FieldElement<T>>,
    reduced_pairs: VecDeque<(FieldElement<T>, FieldElement<T>)>,
    bits: VecDeque<FieldElement<T>>,
    truncated: VecDeque<TruncationTriple<T>>,
    reduced_truncated: VecDeque<TruncationTriple<T>>,
    unbounded: VecDeque<(FieldElement<T>, FieldElement<T>)>,
    /// Chain length the queued unbounded pairs were generated for; rows of
    /// pairs only compose correctly at this exact length.
    unbounded_cols: Option<usize>,
}

impl<T: MersennePrime> Default for RandomStore<T> {
    fn default() -> Self {
        RandomStore {
            sharings: VecDeque::new(),
            reduced_pairs: VecDeque::new(),
            bits: VecDeque::new(),
            truncated: VecDeque::new(),
            reduced_truncated: VecDeque::new(),
            unbounded: VecDeque::new(),
            unbounded_cols: None,
        }
    }
}

impl<T: MersennePrime> RandomStore<T> {
    pub fn available(&self, kind: RandomKind) -> usize {
        match kind {
            RandomKind::Sharing => self.sharings.len(),
            RandomKind::ReducedPair => self.reduced_pairs.len(),
            RandomKind::Bit => self.bits.len(),
            RandomKind::TruncatedTriple => self.truncated.len(),
            RandomKind::ReducedTruncatedTriple => self.reduced_truncated.len(),
            RandomKind::UnboundedPair => self.unbounded.len(),
        }
    }

    fn check(&self, kind: RandomKind, requested: usize) -> Result<(), Error> {
        let available = self.available(kind);
        if available < requested {
            return Err(Error::InsufficientRandomness {
                kind,
                requested,
                available,
            });
        }
        Ok(())
    }

    pub fn push_sharings(&mut self, values: impl IntoIterator<Item = FieldElement<T>>) {
        self.sharings.extend(values);
    }

    pub fn pop_sharings(&mut self, count: usize) -> Result<Vec<FieldElement<T>>, Error> {
        self.check(RandomKind::Sharing, count)?;
        Ok(self.sharings.drain(..count).collect())
    }

    pub fn push_reduced_pairs(
        &mut self,
        pairs: impl IntoIterator<Item = (FieldElement<T>, FieldElement<T>)>,
    ) {
        self.reduced_pairs.extend(pairs);
    }

    pub fn pop_reduced_pairs(
        &mut self,
        count: usize,
    ) -> Result<Vec<(FieldElement<T>, FieldElement<T>)>, Error> {
        self.check(RandomKind::ReducedPair, count)?;
        Ok(self.reduced_pairs.drain(..count).collect())
    }

    pub fn push_bits(&mut self, values: impl IntoIterator<Item = FieldElement<T>>) {
        self.bits.extend(values);
    }

    pub fn pop_bits(&mut self, count: usize) -> Result<Vec<FieldElement<T>>, Error> {
        self.check(RandomKind::Bit, count)?;
        Ok(self.bits.drain(..count).collect())
    }

    pub fn push_truncated(&mut self, triples: impl IntoIterator<Item = TruncationTriple<T>>) {
        self.truncated.extend(triples);
    }

    pub fn pop_truncated(&mut self, count: usize) -> Result<Vec<TruncationTriple<T>>, Error> {
        self.check(RandomKind::TruncatedTriple, count)?;
        Ok(self.truncated.drain(..count).collect())
    }

    pub fn push_reduced_truncated(
        &mut self,
        triples: impl IntoIterator<Item = TruncationTriple<T>>,
    ) {
        self.reduced_truncated.extend(triples);
    }

    pub fn pop_reduced_truncated(
        &mut self,
        count: usize,
    ) -> Result<Vec<TruncationTriple<T>>, Error> {
        self.check(RandomKind::ReducedTruncatedTriple, count)?;
        Ok(self.reduced_truncated.drain(..count).collect())
    }

    pub fn unbounded_cols(&self) -> Option<usize> {
        self.unbounded_cols
    }

    pub fn push_unbounded(
        &mut self,
        cols: usize,
        pairs: impl IntoIterator<Item = (FieldElement<T>, FieldElement<T>)>,
    ) {
        // Pairs only telescope at the chain length they were generated for;
        // a length change invalidates whatever is still queued.
        if self.unbounded_cols != Some(cols) {
            self.unbounded.clear();
            self.unbounded_cols = Some(cols);
        }
        self.unbounded.extend(pairs);
    }

    /// Pops whole rows of chained pairs; `cols` must match the length the
    /// queued pairs were generated for.
    pub fn pop_unbounded(
        &mut self,
        rows: usize,
        cols: usize,
    ) -> Result<Vec<(FieldElement<T>, FieldElement<T>)>, Error> {
        if let Some(generated) = self.unbounded_cols {
            assert_eq!(
                generated, cols,
                "unbounded pairs were generated for chains of length {generated}"
            );
        }
        self.check(RandomKind::UnboundedPair, rows * cols)?;
        Ok(self.unbounded.drain(..rows * cols).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underflow_is_a_typed_error() {
        let mut store = RandomStore::<u64>::default();
        store.push_bits([FieldElement::from_int(1)]);
        let err = store.pop_bits(2).unwrap_err();
        match err {
            Error::InsufficientRandomness {
                kind,
                requested,
                available,
            } => {
                assert_eq!(kind, RandomKind::Bit);
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn changing_the_chain_length_flushes_stale_pairs() {
        let pair = |v: i64| {
            (
                FieldElement::<u32>::from_int(v),
                FieldElement::from_int(v + 100),
            )
        };
        let mut store = RandomStore::<u32>::default();
        store.push_unbounded(3, (0..6).map(pair));
        assert_eq!(store.unbounded_cols(), Some(3));

        store.push_unbounded(4, (10..18).map(pair));
        assert_eq!(store.unbounded_cols(), Some(4));
        assert_eq!(store.available(RandomKind::UnboundedPair), 8);
        // The front of the queue is the fresh 4-chain, not a stale 3-chain.
        let popped = store.pop_unbounded(1, 4).unwrap();
        assert_eq!(popped[0], pair(10));
    }

    #[test]
    fn queues_are_fifo() {
        let mut store = RandomStore::<u32>::default();
        store.push_sharings((0..5).map(FieldElement::from_int));
        let first = store.pop_sharings(2).unwrap();
        assert_eq!(first, vec![FieldElement::from_int(0), FieldElement::from_int(1)]);
        assert_eq!(store.available(RandomKind::Sharing), 3);
    }
}
