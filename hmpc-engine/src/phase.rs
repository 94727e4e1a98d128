use crate::error::Error;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Per-context communication counters, incremented on every outbound
/// message and snapshotted at phase boundaries.
#[derive(Debug, Default)]
pub struct CommStats {
    bytes_sent: AtomicU64,
    messages_sent: AtomicU64,
}

impl CommStats {
    pub fn record(&self, bytes: usize) {
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.bytes_sent.load(Ordering::Relaxed),
            self.messages_sent.load(Ordering::Relaxed),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Offline,
    Online,
}

/// Accumulated cost of one phase across all its segments.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseStats {
    pub elapsed: Duration,
    pub bytes_sent: u64,
    pub messages_sent: u64,
}

/// How much of each correlated-randomness family was produced.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProductionCounters {
    pub sharings: usize,
    pub reduced_pairs: usize,
    pub bits: usize,
    pub truncated_triples: usize,
    pub reduced_truncated_triples: usize,
    pub unbounded_pairs: usize,
}

/// Tracks whether the party is in the offline (preprocessing) or online
/// phase and attributes time and communication to each. In true-offline
/// mode the online phase may not fall back to on-demand generation.
#[derive(Debug)]
pub struct PhaseConfig {
    state: Phase,
    true_offline: bool,
    segment_start: Option<Instant>,
    segment_base: (u64, u64),
    pub offline: PhaseStats,
    pub online: PhaseStats,
    pub produced: ProductionCounters,
}

impl PhaseConfig {
    pub fn new(true_offline: bool) -> Self {
        PhaseConfig {
            state: Phase::Idle,
            true_offline,
            segment_start: None,
            segment_base: (0, 0),
            offline: PhaseStats::default(),
            online: PhaseStats::default(),
            produced: ProductionCounters::default(),
        }
    }

    pub fn state(&self) -> Phase {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == Phase::Online
    }

    pub fn true_offline(&self) -> bool {
        self.true_offline
    }

    fn begin_segment(&mut self, target: Phase, comm: &CommStats) {
        self.state = target;
        self.segment_start = Some(Instant::now());
        self.segment_base = comm.snapshot();
    }

    fn end_segment(&mut self, comm: &CommStats) {
        let (bytes, messages) = comm.snapshot();
        let stats = match self.state {
            Phase::Offline => &mut self.offline,
            Phase::Online => &mut self.online,
            Phase::Idle => return,
        };
        if let Some(start) = self.segment_start.take() {
            stats.elapsed += start.elapsed();
        }
        stats.bytes_sent += bytes - self.segment_base.0;
        stats.messages_sent += messages - self.segment_base.1;
        self.state = Phase::Idle;
    }

    pub fn start_offline(&mut self, comm: &CommStats) -> Result<(), Error> {
        if self.state != Phase::Idle {
            return Err(Error::Phase("start_offline requires an idle phase"));
        }
        self.begin_segment(Phase::Offline, comm);
        Ok(())
    }

    pub fn end_offline(&mut self, comm: &CommStats) -> Result<(), Error> {
        if self.state != Phase::Offline {
            return Err(Error::Phase("end_offline outside the offline phase"));
        }
        self.end_segment(comm);
        Ok(())
    }

    pub fn start_online(&mut self, comm: &CommStats) -> Result<(), Error> {
        if self.state != Phase::Idle {
            return Err(Error::Phase("start_online requires an idle phase"));
        }
        self.begin_segment(Phase::Online, comm);
        Ok(())
    }

    pub fn end_online(&mut self, comm: &CommStats) -> Result<(), Error> {
        if self.state != Phase::Online {
            return Err(Error::Phase("end_online outside the online phase"));
        }
        self.end_segment(comm);
        Ok(())
    }

    /// Suspends the online clock for an on-demand preprocessing detour.
    pub fn switch_to_offline(&mut self, comm: &CommStats) -> Result<(), Error> {
        if self.state != Phase::Online {
            return Err(Error::Phase("switch_to_offline outside the online phase"));
        }
        self.end_segment(comm);
        self.begin_segment(Phase::Offline, comm);
        Ok(())
    }

    pub fn switch_to_online(&mut self, comm: &CommStats) -> Result<(), Error> {
        if self.state != Phase::Offline {
            return Err(Error::Phase("switch_to_online outside the offline phase"));
        }
        self.end_segment(comm);
        self.begin_segment(Phase::Online, comm);
        Ok(())
    }

    pub fn report(&self, party: usize) {
        tracing::info!(
            party,
            offline_ms = self.offline.elapsed.as_millis() as u64,
            offline_bytes = self.offline.bytes_sent,
            offline_messages = self.offline.messages_sent,
            online_ms = self.online.elapsed.as_millis() as u64,
            online_bytes = self.online.bytes_sent,
            online_messages = self.online.messages_sent,
            sharings = self.produced.sharings,
            reduced_pairs = self.produced.reduced_pairs,
            bits = self.produced.bits,
            truncated_triples = self.produced.truncated_triples,
            reduced_truncated_triples = self.produced.reduced_truncated_triples,
            unbounded_pairs = self.produced.unbounded_pairs,
            "phase statistics"
        );
    }
}

/// Quantities to preprocess up front when running with a true offline
/// phase; on-demand generation is disabled in that mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomnessBudget {
    pub sharings: usize,
    pub reduced_pairs: usize,
    pub bits: usize,
    pub truncated_triples: usize,
    pub reduced_truncated_triples: usize,
    /// Unbounded-multiplication pairs as (rows, chain length).
    pub unbounded_rows: usize,
    pub unbounded_cols: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_transitions_are_guarded() {
        let comm = CommStats::default();
        let mut phase = PhaseConfig::new(false);

        assert!(phase.end_offline(&comm).is_err());
        assert!(phase.switch_to_offline(&comm).is_err());

        phase.start_offline(&comm).unwrap();
        assert!(phase.start_online(&comm).is_err());
        phase.end_offline(&comm).unwrap();

        phase.start_online(&comm).unwrap();
        phase.switch_to_offline(&comm).unwrap();
        phase.switch_to_online(&comm).unwrap();
        phase.end_online(&comm).unwrap();
        assert_eq!(phase.state(), Phase::Idle);
    }

    #[test]
    fn communication_is_attributed_to_the_active_phase() {
        let comm = CommStats::default();
        let mut phase = PhaseConfig::new(true);

        phase.start_offline(&comm).unwrap();
        comm.record(100);
        comm.record(20);
        phase.end_offline(&comm).unwrap();

        phase.start_online(&comm).unwrap();
        comm.record(7);
        phase.end_online(&comm).unwrap();

        assert_eq!(phase.offline.bytes_sent, 120);
        assert_eq!(phase.offline.messages_sent, 2);
        assert_eq!(phase.online.bytes_sent, 7);
        assert_eq!(phase.online.messages_sent, 1);
    }
}
