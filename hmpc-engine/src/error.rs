use crate::randomness::RandomKind;
use thiserror::Error;

/// An Error enum capturing the errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Party counts without an honest majority
    #[error("Invalid party count: n = {n}, threshold = {t}")]
    InvalidPartyCount { n: usize, t: usize },
    /// Invalid party id provided
    #[error("Invalid Party id {0}")]
    Id(usize),
    /// A typed randomness queue ran dry in true-offline mode
    #[error("Insufficient {kind} randomness: requested {requested}, available {available}")]
    InsufficientRandomness {
        kind: RandomKind,
        requested: usize,
        available: usize,
    },
    /// Offline/online phase misuse
    #[error("Phase error: {0}")]
    Phase(&'static str),
    /// Error from the eyre crate
    #[error(transparent)]
    Eyre(#[from] eyre::Report),
    /// A IO error has occurred
    #[error(transparent)]
    IO(#[from] std::io::Error),
    /// Some other error has occurred.
    #[error("Err: {0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(mes: String) -> Self {
        Self::Other(mes)
    }
}

impl From<&str> for Error {
    fn from(mes: &str) -> Self {
        Self::Other(mes.to_owned())
    }
}
