pub mod error;
pub mod execution;
pub mod network;
pub mod phase;
pub mod protocol;
pub mod randomness;
pub mod shares;

pub use error::Error;
