pub mod local;
pub mod value;

use crate::execution::{player::Identity, session::SessionId};
use async_trait::async_trait;

/// Point-to-point message transport between parties. Sends are ordered per
/// (sender, receiver) pair; `receive` yields messages from `sender` in the
/// order they were sent.
#[async_trait]
pub trait Networking: Send + Sync {
    async fn send(
        &self,
        value: Vec<u8>,
        receiver: &Identity,
        session_id: &SessionId,
    ) -> eyre::Result<()>;

    async fn receive(&self, sender: &Identity, session_id: &SessionId) -> eyre::Result<Vec<u8>>;
}
