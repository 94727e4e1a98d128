use crate::{
    execution::{player::Identity, session::SessionId},
    network::Networking,
};
use async_trait::async_trait;
use dashmap::DashMap;
use eyre::eyre;
use std::sync::Arc;

type P2PChannels = Arc<
    DashMap<
        (Identity, Identity),
        (
            Arc<async_channel::Sender<Vec<u8>>>,
            Arc<async_channel::Receiver<Vec<u8>>>,
        ),
    >,
>;

/// In-process transport: one unbounded channel per ordered party pair.
#[derive(Debug, Clone)]
pub struct LocalNetworkingStore {
    p2p_channels: P2PChannels,
}

impl LocalNetworkingStore {
    pub fn from_host_ids(identities: &[Identity]) -> Self {
        let p2p = DashMap::new();
        for v1 in identities.iter() {
            for v2 in identities.iter() {
                if v1 != v2 {
                    let (tx, rx) = async_channel::unbounded::<Vec<u8>>();
                    p2p.insert((v1.clone(), v2.clone()), (Arc::new(tx), Arc::new(rx)));
                }
            }
        }
        LocalNetworkingStore {
            p2p_channels: Arc::new(p2p),
        }
    }

    pub fn get_local_network(&self, owner: Identity) -> LocalNetworking {
        LocalNetworking {
            p2p_channels: Arc::clone(&self.p2p_channels),
            owner,
        }
    }
}

#[derive(Debug)]
pub struct LocalNetworking {
    p2p_channels: P2PChannels,
    pub owner: Identity,
}

#[async_trait]
impl Networking for LocalNetworking {
    async fn send(
        &self,
        value: Vec<u8>,
        receiver: &Identity,
        _session_id: &SessionId,
    ) -> eyre::Result<()> {
        let (tx, _) = self
            .p2p_channels
            .get(&(self.owner.clone(), receiver.clone()))
            .ok_or_else(|| {
                eyre!(
                    "p2p channel retrieve error when sending: owner: {:?}, receiver: {:?}",
                    self.owner,
                    receiver
                )
            })?
            .value()
            .clone();

        metrics::counter!("network.bytes_sent").increment(value.len() as u64);
        metrics::counter!("network.messages_sent").increment(1);
        tx.send(value).await.map_err(|e| e.into())
    }

    async fn receive(&self, sender: &Identity, _session_id: &SessionId) -> eyre::Result<Vec<u8>> {
        let (_, rx) = self
            .p2p_channels
            .get(&(sender.clone(), self.owner.clone()))
            .ok_or_else(|| {
                eyre!(
                    "p2p channel retrieve error when receiving: owner: {:?}, sender: {:?}",
                    self.owner,
                    sender
                )
            })?
            .value()
            .clone();

        Ok(rx.recv().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::value;
    use hmpc_common::FieldElement;

    #[tokio::test]
    async fn test_network_send_receive() {
        let identities: Vec<Identity> = vec!["alice".into(), "bob".into(), "charlie".into()];
        let networking_store = LocalNetworkingStore::from_host_ids(&identities);

        let alice = networking_store.get_local_network("alice".into());
        let bob = networking_store.get_local_network("bob".into());

        let payload: Vec<FieldElement<u64>> =
            vec![FieldElement::from_int(777), FieldElement::from_int(-3)];
        let expected = payload.clone();

        let task1 = tokio::spawn(async move {
            let recv = bob.receive(&"alice".into(), &SessionId(1)).await.unwrap();
            let decoded: Vec<FieldElement<u64>> = value::decode_elements(&recv).unwrap();
            assert_eq!(decoded, expected);
        });
        let task2 = tokio::spawn(async move {
            let bytes = value::encode_elements(&payload).unwrap();
            alice.send(bytes, &"bob".into(), &SessionId(1)).await
        });

        let _ = tokio::try_join!(task1, task2).unwrap();
    }
}
