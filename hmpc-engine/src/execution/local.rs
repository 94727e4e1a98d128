use crate::{
    execution::{
        player::{Identity, Role},
        session::{MpcConfig, MpcContext},
    },
    network::local::LocalNetworkingStore,
};
use eyre::Result;
use hmpc_common::MersennePrime;
use rand::distributions::{Distribution, Standard};
use std::sync::Arc;

pub fn generate_local_identities(n_parties: usize) -> Vec<Identity> {
    (0..n_parties)
        .map(|i| Identity::from(format!("local_node_{i}")))
        .collect()
}

/// In-process runtime: all parties in one process over channel-based
/// transport, one context per party. Each context is meant to be moved
/// into its own task.
pub struct LocalRuntime;

impl LocalRuntime {
    pub fn mock_setup<T: MersennePrime>(config: MpcConfig) -> Result<Vec<MpcContext<T>>>
    where
        Standard: Distribution<T>,
    {
        let identities = generate_local_identities(config.n_parties);
        let store = LocalNetworkingStore::from_host_ids(&identities);
        (0..config.n_parties)
            .map(|i| {
                let networking = Arc::new(store.get_local_network(identities[i].clone()));
                Ok(MpcContext::new(
                    config.clone(),
                    Role(i),
                    identities.clone(),
                    networking,
                )?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_setup_builds_one_context_per_party() {
        let config = MpcConfig::new(3, 1).unwrap();
        let contexts = LocalRuntime::mock_setup::<u64>(config).unwrap();
        assert_eq!(contexts.len(), 3);
        for (i, ctx) in contexts.iter().enumerate() {
            assert_eq!(ctx.role(), Role(i));
            assert_eq!(ctx.n_parties(), 3);
        }
    }
}
