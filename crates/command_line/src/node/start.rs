//! Start an operator node.
use anyhow::Result;
use axum_server::Handle;
use dkgnode_driver::{Config, Controller, MemoryStorage, OperatorOwner};
use dkgnode_protocol::OperatorId;
use dkgnode_server::{HttpNetwork, NodeServer, ServerConfig};
use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc};

/// Run the node web server.
pub async fn run(
    bind: String,
    config: PathBuf,
    operator_id: Option<OperatorId>,
) -> Result<()> {
    let mut loaded = ServerConfig::load(&config).await?;

    if let Some(operator_id) = operator_id {
        tracing::info!(operator_id, "override operator identifier");
        let public_key = loaded.owner.private_key.to_public_key();
        if !loaded
            .operators
            .iter()
            .any(|o| o.id == operator_id && o.public_key == public_key)
        {
            anyhow::bail!(
                "keystore does not match the public key of operator {}",
                operator_id
            );
        }
        loaded.owner =
            OperatorOwner::new(operator_id, loaded.owner.private_key);
        loaded.config.operator_id = operator_id;
    }

    let storage = Arc::new(MemoryStorage::new(loaded.operators));
    let network = Arc::new(HttpNetwork::new(loaded.config.peers())?);
    let controller = Arc::new(Controller::new(Config {
        operator: Arc::new(loaded.owner),
        network,
        storage: storage.clone(),
        options: loaded.config.dkg.clone(),
    }));

    let handle = Handle::new();
    let addr = SocketAddr::from_str(&bind)?;
    let server = NodeServer::new(controller, storage, loaded.config.tls);
    server.start(addr, handle).await?;
    Ok(())
}
