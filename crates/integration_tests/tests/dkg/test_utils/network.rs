use async_trait::async_trait;
use dkgnode_driver::{Controller, Network, Result};
use dkgnode_protocol::{decode, encode, Identifier, SignedTransport, TransportType};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};

/// In-process network that sends every broadcast through the
/// wire encoding to all joined nodes, the sender included.
#[derive(Default)]
pub struct LocalNetwork {
    nodes: RwLock<Vec<Weak<Controller>>>,
    sent: Mutex<Vec<SignedTransport>>,
}

impl LocalNetwork {
    pub async fn join(&self, controller: &Arc<Controller>) {
        self.nodes.write().await.push(Arc::downgrade(controller));
    }

    /// Messages of a kind broadcast for a session.
    pub async fn sent(
        &self,
        identifier: &Identifier,
        kind: TransportType,
    ) -> Vec<SignedTransport> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| {
                m.message.identifier == *identifier && m.message.kind == kind
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Network for LocalNetwork {
    async fn broadcast_dkg_message(
        &self,
        message: &SignedTransport,
    ) -> Result<()> {
        let buffer = encode(message)
            .await
            .map_err(dkgnode_protocol::Error::from)?;
        self.sent.lock().await.push(message.clone());

        let nodes: Vec<Arc<Controller>> = self
            .nodes
            .read()
            .await
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for node in nodes {
            let buffer = buffer.clone();
            tokio::spawn(async move {
                match decode::<SignedTransport>(&buffer).await {
                    Ok(message) => {
                        if let Err(e) = node.process(message).await {
                            tracing::debug!(
                                operator = node.operator_id(),
                                error = %e,
                                "deliver"
                            );
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "decode"),
                }
            });
        }
        Ok(())
    }
}
