use async_trait::async_trait;
use dkgnode_driver::{Error as DriverError, Network};
use dkgnode_protocol::{encode, SignedTransport};
use futures::future::join_all;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use crate::Result;

/// Network that posts every message to the consume endpoint
/// of each peer node, the local node included.
pub struct HttpNetwork {
    client: Client,
    peers: RwLock<Vec<Url>>,
}

impl HttpNetwork {
    /// Create a network for a list of peer base URLs.
    pub fn new(peers: Vec<Url>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            peers: RwLock::new(peers),
        })
    }

    /// Add a peer node.
    pub async fn add_peer(&self, peer: Url) {
        let mut writer = self.peers.write().await;
        if !writer.contains(&peer) {
            writer.push(peer);
        }
    }

    async fn post(&self, peer: &Url, body: Vec<u8>) -> Result<()> {
        let url = peer.join("consume")?;
        let response = self
            .client
            .post(url)
            .header("content-type", "application/octet-stream")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%peer, %status, body = %text, "peer rejected message");
        }
        Ok(())
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn broadcast_dkg_message(
        &self,
        message: &SignedTransport,
    ) -> dkgnode_driver::Result<()> {
        let body = encode(message)
            .await
            .map_err(dkgnode_protocol::Error::from)?;
        let peers = self.peers.read().await.clone();
        let results =
            join_all(peers.iter().map(|peer| self.post(peer, body.clone())))
                .await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        for (peer, result) in peers.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(%peer, error = %e, "broadcast");
            }
        }
        if failed == peers.len() && !peers.is_empty() {
            return Err(DriverError::Network(format!(
                "message not delivered to any of {} peers",
                peers.len()
            )));
        }
        Ok(())
    }
}
