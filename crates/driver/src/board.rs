//! Bridge between the session transport and the DKG sub-protocol.
use async_trait::async_trait;
use dkgnode_protocol::{
    encode, Identifier, KyberMessage, KyberMessageType, OperatorId,
    Transport, TransportType,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::{
    crypto::sign_transport,
    dkg::{self, Bundle, DealBundle, Incoming, JustificationBundle, ResponseBundle},
    Error, Network, OperatorOwner, Result,
};

/// Session board.
///
/// Outbound bundles are wrapped, signed by the local operator
/// and broadcast to the session. Inbound bundles are checked
/// against the transport signer and queued for the
/// sub-protocol.
pub struct Board {
    identifier: Identifier,
    operator: Arc<OperatorOwner>,
    network: Arc<dyn Network>,
    deals: mpsc::Sender<DealBundle>,
    responses: mpsc::Sender<ResponseBundle>,
    justifications: mpsc::Sender<JustificationBundle>,
    halted: watch::Sender<bool>,
}

impl Board {
    /// Create a board and the inbound queues for the sub-protocol.
    ///
    /// Each queue holds `capacity` bundles.
    pub fn new(
        identifier: Identifier,
        operator: Arc<OperatorOwner>,
        network: Arc<dyn Network>,
        capacity: usize,
    ) -> (Self, Incoming) {
        let capacity = capacity.max(1);
        let (deals, deal_rx) = mpsc::channel(capacity);
        let (responses, response_rx) = mpsc::channel(capacity);
        let (justifications, justification_rx) = mpsc::channel(capacity);
        (
            Self {
                identifier,
                operator,
                network,
                deals,
                responses,
                justifications,
                halted: watch::channel(false).0,
            },
            Incoming {
                deals: deal_rx,
                responses: response_rx,
                justifications: justification_rx,
            },
        )
    }

    /// Stop queueing bundles.
    ///
    /// Wakes every dispatch waiting on a full queue.
    pub fn halt(&self) {
        self.halted.send_replace(true);
    }

    /// Sign and broadcast a payload to the session.
    pub async fn broadcast(
        &self,
        kind: TransportType,
        data: Vec<u8>,
    ) -> Result<()> {
        let message = Transport {
            kind,
            identifier: self.identifier,
            data,
        };
        let signed = sign_transport(
            &self.operator.private_key,
            self.operator.id,
            message,
        )
        .await?;
        self.network.broadcast_dkg_message(&signed).await
    }

    async fn push(
        &self,
        kind: KyberMessageType,
        bundle: &impl Serialize,
    ) -> Result<()> {
        let data = serde_json::to_vec(bundle)?;
        let message = KyberMessage { kind, data };
        let buffer = encode(&message)
            .await
            .map_err(dkgnode_protocol::Error::from)?;
        self.broadcast(TransportType::KyberWrapped, buffer).await
    }

    /// Decode a sub-protocol message and queue the bundle.
    ///
    /// Waits while the queue is full. Bundles that arrive after
    /// the sub-protocol has finished or the board was halted
    /// are dropped.
    pub async fn dispatch(
        &self,
        signer: OperatorId,
        message: KyberMessage,
    ) -> Result<()> {
        let bundle = match message.kind {
            KyberMessageType::Deal => {
                Bundle::Deal(serde_json::from_slice(&message.data)?)
            }
            KyberMessageType::Response => {
                Bundle::Response(serde_json::from_slice(&message.data)?)
            }
            KyberMessageType::Justification => Bundle::Justification(
                serde_json::from_slice(&message.data)?,
            ),
        };

        if bundle.author() != signer {
            return Err(Error::BundleSender(signer, bundle.author()));
        }

        let mut halted = self.halted.subscribe();
        let delivered = tokio::select! {
            delivered = self.deliver(bundle) => delivered,
            _ = halted.wait_for(|halted| *halted) => false,
        };

        if !delivered {
            tracing::debug!(
                id = %self.identifier,
                signer,
                kind = ?message.kind,
                "bundle dropped"
            );
        }
        Ok(())
    }

    async fn deliver(&self, bundle: Bundle) -> bool {
        match bundle {
            Bundle::Deal(bundle) => self.deals.send(bundle).await.is_ok(),
            Bundle::Response(bundle) => {
                self.responses.send(bundle).await.is_ok()
            }
            Bundle::Justification(bundle) => {
                self.justifications.send(bundle).await.is_ok()
            }
        }
    }
}

#[async_trait]
impl dkg::Board for Board {
    async fn push_deals(&self, bundle: &DealBundle) {
        if let Err(e) = self.push(KyberMessageType::Deal, bundle).await {
            tracing::error!(id = %self.identifier, error = %e, "push deals");
        }
    }

    async fn push_responses(&self, bundle: &ResponseBundle) {
        if let Err(e) = self.push(KyberMessageType::Response, bundle).await
        {
            tracing::error!(
                id = %self.identifier,
                error = %e,
                "push responses"
            );
        }
    }

    async fn push_justifications(&self, bundle: &JustificationBundle) {
        if let Err(e) =
            self.push(KyberMessageType::Justification, bundle).await
        {
            tracing::error!(
                id = %self.identifier,
                error = %e,
                "push justifications"
            );
        }
    }
}
