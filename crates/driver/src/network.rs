use async_trait::async_trait;
use dkgnode_protocol::SignedTransport;

use crate::Result;

/// Transport used to reach the participants of a session.
///
/// Broadcasts must be delivered to every participant of the
/// session identified by the message, including the sender.
#[async_trait]
pub trait Network: Send + Sync {
    /// Broadcast a signed message to the session participants.
    async fn broadcast_dkg_message(
        &self,
        message: &SignedTransport,
    ) -> Result<()>;
}
