//! Pedersen distributed key generation over BLS12-381.
//!
//! Every node deals a random polynomial, encrypting the share
//! for each other node to its ephemeral exchange key and
//! broadcasting Feldman commitments. Share holders respond
//! to each dealer with a success or a complaint, dealers
//! answer complaints by revealing the disputed shares and
//! dealers that cannot justify themselves are disqualified.
//!
//! The qualified set contributes to the distributed key, the
//! group public key is the sum of the qualified constant term
//! commitments.
//!
//! Phases are driven by a [TimePhaser], bundles arrive through
//! the [Incoming] queues and are sent through a [Board].
use async_trait::async_trait;
use bls12_381::{G1Affine, Scalar};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

mod bundle;
mod ecies;
mod phaser;
mod poly;
mod protocol;

pub use bundle::*;
pub use phaser::{Phase, TimePhaser};
pub use poly::*;
pub use protocol::{DkgHandle, Protocol};

/// Errors generated by the sub-protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when the configuration is not valid.
    #[error("invalid dkg config: {0}")]
    InvalidConfig(String),

    /// Error generated when the long-term key is not one
    /// of the nodes.
    #[error("long-term public key is not in the node list")]
    NotInNodes,

    /// Error generated when too few dealers qualify.
    #[error("only {0} qualified dealers, threshold is {1}")]
    NotEnoughQualified(usize, usize),

    /// Error generated when a bundle field is malformed.
    #[error("invalid bundle {0}")]
    InvalidBundle(&'static str),

    /// Error generated by deal encryption.
    #[error("deal encryption failed: {0}")]
    Encryption(&'static str),

    /// Error generated when the protocol stops before finishing.
    #[error("dkg protocol cancelled")]
    Cancelled,
}

/// Participant of the sub-protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Node {
    /// Share index of the node.
    pub index: u64,
    /// Ephemeral public key of the node.
    pub public: G1Affine,
}

/// Configuration for a protocol run.
#[derive(Clone)]
pub struct Config {
    /// Ephemeral secret of the local node.
    pub longterm: Scalar,
    /// Session nonce, every bundle must carry it.
    pub nonce: [u8; 32],
    /// All participating nodes.
    pub nodes: Vec<Node>,
    /// Number of shares needed to reconstruct the key.
    pub threshold: usize,
    /// Duration of each phase.
    pub phase_interval: Duration,
}

/// Secret share with its index.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct PriShare {
    /// Share index.
    pub index: u64,
    /// Share value.
    pub value: Scalar,
}

impl std::fmt::Debug for PriShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriShare")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Distributed key share of the local node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DistKeyShare {
    /// Commitments to the distributed polynomial.
    pub commits: Vec<G1Affine>,
    /// Local share.
    pub share: PriShare,
}

impl DistKeyShare {
    /// Public polynomial of the distributed key.
    pub fn public_poly(&self) -> PubPoly {
        PubPoly::new(self.commits.clone())
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct DkgResult {
    /// Indices of the qualified dealers.
    pub qual: Vec<u64>,
    /// Distributed key share.
    pub key: DistKeyShare,
}

/// Outbound side of the bundle board.
///
/// Implementations broadcast to every node, including the
/// sender. Failures are handled by the implementation.
#[async_trait]
pub trait Board: Send + Sync {
    /// Broadcast a deal bundle.
    async fn push_deals(&self, bundle: &DealBundle);

    /// Broadcast a response bundle.
    async fn push_responses(&self, bundle: &ResponseBundle);

    /// Broadcast a justification bundle.
    async fn push_justifications(&self, bundle: &JustificationBundle);
}

/// Inbound bundle queues for a protocol run.
pub struct Incoming {
    /// Deal bundles.
    pub deals: mpsc::Receiver<DealBundle>,
    /// Response bundles.
    pub responses: mpsc::Receiver<ResponseBundle>,
    /// Justification bundles.
    pub justifications: mpsc::Receiver<JustificationBundle>,
}
