use dkgnode_protocol::{Identifier, OperatorId, Output};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use crate::{bls::SecretShare, Network, Storage};

/// Registered operator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Operator {
    /// Operator identifier.
    pub id: OperatorId,
    /// Operator signing and encryption key.
    pub public_key: RsaPublicKey,
}

/// The local operator with its private key.
#[derive(Clone)]
pub struct OperatorOwner {
    /// Operator identifier.
    pub id: OperatorId,
    /// Operator private key.
    pub private_key: RsaPrivateKey,
}

impl OperatorOwner {
    /// Create the local operator.
    pub fn new(id: OperatorId, private_key: RsaPrivateKey) -> Self {
        Self { id, private_key }
    }

    /// Public view of the operator.
    pub fn operator(&self) -> Operator {
        Operator {
            id: self.id,
            public_key: self.private_key.to_public_key(),
        }
    }
}

impl std::fmt::Debug for OperatorOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorOwner")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Timing options for key generation sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DkgOptions {
    /// Duration of each sub-protocol phase in milliseconds.
    ///
    /// Default is 2 seconds.
    pub phase_interval: u64,

    /// Deadline for a session to finish in seconds.
    ///
    /// Default is 5 minutes.
    pub session_timeout: u64,

    /// Delay between accepting an init message and broadcasting
    /// the exchange key in milliseconds.
    ///
    /// Default is 1 second.
    pub start_delay: u64,
}

impl DkgOptions {
    /// Phase interval as a duration.
    pub fn phase_interval(&self) -> Duration {
        Duration::from_millis(self.phase_interval)
    }

    /// Session timeout as a duration.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout)
    }

    /// Start delay as a duration.
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay)
    }
}

impl Default for DkgOptions {
    fn default() -> Self {
        Self {
            phase_interval: 2000,
            session_timeout: 300,
            start_delay: 1000,
        }
    }
}

/// Configuration shared by the controller and its sessions.
#[derive(Clone)]
pub struct Config {
    /// Local operator.
    pub operator: Arc<OperatorOwner>,
    /// Network used to broadcast to session participants.
    pub network: Arc<dyn Network>,
    /// Operator directory and output storage.
    pub storage: Arc<dyn Storage>,
    /// Session timing.
    pub options: DkgOptions,
}

/// Final result of a key generation session.
#[derive(Debug, Clone)]
pub struct KeyGenOutput {
    /// Session identifier.
    pub identifier: Identifier,
    /// Local secret key share.
    pub share: SecretShare,
    /// Output reported by every operator, the local one included.
    pub outputs: BTreeMap<OperatorId, Output>,
    /// Compressed validator public key.
    pub validator_pk: [u8; 48],
    /// Number of shares needed to sign.
    pub threshold: u64,
}

/// Hex encoded output of one operator.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorOutput {
    /// Secret key share encrypted to the operator key.
    pub encrypted_share: String,
    /// Public key of the secret key share.
    pub share_public_key: String,
    /// Validator public key seen by the operator.
    pub validator_public_key: String,
    /// Partial signature over the deposit data signing root.
    pub deposit_data_signature: String,
}

impl From<&Output> for OperatorOutput {
    fn from(value: &Output) -> Self {
        Self {
            encrypted_share: hex::encode(&value.encrypted_share),
            share_public_key: hex::encode(&value.share_public_key),
            validator_public_key: hex::encode(value.validator_public_key),
            deposit_data_signature: hex::encode(
                value.deposit_data_partial_signature,
            ),
        }
    }
}

/// Public view of a key generation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyGenResult {
    /// Session identifier.
    pub identifier: Identifier,
    /// Hex encoded validator public key.
    pub validator_pk: String,
    /// Output of every operator.
    pub outputs: BTreeMap<OperatorId, OperatorOutput>,
    /// Number of shares needed to sign.
    pub threshold: u64,
}

impl From<&KeyGenOutput> for KeyGenResult {
    fn from(value: &KeyGenOutput) -> Self {
        Self {
            identifier: value.identifier,
            validator_pk: hex::encode(value.validator_pk),
            outputs: value
                .outputs
                .iter()
                .map(|(id, output)| (*id, OperatorOutput::from(output)))
                .collect(),
            threshold: value.threshold,
        }
    }
}
