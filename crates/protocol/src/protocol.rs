use crate::{
    encoding::types, Error, Result, ADDRESS_LEN, FORK_VERSION_LEN,
    IDENTIFIER_LEN,
};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Operator identifier assigned by the operator registry.
pub type OperatorId = u64;

/// Unique identifier for a DKG session.
///
/// The first 20 bytes are the initiator address and the
/// last 4 bytes are a little-endian request nonce.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Identifier([u8; IDENTIFIER_LEN]);

impl Identifier {
    /// Create an identifier from an address and nonce.
    ///
    /// Addresses longer than 20 bytes are truncated and
    /// shorter addresses are zero padded.
    pub fn new(address: impl AsRef<[u8]>, nonce: u32) -> Self {
        let address = address.as_ref();
        let len = address.len().min(ADDRESS_LEN);
        let mut id = [0u8; IDENTIFIER_LEN];
        id[..len].copy_from_slice(&address[..len]);
        id[ADDRESS_LEN..].copy_from_slice(&nonce.to_le_bytes());
        Self(id)
    }

    /// Create a random identifier.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let address: [u8; ADDRESS_LEN] = rng.gen();
        Self::new(address, rng.gen())
    }

    /// Initiator address.
    pub fn address(&self) -> &[u8] {
        &self.0[..ADDRESS_LEN]
    }

    /// Request nonce.
    pub fn nonce(&self) -> u32 {
        let mut nonce = [0u8; 4];
        nonce.copy_from_slice(&self.0[ADDRESS_LEN..]);
        u32::from_le_bytes(nonce)
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; IDENTIFIER_LEN]> for Identifier {
    fn from(value: [u8; IDENTIFIER_LEN]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Identifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        let id: [u8; IDENTIFIER_LEN] = value.try_into().map_err(|_| {
            Error::FieldLength("identifier", IDENTIFIER_LEN, value.len())
        })?;
        Ok(Self(id))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        if bytes.len() != IDENTIFIER_LEN {
            return Err(Error::InvalidIdentifier(IDENTIFIER_LEN));
        }
        Self::try_from(bytes.as_slice())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of payload carried by a transport message.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq)]
pub enum TransportType {
    /// Request to start a new key generation session.
    #[default]
    Init,
    /// Request to reshare an existing key.
    InitReshare,
    /// Ephemeral exchange public key.
    Exchange,
    /// Opaque message of the DKG sub-protocol.
    KyberWrapped,
    /// Final key generation output of an operator.
    Output,
}

impl From<&TransportType> for u8 {
    fn from(value: &TransportType) -> Self {
        match value {
            TransportType::Init => types::TRANSPORT_INIT,
            TransportType::InitReshare => types::TRANSPORT_INIT_RESHARE,
            TransportType::Exchange => types::TRANSPORT_EXCHANGE,
            TransportType::KyberWrapped => types::TRANSPORT_KYBER,
            TransportType::Output => types::TRANSPORT_OUTPUT,
        }
    }
}

impl TryFrom<u8> for TransportType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            types::TRANSPORT_INIT => TransportType::Init,
            types::TRANSPORT_INIT_RESHARE => TransportType::InitReshare,
            types::TRANSPORT_EXCHANGE => TransportType::Exchange,
            types::TRANSPORT_KYBER => TransportType::KyberWrapped,
            types::TRANSPORT_OUTPUT => TransportType::Output,
            _ => return Err(Error::UnknownMessageType(value)),
        })
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::InitReshare => "init_reshare",
            Self::Exchange => "exchange",
            Self::KyberWrapped => "kyber",
            Self::Output => "output",
        };
        write!(f, "{}", name)
    }
}

/// Typed envelope for messages sent to a session.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Transport {
    /// Kind of payload.
    pub kind: TransportType,
    /// Session identifier.
    pub identifier: Identifier,
    /// Encoded payload.
    pub data: Vec<u8>,
}

/// Transport envelope signed by an operator.
///
/// The signature covers the canonical encoding of
/// the transport message.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct SignedTransport {
    /// Signed message.
    pub message: Transport,
    /// Operator that produced the signature.
    pub signer: OperatorId,
    /// Signature bytes.
    pub signature: Vec<u8>,
}

/// Parameters for a new key generation session.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Init {
    /// Participating operators.
    pub operators: Vec<OperatorId>,
    /// Number of shares required to reconstruct the key.
    pub threshold: u64,
    /// Withdrawal credentials for the deposit data.
    pub withdrawal_credentials: Vec<u8>,
    /// Fork version for the deposit signing domain.
    pub fork: [u8; FORK_VERSION_LEN],
}

/// Ephemeral public key of an operator for the session.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Exchange {
    /// Compressed public key bytes.
    pub public_key: Vec<u8>,
}

/// Kind of a DKG sub-protocol message.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq)]
pub enum KyberMessageType {
    /// Bundle of encrypted deals.
    #[default]
    Deal,
    /// Bundle of responses to deals.
    Response,
    /// Bundle of justifications for complaints.
    Justification,
}

impl From<&KyberMessageType> for u8 {
    fn from(value: &KyberMessageType) -> Self {
        match value {
            KyberMessageType::Deal => types::KYBER_DEAL,
            KyberMessageType::Response => types::KYBER_RESPONSE,
            KyberMessageType::Justification => {
                types::KYBER_JUSTIFICATION
            }
        }
    }
}

impl TryFrom<u8> for KyberMessageType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            types::KYBER_DEAL => KyberMessageType::Deal,
            types::KYBER_RESPONSE => KyberMessageType::Response,
            types::KYBER_JUSTIFICATION => KyberMessageType::Justification,
            _ => return Err(Error::UnknownMessageType(value)),
        })
    }
}

/// Wrapper for a DKG sub-protocol message.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct KyberMessage {
    /// Kind of bundle.
    pub kind: KyberMessageType,
    /// Encoded bundle.
    pub data: Vec<u8>,
}

/// Key generation result of a single operator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Output {
    /// Secret key share encrypted to the operator key.
    pub encrypted_share: Vec<u8>,
    /// Public key of the secret key share.
    pub share_public_key: Vec<u8>,
    /// Compressed validator public key.
    pub validator_public_key: [u8; 48],
    /// Partial signature over the deposit data signing root.
    pub deposit_data_partial_signature: [u8; 96],
}

impl Default for Output {
    fn default() -> Self {
        Self {
            encrypted_share: Vec::new(),
            share_public_key: Vec::new(),
            validator_public_key: [0u8; 48],
            deposit_data_partial_signature: [0u8; 96],
        }
    }
}
