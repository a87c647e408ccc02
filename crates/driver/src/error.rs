use dkgnode_protocol::{Identifier, OperatorId, TransportType};
use thiserror::Error;

use crate::instance::InstanceState;

/// Errors generated by the driver library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when a message signer is not a
    /// participant of the session.
    #[error("operator {0} is not a participant of the session")]
    UnknownSigner(OperatorId),

    /// Error generated when a message signature does not verify.
    #[error("invalid signature from operator {0}")]
    InvalidSignature(OperatorId),

    /// Error generated when an operator sends a second message
    /// of a kind that is accepted once.
    #[error("duplicate {0} message from operator {1}")]
    DuplicateMessage(TransportType, OperatorId),

    /// Error generated when a message kind is not valid
    /// for the receiver.
    #[error("unexpected message type {0}")]
    UnknownMessageType(TransportType),

    /// Error generated when a session already exists.
    #[error("session {0} already exists")]
    SessionAlreadyExists(Identifier),

    /// Error generated when a session does not exist.
    #[error("session {0} not found")]
    SessionNotFound(Identifier),

    /// Error generated when an operator cannot be found
    /// in storage.
    #[error("failed to resolve operator {0}")]
    OperatorResolutionFailed(OperatorId),

    /// Error generated when the share index returned by the
    /// sub-protocol is not the operator identifier.
    #[error("share index {1} does not match operator {0}")]
    ShareIndexMismatch(OperatorId, u64),

    /// Error generated when an operator reports a different
    /// validator public key.
    #[error("operator {0} reported an inconsistent validator key")]
    ValidatorKeyInconsistency(OperatorId),

    /// Error generated by the DKG sub-protocol.
    #[error(transparent)]
    SubProtocol(#[from] crate::dkg::Error),

    /// Error generated by a storage backend.
    #[error("storage: {0}")]
    StorageFailure(String),

    /// Error generated by a network backend.
    #[error("network: {0}")]
    Network(String),

    /// Error generated when an init message is not valid.
    #[error("invalid init: {0}")]
    InvalidInit(String),

    /// Error generated when the local operator is not
    /// listed in an init message.
    #[error("operator {0} is not listed in the init message")]
    NotParticipant(OperatorId),

    /// Error generated for reshare requests.
    #[error("resharing is not supported")]
    ReshareNotSupported,

    /// Error generated when a message arrives for a session
    /// that can no longer progress.
    #[error("session {0} is halted in phase {1:?}")]
    SessionHalted(Identifier, InstanceState),

    /// Error generated when a session is started twice.
    #[error("session {0} has already started")]
    AlreadyStarted(Identifier),

    /// Error generated when a sub-protocol bundle is not
    /// authored by the transport signer.
    #[error("bundle for index {1} was sent by operator {0}")]
    BundleSender(OperatorId, u64),

    /// Error generated when a point or scalar encoding is invalid.
    #[error("invalid {0} encoding")]
    InvalidEncoding(&'static str),

    /// Error generated when a PEM key has an unexpected tag.
    #[error("unexpected PEM tag '{0}'")]
    PemTag(String),

    /// Error generated decoding or encoding the protocol.
    #[error(transparent)]
    Decode(#[from] dkgnode_protocol::Error),

    /// Error generated by RSA operations.
    #[error(transparent)]
    Rsa(#[from] rsa::Error),

    /// Error generated by PKCS#1 key encoding.
    #[error(transparent)]
    Pkcs1(#[from] rsa::pkcs1::Error),

    /// Error generated by PKCS#8 key encoding.
    #[error(transparent)]
    Pkcs8(#[from] rsa::pkcs8::Error),

    /// Error generated by public key encoding.
    #[error(transparent)]
    Spki(#[from] rsa::pkcs8::spki::Error),

    /// Error generated by PEM parsing.
    #[error(transparent)]
    Pem(#[from] pem::PemError),

    /// Error generated by JSON serialization.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Error generated by input/output.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Determine if this error was caused by malformed input
    /// rather than local processing.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}
