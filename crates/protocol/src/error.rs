use thiserror::Error;

/// Errors generated by the protocol library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when the encoding identity bytes are wrong.
    #[error("bad encoding identity bytes")]
    BadEncodingIdentity,

    /// Error generated when the encoding version is not supported.
    #[error("unknown encoding version, expected {0} but got {1}")]
    EncodingVersion(u16, u16),

    /// Error generated when an encoded type tag is unknown.
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),

    /// Error generated when a payload exceeds the maximum size.
    #[error("payload of {0} bytes exceeds limit of {1}")]
    PayloadTooLarge(usize, usize),

    /// Error generated when a session lists too many operators.
    #[error("{0} operators exceeds limit of {1}")]
    TooManyOperators(usize, usize),

    /// Error generated when a fixed length field has the wrong size.
    #[error("field '{0}' expects {1} bytes but got {2}")]
    FieldLength(&'static str, usize, usize),

    /// Error generated parsing a hex-encoded identifier.
    #[error("invalid identifier, expected {0} hex encoded bytes")]
    InvalidIdentifier(usize),

    /// Error generated by hex decoding.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),

    /// Error generated by input/output.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
