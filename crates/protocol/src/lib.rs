//! Transport messages and binary encoding for the threshold
//! validator key DKG node.
//!
//! Every message exchanged between operators is a
//! [SignedTransport] wrapping a typed [Transport] envelope.
//! The payload of the envelope is itself one of [Init],
//! [Exchange], [KyberMessage] or [Output] encoded with
//! [encode].
//!
//! # Size Limitations
//!
//! Decoding enforces the bounds in the constants module
//! before any buffer is allocated, payloads are limited
//! to 8MiB and a session may list at most 13 operators.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod constants;
pub(crate) mod encoding;
mod error;
mod protocol;

pub use constants::*;
pub use encoding::{decode, encode, VERSION};
pub use error::Error;
pub use protocol::*;

pub use hex;

/// Result type for the protocol library.
pub type Result<T> = std::result::Result<T, Error>;
