//! HTTP server and peer network for a DKG operator node.
//!
//! Peers deliver encoded signed messages to `POST /consume`
//! and finished key generation results are available from
//! `GET /dkg/:validator_pk`.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod network;
mod server;

pub use config::{LoadedConfig, OperatorConfig, ServerConfig, TlsConfig};
pub use error::Error;
pub use network::HttpNetwork;
pub use server::{ApiResponse, NodeServer};

pub use axum;

/// Result type for the node server.
pub type Result<T> = std::result::Result<T, Error>;
