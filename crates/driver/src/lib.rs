//! Threshold BLS key generation for Ethereum validator keys.
//!
//! A [Controller] owns the key generation sessions of the local
//! operator. Each [Instance] exchanges ephemeral keys with the
//! other operators, runs the Pedersen DKG sub-protocol through
//! its [Board], derives the BLS key share, signs the deposit
//! data and checks that every operator reached the same
//! validator public key.
//!
//! The network and storage backends are supplied by the
//! caller through the [Network] and [Storage] traits.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod board;
pub mod bls;
mod controller;
pub mod crypto;
pub mod deposit;
pub mod dkg;
mod error;
mod instance;
pub mod keypair;
mod network;
mod storage;
mod types;

pub use board::Board;
pub use controller::{validate_init, Controller};
pub use error::Error;
pub use instance::{Instance, InstanceState};
pub use network::Network;
pub use storage::{MemoryStorage, Storage};
pub use types::*;

pub use dkgnode_protocol as protocol;
pub use rsa;

/// Result type for the driver library.
pub type Result<T> = std::result::Result<T, Error>;
