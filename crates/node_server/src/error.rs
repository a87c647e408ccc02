use dkgnode_protocol::OperatorId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors generated by the node server.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when a path is not a file.
    #[error("path {0} is not a file")]
    NotFile(PathBuf),

    /// Error generated when a file has no parent directory.
    #[error("no parent directory")]
    NoParentDir,

    /// Error generated when the keystore is not configured.
    #[error("keystore path is required")]
    KeyFileRequired,

    /// Error generated when a key file does not exist.
    #[error("key file {0} not found")]
    KeyNotFound(PathBuf),

    /// Error generated when the session timeout does not
    /// leave room for the sub-protocol phases.
    #[error("session-timeout must be greater than three phase intervals")]
    SessionTimeoutConfig,

    /// Error generated when the local operator is missing
    /// from the operator directory.
    #[error("operator {0} is not in the operator directory")]
    OperatorNotListed(OperatorId),

    /// Error generated when the keystore does not match the
    /// directory entry of the local operator.
    #[error("keystore does not match the public key of operator {0}")]
    KeyMismatch(OperatorId),

    /// Error generated by the driver library.
    #[error(transparent)]
    Driver(#[from] dkgnode_driver::Error),

    /// Error generated by the protocol library.
    #[error(transparent)]
    Protocol(#[from] dkgnode_protocol::Error),

    /// Error generated parsing the config file.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Error generated by the HTTP client.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Error generated parsing URLs.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// Error generated by input/output.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
