//! Server configuration.
use dkgnode_driver::{
    keypair::{decode_private_key, decode_public_key},
    DkgOptions, Operator, OperatorOwner,
};
use dkgnode_protocol::OperatorId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

use crate::{Error, Result};

/// Configuration for an operator node.
#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Identifier of the local operator.
    pub operator_id: OperatorId,

    /// Path to the PEM encoded operator private key.
    pub keystore: PathBuf,

    /// Operator directory.
    pub operators: Vec<OperatorConfig>,

    /// Timing for key generation sessions.
    pub dkg: DkgOptions,

    /// Configuration for TLS encryption.
    pub tls: Option<TlsConfig>,
}

/// Directory entry for an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OperatorConfig {
    /// Operator identifier.
    pub id: OperatorId,

    /// Path to the PEM encoded public key or the PEM itself.
    pub public_key: String,

    /// Base URL of the operator node.
    pub url: Option<Url>,
}

/// Certificate and key for TLS.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to the certificate.
    pub cert: PathBuf,
    /// Path to the certificate key file.
    pub key: PathBuf,
}

/// Configuration with the keys it references.
pub struct LoadedConfig {
    /// Parsed configuration.
    pub config: ServerConfig,
    /// Local operator.
    pub owner: OperatorOwner,
    /// Operator directory.
    pub operators: Vec<Operator>,
}

impl ServerConfig {
    /// Load a server config from a file path.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<LoadedConfig> {
        if !fs::try_exists(path.as_ref()).await? {
            return Err(Error::NotFile(path.as_ref().to_path_buf()));
        }

        let contents = fs::read_to_string(path.as_ref()).await?;
        let mut config: ServerConfig = toml::from_str(&contents)?;

        if config.dkg.session_timeout()
            <= config.dkg.phase_interval().saturating_mul(3)
        {
            return Err(Error::SessionTimeoutConfig);
        }

        if config.keystore == PathBuf::default() {
            return Err(Error::KeyFileRequired);
        }

        let dir = Self::directory(path.as_ref())?;

        if config.keystore.is_relative() {
            config.keystore = dir.join(&config.keystore);
        }

        if !fs::try_exists(&config.keystore).await? {
            return Err(Error::KeyNotFound(config.keystore.clone()));
        }

        let contents = fs::read_to_string(&config.keystore).await?;
        let owner =
            OperatorOwner::new(config.operator_id, decode_private_key(contents)?);

        let mut operators = Vec::with_capacity(config.operators.len());
        for entry in &config.operators {
            let pem = if entry.public_key.trim_start().starts_with("-----BEGIN") {
                entry.public_key.clone()
            } else {
                let mut key_path = PathBuf::from(&entry.public_key);
                if key_path.is_relative() {
                    key_path = dir.join(key_path);
                }
                if !fs::try_exists(&key_path).await? {
                    return Err(Error::KeyNotFound(key_path));
                }
                fs::read_to_string(&key_path).await?
            };
            operators.push(Operator {
                id: entry.id,
                public_key: decode_public_key(pem)?,
            });
        }

        let local = operators
            .iter()
            .find(|o| o.id == config.operator_id)
            .ok_or(Error::OperatorNotListed(config.operator_id))?;
        if local.public_key != owner.private_key.to_public_key() {
            return Err(Error::KeyMismatch(config.operator_id));
        }

        if let Some(tls) = config.tls.as_mut() {
            if tls.cert.is_relative() {
                tls.cert = dir.join(&tls.cert).canonicalize()?;
            }
            if tls.key.is_relative() {
                tls.key = dir.join(&tls.key).canonicalize()?;
            }
        }

        Ok(LoadedConfig {
            config,
            owner,
            operators,
        })
    }

    /// Base URLs of every operator node in the directory.
    pub fn peers(&self) -> Vec<Url> {
        self.operators.iter().filter_map(|o| o.url.clone()).collect()
    }

    /// Parent directory of the configuration file.
    fn directory(file: impl AsRef<Path>) -> Result<PathBuf> {
        file.as_ref()
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| Error::NoParentDir)
    }
}
