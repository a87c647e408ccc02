//! Generate an operator key.
use anyhow::{bail, Result};
use dkgnode_driver::keypair::{
    encode_private_key, encode_public_key, generate_keypair,
};
use std::path::PathBuf;
use tokio::fs;

/// Write a new RSA key to file.
pub async fn run(
    path: PathBuf,
    force: bool,
    public_key: Option<PathBuf>,
    bits: usize,
) -> Result<()> {
    if fs::try_exists(&path).await? && !force {
        bail!(
            "file {} already exists, use --force to overwrite",
            path.display()
        );
    }

    let key = generate_keypair(bits)?;
    fs::write(&path, encode_private_key(&key)?).await?;
    tracing::info!(path = %path.display(), bits, "wrote private key");

    if let Some(public_key) = public_key {
        fs::write(&public_key, encode_public_key(&key.to_public_key())?)
            .await?;
        tracing::info!(path = %public_key.display(), "wrote public key");
    }
    Ok(())
}
