//! Operator signatures and share encryption.
//!
//! Transport messages are signed with RSASSA-PSS over the
//! SHA-256 digest of their canonical encoding, the salt length
//! equals the digest size. Secret shares are encrypted to the
//! owning operator with RSA PKCS#1 v1.5.
use dkgnode_protocol::{encode, SignedTransport, Transport};
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Sign arbitrary bytes.
pub fn sign(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    let digest = Sha256::digest(data);
    Ok(key.sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), &digest)?)
}

/// Verify a signature over arbitrary bytes.
pub fn verify(
    key: &RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<()> {
    let digest = Sha256::digest(data);
    Ok(key.verify(Pss::new::<Sha256>(), &digest, signature)?)
}

/// Canonical bytes of a transport message covered by signatures.
pub async fn signing_bytes(message: &Transport) -> Result<Vec<u8>> {
    Ok(encode(message)
        .await
        .map_err(dkgnode_protocol::Error::from)?)
}

/// Sign a transport message.
pub async fn sign_transport(
    key: &RsaPrivateKey,
    signer: u64,
    message: Transport,
) -> Result<SignedTransport> {
    let bytes = signing_bytes(&message).await?;
    let signature = sign(key, &bytes)?;
    Ok(SignedTransport {
        message,
        signer,
        signature,
    })
}

/// Verify the signature of a signed transport message.
pub async fn verify_transport(
    key: &RsaPublicKey,
    message: &SignedTransport,
) -> Result<()> {
    let bytes = signing_bytes(&message.message).await?;
    verify(key, &bytes, &message.signature)
        .map_err(|_| Error::InvalidSignature(message.signer))
}

/// Encrypt data to a public key.
pub fn encrypt(key: &RsaPublicKey, data: &[u8]) -> Result<Vec<u8>> {
    Ok(key.encrypt(&mut OsRng, Pkcs1v15Encrypt, data)?)
}

/// Decrypt data encrypted with [encrypt].
pub fn decrypt(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    Ok(key.decrypt(Pkcs1v15Encrypt, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::generate_keypair;
    use anyhow::Result;
    use dkgnode_protocol::{Identifier, TransportType};

    fn transport() -> Transport {
        Transport {
            kind: TransportType::Exchange,
            identifier: Identifier::new([1u8; 20], 9),
            data: b"exchange".to_vec(),
        }
    }

    #[tokio::test]
    async fn transport_signature() -> Result<()> {
        let key = generate_keypair(1024)?;
        let public = key.to_public_key();
        let signed = sign_transport(&key, 1, transport()).await?;
        verify_transport(&public, &signed).await?;

        let mut tampered = signed.clone();
        tampered.message.data[0] ^= 0x01;
        assert!(matches!(
            verify_transport(&public, &tampered).await,
            Err(Error::InvalidSignature(1))
        ));

        let mut tampered = signed.clone();
        tampered.signature[0] ^= 0x01;
        assert!(verify_transport(&public, &tampered).await.is_err());

        let other = generate_keypair(1024)?;
        assert!(verify_transport(&other.to_public_key(), &signed)
            .await
            .is_err());
        Ok(())
    }

    #[test]
    fn encrypt_for_self() -> Result<()> {
        let key = generate_keypair(1024)?;
        let secret = [7u8; 32];
        let ciphertext = encrypt(&key.to_public_key(), &secret)?;
        assert_ne!(secret.as_slice(), ciphertext.as_slice());
        assert_eq!(secret.to_vec(), decrypt(&key, &ciphertext)?);
        Ok(())
    }
}
