//! Helper functions for working with operator RSA keys.
use crate::{Error, Result};
use pem::Pem;
use rsa::{
    pkcs1::{
        DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey,
        EncodeRsaPublicKey,
    },
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    RsaPrivateKey, RsaPublicKey,
};

/// Tag for PKCS#1 private keys.
pub const PEM_RSA_PRIVATE: &str = "RSA PRIVATE KEY";

/// Tag for PKCS#1 public keys.
pub const PEM_RSA_PUBLIC: &str = "RSA PUBLIC KEY";

/// Tag for PKCS#8 private keys.
pub const PEM_PRIVATE: &str = "PRIVATE KEY";

/// Tag for SPKI public keys.
pub const PEM_PUBLIC: &str = "PUBLIC KEY";

/// Default size in bits for generated operator keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Generate a new operator key.
pub fn generate_keypair(bits: usize) -> Result<RsaPrivateKey> {
    Ok(RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)?)
}

/// Encode a private key as PKCS#1 PEM.
pub fn encode_private_key(key: &RsaPrivateKey) -> Result<String> {
    let der = key.to_pkcs1_der()?;
    Ok(pem::encode(&Pem::new(PEM_RSA_PRIVATE, der.as_bytes())))
}

/// Encode a public key as PKCS#1 PEM.
pub fn encode_public_key(key: &RsaPublicKey) -> Result<String> {
    let der = key.to_pkcs1_der()?;
    Ok(pem::encode(&Pem::new(PEM_RSA_PUBLIC, der.as_bytes())))
}

/// Decode a PKCS#1 or PKCS#8 PEM private key.
pub fn decode_private_key(pem: impl AsRef<[u8]>) -> Result<RsaPrivateKey> {
    let pem = pem::parse(pem)?;
    match pem.tag() {
        PEM_RSA_PRIVATE => Ok(RsaPrivateKey::from_pkcs1_der(pem.contents())?),
        PEM_PRIVATE => Ok(RsaPrivateKey::from_pkcs8_der(pem.contents())?),
        tag => Err(Error::PemTag(tag.to_owned())),
    }
}

/// Decode a PKCS#1 or SPKI PEM public key.
pub fn decode_public_key(pem: impl AsRef<[u8]>) -> Result<RsaPublicKey> {
    let pem = pem::parse(pem)?;
    match pem.tag() {
        PEM_RSA_PUBLIC => Ok(RsaPublicKey::from_pkcs1_der(pem.contents())?),
        PEM_PUBLIC => Ok(RsaPublicKey::from_public_key_der(pem.contents())?),
        tag => Err(Error::PemTag(tag.to_owned())),
    }
}
