//! Encryption of deals to the ephemeral G1 key of a node.
//!
//! The ciphertext is the compressed ephemeral point followed by
//! the AES-256-GCM sealed message. The symmetric key is derived
//! with HKDF-SHA256 from the Diffie-Hellman point and bound to
//! the session nonce.
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use bls12_381::{G1Affine, G1Projective, Scalar};
use ff::Field;
use group::Curve;
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use super::Error;

const POINT_LEN: usize = 48;
const INFO: &[u8] = b"dkgnode deal encryption";

fn derive_key(
    shared: &G1Affine,
    ephemeral: &[u8],
    nonce: &[u8],
) -> Result<Aes256Gcm, Error> {
    let mut ikm = shared.to_compressed().to_vec();
    ikm.extend_from_slice(ephemeral);
    let hk = Hkdf::<Sha256>::new(Some(nonce), &ikm);
    let mut key = [0u8; 32];
    hk.expand(INFO, &mut key)
        .map_err(|_| Error::Encryption("key derivation"))?;
    Aes256Gcm::new_from_slice(&key)
        .map_err(|_| Error::Encryption("key length"))
}

/// Encrypt a message to a public key.
pub fn encrypt<R: RngCore + CryptoRng>(
    public: &G1Affine,
    message: &[u8],
    nonce: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, Error> {
    let r = Scalar::random(&mut *rng);
    let ephemeral = (G1Projective::generator() * r).to_affine().to_compressed();
    let shared = (G1Projective::from(public) * r).to_affine();
    let cipher = derive_key(&shared, &ephemeral, nonce)?;
    // key is unique per message
    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&[0u8; 12]),
            Payload {
                msg: message,
                aad: nonce,
            },
        )
        .map_err(|_| Error::Encryption("seal"))?;
    let mut ciphertext = ephemeral.to_vec();
    ciphertext.extend(sealed);
    Ok(ciphertext)
}

/// Decrypt a message with a secret key.
pub fn decrypt(
    secret: &Scalar,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>, Error> {
    if ciphertext.len() < POINT_LEN {
        return Err(Error::Encryption("ciphertext length"));
    }
    let (ephemeral, sealed) = ciphertext.split_at(POINT_LEN);
    let point: [u8; POINT_LEN] = ephemeral
        .try_into()
        .map_err(|_| Error::Encryption("ciphertext length"))?;
    let point: G1Affine = Option::from(G1Affine::from_compressed(&point))
        .ok_or(Error::Encryption("ephemeral point"))?;
    let shared = (G1Projective::from(point) * secret).to_affine();
    let cipher = derive_key(&shared, ephemeral, nonce)?;
    cipher
        .decrypt(
            Nonce::from_slice(&[0u8; 12]),
            Payload {
                msg: sealed,
                aad: nonce,
            },
        )
        .map_err(|_| Error::Encryption("open"))
}
