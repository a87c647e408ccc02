//! BLS12-381 helpers for validator keys and deposit signatures.
//!
//! Public keys live in G1 (48 bytes compressed) and signatures
//! in G2 (96 bytes compressed) as used by Ethereum validators.
use bls12_381::{
    hash_to_curve::{ExpandMsgXmd, HashToCurve},
    pairing, G1Affine, G1Projective, G2Affine, G2Projective, Scalar,
};
use group::Curve;

use crate::{
    dkg::{lagrange_coefficient, DistKeyShare, PubPoly},
    Error, Result,
};

/// Domain separation tag for the proof of possession ciphersuite.
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Secret key share of an operator.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct SecretShare(Scalar);

impl SecretShare {
    /// Scalar value of the share.
    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    /// Public key of the share.
    pub fn public_key(&self) -> G1Affine {
        (G1Projective::generator() * self.0).to_affine()
    }

    /// Big-endian encoding of the share.
    pub fn to_bytes(&self) -> [u8; 32] {
        scalar_to_be_bytes(&self.0)
    }

    /// Decode a big-endian encoded share.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self(scalar_from_be_bytes(bytes)?))
    }

    /// Sign a message with the share.
    pub fn sign(&self, message: &[u8]) -> [u8; 96] {
        let point = hash_to_g2(message) * self.0;
        point.to_affine().to_compressed()
    }
}

impl From<Scalar> for SecretShare {
    fn from(value: Scalar) -> Self {
        Self(value)
    }
}

impl std::fmt::Debug for SecretShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretShare(..)")
    }
}

/// Extract the local secret key share from a DKG result.
pub fn result_to_share_secret_key(result: &DistKeyShare) -> SecretShare {
    SecretShare(result.share.value)
}

/// Reconstruct the group public key from a DKG result.
pub fn results_to_validator_pk(result: &DistKeyShare) -> G1Affine {
    PubPoly::new(result.commits.clone()).eval(0).to_affine()
}

/// Hash a message onto G2.
pub fn hash_to_g2(message: &[u8]) -> G2Projective {
    <G2Projective as HashToCurve<ExpandMsgXmd<sha2_09::Sha256>>>::hash_to_curve(
        message, DST,
    )
}

/// Verify a compressed signature with a compressed public key.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let (Ok(public_key), Ok(signature)) =
        (g1_from_bytes(public_key), g2_from_bytes(signature))
    else {
        return false;
    };
    let hashed = hash_to_g2(message).to_affine();
    pairing(&public_key, &hashed)
        == pairing(&G1Affine::generator(), &signature)
}

/// Combine partial signatures by share index into a signature
/// of the group key.
///
/// Needs at least threshold partial signatures from distinct
/// operators to verify against the validator public key.
pub fn aggregate_partial_signatures(
    partials: &[(u64, Vec<u8>)],
) -> Result<[u8; 96]> {
    if partials.is_empty() {
        return Err(Error::InvalidEncoding("partial signatures"));
    }
    let indices: Vec<u64> = partials.iter().map(|(id, _)| *id).collect();
    let mut signature = G2Projective::identity();
    for (index, partial) in partials {
        let point = g2_from_bytes(partial)?;
        let coefficient = lagrange_coefficient(*index, &indices)
            .ok_or(Error::InvalidEncoding("partial signature index"))?;
        signature += G2Projective::from(point) * coefficient;
    }
    Ok(signature.to_affine().to_compressed())
}

/// Decode a compressed G1 point.
pub fn g1_from_bytes(bytes: &[u8]) -> Result<G1Affine> {
    let bytes: [u8; 48] = bytes
        .try_into()
        .map_err(|_| Error::InvalidEncoding("G1 point"))?;
    Option::from(G1Affine::from_compressed(&bytes))
        .ok_or(Error::InvalidEncoding("G1 point"))
}

/// Decode a compressed G2 point.
pub fn g2_from_bytes(bytes: &[u8]) -> Result<G2Affine> {
    let bytes: [u8; 96] = bytes
        .try_into()
        .map_err(|_| Error::InvalidEncoding("G2 point"))?;
    Option::from(G2Affine::from_compressed(&bytes))
        .ok_or(Error::InvalidEncoding("G2 point"))
}

/// Big-endian encoding of a scalar.
pub fn scalar_to_be_bytes(scalar: &Scalar) -> [u8; 32] {
    let mut bytes = scalar.to_bytes();
    bytes.reverse();
    bytes
}

/// Decode a big-endian encoded scalar.
pub fn scalar_from_be_bytes(bytes: &[u8]) -> Result<Scalar> {
    let mut bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::InvalidEncoding("scalar"))?;
    bytes.reverse();
    Option::from(Scalar::from_bytes(&bytes))
        .ok_or(Error::InvalidEncoding("scalar"))
}
