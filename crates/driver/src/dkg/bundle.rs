//! Bundles exchanged by the DKG sub-protocol.
//!
//! Bundles travel JSON encoded inside a
//! [KyberMessage](dkgnode_protocol::KyberMessage).
use bls12_381::{G1Affine, Scalar};
use serde::{Deserialize, Serialize};

use super::{Error, PubPoly};
use crate::bls::{g1_from_bytes, scalar_from_be_bytes, scalar_to_be_bytes};

/// Encrypted share for a single recipient.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    /// Index of the recipient.
    pub share_index: u64,
    /// Share encrypted to the recipient exchange key.
    #[serde(with = "hex::serde")]
    pub encrypted_share: Vec<u8>,
}

/// Deals of a dealer with the commitments to its polynomial.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealBundle {
    /// Index of the dealer.
    pub dealer_index: u64,
    /// Deals for every node.
    pub deals: Vec<Deal>,
    /// Compressed commitments to the dealer polynomial.
    pub public: Vec<String>,
    /// Session nonce.
    #[serde(with = "hex::serde")]
    pub session_id: Vec<u8>,
}

impl DealBundle {
    /// Decode the commitments.
    pub fn public_poly(&self) -> Result<PubPoly, Error> {
        let commits = self
            .public
            .iter()
            .map(|c| {
                let bytes = hex::decode(c)
                    .map_err(|_| Error::InvalidBundle("commitment"))?;
                g1_from_bytes(&bytes)
                    .map_err(|_| Error::InvalidBundle("commitment"))
            })
            .collect::<Result<Vec<G1Affine>, Error>>()?;
        Ok(PubPoly::new(commits))
    }

    /// Encode commitments for a bundle.
    pub fn encode_public(poly: &PubPoly) -> Vec<String> {
        poly.commits()
            .iter()
            .map(|c| hex::encode(c.to_compressed()))
            .collect()
    }
}

/// Status of a deal as seen by a share holder.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Index of the dealer.
    pub dealer_index: u64,
    /// Whether the deal was received and valid.
    pub status: bool,
}

/// Responses of a share holder to every dealer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBundle {
    /// Index of the share holder.
    pub share_index: u64,
    /// Response per dealer.
    pub responses: Vec<Response>,
    /// Session nonce.
    #[serde(with = "hex::serde")]
    pub session_id: Vec<u8>,
}

/// Plaintext share revealed by a dealer for a complaint.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Justification {
    /// Index of the complaining share holder.
    pub share_index: u64,
    /// Big-endian share scalar.
    #[serde(with = "hex::serde")]
    pub share: Vec<u8>,
}

impl Justification {
    /// Create a justification for a share.
    pub fn new(share_index: u64, share: &Scalar) -> Self {
        Self {
            share_index,
            share: scalar_to_be_bytes(share).to_vec(),
        }
    }

    /// Decode the revealed share.
    pub fn share(&self) -> Result<Scalar, Error> {
        scalar_from_be_bytes(&self.share)
            .map_err(|_| Error::InvalidBundle("justification share"))
    }
}

/// Justifications of a dealer for complaints against it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JustificationBundle {
    /// Index of the dealer.
    pub dealer_index: u64,
    /// Revealed shares.
    pub justifications: Vec<Justification>,
    /// Session nonce.
    #[serde(with = "hex::serde")]
    pub session_id: Vec<u8>,
}

/// Any bundle of the sub-protocol.
#[derive(Debug, Clone)]
pub enum Bundle {
    /// Deal bundle.
    Deal(DealBundle),
    /// Response bundle.
    Response(ResponseBundle),
    /// Justification bundle.
    Justification(JustificationBundle),
}

impl Bundle {
    /// Index of the node that authored the bundle.
    pub fn author(&self) -> u64 {
        match self {
            Self::Deal(bundle) => bundle.dealer_index,
            Self::Response(bundle) => bundle.share_index,
            Self::Justification(bundle) => bundle.dealer_index,
        }
    }
}
