//! Ethereum deposit message signing root.
//!
//! The partial signatures produced by each operator cover
//! the signing root of the deposit message for the validator
//! key, computed with the SSZ hash tree root rules.
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Deposit domain type.
pub const DOMAIN_DEPOSIT: [u8; 4] = [0x03, 0x00, 0x00, 0x00];

/// Deposit amount in Gwei.
pub const MAX_EFFECTIVE_BALANCE: u64 = 32_000_000_000;

/// Length of withdrawal credentials in a deposit message.
pub const WITHDRAWAL_CREDENTIALS_LEN: usize = 32;

/// SSZ chunk.
pub type Chunk = [u8; 32];

fn hash(left: &[u8], right: &[u8]) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn chunk(bytes: &[u8]) -> Chunk {
    let mut chunk = [0u8; 32];
    chunk[..bytes.len()].copy_from_slice(bytes);
    chunk
}

fn pubkey_root(pubkey: &[u8; 48]) -> Chunk {
    hash(&chunk(&pubkey[..32]), &chunk(&pubkey[32..]))
}

/// Hash tree root of a deposit message.
pub fn deposit_message_root(
    pubkey: &[u8; 48],
    withdrawal_credentials: &[u8],
    amount: u64,
) -> Result<Chunk> {
    if withdrawal_credentials.len() > WITHDRAWAL_CREDENTIALS_LEN {
        return Err(Error::InvalidInit(format!(
            "withdrawal credentials must be at most {} bytes",
            WITHDRAWAL_CREDENTIALS_LEN
        )));
    }
    let left = hash(&pubkey_root(pubkey), &chunk(withdrawal_credentials));
    let right = hash(&chunk(&amount.to_le_bytes()), &[0u8; 32]);
    Ok(hash(&left, &right))
}

/// Signing domain for deposits under a fork version.
///
/// Deposits are valid across forks so the genesis validators
/// root is always zero.
pub fn compute_deposit_domain(fork_version: &[u8; 4]) -> Chunk {
    let fork_data_root = hash(&chunk(fork_version), &[0u8; 32]);
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(&DOMAIN_DEPOSIT);
    domain[4..].copy_from_slice(&fork_data_root[..28]);
    domain
}

/// Signing root of a deposit message.
pub fn deposit_signing_root(
    pubkey: &[u8; 48],
    withdrawal_credentials: &[u8],
    fork_version: &[u8; 4],
) -> Result<Chunk> {
    let object_root = deposit_message_root(
        pubkey,
        withdrawal_credentials,
        MAX_EFFECTIVE_BALANCE,
    )?;
    let domain = compute_deposit_domain(fork_version);
    Ok(hash(&object_root, &domain))
}
