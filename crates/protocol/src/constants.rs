//! Size limits enforced by the wire encoding.

/// Length of the address prefix of a session identifier.
pub const ADDRESS_LEN: usize = 20;

/// Length of a session identifier (address and little-endian nonce).
pub const IDENTIFIER_LEN: usize = 24;

/// Maximum size of the payload carried by a transport message.
pub const MAX_PAYLOAD_SIZE: usize = 8_388_608;

/// Maximum number of operators in a session.
pub const MAX_OPERATORS: usize = 13;

/// Maximum size of an operator signature.
pub const MAX_SIGNATURE_SIZE: usize = 2048;

/// Maximum size of the withdrawal credentials in an init message.
pub const MAX_WITHDRAWAL_CREDENTIALS_SIZE: usize = 256;

/// Length of a fork version.
pub const FORK_VERSION_LEN: usize = 4;

/// Length of a compressed BLS public key (G1).
pub const BLS_PUBLIC_KEY_LEN: usize = 48;

/// Length of a compressed BLS signature (G2).
pub const BLS_SIGNATURE_LEN: usize = 96;

/// Maximum size of an encrypted share or a share public key.
pub const MAX_SHARE_FIELD_SIZE: usize = 2048;

/// Maximum size of an exchange public key.
pub const MAX_EXCHANGE_KEY_SIZE: usize = 2048;
