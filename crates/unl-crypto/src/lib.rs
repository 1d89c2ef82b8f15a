//! UNL Crypto: key material and signatures for validator lists
//!
//! - **Codec**: checksummed, versioned base58 in the network's alphabet
//! - **Keys**: ed25519 validator key pairs in their network representations
//! - **Signing**: ed25519 and legacy secp256k1 signing and verification

/// Checksummed base58 codec
pub mod codec;
/// Hash helpers
pub mod hash;
/// Validator key pairs
pub mod keys;
/// Signing and verification
pub mod signing;

pub use codec::{
    decode, decode_account_id, decode_node_private, decode_node_public, encode, encode_account_id,
    encode_node_private, encode_node_public, Decoded, KeyEncoding, ACCOUNT_ID, NODE_PRIVATE,
    NODE_PUBLIC,
};
pub use keys::{
    account_address_from_public_key, hex_to_node_public, node_public_to_hex,
    normalize_public_key_hex, KeyPair, KeyType,
};
pub use signing::{
    sign, signer_from_secret, verifier_from_public_key, verify, verify_legacy,
    SignatureAlgorithm, Signer, Verifier,
};
