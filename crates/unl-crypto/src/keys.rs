//! Validator key material in network-native representations
//!
//! A validator key pair is an ed25519 key rendered three ways:
//!
//! - `secret_key`: the 32-byte seed under the node-private encoding (`p...`)
//! - `node_public_key_hex`: `"ED"` followed by the uppercase hex public key
//! - `node_public_key_base58`: the 33-byte `0xED`-prefixed key under the
//!   node-public encoding (`n...`)

use crate::codec::{
    decode_node_private, decode_node_public, encode_account_id, encode_node_private,
    encode_node_public,
};
use crate::hash::hash160;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use unl_core::{Effects, Result, UnlError};
use zeroize::Zeroizing;

/// Hex prefix that tags an ed25519 public key
pub const ED25519_HEX_PREFIX: &str = "ED";

/// First byte of a 33-byte ed25519 public key
pub const ED25519_PREFIX_BYTE: u8 = 0xED;

/// First character of a node public key in base58 form
pub const NODE_PUBLIC_KEY_PREFIX: char = 'n';

/// PKCS#8 envelope preceding a raw ed25519 seed
pub const DER_PRIVATE_KEY_PREFIX: [u8; 16] = [
    0x30, 0x2E, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2B, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// SPKI envelope preceding a raw ed25519 public key
pub const DER_PUBLIC_KEY_PREFIX: [u8; 12] = [
    0x30, 0x2A, 0x30, 0x05, 0x06, 0x03, 0x2B, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Key algorithm of a validator key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// Ed25519 (the only algorithm new validator keys are generated with)
    Ed25519,
}

/// Validator key pair
///
/// Serializes with the field names existing key stores use
/// (`key_type`, `secret_key`, `nodePublicKeyBase58`, `nodePublicKeyHex`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    /// Key algorithm
    pub key_type: KeyType,
    /// Seed under the node-private encoding
    pub secret_key: String,
    /// Public key under the node-public encoding (`n...`)
    #[serde(rename = "nodePublicKeyBase58")]
    pub node_public_key_base58: String,
    /// `"ED"` + 64 uppercase hex characters
    #[serde(rename = "nodePublicKeyHex")]
    pub node_public_key_hex: String,
}

impl KeyPair {
    /// Generate a fresh key pair from the effects' entropy source
    pub fn generate(effects: &Effects) -> Result<Self> {
        let seed = Zeroizing::new(effects.random_bytes::<32>()?);
        Self::from_seed(&seed)
    }

    /// Build the key pair for a raw 32-byte ed25519 seed
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_bytes(seed);
        let public = signing_key.verifying_key().to_bytes();

        let node_public_key_hex = format!("{ED25519_HEX_PREFIX}{}", hex::encode_upper(public));
        let secret_key = encode_node_private(seed)?;
        let node_public_key_base58 = encode_node_public(&prefixed_public_key(&public))?;

        tracing::debug!(public_key = %node_public_key_base58, "Derived validator key pair");

        Ok(Self {
            key_type: KeyType::Ed25519,
            secret_key,
            node_public_key_base58,
            node_public_key_hex,
        })
    }

    /// Import a key pair from PKCS#8 (private) and SPKI (public) DER documents
    pub fn from_der(private_der: &[u8], public_der: &[u8]) -> Result<Self> {
        let seed = Zeroizing::new(strip_der_envelope(
            private_der,
            &DER_PRIVATE_KEY_PREFIX,
            "private",
        )?);
        let public = strip_der_envelope(public_der, &DER_PUBLIC_KEY_PREFIX, "public")?;

        let pair = Self::from_seed(&seed)?;
        if pair.public_key_bytes()?[1..] != public {
            return Err(UnlError::decoding(
                "DER public key does not match the private key",
            ));
        }
        Ok(pair)
    }

    /// Raw 32-byte seed behind `secret_key`
    pub fn seed(&self) -> Result<Zeroizing<[u8; 32]>> {
        let bytes = Zeroizing::new(decode_node_private(&self.secret_key)?);
        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&bytes);
        Ok(seed)
    }

    /// Ed25519 signing key behind `secret_key`
    pub fn signing_key(&self) -> Result<SigningKey> {
        Ok(SigningKey::from_bytes(&*self.seed()?))
    }

    /// 33-byte public key (`0xED` prefix + 32 bytes)
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        Ok(hex::decode(&self.node_public_key_hex)?)
    }

    /// Check that all three representations describe the same key
    pub fn validate(&self) -> Result<()> {
        let derived = Self::from_seed(&*self.seed()?)?;
        if derived.node_public_key_hex != self.node_public_key_hex {
            return Err(UnlError::invalid(
                "nodePublicKeyHex does not match the secret key",
            ));
        }
        if derived.node_public_key_base58 != self.node_public_key_base58 {
            return Err(UnlError::invalid(
                "nodePublicKeyBase58 does not match the secret key",
            ));
        }
        Ok(())
    }

    /// Classic account address derived from the public key
    pub fn account_address(&self) -> Result<String> {
        account_address_from_bytes(&self.public_key_bytes()?)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_type", &self.key_type)
            .field("secret_key", &"[REDACTED]")
            .field("node_public_key_base58", &self.node_public_key_base58)
            .field("node_public_key_hex", &self.node_public_key_hex)
            .finish()
    }
}

/// Prefix a raw ed25519 public key with `0xED`
pub fn prefixed_public_key(raw: &[u8; 32]) -> [u8; 33] {
    let mut out = [0u8; 33];
    out[0] = ED25519_PREFIX_BYTE;
    out[1..].copy_from_slice(raw);
    out
}

fn strip_der_envelope(der: &[u8], prefix: &[u8], kind: &str) -> Result<[u8; 32]> {
    let raw = der
        .strip_prefix(prefix)
        .ok_or_else(|| UnlError::decoding(format!("unexpected DER envelope for {kind} key")))?;
    raw.try_into().map_err(|_| {
        UnlError::decoding(format!(
            "expected 32 raw {kind} key bytes after DER envelope, got {}",
            raw.len()
        ))
    })
}

/// Decode a node public key (`n...`) to uppercase hex
pub fn node_public_to_hex(node_public: &str) -> Result<String> {
    Ok(hex::encode_upper(decode_node_public(node_public)?))
}

/// Encode a 33-byte hex public key as a node public key (`n...`)
pub fn hex_to_node_public(public_key_hex: &str) -> Result<String> {
    encode_node_public(&hex::decode(public_key_hex)?)
}

/// Bring a public key in either form to uppercase hex
pub fn normalize_public_key_hex(public_key: &str) -> Result<String> {
    if public_key.starts_with(NODE_PUBLIC_KEY_PREFIX) {
        node_public_to_hex(public_key)
    } else {
        Ok(hex::encode_upper(hex::decode(public_key)?))
    }
}

/// Classic address for a validator public key given in either form
pub fn account_address_from_public_key(public_key: &str) -> Result<String> {
    let hex_key = normalize_public_key_hex(public_key)?;
    account_address_from_bytes(&hex::decode(hex_key)?)
}

/// Classic address for 33 raw public key bytes: `ACCOUNT_ID(RIPEMD160(SHA256(key)))`
pub fn account_address_from_bytes(public_key: &[u8]) -> Result<String> {
    if public_key.len() != 33 {
        return Err(UnlError::invalid(format!(
            "expected a 33-byte public key, got {} bytes",
            public_key.len()
        )));
    }
    encode_account_id(&hash160(public_key))
}
