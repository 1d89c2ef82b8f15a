//! Checksummed, versioned base58 codec
//!
//! Layout of every encoded value:
//!
//! ```text
//! base58( version || payload || checksum(version || payload) )
//! ```
//!
//! where `checksum` is the first four bytes of double SHA-256 and the base58
//! alphabet is the network's dictionary (`rpshnaf39wBUDNEGHJKLM4PQRST7...`),
//! not Bitcoin's. Version prefixes may be more than one byte long.

use crate::hash::checksum;
use unl_core::{Result, UnlError};

const CHECKSUM_LEN: usize = 4;

fn alphabet() -> &'static bs58::Alphabet {
    bs58::Alphabet::RIPPLE
}

/// A named fixed-length encoding: accepted version prefixes plus payload length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEncoding {
    /// Human-readable name used in error messages
    pub name: &'static str,
    /// Accepted version prefixes; the first one is used when encoding
    pub versions: &'static [&'static [u8]],
    /// Required payload length in bytes
    pub expected_length: usize,
}

/// Node public key: 33-byte public key, version 0x1C, renders with an `n` prefix
pub const NODE_PUBLIC: KeyEncoding = KeyEncoding {
    name: "node public key",
    versions: &[&[0x1C]],
    expected_length: 33,
};

/// Validator secret key: 32-byte raw ed25519 seed, version 0x20
pub const NODE_PRIVATE: KeyEncoding = KeyEncoding {
    name: "node private key",
    versions: &[&[0x20]],
    expected_length: 32,
};

/// Account ID: 20-byte hash160, version 0x00, renders with an `r` prefix
pub const ACCOUNT_ID: KeyEncoding = KeyEncoding {
    name: "account id",
    versions: &[&[0x00]],
    expected_length: 20,
};

impl KeyEncoding {
    /// Encode `payload` with this encoding's primary version
    pub fn encode(&self, payload: &[u8]) -> Result<String> {
        let version = self
            .versions
            .first()
            .ok_or_else(|| UnlError::encoding(format!("{} has no version bytes", self.name)))?;
        encode(payload, version, self.expected_length)
    }

    /// Decode `input`, requiring one of the accepted versions and the expected length
    pub fn decode(&self, input: &str) -> Result<Vec<u8>> {
        let decoded = decode(input, self.versions, Some(self.expected_length))
            .map_err(|e| UnlError::decoding(format!("invalid {}: {e}", self.name)))?;
        Ok(decoded.payload)
    }
}

/// A decoded value together with the version prefix it carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Version prefix that matched
    pub version: Vec<u8>,
    /// Payload with version and checksum stripped
    pub payload: Vec<u8>,
}

/// Encode `payload` under `version`, failing unless it is exactly `expected_length` bytes
pub fn encode(payload: &[u8], version: &[u8], expected_length: usize) -> Result<String> {
    if payload.len() != expected_length {
        return Err(UnlError::encoding(format!(
            "expected payload of {expected_length} bytes, got {}",
            payload.len()
        )));
    }
    if version.is_empty() {
        return Err(UnlError::encoding("version bytes must not be empty"));
    }

    let mut buf = Vec::with_capacity(version.len() + payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(version);
    buf.extend_from_slice(payload);
    let sum = checksum(&buf);
    buf.extend_from_slice(&sum);

    Ok(bs58::encode(buf).with_alphabet(alphabet()).into_string())
}

/// Decode `input`, verifying the checksum and that it starts with one of `versions`
///
/// When `expected_length` is given, the payload after the matching version
/// must be exactly that long.
pub fn decode(
    input: &str,
    versions: &[&[u8]],
    expected_length: Option<usize>,
) -> Result<Decoded> {
    let bytes = bs58::decode(input)
        .with_alphabet(alphabet())
        .into_vec()
        .map_err(|e| UnlError::decoding(format!("malformed base58: {e}")))?;

    if bytes.len() <= CHECKSUM_LEN {
        return Err(UnlError::decoding(format!(
            "input too short: {} bytes",
            bytes.len()
        )));
    }

    let (body, sum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if checksum(body).as_slice() != sum {
        return Err(UnlError::decoding("checksum mismatch"));
    }

    let version = versions
        .iter()
        .find(|v| !v.is_empty() && body.starts_with(v))
        .ok_or_else(|| UnlError::decoding("unknown version bytes"))?;

    let payload = &body[version.len()..];
    if let Some(expected) = expected_length {
        if payload.len() != expected {
            return Err(UnlError::decoding(format!(
                "expected payload of {expected} bytes, got {}",
                payload.len()
            )));
        }
    }

    Ok(Decoded {
        version: version.to_vec(),
        payload: payload.to_vec(),
    })
}

/// Encode 33 raw public key bytes as a node public key (`n...`)
pub fn encode_node_public(bytes: &[u8]) -> Result<String> {
    NODE_PUBLIC.encode(bytes)
}

/// Decode a node public key (`n...`) to its 33 raw bytes
pub fn decode_node_public(input: &str) -> Result<Vec<u8>> {
    NODE_PUBLIC.decode(input)
}

/// Encode a 32-byte ed25519 seed as a validator secret key
pub fn encode_node_private(seed: &[u8]) -> Result<String> {
    NODE_PRIVATE.encode(seed)
}

/// Decode a validator secret key to its 32-byte ed25519 seed
pub fn decode_node_private(input: &str) -> Result<Vec<u8>> {
    NODE_PRIVATE.decode(input)
}

/// Encode a 20-byte account ID as a classic address (`r...`)
pub fn encode_account_id(bytes: &[u8]) -> Result<String> {
    ACCOUNT_ID.encode(bytes)
}

/// Decode a classic address (`r...`) to its 20-byte account ID
pub fn decode_account_id(input: &str) -> Result<Vec<u8>> {
    ACCOUNT_ID.decode(input)
}
