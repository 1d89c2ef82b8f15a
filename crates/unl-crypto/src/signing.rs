//! Signing and verification over ed25519 and legacy secp256k1 keys
//!
//! The algorithm is picked from the key itself:
//!
//! - ed25519 public keys are 33 bytes starting with `0xED` (hex `"ED..."`);
//!   the signature covers the raw message bytes.
//! - anything else is treated as a compressed secp256k1 key; the signature
//!   covers `SHA-512-half(message)` and is DER encoded.
//!
//! Public keys may be given as hex or in node public key form (`n...`).
//! Signatures are exchanged as uppercase hex.

use crate::codec::decode_node_private;
use crate::hash::sha512_half;
use crate::keys::{
    normalize_public_key_hex, prefixed_public_key, ED25519_HEX_PREFIX, ED25519_PREFIX_BYTE,
};
use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use unl_core::{Result, UnlError};
use zeroize::Zeroizing;

/// Signature algorithm behind a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// Ed25519 over the raw message
    Ed25519,
    /// ECDSA secp256k1 over SHA-512-half of the message
    Secp256k1,
}

/// Produces signatures with a private key
pub trait Signer: Send + Sync {
    /// Algorithm of this key
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Public key as uppercase hex (33 bytes)
    fn public_key_hex(&self) -> String;

    /// Sign `message`, returning raw signature bytes
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Checks signatures against a public key
pub trait Verifier: Send + Sync {
    /// Algorithm of this key
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Check `signature` over `message`
    ///
    /// Returns `Err` when the signature bytes are malformed and `Ok(false)`
    /// when they parse but do not verify.
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool>;
}

/// Ed25519 signer built from a 32-byte seed
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Create a signer from a raw seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }
}

impl Signer for Ed25519Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn public_key_hex(&self) -> String {
        hex::encode_upper(prefixed_public_key(&self.key.verifying_key().to_bytes()))
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// Secp256k1 signer built from a 32-byte private scalar
pub struct Secp256k1Signer {
    key: k256::ecdsa::SigningKey,
}

impl Secp256k1Signer {
    /// Create a signer from a raw private scalar
    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        let key = k256::ecdsa::SigningKey::from_slice(secret)
            .map_err(|e| UnlError::crypto(format!("invalid secp256k1 secret key: {e}")))?;
        Ok(Self { key })
    }
}

impl Signer for Secp256k1Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Secp256k1
    }

    fn public_key_hex(&self) -> String {
        hex::encode_upper(self.key.verifying_key().to_encoded_point(true).as_bytes())
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = sha512_half(message);
        let signature: k256::ecdsa::Signature = self
            .key
            .sign_prehash(&digest)
            .map_err(|e| UnlError::crypto(format!("secp256k1 signing failed: {e}")))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

/// Ed25519 verifier
pub struct Ed25519Verifier {
    key: ed25519_dalek::VerifyingKey,
}

impl Ed25519Verifier {
    /// Create a verifier from a 33-byte `0xED`-prefixed public key
    pub fn from_public_key(public_key: &[u8]) -> Result<Self> {
        let raw: &[u8; 32] = match public_key {
            [ED25519_PREFIX_BYTE, rest @ ..] => rest.try_into().map_err(|_| {
                UnlError::crypto(format!(
                    "ed25519 public key must be 33 bytes, got {}",
                    public_key.len()
                ))
            })?,
            _ => return Err(UnlError::crypto("ed25519 public key must start with 0xED")),
        };
        let key = ed25519_dalek::VerifyingKey::from_bytes(raw)
            .map_err(|e| UnlError::crypto(format!("invalid ed25519 public key: {e}")))?;
        Ok(Self { key })
    }
}

impl Verifier for Ed25519Verifier {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|e| UnlError::crypto(format!("malformed ed25519 signature: {e}")))?;
        Ok(self.key.verify(message, &signature).is_ok())
    }
}

/// Secp256k1 verifier over SHA-512-half digests
pub struct Secp256k1Verifier {
    key: k256::ecdsa::VerifyingKey,
}

impl Secp256k1Verifier {
    /// Create a verifier from a SEC1 encoded public key
    pub fn from_public_key(public_key: &[u8]) -> Result<Self> {
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|e| UnlError::crypto(format!("invalid secp256k1 public key: {e}")))?;
        Ok(Self { key })
    }

    /// Verify, accepting non-canonical (high-S) signatures by normalizing them first
    pub fn verify_allow_high_s(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        let signature = parse_der_signature(signature)?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(self
            .key
            .verify_prehash(&sha512_half(message), &signature)
            .is_ok())
    }
}

impl Verifier for Secp256k1Verifier {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Secp256k1
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        let signature = parse_der_signature(signature)?;
        // High-S signatures are malleable copies of a canonical one
        if signature.normalize_s().is_some() {
            return Ok(false);
        }
        Ok(self
            .key
            .verify_prehash(&sha512_half(message), &signature)
            .is_ok())
    }
}

fn parse_der_signature(signature: &[u8]) -> Result<k256::ecdsa::Signature> {
    k256::ecdsa::Signature::from_der(signature)
        .map_err(|e| UnlError::crypto(format!("malformed DER signature: {e}")))
}

/// Build a signer for a secret key
///
/// Accepted forms:
/// - validator secret key (node private encoding): ed25519 seed
/// - `"ED"` + 64 hex characters: ed25519 seed
/// - 64 hex characters, optionally prefixed with `"00"`: secp256k1 scalar
pub fn signer_from_secret(secret_key: &str) -> Result<Box<dyn Signer>> {
    if let Ok(seed) = decode_node_private(secret_key) {
        let seed = Zeroizing::new(seed);
        return Ok(Box::new(Ed25519Signer::from_seed(&seed_array(&seed)?)));
    }

    let upper = secret_key.to_ascii_uppercase();
    if let Some(seed_hex) = upper.strip_prefix(ED25519_HEX_PREFIX).filter(|s| s.len() == 64) {
        let seed = Zeroizing::new(hex::decode(seed_hex)?);
        return Ok(Box::new(Ed25519Signer::from_seed(&seed_array(&seed)?)));
    }

    let scalar_hex = match upper.len() {
        66 if upper.starts_with("00") => &upper[2..],
        64 => upper.as_str(),
        _ => {
            return Err(UnlError::decoding(
                "secret key is neither a validator secret nor a hex private key",
            ))
        }
    };
    let scalar = Zeroizing::new(hex::decode(scalar_hex)?);
    Ok(Box::new(Secp256k1Signer::from_bytes(&scalar)?))
}

fn seed_array(seed: &[u8]) -> Result<[u8; 32]> {
    seed.try_into()
        .map_err(|_| UnlError::decoding(format!("expected 32-byte seed, got {}", seed.len())))
}

/// Build a verifier for a public key given as hex or node public key
pub fn verifier_from_public_key(public_key: &str) -> Result<Box<dyn Verifier>> {
    let key_hex = normalize_public_key_hex(public_key)?;
    let key_bytes = hex::decode(&key_hex)?;
    if key_hex.starts_with(ED25519_HEX_PREFIX) {
        Ok(Box::new(Ed25519Verifier::from_public_key(&key_bytes)?))
    } else {
        Ok(Box::new(Secp256k1Verifier::from_public_key(&key_bytes)?))
    }
}

/// Sign `message` with `secret_key`, returning an uppercase hex signature
pub fn sign(message: &[u8], secret_key: &str) -> Result<String> {
    let signer = signer_from_secret(secret_key)?;
    Ok(hex::encode_upper(signer.sign(message)?))
}

/// Verify a hex signature over `message`
///
/// Never fails: malformed keys or signatures and cryptographic mismatches
/// all return `false`. Secp256k1 signatures must be canonical (low-S).
pub fn verify(message: &[u8], signature_hex: &str, public_key: &str) -> bool {
    let outcome = hex::decode(signature_hex)
        .map_err(UnlError::from)
        .and_then(|signature| verifier_from_public_key(public_key)?.verify(message, &signature));
    match outcome {
        Ok(valid) => valid,
        Err(e) => {
            tracing::debug!(error = %e, "Signature rejected");
            false
        }
    }
}

/// Verify a hex signature, reporting malformed input as an error
///
/// Unlike [`verify`], secp256k1 signatures are normalized to low-S before
/// checking, so non-canonical encodings of a valid signature are accepted.
pub fn verify_legacy(message: &[u8], signature_hex: &str, public_key: &str) -> Result<bool> {
    let signature = hex::decode(signature_hex)?;
    let key_hex = normalize_public_key_hex(public_key)?;
    let key_bytes = hex::decode(&key_hex)?;

    if key_hex.starts_with(ED25519_HEX_PREFIX) {
        Ed25519Verifier::from_public_key(&key_bytes)?.verify(message, &signature)
    } else {
        Secp256k1Verifier::from_public_key(&key_bytes)?.verify_allow_high_s(message, &signature)
    }
}
