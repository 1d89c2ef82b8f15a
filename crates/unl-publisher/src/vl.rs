//! Validator list blob and signed output document

use crate::manifest::Manifest;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use unl_core::{Result, UnlError};
use unl_crypto::{normalize_public_key_hex, verify};

/// Seconds between the Unix epoch and the network epoch (2000-01-01T00:00:00Z)
pub const RIPPLE_EPOCH_OFFSET: u64 = 946_684_800;

/// Version of the signed validator list format
pub const VL_VERSION: u32 = 1;

/// Convert Unix seconds to ledger time
pub fn unix_to_ledger_time(unix_seconds: u64) -> Result<u32> {
    let ledger = unix_seconds.checked_sub(RIPPLE_EPOCH_OFFSET).ok_or_else(|| {
        UnlError::invalid(format!(
            "time {unix_seconds} is before the network epoch ({RIPPLE_EPOCH_OFFSET})"
        ))
    })?;
    u32::try_from(ledger)
        .map_err(|_| UnlError::invalid(format!("time {unix_seconds} is beyond ledger time range")))
}

/// Convert ledger time to Unix seconds
pub fn ledger_time_to_unix(ledger_seconds: u32) -> u64 {
    u64::from(ledger_seconds) + RIPPLE_EPOCH_OFFSET
}

/// One validator in the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorManifestEntry {
    /// Validator master public key, uppercase hex
    pub validation_public_key: String,
    /// Validator manifest as returned by the network, base64
    pub manifest: String,
}

/// Contents of the signed blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlBlob {
    /// List sequence number
    pub sequence: u32,
    /// Expiration in ledger time
    pub expiration: u32,
    /// Validators in publication order
    pub validators: Vec<ValidatorManifestEntry>,
}

impl VlBlob {
    /// Compact JSON bytes that get signed
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Base64 of the compact JSON
    pub fn encode(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_json_bytes()?))
    }

    /// Parse a base64 blob
    pub fn decode(blob: &str) -> Result<Self> {
        Ok(serde_json::from_slice(&STANDARD.decode(blob.trim())?)?)
    }

    /// Expiration as Unix seconds
    pub fn expiration_unix(&self) -> u64 {
        ledger_time_to_unix(self.expiration)
    }

    /// Whether the list has expired at the given Unix time
    pub fn is_expired_at(&self, unix_seconds: u64) -> bool {
        unix_seconds >= self.expiration_unix()
    }
}

/// The published validator list document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedValidatorList {
    /// Base64 [`VlBlob`] JSON
    pub blob: String,
    /// Publisher manifest, base64
    pub manifest: String,
    /// Ephemeral key signature over the decoded blob bytes, uppercase hex
    pub signature: String,
    /// Publisher master public key, uppercase hex
    pub public_key: String,
    /// Format version, always 1
    pub version: u32,
}

impl SignedValidatorList {
    /// Decode the blob contents
    pub fn decode_blob(&self) -> Result<VlBlob> {
        VlBlob::decode(&self.blob)
    }

    /// Decode the publisher manifest
    pub fn decode_manifest(&self) -> Result<Manifest> {
        Manifest::from_base64(&self.manifest)
    }

    /// Check the document end to end
    ///
    /// The publisher manifest must be valid and belong to `public_key`, and
    /// `signature` must verify over the blob bytes under the manifest's
    /// ephemeral key.
    pub fn verify(&self) -> Result<()> {
        if self.version != VL_VERSION {
            return Err(UnlError::invalid(format!(
                "unsupported validator list version {}",
                self.version
            )));
        }

        let manifest = self.decode_manifest()?;
        if manifest.public_key_hex() != normalize_public_key_hex(&self.public_key)? {
            return Err(UnlError::invalid(
                "manifest master key does not match public_key",
            ));
        }
        if !manifest.verify() {
            return Err(UnlError::invalid("publisher manifest signatures do not verify"));
        }

        let blob = STANDARD.decode(self.blob.trim())?;
        if !verify(&blob, &self.signature, &manifest.signing_pub_key_hex()) {
            return Err(UnlError::invalid("blob signature does not verify"));
        }
        Ok(())
    }

    /// Pretty JSON of the document
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
