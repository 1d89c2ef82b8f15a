//! Validator manifests
//!
//! A manifest binds a long-lived master key to an ephemeral signing key.
//! Both keys sign the same bytes: `"MAN\0"` followed by the canonical
//! encoding of every field except the two signatures.

use crate::binary::{fields, FieldValue, StObject};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use unl_core::{Result, UnlError};
use unl_crypto::{normalize_public_key_hex, signer_from_secret, verify};

/// Prefix of manifest signing data
pub const MANIFEST_PREFIX: [u8; 4] = *b"MAN\0";

/// Inputs for building a manifest
///
/// Public keys are hex (or node public key form); secrets are anything
/// [`unl_crypto::signer_from_secret`] accepts. `domain` is hex.
#[derive(Clone, PartialEq, Eq)]
pub struct ManifestFields {
    /// Manifest sequence number
    pub sequence: u32,
    /// Master public key
    pub public_key: Option<String>,
    /// Ephemeral signing public key
    pub signing_pub_key: Option<String>,
    /// Ephemeral secret key
    pub signing_private_key: String,
    /// Master secret key
    pub master_private_key: String,
    /// Validator domain, hex encoded
    pub domain: Option<String>,
}

impl std::fmt::Debug for ManifestFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestFields")
            .field("sequence", &self.sequence)
            .field("public_key", &self.public_key)
            .field("signing_pub_key", &self.signing_pub_key)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// A signed manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Manifest sequence number
    pub sequence: u32,
    /// Master public key bytes
    pub public_key: Vec<u8>,
    /// Ephemeral public key bytes
    pub signing_pub_key: Vec<u8>,
    /// Raw domain bytes
    pub domain: Option<Vec<u8>>,
    /// Signature by the ephemeral key
    pub signature: Vec<u8>,
    /// Signature by the master key
    pub master_signature: Vec<u8>,
}

impl Manifest {
    /// Build and sign a manifest
    pub fn sign(input: &ManifestFields) -> Result<Self> {
        let public_key = required_key(input.public_key.as_deref(), "PublicKey")?;
        let signing_pub_key = required_key(input.signing_pub_key.as_deref(), "SigningPubKey")?;
        let domain = input.domain.as_deref().map(hex::decode).transpose()?;

        let ephemeral = signer_from_secret(&input.signing_private_key)?;
        let master = signer_from_secret(&input.master_private_key)?;
        if !master.public_key_hex().eq_ignore_ascii_case(&hex::encode(&public_key)) {
            return Err(UnlError::manifest(
                "master private key does not belong to PublicKey",
            ));
        }
        if !ephemeral
            .public_key_hex()
            .eq_ignore_ascii_case(&hex::encode(&signing_pub_key))
        {
            return Err(UnlError::manifest(
                "signing private key does not belong to SigningPubKey",
            ));
        }

        let data = signing_data(input.sequence, &public_key, &signing_pub_key, domain.as_deref())?;
        let signature = ephemeral.sign(&data)?;
        let master_signature = master.sign(&data)?;

        Ok(Self {
            sequence: input.sequence,
            public_key,
            signing_pub_key,
            domain,
            signature,
            master_signature,
        })
    }

    /// Bytes both signatures cover
    pub fn signing_data(&self) -> Result<Vec<u8>> {
        self.to_object()?.signing_data(&MANIFEST_PREFIX)
    }

    /// Field object including both signatures
    pub fn to_object(&self) -> Result<StObject> {
        let mut object = StObject::new();
        object.insert(fields::SEQUENCE, FieldValue::UInt32(self.sequence))?;
        object.insert(fields::PUBLIC_KEY, FieldValue::Blob(self.public_key.clone()))?;
        object.insert(
            fields::SIGNING_PUB_KEY,
            FieldValue::Blob(self.signing_pub_key.clone()),
        )?;
        object.insert(fields::SIGNATURE, FieldValue::Blob(self.signature.clone()))?;
        if let Some(domain) = &self.domain {
            object.insert(fields::DOMAIN, FieldValue::Blob(domain.clone()))?;
        }
        object.insert(
            fields::MASTER_SIGNATURE,
            FieldValue::Blob(self.master_signature.clone()),
        )?;
        Ok(object)
    }

    /// Canonical binary serialization
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_object()?.encode()
    }

    /// Canonical binary serialization, base64 encoded
    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    /// Parse a serialized manifest
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let object = StObject::decode(bytes)?;
        let blob = |field| {
            object.get_blob(field).map(<[u8]>::to_vec).ok_or_else(|| {
                UnlError::manifest(format!(
                    "missing {}",
                    fields::name(field).unwrap_or("field")
                ))
            })
        };

        let manifest = Self {
            sequence: object
                .get_u32(fields::SEQUENCE)
                .ok_or_else(|| UnlError::manifest("missing Sequence"))?,
            public_key: blob(fields::PUBLIC_KEY)?,
            signing_pub_key: blob(fields::SIGNING_PUB_KEY)?,
            domain: object.get_blob(fields::DOMAIN).map(<[u8]>::to_vec),
            signature: blob(fields::SIGNATURE)?,
            master_signature: blob(fields::MASTER_SIGNATURE)?,
        };

        if let Some((field, _)) = object.iter().find(|(f, _)| fields::name(**f).is_none()) {
            return Err(UnlError::manifest(format!(
                "unexpected field ({}, {})",
                field.type_code, field.field_code
            )));
        }
        Ok(manifest)
    }

    /// Parse a base64 serialized manifest
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_bytes(&STANDARD.decode(encoded.trim())?)
    }

    /// Master public key as uppercase hex
    pub fn public_key_hex(&self) -> String {
        hex::encode_upper(&self.public_key)
    }

    /// Ephemeral public key as uppercase hex
    pub fn signing_pub_key_hex(&self) -> String {
        hex::encode_upper(&self.signing_pub_key)
    }

    /// Domain decoded as text, if present and valid UTF-8
    pub fn domain_text(&self) -> Option<String> {
        self.domain
            .as_ref()
            .and_then(|d| String::from_utf8(d.clone()).ok())
    }

    /// Check both signatures over the signing data
    pub fn verify(&self) -> bool {
        let Ok(data) = self.signing_data() else {
            return false;
        };
        verify(
            &data,
            &hex::encode_upper(&self.signature),
            &self.signing_pub_key_hex(),
        ) && verify(
            &data,
            &hex::encode_upper(&self.master_signature),
            &self.public_key_hex(),
        )
    }
}

fn required_key(key: Option<&str>, name: &str) -> Result<Vec<u8>> {
    let key = key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| UnlError::manifest(format!("{name} is required")))?;
    Ok(hex::decode(normalize_public_key_hex(key)?)?)
}

/// Signing data for the given field values: `"MAN\0"` then the tagged fields
pub fn signing_data(
    sequence: u32,
    public_key: &[u8],
    signing_pub_key: &[u8],
    domain: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut object = StObject::new();
    object.insert(fields::SEQUENCE, FieldValue::UInt32(sequence))?;
    object.insert(fields::PUBLIC_KEY, FieldValue::Blob(public_key.to_vec()))?;
    object.insert(
        fields::SIGNING_PUB_KEY,
        FieldValue::Blob(signing_pub_key.to_vec()),
    )?;
    if let Some(domain) = domain {
        object.insert(fields::DOMAIN, FieldValue::Blob(domain.to_vec()))?;
    }
    object.signing_data(&MANIFEST_PREFIX)
}

/// Build, sign and serialize a manifest, returning base64
pub fn generate_manifest(input: &ManifestFields) -> Result<String> {
    let manifest = Manifest::sign(input)?;
    tracing::debug!(
        sequence = input.sequence,
        public_key = %manifest.public_key_hex(),
        "Generated manifest"
    );
    manifest.to_base64()
}

/// Hex encode a domain given as text
pub fn domain_to_hex(domain: &str) -> String {
    hex::encode_upper(domain.as_bytes())
}
