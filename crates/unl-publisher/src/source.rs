//! Manifest lookup seam
//!
//! The assembler only needs "give me the current manifest for this
//! validator". Transports implement [`ManifestSource`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use unl_core::{Result, UnlError};
use unl_crypto::normalize_public_key_hex;

/// Error code the network returns when a client is rate limited
pub const SLOW_DOWN: &str = "slowDown";

/// A manifest lookup result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    /// Current manifest, base64
    pub manifest: String,
    /// The key the lookup was for, in node public key form
    pub requested: String,
}

/// Outcome of one manifest lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestResponse {
    /// The validator's manifest
    Found(ManifestInfo),
    /// Error code reported by the source (e.g. [`SLOW_DOWN`])
    Error(String),
}

impl ManifestResponse {
    /// Interpret a `manifest` command reply
    ///
    /// The error code may sit at the top level or inside `result`; the
    /// manifest and requested key are read from `result` when present.
    pub fn from_json(reply: &serde_json::Value) -> Result<Self> {
        let result = reply.get("result").unwrap_or(reply);

        let error = reply
            .get("error")
            .or_else(|| result.get("error"))
            .and_then(|e| e.as_str());
        if let Some(error) = error {
            return Ok(Self::Error(error.to_string()));
        }

        let field = |name: &str| result.get(name).and_then(|v| v.as_str()).map(str::to_string);
        match (field("manifest"), field("requested")) {
            (Some(manifest), Some(requested)) => Ok(Self::Found(ManifestInfo {
                manifest,
                requested,
            })),
            (None, _) => Ok(Self::Error("manifestNotFound".to_string())),
            (Some(_), None) => Err(UnlError::serialization(
                "manifest reply is missing the requested key",
            )),
        }
    }

    /// Whether the source asked the client to back off
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Error(code) if code == SLOW_DOWN)
    }
}

/// Something that can look up validator manifests
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch the current manifest for `public_key`
    ///
    /// Error codes reported by the source come back as
    /// [`ManifestResponse::Error`]; `Err` is reserved for transport failures.
    async fn fetch_manifest(&self, public_key: &str) -> Result<ManifestResponse>;
}

#[async_trait]
impl<S: ManifestSource + ?Sized> ManifestSource for &S {
    async fn fetch_manifest(&self, public_key: &str) -> Result<ManifestResponse> {
        (**self).fetch_manifest(public_key).await
    }
}

#[async_trait]
impl<S: ManifestSource + ?Sized> ManifestSource for Arc<S> {
    async fn fetch_manifest(&self, public_key: &str) -> Result<ManifestResponse> {
        (**self).fetch_manifest(public_key).await
    }
}

/// Manifests known ahead of time, keyed by public key
///
/// Keys may be given as hex or in node public key form; lookups match
/// either.
#[derive(Debug, Clone, Default)]
pub struct InMemoryManifestSource {
    manifests: HashMap<String, ManifestInfo>,
}

impl InMemoryManifestSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the manifest for a validator
    pub fn insert(&mut self, public_key: &str, manifest: impl Into<String>) -> Result<()> {
        let key = normalize_public_key_hex(public_key)?;
        let requested = if public_key.starts_with('n') {
            public_key.to_string()
        } else {
            unl_crypto::hex_to_node_public(&key)?
        };
        self.manifests.insert(
            key,
            ManifestInfo {
                manifest: manifest.into(),
                requested,
            },
        );
        Ok(())
    }

    /// Build a source from a `{public_key: manifest}` map
    pub fn from_map(entries: &HashMap<String, String>) -> Result<Self> {
        let mut source = Self::new();
        for (public_key, manifest) in entries {
            source.insert(public_key, manifest.clone())?;
        }
        Ok(source)
    }

    /// Number of known manifests
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Whether no manifests are known
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

#[async_trait]
impl ManifestSource for InMemoryManifestSource {
    async fn fetch_manifest(&self, public_key: &str) -> Result<ManifestResponse> {
        let Ok(key) = normalize_public_key_hex(public_key) else {
            return Ok(ManifestResponse::Error("invalidParams".to_string()));
        };
        Ok(match self.manifests.get(&key) {
            Some(info) => ManifestResponse::Found(info.clone()),
            None => ManifestResponse::Error("manifestNotFound".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use unl_crypto::KeyPair;

    #[test]
    fn test_reply_with_manifest() {
        let reply = json!({
            "id": 1,
            "result": {"manifest": "JAAAAA==", "requested": "nHabc", "details": {}},
            "status": "success",
        });
        assert_eq!(
            ManifestResponse::from_json(&reply).unwrap(),
            ManifestResponse::Found(ManifestInfo {
                manifest: "JAAAAA==".into(),
                requested: "nHabc".into(),
            })
        );
    }

    #[test]
    fn test_reply_errors() {
        let top_level = json!({"error": "slowDown", "status": "error"});
        let response = ManifestResponse::from_json(&top_level).unwrap();
        assert!(response.is_rate_limited());

        let nested = json!({"result": {"error": "invalidParams", "status": "error"}});
        let response = ManifestResponse::from_json(&nested).unwrap();
        assert_eq!(response, ManifestResponse::Error("invalidParams".into()));
        assert!(!response.is_rate_limited());

        let missing = json!({"result": {"requested": "nHabc"}});
        assert_eq!(
            ManifestResponse::from_json(&missing).unwrap(),
            ManifestResponse::Error("manifestNotFound".into())
        );
    }

    #[tokio::test]
    async fn test_in_memory_source_matches_either_key_form() {
        let pair = KeyPair::from_seed(&[5u8; 32]).unwrap();
        let mut source = InMemoryManifestSource::new();
        source.insert(&pair.node_public_key_hex, "MANIFEST").unwrap();

        for key in [&pair.node_public_key_hex, &pair.node_public_key_base58] {
            match source.fetch_manifest(key).await.unwrap() {
                ManifestResponse::Found(info) => {
                    assert_eq!(info.manifest, "MANIFEST");
                    assert_eq!(info.requested, pair.node_public_key_base58);
                }
                other => panic!("unexpected response: {other:?}"),
            }
        }

        let other = KeyPair::from_seed(&[6u8; 32]).unwrap();
        assert_eq!(
            source.fetch_manifest(&other.node_public_key_base58).await.unwrap(),
            ManifestResponse::Error("manifestNotFound".into())
        );
    }
}
