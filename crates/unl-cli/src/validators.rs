//! Validator node list files
//!
//! ```yaml
//! nodes:
//!   - id: nHBidG3pZK11zQD6kpNDoAhDxH6WLGui6ZxSbUx7LSqLHsgzMPec
//!     name: validator-1
//! ```
//!
//! `.json` files are read as JSON; anything else as YAML.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use unl_core::{Result, UnlError};
use unl_crypto::normalize_public_key_hex;

/// One validator entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Validator public key (node public key form or hex)
    pub id: String,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A list of validators to publish
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Validators in publication order
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl NodeConfig {
    /// Read a node list file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UnlError::storage(format!("failed to read {}: {e}", path.display()))
        })?;
        if is_json(path) {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }

    /// Parse YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| UnlError::serialization(format!("invalid node list: {e}")))
    }

    /// Parse JSON text
    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| UnlError::serialization(format!("invalid node list: {e}")))
    }

    /// Validator keys in order, each checked to be a well-formed public key
    pub fn validator_keys(&self) -> Result<Vec<String>> {
        if self.nodes.is_empty() {
            return Err(UnlError::invalid("no nodes found in node list"));
        }
        self.nodes
            .iter()
            .map(|node| {
                let id = node.id.trim();
                normalize_public_key_hex(id).map_err(|e| {
                    UnlError::invalid(format!(
                        "node {} has an invalid id: {e}",
                        node.name.as_deref().unwrap_or(id)
                    ))
                })?;
                Ok(id.to_string())
            })
            .collect()
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Read a `{public_key: manifest}` JSON map used for offline assembly
pub fn load_manifest_map(path: &Path) -> Result<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        UnlError::storage(format!("failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents)
        .map_err(|e| UnlError::serialization(format!("invalid manifest map: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use unl_crypto::KeyPair;

    #[test]
    fn test_yaml_node_list() {
        let a = KeyPair::from_seed(&[1u8; 32]).unwrap();
        let b = KeyPair::from_seed(&[2u8; 32]).unwrap();
        let yaml = format!(
            "nodes:\n  - id: {}\n    name: alpha\n  - id: {}\n",
            a.node_public_key_base58, b.node_public_key_hex
        );
        let config = NodeConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.nodes[0].name.as_deref(), Some("alpha"));
        assert_eq!(config.nodes[1].name, None);
        assert_eq!(
            config.validator_keys().unwrap(),
            vec![a.node_public_key_base58, b.node_public_key_hex]
        );
    }

    #[test]
    fn test_json_node_list_file() {
        let a = KeyPair::from_seed(&[3u8; 32]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validators.json");
        std::fs::write(
            &path,
            format!(r#"{{"nodes": [{{"id": "{}"}}]}}"#, a.node_public_key_base58),
        )
        .unwrap();

        let config = NodeConfig::load(&path).unwrap();
        assert_eq!(config.validator_keys().unwrap(), vec![a.node_public_key_base58]);
    }

    #[test]
    fn test_rejects_empty_and_malformed_lists() {
        assert_matches!(
            NodeConfig::from_yaml_str("nodes: []").unwrap().validator_keys(),
            Err(UnlError::Invalid { .. })
        );
        assert_matches!(
            NodeConfig::from_yaml_str("other: 1").unwrap().validator_keys(),
            Err(UnlError::Invalid { .. })
        );
        assert_matches!(
            NodeConfig::from_yaml_str("nodes:\n  - id: nNotAKey\n")
                .unwrap()
                .validator_keys(),
            Err(UnlError::Invalid { .. })
        );
        assert_matches!(
            NodeConfig::from_yaml_str("nodes: [[["),
            Err(UnlError::Serialization { .. })
        );
    }
}
