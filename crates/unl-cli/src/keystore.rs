//! Publisher key pair persistence
//!
//! The master (`vk`) and ephemeral (`sk`) key pairs are stored together as
//! one JSON secret under service `unl`, key `validator_keys`.

use crate::secrets::SecretStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unl_core::{Effects, Result, UnlError};
use unl_crypto::KeyPair;

/// Secret service holding publisher keys
pub const SECRET_SERVICE: &str = "unl";
/// Secret key holding publisher keys
pub const SECRET_KEY: &str = "validator_keys";

/// Stored publisher key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorKeys {
    /// When the keys were generated
    pub ts: DateTime<Utc>,
    /// Master ("validator") key pair
    pub vk: KeyPair,
    /// Ephemeral ("signing") key pair
    pub sk: KeyPair,
}

impl ValidatorKeys {
    /// Generate a fresh master and ephemeral key pair
    pub fn generate(effects: &Effects) -> Result<Self> {
        let now = effects.now()?;
        let ts = i64::try_from(now)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| UnlError::invalid(format!("timestamp {now} out of range")))?;

        Ok(Self {
            ts,
            vk: KeyPair::generate(effects)?,
            sk: KeyPair::generate(effects)?,
        })
    }

    /// Load stored keys, checking both pairs are internally consistent
    pub fn load(store: &dyn SecretStore) -> Result<Option<Self>> {
        let Some(raw) = store.get(SECRET_SERVICE, SECRET_KEY)? else {
            return Ok(None);
        };
        let keys: Self = serde_json::from_str(&raw)
            .map_err(|e| UnlError::storage(format!("stored validator keys are malformed: {e}")))?;
        keys.vk.validate()?;
        keys.sk.validate()?;
        Ok(Some(keys))
    }

    /// Persist the keys
    pub fn save(&self, store: &dyn SecretStore) -> Result<()> {
        store.set(SECRET_SERVICE, SECRET_KEY, &serde_json::to_string(self)?)
    }

    /// Public view without secret keys
    pub fn public_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "ts": self.ts,
            "vk": {
                "nodePublicKeyBase58": self.vk.node_public_key_base58,
                "nodePublicKeyHex": self.vk.node_public_key_hex,
            },
            "sk": {
                "nodePublicKeyBase58": self.sk.node_public_key_base58,
                "nodePublicKeyHex": self.sk.node_public_key_hex,
            },
        })
    }
}
