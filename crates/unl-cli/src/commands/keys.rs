//! `unl keys`: publisher key management

use crate::keystore::ValidatorKeys;
use crate::secrets::SecretStore;
use unl_core::Effects;

/// Load existing keys, or generate and store new ones
///
/// With `force`, existing keys are replaced.
pub fn init(
    store: &dyn SecretStore,
    effects: &Effects,
    force: bool,
) -> anyhow::Result<ValidatorKeys> {
    if !force {
        if let Some(keys) = ValidatorKeys::load(store)? {
            println!("Validator keys found");
            println!("{}", serde_json::to_string_pretty(&keys.public_summary())?);
            return Ok(keys);
        }
    }

    let keys = ValidatorKeys::generate(effects)?;
    keys.save(store)?;
    tracing::info!(
        master = %keys.vk.node_public_key_base58,
        ephemeral = %keys.sk.node_public_key_base58,
        "Generated validator keys"
    );
    println!("Validator keys generated and saved");
    println!("{}", serde_json::to_string_pretty(&keys.public_summary())?);
    Ok(keys)
}

/// Print stored public key material
pub fn show(store: &dyn SecretStore) -> anyhow::Result<ValidatorKeys> {
    let keys = ValidatorKeys::load(store)?
        .ok_or_else(|| anyhow::anyhow!("no validator keys found; run `unl keys init`"))?;
    println!("{}", serde_json::to_string_pretty(&keys.public_summary())?);
    Ok(keys)
}
