//! `unl generate`: build and write a signed validator list

use crate::config::CliConfig;
use crate::keystore::ValidatorKeys;
use crate::rpc::WebSocketManifestSource;
use crate::secrets::SecretStore;
use crate::validators::{load_manifest_map, NodeConfig};
use std::path::PathBuf;
use unl_core::Effects;
use unl_publisher::{
    InMemoryManifestSource, ManifestSource, SignedValidatorList, ValidatorListAssembler,
};

/// Options for one list
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Node list file (YAML or JSON)
    pub validators: PathBuf,
    /// List sequence; also used for the publisher manifest
    pub sequence: u32,
    /// Expiration as Unix seconds
    pub expiration: u64,
    /// Where to write the document
    pub output: PathBuf,
    /// Endpoint overriding the configured one
    pub rpc_url: Option<String>,
    /// Publisher domain for the manifest
    pub domain: Option<String>,
    /// `{public_key: manifest}` JSON file used instead of the network
    pub manifests: Option<PathBuf>,
}

/// Build the list and write it to `options.output`
pub async fn run(
    config: &CliConfig,
    store: &dyn SecretStore,
    effects: Effects,
    options: &GenerateOptions,
) -> anyhow::Result<SignedValidatorList> {
    let keys = ValidatorKeys::load(store)?
        .ok_or_else(|| anyhow::anyhow!("no validator keys found; run `unl keys init`"))?;
    let validators = NodeConfig::load(&options.validators)?.validator_keys()?;
    tracing::info!(
        count = validators.len(),
        file = %options.validators.display(),
        "Loaded validators"
    );

    let vl = match &options.manifests {
        Some(path) => {
            let source = InMemoryManifestSource::from_map(&load_manifest_map(path)?)?;
            assemble(source, config, effects, &keys, &validators, options).await?
        }
        None => {
            let url = options.rpc_url.as_deref().unwrap_or(&config.rpc_url);
            let source = WebSocketManifestSource::new(url, config.request_timeout());
            let result = assemble(&source, config, effects, &keys, &validators, options).await;
            if let Err(e) = source.close().await {
                tracing::debug!(error = %e, "Closing connection failed");
            }
            result?
        }
    };

    std::fs::write(&options.output, serde_json::to_string(&vl)?)?;
    println!("Validator list saved to {}", options.output.display());
    Ok(vl)
}

async fn assemble<S: ManifestSource>(
    source: S,
    config: &CliConfig,
    effects: Effects,
    keys: &ValidatorKeys,
    validators: &[String],
    options: &GenerateOptions,
) -> anyhow::Result<SignedValidatorList> {
    let mut assembler =
        ValidatorListAssembler::new(source, effects).with_retry_policy(config.retry_policy());
    if let Some(domain) = &options.domain {
        assembler = assembler.with_domain(domain.clone());
    }
    Ok(assembler
        .create_vl(&keys.vk, &keys.sk, options.sequence, options.expiration, validators)
        .await?)
}
