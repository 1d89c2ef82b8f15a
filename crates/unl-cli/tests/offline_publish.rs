//! Key initialization, offline list generation and verification end to end

use assert_matches::assert_matches;
use std::collections::HashMap;
use unl_cli::commands::{self, generate::GenerateOptions};
use unl_cli::{CliConfig, FileSecretStore, MemorySecretStore, SecretStore, ValidatorKeys};
use unl_core::{Effects, UnlError};
use unl_crypto::KeyPair;
use unl_publisher::SignedValidatorList;

#[test]
fn test_keys_init_is_idempotent() {
    let store = MemorySecretStore::new();
    let effects = Effects::for_test("test_keys_init_is_idempotent");

    let first = commands::keys::init(&store, &effects, false).unwrap();
    let second = commands::keys::init(&store, &effects, false).unwrap();
    assert_eq!(first, second);

    let forced = commands::keys::init(&store, &effects, true).unwrap();
    assert_ne!(forced.vk, first.vk);
    assert_eq!(commands::keys::show(&store).unwrap(), forced);
}

#[test]
fn test_keys_show_without_keys_fails() {
    assert!(commands::keys::show(&MemorySecretStore::new()).is_err());
}

#[tokio::test]
async fn test_generate_offline_then_verify() {
    let dir = tempfile::tempdir().unwrap();
    let effects = Effects::for_test("test_generate_offline_then_verify");
    let store = FileSecretStore::new(dir.path().join("secrets.json"));
    let keys = commands::keys::init(&store, &effects, false).unwrap();

    let validators: Vec<KeyPair> = (0..3)
        .map(|_| KeyPair::generate(&effects).unwrap())
        .collect();

    let mut node_list = String::from("nodes:\n");
    let mut manifests = HashMap::new();
    for (i, validator) in validators.iter().enumerate() {
        node_list.push_str(&format!(
            "  - id: {}\n    name: v{i}\n",
            validator.node_public_key_base58
        ));
        manifests.insert(validator.node_public_key_hex.clone(), format!("TUFO{i}A=="));
    }
    let node_path = dir.path().join("validators.yaml");
    std::fs::write(&node_path, node_list).unwrap();
    let manifest_path = dir.path().join("manifests.json");
    std::fs::write(&manifest_path, serde_json::to_string(&manifests).unwrap()).unwrap();

    let output = dir.path().join("unl.json");
    let options = GenerateOptions {
        validators: node_path,
        sequence: 4,
        expiration: 1_756_598_400,
        output: output.clone(),
        rpc_url: None,
        domain: Some("example.com".to_string()),
        manifests: Some(manifest_path),
    };
    let vl = commands::generate::run(&CliConfig::default(), &store, effects, &options)
        .await
        .unwrap();

    let written =
        SignedValidatorList::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, vl);
    assert_eq!(written.public_key, keys.vk.node_public_key_hex);

    let blob = commands::verify::run(&output, 1_756_000_000).unwrap();
    assert_eq!(blob.sequence, 4);
    assert_eq!(blob.expiration, 809_913_600);
    let listed: Vec<_> = blob
        .validators
        .iter()
        .map(|v| v.validation_public_key.clone())
        .collect();
    let expected: Vec<_> = validators
        .iter()
        .map(|v| v.node_public_key_hex.clone())
        .collect();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_generate_fails_on_unknown_validator() {
    let dir = tempfile::tempdir().unwrap();
    let effects = Effects::for_test("test_generate_fails_on_unknown_validator");
    let store = MemorySecretStore::new();
    commands::keys::init(&store, &effects, false).unwrap();

    let validator = KeyPair::generate(&effects).unwrap();
    let node_path = dir.path().join("validators.json");
    std::fs::write(
        &node_path,
        format!(r#"{{"nodes":[{{"id":"{}"}}]}}"#, validator.node_public_key_base58),
    )
    .unwrap();
    let manifest_path = dir.path().join("manifests.json");
    std::fs::write(&manifest_path, "{}").unwrap();

    let output = dir.path().join("unl.json");
    let options = GenerateOptions {
        validators: node_path,
        sequence: 1,
        expiration: 1_756_598_400,
        output: output.clone(),
        rpc_url: None,
        domain: None,
        manifests: Some(manifest_path),
    };
    let err = commands::generate::run(&CliConfig::default(), &store, effects, &options)
        .await
        .unwrap_err();

    assert_matches!(
        err.downcast_ref::<UnlError>(),
        Some(UnlError::Fetch { .. })
    );
    assert!(!output.exists());
}

#[test]
fn test_verify_rejects_tampered_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unl.json");

    let keys = ValidatorKeys::generate(&Effects::test()).unwrap();
    let document = SignedValidatorList {
        blob: "e30=".to_string(),
        manifest: String::new(),
        signature: "00".to_string(),
        public_key: keys.vk.node_public_key_hex,
        version: 1,
    };
    std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();
    assert!(commands::verify::run(&path, 0).is_err());
}

#[test]
fn test_secret_commands() {
    let store = MemorySecretStore::new();
    commands::secret::set(&store, "unl", "token", "abc").unwrap();
    commands::secret::get(&store, "unl", "token").unwrap();
    commands::secret::list(&store, "unl").unwrap();
    commands::secret::delete(&store, "unl", "token").unwrap();
    assert!(commands::secret::get(&store, "unl", "token").is_err());
    assert!(store.list("unl").unwrap().is_empty());
}

#[tokio::test]
async fn test_verify_command_does_not_open_secret_store() {
    let dir = tempfile::tempdir().unwrap();
    let effects = Effects::for_test("test_verify_command_does_not_open_secret_store");
    let store = MemorySecretStore::new();
    commands::keys::init(&store, &effects, false).unwrap();

    let validator = KeyPair::generate(&effects).unwrap();
    let node_path = dir.path().join("validators.yaml");
    std::fs::write(
        &node_path,
        format!("nodes:\n  - id: {}\n", validator.node_public_key_base58),
    )
    .unwrap();
    let manifest_path = dir.path().join("manifests.json");
    std::fs::write(
        &manifest_path,
        format!(r#"{{"{}": "TUFOAA=="}}"#, validator.node_public_key_hex),
    )
    .unwrap();
    let output = dir.path().join("unl.json");
    let options = GenerateOptions {
        validators: node_path,
        sequence: 2,
        expiration: 1_756_598_400,
        output: output.clone(),
        rpc_url: None,
        domain: None,
        manifests: Some(manifest_path),
    };
    commands::generate::run(&CliConfig::default(), &store, effects, &options)
        .await
        .unwrap();

    // A secrets path that cannot be opened as a file store
    let unusable = dir.path().join("secrets-dir");
    std::fs::create_dir(&unusable).unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!("[secrets]\npath = {:?}\n", unusable.display().to_string()),
    )
    .unwrap();

    let run = |args: &[&str]| {
        std::process::Command::new(env!("CARGO_BIN_EXE_unl"))
            .arg("--config")
            .arg(&config_path)
            .args(args)
            .env_remove("UNL_RPC_URL")
            .env_remove("UNL_SECRET_BACKEND")
            .output()
            .unwrap()
    };

    let verified = run(&["verify", output.to_str().unwrap()]);
    assert!(
        verified.status.success(),
        "verify failed: {}",
        String::from_utf8_lossy(&verified.stderr)
    );
    assert!(String::from_utf8_lossy(&verified.stdout).contains("Signature:   valid"));

    let listed = run(&["secret", "list", "unl"]);
    assert!(!listed.status.success());
}
