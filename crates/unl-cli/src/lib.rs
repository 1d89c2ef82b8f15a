//! UNL CLI: operator tooling around the validator list publisher
//!
//! Configuration, secret storage, the live WebSocket manifest source and
//! the command implementations behind the `unl` binary.

/// Command implementations
pub mod commands;
/// TOML configuration
pub mod config;
/// Publisher key persistence
pub mod keystore;
/// WebSocket manifest source
pub mod rpc;
/// Secret storage backends
pub mod secrets;
/// Node list files
pub mod validators;

pub use config::{CliConfig, SecretBackend};
pub use keystore::ValidatorKeys;
pub use rpc::WebSocketManifestSource;
pub use secrets::{open_secret_store, FileSecretStore, MemorySecretStore, SecretStore};
