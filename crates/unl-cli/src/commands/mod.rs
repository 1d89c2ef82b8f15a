//! Command implementations

/// `unl generate`
pub mod generate;
/// `unl keys`
pub mod keys;
/// `unl secret`
pub mod secret;
/// `unl verify`
pub mod verify;
