//! UNL Core: shared foundation for the validator list publisher
//!
//! - **Errors**: one error type covering codec, manifest and assembly failures
//! - **Effects**: injectable clock and entropy for deterministic tests
//! - **Retry**: backoff policy used for rate-limited manifest lookups

/// Unified error handling
pub mod errors;
/// Injectable clock and entropy
pub mod effects;
/// Retry policy with backoff
pub mod retry;

pub use effects::{
    Clock, Effects, Entropy, ManualClock, OsEntropy, SeededEntropy, WallClock, TEST_EPOCH,
};
pub use errors::{Result, UnlError};
pub use retry::{RetryPolicy, RetryResult};
