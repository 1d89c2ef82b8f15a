//! Unified error system for the UNL publisher
//!
//! One error type covers codec, key, manifest and assembly failures. Every
//! variant is fatal to the operation that produced it: nothing here is
//! retried except the rate-limit backoff in manifest lookup, and no partial
//! validator list is ever produced.

use serde::{Deserialize, Serialize};

/// Unified error type for all UNL operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum UnlError {
    /// Payload could not be encoded (wrong length, unsupported version)
    #[error("Encoding error: {message}")]
    Encoding {
        /// Error message describing the encoding failure
        message: String,
    },

    /// Input could not be decoded (bad alphabet, checksum, version or length)
    #[error("Decoding error: {message}")]
    Decoding {
        /// Error message describing the decoding failure
        message: String,
    },

    /// Manifest is missing required fields or is malformed
    #[error("Manifest error: {message}")]
    Manifest {
        /// Error message describing the manifest problem
        message: String,
    },

    /// Manifest lookup kept being rate limited until the attempt budget ran out
    #[error("Manifest lookup for {public_key} exhausted after {attempts} attempts")]
    FetchExhausted {
        /// Validator public key that was being looked up
        public_key: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Manifest source reported a non-retryable error
    #[error("Manifest lookup for {public_key} failed: {reason}")]
    Fetch {
        /// Validator public key that was being looked up
        public_key: String,
        /// Error reported by the manifest source
        reason: String,
    },

    /// Signing or key construction failed
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message describing the cryptographic failure
        message: String,
    },

    /// Invalid input or argument
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Network or transport error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Secret storage failure
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl UnlError {
    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create a manifest error
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
        }
    }

    /// Create a fetch-exhausted error
    pub fn fetch_exhausted(public_key: impl Into<String>, attempts: u32) -> Self {
        Self::FetchExhausted {
            public_key: public_key.into(),
            attempts,
        }
    }

    /// Create a fatal fetch error
    pub fn fetch(public_key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            public_key: public_key.into(),
            reason: reason.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Standard Result type for UNL operations
pub type Result<T> = std::result::Result<T, UnlError>;

impl From<serde_json::Error> for UnlError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<hex::FromHexError> for UnlError {
    fn from(err: hex::FromHexError) -> Self {
        Self::decoding(format!("invalid hex: {err}"))
    }
}

impl From<base64::DecodeError> for UnlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::decoding(format!("invalid base64: {err}"))
    }
}

impl From<std::io::Error> for UnlError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UnlError::fetch_exhausted("nHBidG3pZK11zQD6kpNDoAhDxH6WLGui6ZxSbUx7LSqLHsgzMPec", 5);
        assert_eq!(
            err.to_string(),
            "Manifest lookup for nHBidG3pZK11zQD6kpNDoAhDxH6WLGui6ZxSbUx7LSqLHsgzMPec exhausted after 5 attempts"
        );

        let err = UnlError::decoding("checksum mismatch");
        assert_eq!(err.to_string(), "Decoding error: checksum mismatch");
    }

    #[test]
    fn test_hex_error_maps_to_decoding() {
        let err: UnlError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, UnlError::Decoding { .. }));
    }
}
