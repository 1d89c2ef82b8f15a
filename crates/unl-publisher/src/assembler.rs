//! Validator list assembly
//!
//! Looks up each validator's manifest (sequentially, retrying rate-limited
//! lookups), builds the blob, signs it with the ephemeral key and wraps it
//! with the publisher manifest. Assembly is all or nothing.

use crate::manifest::{domain_to_hex, generate_manifest, ManifestFields};
use crate::source::{ManifestInfo, ManifestResponse, ManifestSource};
use crate::vl::{
    unix_to_ledger_time, SignedValidatorList, ValidatorManifestEntry, VlBlob, VL_VERSION,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::Instrument;
use unl_core::{Effects, Result, RetryPolicy, UnlError};
use unl_crypto::{normalize_public_key_hex, sign, KeyPair};

/// Why a single lookup attempt did not produce a manifest
#[derive(Debug)]
enum LookupFailure {
    RateLimited,
    Fatal(UnlError),
}

/// Builds signed validator lists from a manifest source
pub struct ValidatorListAssembler<S> {
    source: S,
    effects: Effects,
    retry: RetryPolicy,
    domain: Option<String>,
}

impl<S: ManifestSource> ValidatorListAssembler<S> {
    /// Create an assembler with the default lookup retry policy
    pub fn new(source: S, effects: Effects) -> Self {
        Self {
            source,
            effects,
            retry: RetryPolicy::manifest_lookup(),
            domain: None,
        }
    }

    /// Use a different retry policy for rate-limited lookups
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Publish the given domain (plain text) in the publisher manifest
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// The underlying manifest source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Look up one manifest, backing off while the source is rate limiting
    ///
    /// Any other error code from the source is fatal. Running out of
    /// attempts yields [`UnlError::FetchExhausted`].
    pub async fn fetch_with_retry(&self, public_key: &str) -> Result<ManifestInfo> {
        let span = tracing::debug_span!("manifest_lookup", public_key);
        let outcome = self
            .retry
            .execute(
                &self.effects,
                |attempt| async move {
                    tracing::debug!(attempt, "Requesting manifest");
                    match self.source.fetch_manifest(public_key).await {
                        Ok(ManifestResponse::Found(info)) => Ok(info),
                        Ok(response) if response.is_rate_limited() => {
                            Err(LookupFailure::RateLimited)
                        }
                        Ok(ManifestResponse::Error(code)) => {
                            Err(LookupFailure::Fatal(UnlError::fetch(public_key, code)))
                        }
                        Err(e) => Err(LookupFailure::Fatal(e)),
                    }
                },
                |failure| matches!(failure, LookupFailure::RateLimited),
            )
            .instrument(span)
            .await;

        let attempts = outcome.attempts;
        if attempts > 1 {
            tracing::debug!(
                public_key,
                attempts,
                waited_ms = outcome.total_retry_delay.as_millis() as u64,
                "Manifest lookup finished after retries"
            );
        }
        outcome.into_result().map_err(|failure| match failure {
            LookupFailure::RateLimited => UnlError::fetch_exhausted(public_key, attempts),
            LookupFailure::Fatal(e) => e,
        })
    }

    /// Look up manifests for all validators, preserving input order
    pub async fn fetch_validator_manifests(
        &self,
        public_keys: &[String],
    ) -> Result<Vec<ValidatorManifestEntry>> {
        let mut validators = Vec::with_capacity(public_keys.len());
        for public_key in public_keys {
            let info = self.fetch_with_retry(public_key).await?;
            validators.push(ValidatorManifestEntry {
                validation_public_key: normalize_public_key_hex(&info.requested)?,
                manifest: info.manifest,
            });
        }
        Ok(validators)
    }

    /// Build the blob for the given validators
    pub async fn create_vl_blob(
        &self,
        sequence: u32,
        expiration_unix: u64,
        public_keys: &[String],
    ) -> Result<VlBlob> {
        let expiration = unix_to_ledger_time(expiration_unix)?;
        let validators = self.fetch_validator_manifests(public_keys).await?;
        Ok(VlBlob {
            sequence,
            expiration,
            validators,
        })
    }

    /// Build the complete signed validator list
    ///
    /// The publisher manifest uses the same `sequence` as the list.
    pub async fn create_vl(
        &self,
        master: &KeyPair,
        ephemeral: &KeyPair,
        sequence: u32,
        expiration_unix: u64,
        public_keys: &[String],
    ) -> Result<SignedValidatorList> {
        let vl_blob = self
            .create_vl_blob(sequence, expiration_unix, public_keys)
            .await?;
        let blob = vl_blob.encode()?;

        let manifest = generate_manifest(&ManifestFields {
            sequence,
            public_key: Some(master.node_public_key_hex.clone()),
            signing_pub_key: Some(ephemeral.node_public_key_hex.clone()),
            signing_private_key: ephemeral.secret_key.clone(),
            master_private_key: master.secret_key.clone(),
            domain: self.domain.as_deref().map(domain_to_hex),
        })?;

        let signature = sign(&STANDARD.decode(&blob)?, &ephemeral.secret_key)?;

        tracing::info!(
            sequence,
            expiration = vl_blob.expiration,
            validators = vl_blob.validators.len(),
            "Created validator list"
        );

        Ok(SignedValidatorList {
            blob,
            manifest,
            signature,
            public_key: master.node_public_key_hex.clone(),
            version: VL_VERSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryManifestSource;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_non_rate_limit_error_is_fatal() {
        let assembler =
            ValidatorListAssembler::new(InMemoryManifestSource::new(), Effects::test());
        let pair = KeyPair::from_seed(&[1u8; 32]).unwrap();

        let err = assembler
            .fetch_with_retry(&pair.node_public_key_base58)
            .await
            .unwrap_err();
        assert_matches!(err, UnlError::Fetch { ref reason, .. } if reason == "manifestNotFound");
    }

    #[tokio::test]
    async fn test_invalid_expiration_fails_before_lookups() {
        let assembler =
            ValidatorListAssembler::new(InMemoryManifestSource::new(), Effects::test());
        let keys = vec!["nHnotlookedup".to_string()];
        assert_matches!(
            assembler.create_vl_blob(1, 10, &keys).await,
            Err(UnlError::Invalid { .. })
        );
    }
}
