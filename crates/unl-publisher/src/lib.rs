//! UNL Publisher: manifests and signed validator lists
//!
//! - **Binary**: tagged-field writer and canonical field object encoding
//! - **Manifest**: dual-signed manifests binding master and ephemeral keys
//! - **VL**: blob model, ledger time and the signed output document
//! - **Source**: the manifest lookup seam
//! - **Assembler**: retrying lookups and end-to-end list creation

/// Validator list assembly
pub mod assembler;
/// Canonical binary field encoding
pub mod binary;
/// Validator manifests
pub mod manifest;
/// Manifest lookup seam
pub mod source;
/// Validator list blob and output document
pub mod vl;

pub use assembler::ValidatorListAssembler;
pub use binary::{FieldId, FieldValue, StObject, TaggedFieldWriter};
pub use manifest::{domain_to_hex, generate_manifest, Manifest, ManifestFields, MANIFEST_PREFIX};
pub use source::{InMemoryManifestSource, ManifestInfo, ManifestResponse, ManifestSource, SLOW_DOWN};
pub use vl::{
    ledger_time_to_unix, unix_to_ledger_time, SignedValidatorList, ValidatorManifestEntry, VlBlob,
    RIPPLE_EPOCH_OFFSET, VL_VERSION,
};
