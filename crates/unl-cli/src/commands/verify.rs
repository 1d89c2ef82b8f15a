//! `unl verify`: offline check of a published list

use std::path::Path;
use unl_publisher::{SignedValidatorList, VlBlob};

/// Verify the document at `path` and print a summary
pub fn run(path: &Path, now_unix: u64) -> anyhow::Result<VlBlob> {
    let contents = std::fs::read_to_string(path)?;
    let vl = SignedValidatorList::from_json(&contents)?;
    vl.verify()?;

    let blob = vl.decode_blob()?;
    println!("Signature:   valid");
    println!("Publisher:   {}", vl.public_key);
    println!("Sequence:    {}", blob.sequence);
    println!(
        "Expiration:  {} (unix {}){}",
        blob.expiration,
        blob.expiration_unix(),
        if blob.is_expired_at(now_unix) { " EXPIRED" } else { "" }
    );
    println!("Validators:  {}", blob.validators.len());
    for entry in &blob.validators {
        println!("  {}", entry.validation_public_key);
    }
    Ok(blob)
}
