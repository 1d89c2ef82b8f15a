//! `unl secret`: direct access to the secret store

use crate::secrets::SecretStore;

/// Print a secret
pub fn get(store: &dyn SecretStore, service: &str, key: &str) -> anyhow::Result<()> {
    match store.get(service, key)? {
        Some(value) => println!("{value}"),
        None => anyhow::bail!("no secret {service}/{key}"),
    }
    Ok(())
}

/// Store a secret
pub fn set(store: &dyn SecretStore, service: &str, key: &str, value: &str) -> anyhow::Result<()> {
    store.set(service, key, value)?;
    println!("Saved {service}/{key}");
    Ok(())
}

/// Remove a secret
pub fn delete(store: &dyn SecretStore, service: &str, key: &str) -> anyhow::Result<()> {
    if store.delete(service, key)? {
        println!("Deleted {service}/{key}");
    } else {
        println!("No secret {service}/{key}");
    }
    Ok(())
}

/// List the keys stored for a service
pub fn list(store: &dyn SecretStore, service: &str) -> anyhow::Result<()> {
    for key in store.list(service)? {
        println!("{key}");
    }
    Ok(())
}
