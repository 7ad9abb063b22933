use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "yapd";

/// Keychain account holding the credential store passphrase
const MASTER_ACCOUNT: &str = "config-secret";

/// Environment variable that takes precedence over the keychain
pub const SECRET_ENV: &str = "CONFIG_SECRET";

/// The operator passphrase the credential store key is derived from.
pub struct MasterSecret;

impl MasterSecret {
    /// Store the passphrase in the OS keychain
    pub fn store(passphrase: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, MASTER_ACCOUNT)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(passphrase)
            .context("Failed to store passphrase in keychain")?;
        Ok(())
    }

    /// Retrieve the passphrase from the OS keychain
    pub fn get() -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, MASTER_ACCOUNT)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve passphrase from keychain")
    }

    /// Delete the stored passphrase
    pub fn delete() -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, MASTER_ACCOUNT)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete passphrase from keychain")?;
        Ok(())
    }

    /// Check if a passphrase is stored in the keychain
    pub fn is_stored() -> bool {
        if let Ok(entry) = Entry::new(SERVICE_NAME, MASTER_ACCOUNT) {
            entry.get_password().is_ok()
        } else {
            false
        }
    }

    /// `CONFIG_SECRET` if set and non-empty, else the keychain entry.
    pub fn resolve() -> Result<String> {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    fn resolve_with<F>(lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(SECRET_ENV).filter(|s| !s.is_empty()) {
            debug!("Using master passphrase from environment");
            return Ok(secret);
        }
        Self::get().with_context(|| {
            format!(
                "No master passphrase: set {} or run `yapd init`",
                SECRET_ENV
            )
        })
    }
}
