//! Optional remembered login password, held in the OS keychain.
//!
//! Strictly a convenience for the interactive login flow: the session token
//! is never stored here, and nothing in the core reads the keychain on its
//! own.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "segnala";

pub struct Keychain;

impl Keychain {
    /// Remember the password for an account.
    pub fn remember(email: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to open keychain entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Look up the remembered password for an account.
    pub fn lookup(email: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to open keychain entry")?;
        entry
            .get_password()
            .context("Failed to read password from keychain")
    }

    /// Forget the remembered password for an account.
    pub fn forget(email: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to open keychain entry")?;
        entry
            .delete_credential()
            .context("Failed to remove password from keychain")?;
        Ok(())
    }

    /// Whether a password is remembered for an account.
    pub fn has(email: &str) -> bool {
        Entry::new(SERVICE_NAME, email)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}
