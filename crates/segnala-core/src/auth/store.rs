//! Durable credential persistence.
//!
//! The store keeps exactly two entries under the state directory: `token`
//! (the raw bearer string) and `user` (the identity record as JSON). They are
//! only meaningful as a pair; `load` refuses anything partial or malformed so
//! a damaged store degrades to "logged out" instead of failing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::Identity;

/// Token entry file name in the state directory.
const TOKEN_FILE: &str = "token";

/// Identity entry file name in the state directory.
const USER_FILE: &str = "user";

/// The (token, identity) pair proving and describing an authenticated user.
///
/// The token is deliberately unreadable outside this crate; only the API
/// gateway ever attaches it to a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub(crate) token: String,
    pub identity: Identity,
}

impl Credential {
    pub fn new(token: impl Into<String>, identity: Identity) -> Self {
        Self {
            token: token.into(),
            identity,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Persistence seam for the current credential.
///
/// Implementations must treat the pair as all-or-nothing: `load` returns a
/// credential only when both halves are present and well-formed.
pub trait CredentialStore: Send + Sync {
    /// Persist the pair, replacing any previous value.
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Return the stored pair, or `None` when absent, partial, or malformed.
    /// Never errors: a broken store reads as "no session".
    fn load(&self) -> Option<Credential>;

    /// Remove both entries. Idempotent; clearing an empty store is a no-op.
    fn clear(&self);
}

/// File-backed store: two small files in an application state directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(USER_FILE)
    }

    fn remove_entry(&self, path: PathBuf) {
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove credential entry");
            }
        }
    }
}

impl CredentialStore for FileStore {
    fn save(&self, credential: &Credential) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create state directory {}", self.dir.display()))?;

        // Any previous pair is removed before the new one is written, and
        // the token is the first entry destroyed and the last one recreated.
        // An interruption at any step leaves a store without a token, which
        // load() rejects; an old token never pairs up with a new identity.
        self.clear();

        let user_json = serde_json::to_string(&credential.identity)
            .context("Failed to serialize identity")?;
        std::fs::write(self.user_path(), user_json).context("Failed to write user entry")?;
        std::fs::write(self.token_path(), &credential.token)
            .context("Failed to write token entry")?;
        Ok(())
    }

    fn load(&self) -> Option<Credential> {
        // The token is opaque, so its bytes come back untouched; only an
        // all-whitespace entry reads as empty.
        let token = match std::fs::read_to_string(self.token_path()) {
            Ok(t) if !t.trim().is_empty() => t,
            Ok(_) => {
                debug!("Token entry is empty, treating store as empty");
                return None;
            }
            Err(_) => return None,
        };

        let user_json = std::fs::read_to_string(self.user_path()).ok()?;
        match serde_json::from_str::<Identity>(&user_json) {
            Ok(identity) => Some(Credential { token, identity }),
            Err(e) => {
                // Corrupted or legacy identity payloads read as logged out.
                debug!(error = %e, "Stored identity did not parse, treating store as empty");
                None
            }
        }
    }

    fn clear(&self) {
        self.remove_entry(self.token_path());
        self.remove_entry(self.user_path());
    }
}
