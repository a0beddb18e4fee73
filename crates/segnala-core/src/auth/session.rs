//! In-memory session state and its process-wide provider.
//!
//! [`SessionManager`] owns the single live session for the process. It reads
//! the credential store exactly once at construction and applies the two
//! legal transitions (`login`, `logout`). Every change is republished through
//! a watch channel so navigation and header surfaces observe the same state.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::store::{Credential, CredentialStore};
use crate::models::Identity;

/// Current authentication state of the running application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Credential),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(credential) => Some(&credential.identity),
        }
    }
}

/// Owner of the live session.
///
/// Everything else holds this by shared reference and consumes immutable
/// [`SessionState`] snapshots; the only mutations are [`login`] and
/// [`logout`]. The raw token never leaves the crate.
///
/// [`login`]: SessionManager::login
/// [`logout`]: SessionManager::logout
pub struct SessionManager {
    store: Box<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Build the session from whatever the store currently holds. A partial
    /// or malformed store reads as [`SessionState::Anonymous`].
    pub fn new(store: Box<dyn CredentialStore>) -> Self {
        let initial = match store.load() {
            Some(credential) => {
                debug!(user_id = credential.identity.id, "Restored persisted session");
                SessionState::Authenticated(credential)
            }
            None => {
                debug!("No persisted session, starting anonymous");
                SessionState::Anonymous
            }
        };
        let (state, _) = watch::channel(initial);
        Self { store, state }
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes. The receiver always starts at the current
    /// value; every `login`/`logout` is visible to all receivers before the
    /// call returns.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// Bearer token for outbound requests. Crate-visible on purpose: the API
    /// gateway is the only caller, which keeps the invalidate-on-401 rule
    /// impossible to bypass from page code.
    pub(crate) fn bearer_token(&self) -> Option<String> {
        match &*self.state.borrow() {
            SessionState::Anonymous => None,
            SessionState::Authenticated(credential) => Some(credential.token.clone()),
        }
    }

    /// Establish a new session, replacing any previous one.
    ///
    /// Persistence failure is logged and tolerated: the in-memory session is
    /// still valid for this process, it just will not survive a restart.
    pub fn login(&self, token: impl Into<String>, identity: Identity) {
        let credential = Credential::new(token, identity);
        if let Err(e) = self.store.save(&credential) {
            warn!(error = %e, "Failed to persist credential; session is memory-only");
        }
        info!(
            user_id = credential.identity.id,
            role = %credential.identity.role,
            "Session established"
        );
        self.state.send_replace(SessionState::Authenticated(credential));
    }

    /// End the session and wipe the store. Safe to call at any time, in any
    /// state, any number of times.
    pub fn logout(&self) {
        self.store.clear();
        let previous = self.state.send_replace(SessionState::Anonymous);
        if previous.is_authenticated() {
            info!("Session ended");
        } else {
            debug!("Logout on an already-anonymous session");
        }
    }
}
