//! Navigation authorization.
//!
//! [`evaluate`] is a pure decision: it looks only at the session snapshot and
//! the role a view requires, and never touches storage or the network. The
//! navigation layer runs it on every view change and acts on the verdict;
//! nothing here performs the redirect itself.

use crate::auth::SessionState;
use crate::models::Role;

/// Verdict for a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Render the requested view.
    Allow,
    /// No session: send the user to the login view.
    RedirectToLogin,
    /// Valid session, insufficient role: send the user to the default view.
    RedirectToDefault,
}

/// Decide whether the current session may open a view.
///
/// `required` is the minimum role the view demands, or `None` for views open
/// to any authenticated user. Anonymous users are always redirected to login,
/// even for role-gated views - authentication is checked before authorization.
#[must_use]
pub fn evaluate(session: &SessionState, required: Option<Role>) -> Access {
    let Some(identity) = session.identity() else {
        return Access::RedirectToLogin;
    };
    match required {
        None => Access::Allow,
        Some(role) if identity.role == role => Access::Allow,
        Some(_) => Access::RedirectToDefault,
    }
}
