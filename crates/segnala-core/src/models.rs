//! Domain types shared across the session core.
//!
//! The backend speaks camelCase JSON (`clienteId`); field renames here are
//! the single place that mapping lives.

use serde::{Deserialize, Serialize};

/// Canonical role vocabulary.
///
/// The backend historically emitted several spellings; only these two are
/// accepted. Anything else fails deserialization, which the credential store
/// treats as "no session" rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

/// The authenticated user record, as issued by the backend at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Role,
    /// Client organization the operator belongs to; admins have none.
    #[serde(rename = "clienteId", default)]
    pub cliente_id: Option<i64>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
