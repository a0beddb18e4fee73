//! Session and authorization core for the segnala admin console.
//!
//! Everything a front end needs to talk to the segnala backend safely:
//!
//! - [`auth`]: the credential store (token + identity persisted as one unit)
//!   and the [`SessionManager`], the single owner of the session state machine
//! - [`api`]: the [`ApiGateway`], the one place requests are issued and
//!   failures normalized into [`GatewayError`]
//! - [`guard`]: the pure navigation decision to allow a view or redirect
//! - [`config`]: base URL resolution and the on-disk state directory
//!
//! The flow between them is deliberately one-way. The session publishes
//! snapshots; the gateway reads the token and may end the session on a
//! 401/403; the guard only ever looks at a snapshot. No other component
//! touches the token.

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod models;

pub use api::{ApiGateway, GatewayError};
pub use auth::{Credential, CredentialStore, FileStore, Keychain, SessionManager, SessionState};
pub use config::{Config, ConfigError};
pub use guard::{evaluate, Access};
pub use models::{Identity, Role};
