//! Session state and credential persistence.
//!
//! This module provides:
//! - `CredentialStore` / `FileStore`: durable storage for the (token, identity) pair
//! - `SessionManager`: the single live session, with login/logout transitions
//!   republished to observers
//! - `Keychain`: opt-in remembered login password via the OS keychain
//!
//! The bearer token is crate-private; pages and navigation code only ever see
//! `SessionState` snapshots.

pub mod keychain;
pub mod session;
pub mod store;

pub use keychain::Keychain;
pub use session::{SessionManager, SessionState};
pub use store::{Credential, CredentialStore, FileStore};
