//! Authentication module for managing the session lifecycle and credentials.
//!
//! This module provides:
//! - `CredentialStore`: token-pair and profile persistence (keychain-backed
//!   `KeyringStore`, in-memory `MemoryStore`)
//! - `AuthService`: code-based login, verification, profile, and logout
//! - `SessionHandle`: the process-wide authentication state machine
//!
//! Sessions rehydrate from stored credentials at startup and are torn down
//! on logout or an unrecoverable token refresh failure.

pub mod credentials;
pub mod service;
pub mod session;

pub use credentials::{Credential, CredentialStore, KeyringStore, MemoryStore, StoreError};
pub use service::{AuthService, CodeRequest};
pub use session::{AuthState, Session, SessionHandle, SessionWatcher};
