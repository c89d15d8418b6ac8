//! Core library for the tenet client.
//!
//! tenet is a social "principles" app: users register and log in with
//! emailed one-time codes, then browse, author, and agree with short
//! statements, viewed against country-level agreement aggregates.
//!
//! This crate holds everything below the presentation layer:
//!
//! - `api`: the HTTP gateway (bearer attachment, timeout, coordinated
//!   token refresh)
//! - `auth`: credential persistence, the auth service, and the session
//!   state machine
//! - `principles` / `countries`: domain services over the gateway
//! - `models`: wire and domain data types
//! - `config`: configuration file and environment handling

pub mod api;
pub mod auth;
pub mod config;
pub mod countries;
pub mod models;
pub mod principles;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AuthService, AuthState, Credential, CredentialStore, KeyringStore, MemoryStore, Session,
    SessionHandle, SessionWatcher, StoreError,
};
pub use config::Config;
pub use countries::CountryService;
pub use principles::PrincipleService;
