//! REST gateway module for the tenet service.
//!
//! This module provides the `ApiClient` every other component routes its
//! network calls through. The client attaches bearer credentials, enforces
//! the request timeout, and runs the coordinated token-refresh procedure
//! on authorization failures.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
