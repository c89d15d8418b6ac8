//! Data models for tenet entities.
//!
//! This module contains the data structures exchanged with the tenet API:
//!
//! - `UserProfile`: the authenticated user's cached profile
//! - `Principle`, `PrinciplesPage`, `AgreementSummary`: principles and
//!   agreement tracking
//! - `Country`, `CountryAgreement`: country reference data and the
//!   aggregate agreement feed consumed by the map view

pub mod country;
pub mod principle;
pub mod user;

pub use country::{Country, CountryAgreement, CountryAgreementFeed, CountryDetection};
pub use principle::{AgreedPrinciples, AgreementSummary, Pagination, Principle, PrinciplesPage};
pub use user::UserProfile;
