use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached copy of the server-side user record. The remote service remains
/// the source of truth; this is whatever the last successful verify or
/// profile fetch returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "birthYear")]
    pub birth_year: Option<i32>,
    pub country: Option<String>,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Name to show in headers and prompts: the display name when set,
    /// otherwise the mailbox part of the email address.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}
