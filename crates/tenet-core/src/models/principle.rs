use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short user-authored statement other users can agree with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principle {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "agreementCount", default)]
    pub agreement_count: i64,
    #[serde(rename = "userAgreed", default)]
    pub user_agreed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Principle {
    /// Single-line preview for list views, truncated on a char boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut line: String = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.chars().count() > max_chars {
            line = line.chars().take(max_chars.saturating_sub(1)).collect();
            line.push('…');
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

/// One page of the principles listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinciplesPage {
    pub principles: Vec<Principle>,
    pub pagination: Pagination,
}

/// Principles the current user has agreed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreedPrinciples {
    pub principles: Vec<Principle>,
    pub count: u64,
}

/// Result of agreeing with (or retracting agreement from) a principle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementSummary {
    #[serde(rename = "principleId")]
    pub principle_id: String,
    #[serde(rename = "agreementCount")]
    pub agreement_count: i64,
    #[serde(rename = "userAgreed")]
    pub user_agreed: bool,
}
