//! Principles domain service: browsing, authoring, and agreement, plus the
//! country-level aggregate feed the map view renders.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::{ApiClient, ApiError};
use crate::models::{
    AgreedPrinciples, AgreementSummary, CountryAgreementFeed, Principle, PrinciplesPage,
};

/// Default page size for the principles listing
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
struct PrincipleData {
    principle: Principle,
}

pub struct PrincipleService {
    api: Arc<ApiClient>,
}

impl PrincipleService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetch one page of principles, optionally filtered by a search term.
    /// Authenticated so `userAgreed` reflects the current user.
    pub async fn list(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<PrinciplesPage, ApiError> {
        let mut endpoint = format!("/principles?page={}&limit={}", page, limit);
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            endpoint.push_str("&search=");
            endpoint.push_str(&urlencoding::encode(search));
        }
        self.api.get(&endpoint, true).await
    }

    pub async fn get(&self, id: &str) -> Result<Principle, ApiError> {
        let data: PrincipleData = self.api.get(&format!("/principles/{}", id), true).await?;
        Ok(data.principle)
    }

    /// Create a new principle. The server records the author's agreement
    /// automatically.
    pub async fn create(&self, text: &str) -> Result<Principle, ApiError> {
        let body = serde_json::json!({ "text": text });
        let data: PrincipleData = self.api.post("/principles", Some(&body), true).await?;
        Ok(data.principle)
    }

    pub async fn agree(&self, id: &str) -> Result<AgreementSummary, ApiError> {
        self.api
            .post::<AgreementSummary, serde_json::Value>(
                &format!("/principles/{}/agree", id),
                None,
                true,
            )
            .await
    }

    pub async fn retract(&self, id: &str) -> Result<AgreementSummary, ApiError> {
        self.api
            .delete(&format!("/principles/{}/agree", id), true)
            .await
    }

    /// Principles the current user has agreed with.
    pub async fn my_agreed(&self) -> Result<AgreedPrinciples, ApiError> {
        self.api.get("/principles/user/agreed", true).await
    }

    /// Country-level aggregate agreement, optionally narrowed to a set of
    /// principles or to one author's principles. Read-only; all aggregation
    /// happens server-side.
    pub async fn country_agreement_percentages(
        &self,
        principle_ids: &[String],
        user_id: Option<&str>,
    ) -> Result<CountryAgreementFeed, ApiError> {
        let mut endpoint = String::from("/principles/country-agreement-percentages");
        let mut separator = '?';
        for id in principle_ids {
            endpoint.push(separator);
            endpoint.push_str("principleIds=");
            endpoint.push_str(&urlencoding::encode(id));
            separator = '&';
        }
        if let Some(user_id) = user_id {
            endpoint.push(separator);
            endpoint.push_str("userId=");
            endpoint.push_str(&urlencoding::encode(user_id));
        }
        self.api.get(&endpoint, true).await
    }
}
