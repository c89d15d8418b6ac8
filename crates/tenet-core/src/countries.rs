//! Country reference data: the active-country list shown at registration
//! and IP-based country detection. Both endpoints are unauthenticated.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::{ApiClient, ApiError};
use crate::models::{Country, CountryDetection};

#[derive(Debug, Deserialize)]
struct CountriesData {
    countries: Vec<Country>,
}

pub struct CountryService {
    api: Arc<ApiClient>,
}

impl CountryService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// All countries accounts can register under.
    pub async fn list(&self) -> Result<Vec<Country>, ApiError> {
        let data: CountriesData = self.api.get("/countries", false).await?;
        Ok(data.countries)
    }

    /// Best-effort country detection from the caller's IP.
    pub async fn detect(&self) -> Result<CountryDetection, ApiError> {
        self.api.get("/countries/detect", false).await
    }
}
