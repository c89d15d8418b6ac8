use serde::{Deserialize, Serialize};

/// Country reference entry used by registration and the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// ISO 3166-1 alpha-2 code
    pub code: String,
}

/// Result of IP-based country detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryDetection {
    pub country: Option<Country>,
    pub detected: bool,
    pub message: Option<String>,
}

/// Aggregate agreement level for one country, 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryAgreement {
    pub country: Country,
    pub percentage: f64,
}

impl CountryAgreement {
    pub fn percentage_display(&self) -> String {
        format!("{:.0}%", self.percentage.clamp(0.0, 100.0))
    }
}

/// Read-only aggregate feed driving the map coloring. Computed entirely
/// server-side; the client only renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryAgreementFeed {
    pub countries: Vec<CountryAgreement>,
}
