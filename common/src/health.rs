//! Health analysis of a single product, as produced by the backend's AI
//! endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire;

const NO_ANALYSIS: &str = "No detailed analysis available.";

/// Product details echoed back with an analysis. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub expire_date: Option<String>,
}

/// `{ success, product, health_score, ai_analysis, message }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthAnalysis {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub product: Option<AnalyzedProduct>,
    /// 0 to 100.
    #[serde(default, deserialize_with = "wire::count")]
    pub health_score: u64,
    #[serde(default)]
    pub ai_analysis: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthRating {
    Excellent,
    Moderate,
    Poor,
}

impl HealthRating {
    pub fn from_score(score: u64) -> Self {
        match score {
            75.. => HealthRating::Excellent,
            50..=74 => HealthRating::Moderate,
            _ => HealthRating::Poor,
        }
    }
}

impl fmt::Display for HealthRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthRating::Excellent => "Excellent",
            HealthRating::Moderate => "Moderate",
            HealthRating::Poor => "Poor",
        })
    }
}

impl HealthAnalysis {
    pub fn rating(&self) -> HealthRating {
        HealthRating::from_score(self.health_score)
    }

    /// The analysis body: the text after an `Analysis:` label if the model
    /// wrote one, otherwise the whole text.
    pub fn summary(&self) -> &str {
        let text = match self.ai_analysis.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => return NO_ANALYSIS,
        };
        let lower = text.to_ascii_lowercase();
        match lower.find("analysis:") {
            Some(at) => text[at + "analysis:".len()..].trim(),
            None => text,
        }
    }
}
