// crates/types/src/insights.rs
//! Structured insights payload returned by the narrative-generation endpoint.
//!
//! The tracking core treats insights like any other opaque job result; these
//! shapes exist so presentation layers can decode the payload when they want
//! the structured fields instead of raw JSON.

use serde::{Deserialize, Serialize};

/// AI-generated narrative over a completed job (forecast explanation,
/// model interpretation). All sections are optional: the backend omits
/// whatever the generation pass could not produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// A feature or factor the backend identified as influencing the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub name: String,
    /// Relative importance, when the backend quantifies it (e.g. SHAP value).
    #[serde(default)]
    pub impact: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A what-if projection attached to the narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub projected_change: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_full_report() {
        let json = serde_json::json!({
            "summary": "Revenue is projected to grow 12% next quarter.",
            "drivers": [
                {"name": "ad_spend", "impact": 0.42},
                {"name": "seasonality", "impact": 0.31, "description": "Q4 uplift"}
            ],
            "scenarios": [
                {"name": "budget_cut", "projected_change": -0.08}
            ],
            "recommendations": ["Increase ad spend in November"]
        });
        let report: InsightsReport = serde_json::from_value(json).unwrap();
        assert_eq!(report.drivers.len(), 2);
        assert_eq!(report.drivers[0].name, "ad_spend");
        assert_eq!(report.scenarios[0].projected_change, Some(-0.08));
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_decode_sparse_report() {
        // Backend may omit every section.
        let report: InsightsReport = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(report, InsightsReport::default());
        assert!(report.summary.is_none());
        assert!(report.drivers.is_empty());
    }
}
