//! Tri-level quality classification for averaged throughput values.

use serde::{Deserialize, Serialize};

/// Quality label attached to zones and antenna sectors.
///
/// Serialized with the operator-facing labels used across the dashboard
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Bon,
    Moyen,
    Critique,
    /// No samples to judge from.
    Inconnu,
}

/// Classification cut-points in Mbps: `good` is the floor of `Bon`,
/// `medium` the floor of `Moyen`. A single configurable policy is threaded
/// through every call site that derives a status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub good: f64,
    pub medium: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            good: 10.0,
            medium: 5.0,
        }
    }
}

/// Classify an averaged metric value. `None` (no samples) maps to
/// `Inconnu`; otherwise classification gets strictly worse as the value
/// decreases.
pub fn classify(value: Option<f64>, thresholds: &StatusThresholds) -> QualityStatus {
    match value {
        None => QualityStatus::Inconnu,
        Some(v) if v >= thresholds.good => QualityStatus::Bon,
        Some(v) if v >= thresholds.medium => QualityStatus::Moyen,
        Some(_) => QualityStatus::Critique,
    }
}
