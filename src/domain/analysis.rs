//! Analyzer payloads consumed by the highlighting engine.
//!
//! These mirror what the upstream scoring pipeline hands over; the engine
//! only reads them.

use serde::{Deserialize, Serialize};

/// Result of a weighted coherence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl Verdict {
    /// Derive a verdict from score/weight (>= 0.8 pass, >= 0.4 warn)
    pub fn from_ratio(score: f64, weight: f64) -> Self {
        if weight <= 0.0 {
            return Verdict::Fail;
        }
        let ratio = score / weight;
        if ratio >= 0.8 {
            Verdict::Pass
        } else if ratio >= 0.4 {
            Verdict::Warn
        } else {
            Verdict::Fail
        }
    }

    /// Parse the analyzer's free-form result string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Some(Verdict::Pass),
            "WARN" => Some(Verdict::Warn),
            "FAIL" => Some(Verdict::Fail),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Warn => "WARN",
            Verdict::Fail => "FAIL",
        }
    }
}

/// Estimated business impact of a causal chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    #[default]
    Medium,
    Low,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }

    /// Display label shown in the panel footer
    pub fn label(&self) -> &'static str {
        match self {
            Impact::High => "높음",
            Impact::Medium => "보통",
            Impact::Low => "낮음",
        }
    }
}

/// A scored coherence check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoherenceCheck {
    pub item: String,
    pub result: Verdict,
    pub detail: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_refs: Vec<String>,
}

/// Minimal check shape used for passive highlighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInfo {
    pub item: String,
    pub result: String,
    pub detail: String,
}

impl CheckInfo {
    pub fn verdict(&self) -> Option<Verdict> {
        Verdict::parse(&self.result)
    }
}

impl From<&CoherenceCheck> for CheckInfo {
    fn from(check: &CoherenceCheck) -> Self {
        Self {
            item: check.item.clone(),
            result: check.result.as_str().to_string(),
            detail: check.detail.clone(),
        }
    }
}

/// Value chain from a concrete document keyword up to a business goal.
/// `chain[0]` is the most concrete entry, the last one the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalChain {
    pub keyword: String,
    pub chain: Vec<String>,
    #[serde(default)]
    pub kpis: Vec<String>,
    #[serde(default)]
    pub impact: Impact,
}

/// Payload for a full marking pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightData {
    pub checks: Vec<CheckInfo>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub causal_chains: Vec<CausalChain>,
}
