//! Connection overlay: curved connectors from evidence regions to a floating
//! convergence node that follows the targets as the view scrolls.
//!
//! - `discovery`: which regions a check points at
//! - `session`: one overlay's lifecycle (draw, track, teardown)
//! - `tracker`: the damped-spring state machine
//! - `path`, `node`, `palette`: geometry and content

pub mod discovery;
pub mod node;
pub mod palette;
pub mod path;
pub mod session;
pub mod tracker;

use serde::{Deserialize, Serialize};

use crate::domain::analysis::{CoherenceCheck, Verdict};

pub use discovery::{discover_targets, ConnTarget, Discovery, TargetSource};
pub use node::NodeSummary;
pub use palette::{swatch, Swatch, PALETTE};
pub use session::{ConnectionSession, ConnectorFrame, OverlayFrame, SessionPhase};
pub use tracker::{SpringTracker, TrackerState};

/// Payload of a show-connection command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub item: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    /// `PASS`, `WARN` or `FAIL`
    #[serde(default, rename = "checkResult", alias = "result")]
    pub result: Option<String>,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
}

impl ConnectionRequest {
    pub fn verdict(&self) -> Option<Verdict> {
        self.result.as_deref().and_then(Verdict::parse)
    }

    /// Node content for the given targets
    pub fn summary(&self, targets: &[ConnTarget]) -> NodeSummary {
        NodeSummary::new(
            &self.item,
            self.score,
            self.weight,
            self.verdict(),
            targets.iter().map(|t| (t.label.clone(), t.swatch)),
        )
    }
}

impl From<&CoherenceCheck> for ConnectionRequest {
    fn from(check: &CoherenceCheck) -> Self {
        Self {
            item: check.item.clone(),
            detail: check.detail.clone(),
            subject: String::new(),
            score: Some(check.score),
            weight: Some(check.weight),
            result: Some(check.result.as_str().to_string()),
            evidence_refs: check.evidence_refs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_transport_json() {
        let json = r#"{
            "item": "구조 완결성",
            "detail": "목적과 배경이 명확함",
            "subject": "물류 센터 통합",
            "score": 16,
            "weight": 20,
            "checkResult": "PASS",
            "evidenceRefs": ["목적", "배경"]
        }"#;
        let req: ConnectionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.verdict(), Some(Verdict::Pass));
        assert_eq!(req.evidence_refs.len(), 2);
        assert_eq!(req.score, Some(16.0));
    }

    #[test]
    fn test_minimal_request() {
        let req: ConnectionRequest = serde_json::from_str(r#"{"item": "근거"}"#).unwrap();
        assert!(req.evidence_refs.is_empty());
        assert!(req.verdict().is_none());
    }
}
