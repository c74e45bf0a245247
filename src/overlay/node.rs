//! Convergence node content.

use serde::Serialize;

use crate::domain::analysis::Verdict;
use crate::popup::escape_html;

use super::palette::Swatch;

/// Rendered node height; the node is anchored on its vertical centre
pub const NODE_HEIGHT: f64 = 56.0;

/// Distance between the node's right edge and the viewport edge
pub const NODE_RIGHT_INSET: f64 = 16.0;

const MIN_WIDTH: f64 = 120.0;
const MAX_WIDTH: f64 = 240.0;
const HORIZONTAL_PADDING: f64 = 32.0;
const TITLE_CHAR_WIDTH: f64 = 11.0;
const LEGEND_CHAR_WIDTH: f64 = 7.0;
const LEGEND_ITEM_EXTRA: f64 = 14.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: &'static str,
}

/// What the node shows: item, `score/weight`, a result badge and a legend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub item: String,
    pub score_text: Option<String>,
    pub result: Option<Verdict>,
    pub legend: Vec<LegendEntry>,
}

impl NodeSummary {
    pub fn new(
        item: &str,
        score: Option<f64>,
        weight: Option<f64>,
        result: Option<Verdict>,
        legend: impl IntoIterator<Item = (String, Swatch)>,
    ) -> Self {
        let score_text = match (score, weight) {
            (Some(s), Some(w)) => Some(format!("{}/{}", s, w)),
            _ => None,
        };
        Self {
            item: item.to_string(),
            score_text,
            result,
            legend: legend
                .into_iter()
                .map(|(label, swatch)| LegendEntry {
                    label,
                    color: swatch.main,
                })
                .collect(),
        }
    }

    /// Estimated rendered width
    pub fn width(&self) -> f64 {
        let title = self.item.chars().count() as f64 * TITLE_CHAR_WIDTH;
        let legend: f64 = self
            .legend
            .iter()
            .map(|l| l.label.chars().count() as f64 * LEGEND_CHAR_WIDTH + LEGEND_ITEM_EXTRA)
            .sum();
        (title.max(legend) + HORIZONTAL_PADDING).clamp(MIN_WIDTH, MAX_WIDTH)
    }

    pub fn to_html(&self) -> String {
        let result = self.result.map(|v| v.as_str()).unwrap_or_default();
        let badge_class = self.result.unwrap_or(Verdict::Pass).as_str().to_ascii_lowercase();
        let legend = self
            .legend
            .iter()
            .map(|l| {
                format!(
                    "<span class=\"al-conn-legend-item\" style=\"color:{}\">{}</span>",
                    l.color,
                    escape_html(&l.label)
                )
            })
            .collect::<Vec<_>>()
            .join("<span class=\"al-conn-legend-sep\">·</span>");
        format!(
            "<div class=\"al-conn-title\">{}</div>\
             <div class=\"al-conn-score-row al-conn-{}\"><span class=\"al-conn-score\">{}</span>\
             <span class=\"al-conn-badge\">{}</span></div>\
             <div class=\"al-conn-legend\">{}</div>",
            escape_html(&self.item),
            badge_class,
            escape_html(self.score_text.as_deref().unwrap_or_default()),
            result,
            legend
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::palette::swatch;

    fn no_legend() -> Vec<(String, Swatch)> {
        Vec::new()
    }

    #[test]
    fn test_score_text_needs_both_parts() {
        let full = NodeSummary::new("구조 완결성", Some(16.0), Some(20.0), Some(Verdict::Pass), no_legend());
        assert_eq!(full.score_text.as_deref(), Some("16/20"));
        let partial = NodeSummary::new("구조 완결성", Some(16.0), None, None, no_legend());
        assert!(partial.score_text.is_none());
    }

    #[test]
    fn test_width_is_clamped() {
        let tiny = NodeSummary::new("a", None, None, None, no_legend());
        assert_eq!(tiny.width(), 120.0);
        let huge = NodeSummary::new(&"가".repeat(80), None, None, None, no_legend());
        assert_eq!(huge.width(), 240.0);
    }

    #[test]
    fn test_html_legend() {
        let node = NodeSummary::new(
            "근거",
            Some(5.0),
            Some(10.0),
            Some(Verdict::Warn),
            [("목적".to_string(), swatch(0)), ("배경".to_string(), swatch(1))],
        );
        let html = node.to_html();
        assert!(html.contains("5/10"));
        assert!(html.contains("al-conn-warn"));
        assert!(html.contains("#6366f1\">목적"));
        assert!(html.contains("#10b981\">배경"));
    }
}
