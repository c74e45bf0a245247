//! Hover tooltip content.

use serde::Serialize;

use crate::domain::analysis::CheckInfo;
use crate::marking::Category;

use super::escape_html;
use super::placement::PopupSize;

pub const TOOLTIP_WIDTH: f64 = 320.0;
pub const TOOLTIP_GAP: f64 = 8.0;

const TOPIC_DETAIL: &str = "문서의 핵심 주제 키워드";
const CHAIN_HINT: &str = "클릭하면 인과관계 · KPI 연관도 표시";

// Rough text metrics for height estimation
const PADDING: f64 = 20.0;
const LINE_HEIGHT: f64 = 18.0;
const CHAR_WIDTH: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipView {
    pub category: Category,
    pub badge: String,
    /// Check item, or the marked text for plain topics
    pub title: String,
    pub detail: String,
    /// Whether clicking opens a causal panel
    pub has_chain: bool,
}

impl TooltipView {
    /// Content for a marker: its check when one is known, else a topic card
    pub fn for_marker(
        category: Category,
        marker_text: &str,
        check: Option<&CheckInfo>,
        has_chain: bool,
    ) -> Self {
        match check {
            Some(info) => Self {
                category,
                badge: category.badge().to_string(),
                title: info.item.clone(),
                detail: info.detail.clone(),
                has_chain,
            },
            None => Self {
                category: Category::Topic,
                badge: Category::Topic.badge().to_string(),
                title: marker_text.to_string(),
                detail: TOPIC_DETAIL.to_string(),
                has_chain,
            },
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<div class=\"al-tt-item\"><span class=\"al-tt-badge al-tt-badge-{}\">{}</span>{}</div>\
             <div class=\"al-tt-detail\">{}</div>",
            self.category.key(),
            escape_html(&self.badge),
            escape_html(&self.title),
            escape_html(&self.detail),
        );
        if self.has_chain {
            html.push_str(&format!("<div class=\"al-tt-hint\">{}</div>", CHAIN_HINT));
        }
        html
    }

    pub fn size(&self) -> PopupSize {
        let per_line = ((TOOLTIP_WIDTH - PADDING) / CHAR_WIDTH).floor().max(1.0);
        let lines = |s: &str| (s.chars().count() as f64 / per_line).ceil().max(1.0);
        let mut height = PADDING + (lines(&self.title) + lines(&self.detail)) * LINE_HEIGHT;
        if self.has_chain {
            height += LINE_HEIGHT;
        }
        PopupSize {
            width: TOOLTIP_WIDTH,
            height,
            gap: TOOLTIP_GAP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_card_when_no_check() {
        let view = TooltipView::for_marker(Category::Warn, "물류", None, false);
        assert_eq!(view.category, Category::Topic);
        assert_eq!(view.badge, "주제");
        assert_eq!(view.detail, TOPIC_DETAIL);
    }

    #[test]
    fn test_html_escapes_analyzer_text() {
        let info = CheckInfo {
            item: "<b>근거</b>".into(),
            result: "FAIL".into(),
            detail: "\"A & B\"".into(),
        };
        let view = TooltipView::for_marker(Category::Fail, "x", Some(&info), true);
        let html = view.to_html();
        assert!(html.contains("&lt;b&gt;근거&lt;/b&gt;"));
        assert!(html.contains("&quot;A &amp; B&quot;"));
        assert!(html.contains("al-tt-badge-fail"));
        assert!(html.contains("al-tt-hint"));
    }

    #[test]
    fn test_size_grows_with_detail() {
        let short = TooltipView::for_marker(Category::Topic, "물류", None, false);
        let mut long = short.clone();
        long.detail = "가".repeat(100);
        assert!(long.size().height > short.size().height);
        assert_eq!(short.size().width, TOOLTIP_WIDTH);
    }
}
