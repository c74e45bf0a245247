//! Causal-chain panel: a bottom-up value timeline plus KPIs and impact.
//!
//! The chain is stored concrete-first (`chain[0]` is the document keyword,
//! the last entry the business goal). The panel shows it reversed, goal on
//! top, each step indented in proportion to its position so the rows read as
//! an ascending staircase.

use serde::Serialize;

use crate::domain::analysis::{CausalChain, Impact};

use super::escape_html;
use super::placement::PopupSize;

pub const PANEL_WIDTH: f64 = 340.0;
pub const PANEL_GAP: f64 = 12.0;

/// Indent of the goal row; the base row has none
pub const MAX_INDENT: f64 = 120.0;

const HEADER_HEIGHT: f64 = 40.0;
const STEP_HEIGHT: f64 = 32.0;
const CONNECTOR_HEIGHT: f64 = 10.0;
const KPI_HEIGHT: f64 = 48.0;
const FOOTER_HEIGHT: f64 = 32.0;
const PADDING: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    Goal,
    Middle,
    Base,
}

impl StepRole {
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            StepRole::Goal => Some("목표"),
            StepRole::Base => Some("기안"),
            StepRole::Middle => None,
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            StepRole::Goal => "🎯",
            StepRole::Base => "📋",
            StepRole::Middle => "▸",
        }
    }

    fn class(&self) -> &'static str {
        match self {
            StepRole::Goal => "al-cp-step-goal",
            StepRole::Base => "al-cp-step-base",
            StepRole::Middle => "al-cp-step",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelStep {
    pub text: String,
    pub role: StepRole,
    /// Left indent in pixels
    pub indent: f64,
    /// Whether a diagonal connector precedes this row
    pub connector: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub keyword: String,
    /// Display order: goal first, base last
    pub steps: Vec<PanelStep>,
    pub kpis: Vec<String>,
    pub impact: Impact,
}

impl PanelView {
    pub fn from_chain(chain: &CausalChain) -> Self {
        let total = chain.chain.len();
        let span = total.saturating_sub(1).max(1) as f64;
        let steps = chain
            .chain
            .iter()
            .enumerate()
            .rev()
            .enumerate()
            .map(|(row, (orig, text))| {
                let role = if orig + 1 == total {
                    StepRole::Goal
                } else if orig == 0 {
                    StepRole::Base
                } else {
                    StepRole::Middle
                };
                PanelStep {
                    text: text.clone(),
                    role,
                    indent: (orig as f64 / span * MAX_INDENT).round(),
                    connector: row > 0,
                }
            })
            .collect();

        Self {
            keyword: chain.keyword.clone(),
            steps,
            kpis: chain.kpis.clone(),
            impact: chain.impact,
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<div class=\"al-cp-header\"><span class=\"al-cp-title\">🔗 {}</span>\
             <button class=\"al-cp-close\" id=\"al-cp-close\">✕</button></div>\
             <div class=\"al-cp-timeline\">",
            escape_html(&self.keyword)
        );
        for step in &self.steps {
            if step.connector {
                html.push_str(&format!(
                    "<div class=\"al-cp-connector\" style=\"padding-left:{}px\"></div>",
                    step.indent - 10.0
                ));
            }
            let tag = step
                .role
                .tag()
                .map(|t| format!("<span class=\"al-cp-label-tag\">{}</span>", t))
                .unwrap_or_default();
            html.push_str(&format!(
                "<div class=\"{}\" style=\"margin-left:{}px\"><span>{}</span><span>{}{}</span></div>",
                step.role.class(),
                step.indent,
                step.role.icon(),
                escape_html(&step.text),
                tag
            ));
        }
        html.push_str("</div>");

        if !self.kpis.is_empty() {
            html.push_str("<div class=\"al-cp-kpi\"><div class=\"al-cp-kpi-label\">📊 연관 KPI</div><div class=\"al-cp-kpi-list\">");
            for kpi in &self.kpis {
                html.push_str(&format!("<span class=\"al-cp-kpi-tag\">{}</span>", escape_html(kpi)));
            }
            html.push_str("</div></div>");
        }

        html.push_str(&format!(
            "<div class=\"al-cp-impact\">영향도 <span class=\"al-cp-impact-badge al-cp-impact-{}\">{}</span></div>",
            self.impact.as_str(),
            self.impact.label()
        ));
        html
    }

    pub fn size(&self) -> PopupSize {
        let connectors = self.steps.iter().filter(|s| s.connector).count() as f64;
        let mut height = PADDING
            + HEADER_HEIGHT
            + self.steps.len() as f64 * STEP_HEIGHT
            + connectors * CONNECTOR_HEIGHT
            + FOOTER_HEIGHT;
        if !self.kpis.is_empty() {
            height += KPI_HEIGHT;
        }
        PopupSize {
            width: PANEL_WIDTH,
            height,
            gap: PANEL_GAP,
        }
    }
}
