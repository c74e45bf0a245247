//! Scripted replay of commands and UI events against a snapshot.
//!
//! A script is a YAML list of steps, each with exactly one action:
//!
//! ```yaml
//! steps:
//!   - command: { type: SHOW_CHECK_CONNECTION, payload: { item: 구조, evidenceRefs: [목적, 배경] } }
//!   - advance: 1200
//!   - scroll: 400
//!   - click: "#footer"
//! ```
//!
//! Pointer actions name their target with a selector. Every step yields one
//! [`ReplayRecord`] describing the engine state after it ran.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::document::NodeId;
use crate::domain::listeners::ListenerKind;
use crate::domain::selector::{Selector, SelectorError};
use crate::engine::{Command, CommandOutcome, HighlightEngine, UiEvent};
use crate::marking::marker;
use crate::overlay::{OverlayFrame, TrackerState};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse script: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Step {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("Step {index}: {source}")]
    Selector {
        index: usize,
        #[source]
        source: SelectorError,
    },

    #[error("Step {index}: nothing matches '{selector}'")]
    NoMatch { index: usize, selector: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// One scripted step; exactly one field must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    #[serde(default)]
    pub command: Option<Command>,
    /// Milliseconds of virtual time
    #[serde(default)]
    pub advance: Option<u64>,
    /// Absolute vertical scroll offset
    #[serde(default)]
    pub scroll: Option<f64>,
    #[serde(default)]
    pub resize: Option<Size>,
    #[serde(default)]
    pub hover: Option<String>,
    #[serde(default)]
    pub unhover: Option<String>,
    #[serde(default)]
    pub click: Option<String>,
    /// Remove the matched node from the document, as a host re-render would
    #[serde(default)]
    pub detach: Option<String>,
}

#[derive(Debug, Clone)]
enum Action {
    Command(Box<Command>),
    Advance(u64),
    Scroll(f64),
    Resize(Size),
    Hover(String),
    Unhover(String),
    Click(String),
    Detach(String),
}

impl Action {
    fn label(&self) -> String {
        match self {
            Action::Command(c) => c.name().to_string(),
            Action::Advance(ms) => format!("advance {}ms", ms),
            Action::Scroll(y) => format!("scroll {}", y),
            Action::Resize(s) => format!("resize {}x{}", s.width, s.height),
            Action::Hover(sel) => format!("hover {}", sel),
            Action::Unhover(sel) => format!("unhover {}", sel),
            Action::Click(sel) => format!("click {}", sel),
            Action::Detach(sel) => format!("detach {}", sel),
        }
    }
}

impl Step {
    fn into_action(self, index: usize) -> Result<Action, ScriptError> {
        let mut actions: Vec<Action> = [
            self.command.map(|c| Action::Command(Box::new(c))),
            self.advance.map(Action::Advance),
            self.scroll.map(Action::Scroll),
            self.resize.map(Action::Resize),
            self.hover.map(Action::Hover),
            self.unhover.map(Action::Unhover),
            self.click.map(Action::Click),
            self.detach.map(Action::Detach),
        ]
        .into_iter()
        .flatten()
        .collect();

        match actions.len() {
            1 => Ok(actions.remove(0)),
            0 => Err(ScriptError::InvalidStep {
                index,
                reason: "no action".to_string(),
            }),
            n => Err(ScriptError::InvalidStep {
                index,
                reason: format!("{} actions in one step", n),
            }),
        }
    }
}

impl Script {
    pub fn from_yaml(yaml: &str) -> Result<Self, ScriptError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}

/// Engine state after one step
#[derive(Debug, Clone, Serialize)]
pub struct ReplayRecord {
    pub step: usize,
    pub action: String,
    /// Virtual time after the step
    pub at_ms: u64,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
    pub markers: usize,
    pub listeners: usize,
    pub tooltip_visible: bool,
    pub panel_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<OverlayFrame>,
}

fn select(engine: &HighlightEngine, index: usize, source: &str) -> Result<NodeId, ScriptError> {
    let selector =
        Selector::parse(source).map_err(|source| ScriptError::Selector { index, source })?;
    let doc = engine.doc();
    selector
        .query(doc, doc.root())
        .ok_or_else(|| ScriptError::NoMatch {
            index,
            selector: source.to_string(),
        })
}

/// Deepest text-bearing node under `id`, where a real pointer would land
fn pointer_target(engine: &HighlightEngine, id: NodeId) -> NodeId {
    let doc = engine.doc();
    doc.text_nodes(id).first().copied().unwrap_or(id)
}

fn record(engine: &HighlightEngine, step: usize, action: String, outcome: Option<CommandOutcome>) -> ReplayRecord {
    let state = engine.state();
    let doc = engine.doc();
    ReplayRecord {
        step,
        action,
        at_ms: engine.now(),
        recorded_at: Utc::now(),
        outcome,
        markers: marker::markers_under(doc, doc.root()).len(),
        listeners: state.listeners.len(),
        tooltip_visible: state.popups.tooltip_visible(doc),
        panel_visible: state.popups.panel_visible(doc),
        tracker: engine.connection().and_then(|c| c.tracker()).map(|t| t.state()),
        frame: engine.frame().cloned(),
    }
}

/// Run a script to completion.
///
/// With `realtime`, each `advance` also waits the same wall-clock time so a
/// host can watch the overlay move.
pub async fn run_script(
    engine: &mut HighlightEngine,
    script: Script,
    realtime: bool,
) -> Result<Vec<ReplayRecord>, ScriptError> {
    let mut records = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.into_iter().enumerate() {
        let action = step.into_action(index)?;
        let label = action.label();
        debug!(step = index, action = %label, "Replaying step");

        let mut outcome = None;
        match action {
            Action::Command(command) => outcome = Some(engine.handle(*command)),
            Action::Advance(ms) => {
                if realtime {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                engine.advance(ms);
            }
            Action::Scroll(y) => engine.dispatch(UiEvent::Scroll { y }),
            Action::Resize(size) => engine.dispatch(UiEvent::Resize {
                width: size.width,
                height: size.height,
            }),
            Action::Hover(sel) => {
                let target = pointer_target(engine, select(engine, index, &sel)?);
                engine.dispatch(UiEvent::PointerOver { target });
            }
            Action::Unhover(sel) => {
                let target = pointer_target(engine, select(engine, index, &sel)?);
                engine.dispatch(UiEvent::PointerOut { target });
            }
            Action::Click(sel) => {
                let target = pointer_target(engine, select(engine, index, &sel)?);
                engine.dispatch(UiEvent::Click { target });
            }
            Action::Detach(sel) => {
                let node = select(engine, index, &sel)?;
                engine.doc_mut().remove(node);
            }
        }

        records.push(record(engine, index, label, outcome));
    }

    info!(
        steps = records.len(),
        scroll_listeners = engine.state().listeners.count(ListenerKind::Scroll),
        "Replay finished"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_needs_exactly_one_action() {
        let script = Script::from_yaml(
            r#"
steps:
  - advance: 100
  - scroll: 10
    advance: 5
  - {}
"#,
        )
        .unwrap();
        let mut steps = script.steps.into_iter();
        assert!(matches!(
            steps.next().unwrap().into_action(0),
            Ok(Action::Advance(100))
        ));
        assert!(matches!(
            steps.next().unwrap().into_action(1),
            Err(ScriptError::InvalidStep { index: 1, .. })
        ));
        assert!(steps.next().unwrap().into_action(2).is_err());
    }

    #[test]
    fn test_run_against_small_document() {
        use crate::domain::document::Document;
        use crate::domain::geometry::Viewport;
        use crate::resolver::AnchorResolver;

        let mut doc = Document::new(Viewport::default());
        let root = doc.root();
        let p = doc.create_element("p");
        if let Some(e) = doc.element_mut(p) {
            e.id = Some("note".to_string());
        }
        let text = doc.create_text("물류 센터 통합");
        doc.append_child(p, text);
        doc.append_child(root, p);
        let mut engine = HighlightEngine::new(doc, AnchorResolver::default());

        let script = Script::from_yaml(
            r##"
steps:
  - command: { type: HIGHLIGHT_TEXT, payload: { keywords: [물류] } }
  - hover: "#note"
  - detach: "#note"
"##,
        )
        .unwrap();
        let records = tokio_test::block_on(run_script(&mut engine, script, false)).unwrap();
        assert_eq!(records[0].markers, 1);
        assert!(records[1].tooltip_visible);
        assert_eq!(records[2].markers, 0);
    }

    #[test]
    fn test_unknown_step_field_rejected() {
        assert!(Script::from_yaml("steps:\n  - teleport: 3\n").is_err());
    }

    #[test]
    fn test_command_step_parses() {
        let script = Script::from_yaml(
            r#"
steps:
  - command:
      type: SCROLL_TO_HIGHLIGHT
      payload: { text: "원가 절감" }
"#,
        )
        .unwrap();
        let action = script.steps[0].clone().into_action(0).unwrap();
        assert_eq!(action.label(), "SCROLL_TO_HIGHLIGHT");
    }
}
