//! Commands and UI events accepted by the engine, and what came of them.
//!
//! Commands use the transport's `{ "type": ..., "payload": ... }` envelope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::analysis::HighlightData;
use crate::domain::document::NodeId;
use crate::marking::ScrollTarget;
use crate::overlay::{ConnectionRequest, TargetSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightTextPayload {
    pub keywords: Vec<String>,
    /// Marker class; plain keywords when absent
    #[serde(default)]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollToPayload {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    HighlightText(HighlightTextPayload),
    ClearHighlights,
    ScrollToHighlight(ScrollToPayload),
    ShowCheckConnection(ConnectionRequest),
    ToggleHighlights(Option<HighlightData>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::HighlightText(_) => "HIGHLIGHT_TEXT",
            Command::ClearHighlights => "CLEAR_HIGHLIGHTS",
            Command::ScrollToHighlight(_) => "SCROLL_TO_HIGHLIGHT",
            Command::ShowCheckConnection(_) => "SHOW_CHECK_CONNECTION",
            Command::ToggleHighlights(_) => "TOGGLE_HIGHLIGHTS",
        }
    }
}

/// Input from the host. Pointer events carry the node under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    PointerOver { target: NodeId },
    PointerOut { target: NodeId },
    Click { target: NodeId },
    /// Vertical scroll to an absolute offset
    Scroll { y: f64 },
    Resize { width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Highlighted {
        markers: usize,
    },
    Cleared {
        removed: usize,
        connection_closed: bool,
    },
    Scrolled {
        target: ScrollTarget,
    },
    ConnectionStarted {
        session: Uuid,
        source: TargetSource,
        targets: Vec<String>,
    },
    /// No targets; the fallback phrase was scrolled to instead
    ConnectionFallback {
        phrase: Option<String>,
        target: ScrollTarget,
    },
    Toggled {
        enabled: bool,
    },
}
