//! Tooltip and causal-panel fixtures.
//!
//! Both popups are singleton elements appended to the document the first
//! time they are needed and reused afterwards. Only one is visible at a time:
//! opening the panel hides the tooltip.

pub mod panel;
pub mod placement;
pub mod tooltip;

use crate::domain::document::{Document, NodeId, OVERLAY_ATTR};
use crate::domain::geometry::Rect;

pub use panel::{PanelStep, PanelView, StepRole};
pub use placement::PopupSize;
pub use tooltip::TooltipView;

pub const TOOLTIP_ID: &str = "al-tooltip";
pub const PANEL_ID: &str = "al-chain-panel";
pub const PANEL_CLOSE_ID: &str = "al-cp-close";
pub const TOOLTIP_VISIBLE_CLASS: &str = "al-tooltip-visible";
pub const PANEL_VISIBLE_CLASS: &str = "al-panel-visible";

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct PopupFixtures {
    tooltip: Option<NodeId>,
    panel: Option<NodeId>,
    close_button: Option<NodeId>,
    tooltip_view: Option<TooltipView>,
    panel_view: Option<PanelView>,
    created: usize,
}

impl PopupFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    fn fixture(&mut self, doc: &mut Document, dom_id: &str) -> NodeId {
        let el = doc.create_element("div");
        doc.set_attr(el, OVERLAY_ATTR, "popup");
        if let Some(e) = doc.element_mut(el) {
            e.id = Some(dom_id.to_string());
            e.classes.push(dom_id.to_string());
        }
        let root = doc.root();
        doc.append_child(root, el);
        self.created += 1;
        el
    }

    fn ensure_tooltip(&mut self, doc: &mut Document) -> NodeId {
        match self.tooltip {
            Some(id) if doc.is_alive(id) => id,
            _ => {
                let id = self.fixture(doc, TOOLTIP_ID);
                self.tooltip = Some(id);
                id
            }
        }
    }

    fn ensure_panel(&mut self, doc: &mut Document) -> NodeId {
        match self.panel {
            Some(id) if doc.is_alive(id) => id,
            _ => {
                let id = self.fixture(doc, PANEL_ID);
                let close = doc.create_element("button");
                if let Some(e) = doc.element_mut(close) {
                    e.id = Some(PANEL_CLOSE_ID.to_string());
                    e.classes.push(PANEL_CLOSE_ID.to_string());
                }
                let label = doc.create_text("✕");
                doc.append_child(close, label);
                doc.append_child(id, close);
                self.panel = Some(id);
                self.close_button = Some(close);
                id
            }
        }
    }

    /// Number of fixture elements ever created
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn show_tooltip(&mut self, doc: &mut Document, anchor: &Rect, view: TooltipView) {
        let el = self.ensure_tooltip(doc);
        let size = view.size();
        let vp = doc.viewport();
        let at = placement::place_above_or_below(anchor, size, &vp);
        doc.set_client_rect(el, Rect::new(at.x, at.y, at.x + size.width, at.y + size.height));
        doc.add_class(el, TOOLTIP_VISIBLE_CLASS);
        self.tooltip_view = Some(view);
    }

    pub fn hide_tooltip(&mut self, doc: &mut Document) {
        if let Some(el) = self.tooltip {
            doc.remove_class(el, TOOLTIP_VISIBLE_CLASS);
        }
    }

    pub fn show_panel(&mut self, doc: &mut Document, anchor: &Rect, view: PanelView) {
        self.hide_tooltip(doc);
        let el = self.ensure_panel(doc);
        let size = view.size();
        let vp = doc.viewport();
        let at = placement::place_clamped(anchor, size, &vp);
        doc.set_client_rect(el, Rect::new(at.x, at.y, at.x + size.width, at.y + size.height));
        doc.add_class(el, PANEL_VISIBLE_CLASS);
        self.panel_view = Some(view);
    }

    pub fn hide_panel(&mut self, doc: &mut Document) {
        if let Some(el) = self.panel {
            doc.remove_class(el, PANEL_VISIBLE_CLASS);
        }
    }

    pub fn tooltip_visible(&self, doc: &Document) -> bool {
        self.tooltip
            .is_some_and(|el| doc.has_class(el, TOOLTIP_VISIBLE_CLASS))
    }

    pub fn panel_visible(&self, doc: &Document) -> bool {
        self.panel.is_some_and(|el| doc.has_class(el, PANEL_VISIBLE_CLASS))
    }

    /// Last tooltip content shown
    pub fn tooltip_view(&self) -> Option<&TooltipView> {
        self.tooltip_view.as_ref()
    }

    /// Last panel content shown
    pub fn panel_view(&self) -> Option<&PanelView> {
        self.panel_view.as_ref()
    }

    pub fn tooltip_element(&self) -> Option<NodeId> {
        self.tooltip
    }

    pub fn panel_element(&self) -> Option<NodeId> {
        self.panel
    }

    pub fn panel_contains(&self, doc: &Document, node: NodeId) -> bool {
        self.panel.is_some_and(|el| doc.contains(el, node))
    }

    pub fn is_close_button(&self, doc: &Document, node: NodeId) -> bool {
        self.close_button.is_some_and(|el| doc.contains(el, node))
    }

    /// Remove both fixtures from the document
    pub fn remove(&mut self, doc: &mut Document) {
        for el in [self.tooltip.take(), self.panel.take()].into_iter().flatten() {
            doc.remove(el);
        }
        self.close_button = None;
        self.tooltip_view = None;
        self.panel_view = None;
    }
}
