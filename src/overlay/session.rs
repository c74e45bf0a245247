//! One connection overlay session, from scheduling to teardown.
//!
//! A session owns everything it injects: the convergence node, the connector
//! layer, one floating label per target, its listener registrations and its
//! timers. Teardown removes all of it and is safe to repeat.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::document::{Document, NodeId, OVERLAY_ATTR};
use crate::domain::geometry::{Point, Rect};
use crate::domain::listeners::{ListenerKind, ListenerOwner, ListenerRegistry};
use crate::engine::scheduler::{FrameId, Scheduler, Task, TimerId};

use super::discovery::ConnTarget;
use super::node::{NodeSummary, NODE_HEIGHT, NODE_RIGHT_INSET};
use super::path::{connector_path, connector_start};
use super::tracker::{ideal_y, SpringTracker, TrackerState, SCROLL_DEBOUNCE_MS};

/// Delay between showing targets and drawing, to let the scroll land
pub const DRAW_DELAY_MS: u64 = 500;

/// Outside clicks are ignored until this long after the session starts
pub const DISMISS_ARM_MS: u64 = 600;

/// Per-connector entry stagger
pub const ENTRY_STAGGER_MS: u64 = 150;

/// Duration of one connector's draw-in
pub const PATH_DRAW_MS: u64 = 600;

/// Duration of a dot fade-in
pub const DOT_FADE_MS: u64 = 300;

/// Minimum entry phase length
pub const MIN_ENTRY_MS: u64 = 800;

/// Labels float this far above their target
pub const LABEL_OFFSET_Y: f64 = 28.0;

/// Identifier of the connector layer element
pub const OVERLAY_LAYER_ID: &str = "al-conn-overlay";
pub const NODE_CLASS: &str = "al-conn-node";
pub const LABEL_CLASS: &str = "al-conn-label";

/// Length of the entry phase for `n` connectors
pub fn entry_duration_ms(n: usize) -> u64 {
    MIN_ENTRY_MS.max(n as u64 * ENTRY_STAGGER_MS + PATH_DRAW_MS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Targets highlighted, overlay not drawn yet
    Scheduled,
    Drawn,
}

/// One painted connector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorFrame {
    pub label: String,
    pub color: &'static str,
    pub color_light: &'static str,
    /// SVG path data
    pub d: String,
    /// Endpoint dot at the target
    pub dot: Point,
    /// Top-left of the floating label
    pub label_at: Point,
    /// Entry animation start offset
    pub delay_ms: u64,
}

/// Everything a host needs to paint the overlay for the current frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub session: Uuid,
    pub tracker: TrackerState,
    pub node: Rect,
    pub summary: NodeSummary,
    pub connectors: Vec<ConnectorFrame>,
    /// Dot where all connectors converge
    pub end_dot: Point,
    pub end_dot_delay_ms: u64,
}

#[derive(Debug)]
pub struct ConnectionSession {
    id: Uuid,
    phase: SessionPhase,
    targets: Vec<ConnTarget>,
    summary: NodeSummary,
    tracker: Option<SpringTracker>,
    node_el: Option<NodeId>,
    layer_el: Option<NodeId>,
    label_els: Vec<NodeId>,
    debounce: Option<TimerId>,
    frame_req: Option<FrameId>,
    frame: Option<OverlayFrame>,
}

impl ConnectionSession {
    /// Highlight the targets and schedule drawing and dismissal arming
    pub fn start(
        doc: &mut Document,
        scheduler: &mut Scheduler,
        targets: Vec<ConnTarget>,
        summary: NodeSummary,
    ) -> Self {
        let id = Uuid::new_v4();
        for t in &targets {
            doc.add_class(t.region, t.highlight_class);
        }
        scroll_to_show(doc, &targets);
        scheduler.schedule(DRAW_DELAY_MS, Task::DrawOverlay(id));
        scheduler.schedule(DISMISS_ARM_MS, Task::ArmDismiss(id));
        info!(session = %id, targets = targets.len(), item = %summary.item, "Connection session started");

        Self {
            id,
            phase: SessionPhase::Scheduled,
            targets,
            summary,
            tracker: None,
            node_el: None,
            layer_el: None,
            label_els: Vec::new(),
            debounce: None,
            frame_req: None,
            frame: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn targets(&self) -> &[ConnTarget] {
        &self.targets
    }

    pub fn tracker(&self) -> Option<&SpringTracker> {
        self.tracker.as_ref()
    }

    /// Latest painted frame
    pub fn frame(&self) -> Option<&OverlayFrame> {
        self.frame.as_ref()
    }

    /// Elements injected by this session
    pub fn overlay_elements(&self) -> Vec<NodeId> {
        self.node_el
            .iter()
            .chain(self.layer_el.iter())
            .chain(self.label_els.iter())
            .copied()
            .collect()
    }

    /// Whether a click on `node` counts as inside the session
    pub fn owns_click(&self, doc: &Document, node: NodeId) -> bool {
        self.overlay_elements()
            .into_iter()
            .chain(self.targets.iter().map(|t| t.region))
            .any(|el| doc.contains(el, node))
    }

    /// Drop targets whose regions have detached. Returns how many remain.
    fn prune_detached(&mut self, doc: &mut Document) -> usize {
        let mut kept_targets = Vec::with_capacity(self.targets.len());
        let mut kept_labels = Vec::with_capacity(self.label_els.len());
        let labels = std::mem::take(&mut self.label_els);
        let mut labels = labels.into_iter();
        for target in std::mem::take(&mut self.targets) {
            let label = labels.next();
            if doc.is_alive(target.region) {
                kept_targets.push(target);
                kept_labels.extend(label);
            } else {
                debug!(session = %self.id, label = %target.label, "Target detached; dropping");
                if let Some(el) = label {
                    doc.remove(el);
                }
            }
        }
        self.targets = kept_targets;
        self.label_els = kept_labels;
        self.targets.len()
    }

    /// Inject the overlay and start the entry phase. Returns false when every
    /// target has detached and the session should be torn down.
    pub fn draw(&mut self, doc: &mut Document, scheduler: &mut Scheduler) -> bool {
        if self.prune_detached(doc) == 0 {
            return false;
        }
        let root = doc.root();

        let node = doc.create_element("div");
        doc.set_attr(node, OVERLAY_ATTR, "node");
        doc.add_class(node, NODE_CLASS);
        for text in [Some(self.summary.item.clone()), self.summary.score_text.clone()]
            .into_iter()
            .flatten()
        {
            let run = doc.create_text(&text);
            doc.append_child(node, run);
        }
        doc.append_child(root, node);

        let layer = doc.create_element("svg");
        doc.set_attr(layer, OVERLAY_ATTR, "layer");
        if let Some(e) = doc.element_mut(layer) {
            e.id = Some(OVERLAY_LAYER_ID.to_string());
        }
        doc.append_child(root, layer);

        for target in &self.targets {
            let label = doc.create_element("div");
            doc.set_attr(label, OVERLAY_ATTR, "label");
            doc.add_class(label, LABEL_CLASS);
            let run = doc.create_text(&target.label);
            doc.append_child(label, run);
            doc.append_child(root, label);
            self.label_els.push(label);
        }

        self.node_el = Some(node);
        self.layer_el = Some(layer);

        let vh = doc.viewport().height;
        let rects: Vec<Rect> = self
            .targets
            .iter()
            .filter_map(|t| doc.client_rect(t.region))
            .collect();
        let mids: Vec<f64> = rects.iter().map(Rect::mid_y).collect();
        let initial = mids.iter().sum::<f64>() / mids.len().max(1) as f64;
        self.tracker = Some(SpringTracker::new(super::tracker::clamp_to_band(initial, vh)));
        self.phase = SessionPhase::Drawn;
        self.layout(doc);

        scheduler.schedule(
            entry_duration_ms(self.targets.len()),
            Task::EntryComplete(self.id),
        );
        info!(session = %self.id, connectors = self.targets.len(), "Connection overlay drawn");
        true
    }

    /// Start listening for outside clicks
    pub fn arm_dismiss(&mut self, listeners: &mut ListenerRegistry) {
        listeners.add(ListenerKind::ClickCapture, ListenerOwner::Connection(self.id));
    }

    /// Entry animation finished: hand over to scroll/resize tracking
    pub fn entry_complete(&mut self, listeners: &mut ListenerRegistry) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.entry_complete();
        }
        let owner = ListenerOwner::Connection(self.id);
        listeners.add(ListenerKind::Scroll, owner);
        listeners.add(ListenerKind::Resize, owner);
        if let Some(frame) = self.frame.as_mut() {
            frame.tracker = TrackerState::Idle;
        }
    }

    fn ensure_frame(&mut self, scheduler: &mut Scheduler) {
        if self.frame_req.is_none() {
            self.frame_req = Some(scheduler.request_frame(Task::SpringFrame(self.id)));
        }
    }

    pub fn on_scroll(&mut self, scheduler: &mut Scheduler) {
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        let reaction = tracker.on_scroll();
        if reaction.request_frame {
            self.ensure_frame(scheduler);
        }
        if reaction.restart_debounce {
            if let Some(timer) = self.debounce.take() {
                scheduler.cancel(timer);
            }
            self.debounce = Some(scheduler.schedule(SCROLL_DEBOUNCE_MS, Task::ScrollSettle(self.id)));
        }
    }

    /// Debounce elapsed or viewport resized
    pub fn on_settle(&mut self, scheduler: &mut Scheduler) {
        self.debounce = None;
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        if tracker.on_settle().request_frame {
            self.ensure_frame(scheduler);
        }
    }

    /// One spring-loop frame. Returns false when every target has detached.
    pub fn on_frame(&mut self, doc: &mut Document, scheduler: &mut Scheduler) -> bool {
        self.frame_req = None;
        if self.prune_detached(doc) == 0 {
            return false;
        }
        self.layout(doc);
        let again = self.tracker.as_mut().is_some_and(SpringTracker::frame_done);
        if again {
            self.ensure_frame(scheduler);
        }
        if let (Some(frame), Some(tracker)) = (self.frame.as_mut(), self.tracker.as_ref()) {
            frame.tracker = tracker.state();
        }
        true
    }

    /// Recompute every position from fresh geometry and step the spring
    fn layout(&mut self, doc: &mut Document) {
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        let vp = doc.viewport();
        let rects: Vec<Option<Rect>> = self.targets.iter().map(|t| doc.client_rect(t.region)).collect();
        let live: Vec<Rect> = rects.iter().flatten().copied().collect();
        if let Some(ideal) = ideal_y(&live, vp.height) {
            tracker.step(ideal, vp.height);
        }

        let anchored = tracker.anchored_y();
        let width = self.summary.width();
        let node = Rect::new(
            vp.width - NODE_RIGHT_INSET - width,
            anchored - NODE_HEIGHT / 2.0,
            vp.width - NODE_RIGHT_INSET,
            anchored + NODE_HEIGHT / 2.0,
        );
        let end = Point::new(node.left, node.mid_y());

        let mut connectors = Vec::with_capacity(self.targets.len());
        for (i, (target, rect)) in self.targets.iter().zip(&rects).enumerate() {
            let Some(rect) = rect else {
                continue;
            };
            let start = connector_start(rect, vp.width);
            let label_at = Point::new(rect.left.max(8.0), (rect.top - LABEL_OFFSET_Y).max(4.0));
            if let Some(el) = self.label_els.get(i) {
                doc.set_client_rect(*el, Rect::new(label_at.x, label_at.y, label_at.x, label_at.y));
            }
            connectors.push(ConnectorFrame {
                label: target.label.clone(),
                color: target.swatch.main,
                color_light: target.swatch.light,
                d: connector_path(start, end),
                dot: start,
                label_at,
                delay_ms: i as u64 * ENTRY_STAGGER_MS,
            });
        }
        if let Some(el) = self.node_el {
            doc.set_client_rect(el, node);
        }
        if let Some(el) = self.layer_el {
            doc.set_client_rect(el, Rect::new(0.0, 0.0, vp.width, vp.height));
        }

        self.frame = Some(OverlayFrame {
            session: self.id,
            tracker: tracker.state(),
            node,
            summary: self.summary.clone(),
            end_dot_delay_ms: self.targets.len() as u64 * ENTRY_STAGGER_MS + DOT_FADE_MS,
            connectors,
            end_dot: end,
        });
    }

    /// Remove every node, class, listener, timer and frame this session owns
    pub fn teardown(
        &mut self,
        doc: &mut Document,
        scheduler: &mut Scheduler,
        listeners: &mut ListenerRegistry,
    ) {
        let cancelled = scheduler.cancel_matching(|t| t.session() == Some(self.id));
        listeners.remove_owner(ListenerOwner::Connection(self.id));
        for t in &self.targets {
            doc.remove_class(t.region, t.highlight_class);
        }
        for el in self.overlay_elements() {
            doc.remove(el);
        }
        self.node_el = None;
        self.layer_el = None;
        self.label_els.clear();
        self.debounce = None;
        self.frame_req = None;
        self.frame = None;
        self.tracker = None;
        debug!(session = %self.id, cancelled, "Connection session torn down");
    }
}

/// Scroll so the targets are in view: one target centred; several centred on
/// their midpoint when they fit in 85% of the viewport; otherwise the top-most
/// target just below the top edge
pub fn scroll_to_show(doc: &mut Document, targets: &[ConnTarget]) {
    let rects: Vec<Rect> = targets
        .iter()
        .filter_map(|t| doc.page_rect(t.region))
        .collect();
    match rects.as_slice() {
        [] => {}
        [_] => {
            doc.scroll_into_view(targets[0].region);
        }
        _ => {
            let top = rects.iter().map(|r| r.top).fold(f64::INFINITY, f64::min);
            let bottom = rects.iter().map(|r| r.bottom).fold(f64::NEG_INFINITY, f64::max);
            let span = bottom - top;
            let vh = doc.viewport().height;
            if span <= vh * 0.85 {
                doc.scroll_to(top + span / 2.0 - vh / 2.0);
            } else {
                doc.scroll_to(top - super::tracker::EDGE_MARGIN_PX);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Viewport;
    use crate::overlay::discovery::TARGET_HIGHLIGHT_CLASS;
    use crate::overlay::palette::{swatch, Swatch};

    fn doc_with_targets(tops: &[f64]) -> (Document, Vec<ConnTarget>) {
        let mut doc = Document::new(Viewport::default());
        let root = doc.root();
        doc.set_rect(root, Rect::new(0.0, 0.0, 1280.0, 5000.0));
        let targets = tops
            .iter()
            .enumerate()
            .map(|(i, top)| {
                let p = doc.create_element("p");
                let t = doc.create_text(&format!("문단 {}", i));
                doc.append_child(p, t);
                doc.append_child(root, p);
                doc.set_rect(p, Rect::new(40.0, *top, 600.0, top + 40.0));
                ConnTarget {
                    region: p,
                    label: format!("문단 {}", i),
                    swatch: swatch(i),
                    highlight_class: TARGET_HIGHLIGHT_CLASS,
                }
            })
            .collect();
        (doc, targets)
    }

    fn summary() -> NodeSummary {
        NodeSummary::new(
            "근거 충실성",
            Some(8.0),
            Some(10.0),
            None,
            Vec::<(String, Swatch)>::new(),
        )
    }

    #[test]
    fn test_entry_duration() {
        assert_eq!(entry_duration_ms(1), 800);
        assert_eq!(entry_duration_ms(2), 900);
        assert_eq!(entry_duration_ms(4), 1200);
    }

    #[test]
    fn test_scroll_to_show_centres_close_targets() {
        let (mut doc, targets) = doc_with_targets(&[1000.0, 1200.0]);
        scroll_to_show(&mut doc, &targets);
        // span 1000..1240, midpoint 1120, minus half the viewport
        assert_eq!(doc.viewport().scroll_y, 720.0);
    }

    #[test]
    fn test_scroll_to_show_far_apart_targets() {
        let (mut doc, targets) = doc_with_targets(&[1000.0, 3000.0]);
        scroll_to_show(&mut doc, &targets);
        assert_eq!(doc.viewport().scroll_y, 940.0);
    }

    #[test]
    fn test_draw_and_teardown_leave_nothing_behind() {
        let (mut doc, targets) = doc_with_targets(&[100.0, 300.0]);
        let mut sched = Scheduler::default();
        let mut listeners = ListenerRegistry::new();
        let regions: Vec<NodeId> = targets.iter().map(|t| t.region).collect();
        let elements_before = doc.elements_under(doc.root()).len();

        let mut session = ConnectionSession::start(&mut doc, &mut sched, targets, summary());
        assert!(doc.has_class(regions[0], TARGET_HIGHLIGHT_CLASS));
        assert!(session.draw(&mut doc, &mut sched));
        session.arm_dismiss(&mut listeners);
        session.entry_complete(&mut listeners);
        session.on_scroll(&mut sched);
        assert_eq!(listeners.len(), 3);
        assert_eq!(session.overlay_elements().len(), 4);

        let frame = session.frame().unwrap();
        assert_eq!(frame.connectors.len(), 2);
        assert_eq!(frame.connectors[1].delay_ms, ENTRY_STAGGER_MS);

        session.teardown(&mut doc, &mut sched, &mut listeners);
        assert!(listeners.is_empty());
        assert!(sched.is_idle());
        assert_eq!(doc.elements_under(doc.root()).len(), elements_before);
        assert!(!doc.has_class(regions[0], TARGET_HIGHLIGHT_CLASS));

        // Repeated teardown is harmless
        session.teardown(&mut doc, &mut sched, &mut listeners);
    }

    #[test]
    fn test_detached_targets_are_dropped() {
        let (mut doc, targets) = doc_with_targets(&[100.0, 300.0]);
        let mut sched = Scheduler::default();
        let first = targets[0].region;
        let mut session = ConnectionSession::start(&mut doc, &mut sched, targets, summary());
        doc.remove(first);
        assert!(session.draw(&mut doc, &mut sched));
        assert_eq!(session.targets().len(), 1);
        assert_eq!(session.frame().unwrap().connectors.len(), 1);

        let second = session.targets()[0].region;
        doc.remove(second);
        assert!(!session.on_frame(&mut doc, &mut sched));
    }
}
