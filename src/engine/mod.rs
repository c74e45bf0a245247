//! The highlighting engine.
//!
//! [`HighlightEngine`] owns every piece of mutable state (document, timers,
//! listeners, marking tables, popup fixtures, the active connection session)
//! in one [`HighlightEngineState`]. Hosts feed it [`Command`]s and
//! [`UiEvent`]s and drive time with [`HighlightEngine::advance`].

pub mod command;
pub mod scheduler;

use tracing::{debug, info, instrument};

use crate::domain::document::{Document, NodeId};
use crate::domain::listeners::{ListenerKind, ListenerOwner, ListenerRegistry};
use crate::marking::marker::{self, Category};
use crate::marking::{MarkingSession, ScrollTarget};
use crate::overlay::{discover_targets, ConnectionRequest, ConnectionSession, Discovery, OverlayFrame};
use crate::popup::{PanelView, PopupFixtures, TooltipView};
use crate::resolver::AnchorResolver;

pub use command::{Command, CommandOutcome, HighlightTextPayload, ScrollToPayload, UiEvent};
pub use scheduler::{Scheduler, Task, FRAME_INTERVAL_MS};

/// All mutable engine state
#[derive(Debug)]
pub struct HighlightEngineState {
    pub doc: Document,
    pub scheduler: Scheduler,
    pub listeners: ListenerRegistry,
    pub marking: MarkingSession,
    pub popups: PopupFixtures,
    pub connection: Option<ConnectionSession>,
}

impl HighlightEngineState {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            scheduler: Scheduler::default(),
            listeners: ListenerRegistry::new(),
            marking: MarkingSession::new(),
            popups: PopupFixtures::new(),
            connection: None,
        }
    }

    /// Tear down the active connection session, if any
    fn close_connection(&mut self) -> bool {
        match self.connection.take() {
            Some(mut session) => {
                session.teardown(&mut self.doc, &mut self.scheduler, &mut self.listeners);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct HighlightEngine {
    state: HighlightEngineState,
    resolver: AnchorResolver,
}

impl HighlightEngine {
    pub fn new(doc: Document, resolver: AnchorResolver) -> Self {
        Self {
            state: HighlightEngineState::new(doc),
            resolver,
        }
    }

    pub fn state(&self) -> &HighlightEngineState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        &self.state.doc
    }

    /// Mutable document access, for hosts simulating reflow or detachment
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.state.doc
    }

    pub fn resolver(&self) -> &AnchorResolver {
        &self.resolver
    }

    pub fn now(&self) -> u64 {
        self.state.scheduler.now()
    }

    pub fn connection(&self) -> Option<&ConnectionSession> {
        self.state.connection.as_ref()
    }

    /// Latest overlay frame for the host to paint
    pub fn frame(&self) -> Option<&OverlayFrame> {
        self.state.connection.as_ref().and_then(ConnectionSession::frame)
    }

    /// Remove everything the engine injected and drop pending work
    pub fn reset(&mut self) {
        let s = &mut self.state;
        s.close_connection();
        s.marking.clear(&mut s.doc, &mut s.scheduler);
        s.marking.detach_delegate(&mut s.listeners);
        s.popups.remove(&mut s.doc);
        s.scheduler.cancel_matching(|_| true);
        info!("Engine reset");
    }

    #[instrument(skip(self, command), fields(command = command.name()))]
    pub fn handle(&mut self, command: Command) -> CommandOutcome {
        let s = &mut self.state;
        let root = s.doc.root();
        match command {
            Command::HighlightText(payload) => {
                let category = payload
                    .class_name
                    .as_deref()
                    .map(Category::from_class_name)
                    .unwrap_or(Category::Topic);
                let markers = s.marking.highlight_keywords(
                    &mut s.doc,
                    &mut s.listeners,
                    root,
                    &payload.keywords,
                    category,
                );
                CommandOutcome::Highlighted { markers }
            }
            Command::ClearHighlights => {
                let connection_closed = s.close_connection();
                let removed = s.marking.clear(&mut s.doc, &mut s.scheduler);
                s.popups.hide_tooltip(&mut s.doc);
                s.popups.hide_panel(&mut s.doc);
                CommandOutcome::Cleared {
                    removed,
                    connection_closed,
                }
            }
            Command::ScrollToHighlight(payload) => CommandOutcome::Scrolled {
                target: s
                    .marking
                    .scroll_to_highlight(&mut s.doc, &mut s.scheduler, root, &payload.text),
            },
            Command::ShowCheckConnection(request) => self.show_connection(request),
            Command::ToggleHighlights(data) => {
                let enabled = s.marking.toggle(
                    &mut s.doc,
                    &mut s.scheduler,
                    &mut s.listeners,
                    root,
                    data.as_ref(),
                );
                if !enabled {
                    s.popups.hide_tooltip(&mut s.doc);
                    s.popups.hide_panel(&mut s.doc);
                }
                CommandOutcome::Toggled { enabled }
            }
        }
    }

    /// Start a connection session for a check, replacing any active one
    pub fn show_connection(&mut self, request: ConnectionRequest) -> CommandOutcome {
        let s = &mut self.state;
        s.close_connection();

        match discover_targets(&self.resolver, &s.doc, &request) {
            Discovery::Found { source, targets } => {
                let labels = targets.iter().map(|t| t.label.clone()).collect();
                let summary = request.summary(&targets);
                let session = ConnectionSession::start(&mut s.doc, &mut s.scheduler, targets, summary);
                let id = session.id();
                s.connection = Some(session);
                CommandOutcome::ConnectionStarted {
                    session: id,
                    source,
                    targets: labels,
                }
            }
            Discovery::Fallback(phrase) => {
                let root = s.doc.root();
                let target = match phrase.as_deref() {
                    Some(text) => s
                        .marking
                        .scroll_to_highlight(&mut s.doc, &mut s.scheduler, root, text),
                    None => ScrollTarget::NotFound,
                };
                CommandOutcome::ConnectionFallback { phrase, target }
            }
        }
    }

    /// Deliver a UI event to whoever is listening for it
    pub fn dispatch(&mut self, event: UiEvent) {
        match event {
            UiEvent::PointerOver { target } => {
                if self.state.listeners.count(ListenerKind::PointerOver) > 0 {
                    self.on_pointer_over(target);
                }
            }
            UiEvent::PointerOut { target } => {
                let s = &mut self.state;
                if s.listeners.count(ListenerKind::PointerOut) > 0
                    && marker::enclosing_marker(&s.doc, target).is_some()
                {
                    s.popups.hide_tooltip(&mut s.doc);
                }
            }
            UiEvent::Click { target } => {
                // Capture phase runs before the delegate
                self.on_click_capture(target);
                if self.state.listeners.count(ListenerKind::Click) > 0 {
                    self.on_click(target);
                }
            }
            UiEvent::Scroll { y } => {
                let s = &mut self.state;
                s.doc.scroll_to(y);
                for owner in s.listeners.owners(ListenerKind::Scroll) {
                    if let ListenerOwner::Connection(id) = owner {
                        if let Some(session) = s.connection.as_mut().filter(|c| c.id() == id) {
                            session.on_scroll(&mut s.scheduler);
                        }
                    }
                }
            }
            UiEvent::Resize { width, height } => {
                let s = &mut self.state;
                s.doc.resize(width, height);
                for owner in s.listeners.owners(ListenerKind::Resize) {
                    if let ListenerOwner::Connection(id) = owner {
                        if let Some(session) = s.connection.as_mut().filter(|c| c.id() == id) {
                            session.on_settle(&mut s.scheduler);
                        }
                    }
                }
            }
        }
    }

    fn on_pointer_over(&mut self, target: NodeId) {
        let s = &mut self.state;
        if !s.marking.is_enabled() {
            return;
        }
        let Some(mark) = marker::enclosing_marker(&s.doc, target) else {
            return;
        };
        let Some(anchor) = s.doc.client_rect(mark) else {
            return;
        };
        let text = s.doc.text_content(mark);
        let tables = s.marking.tables();
        let view = TooltipView::for_marker(
            Category::of(&s.doc, mark),
            &text,
            tables.check_for(&text).map(|(_, info)| info),
            tables.chain_for(&text).is_some(),
        );
        s.popups.show_tooltip(&mut s.doc, &anchor, view);
    }

    fn on_click_capture(&mut self, target: NodeId) {
        let s = &mut self.state;
        let armed = s
            .listeners
            .owners(ListenerKind::ClickCapture)
            .into_iter()
            .any(|owner| matches!(owner, ListenerOwner::Connection(id) if s.connection.as_ref().is_some_and(|c| c.id() == id)));
        if !armed {
            return;
        }
        let inside = s
            .connection
            .as_ref()
            .is_some_and(|c| c.owns_click(&s.doc, target));
        if !inside {
            debug!("Outside click; closing connection");
            s.close_connection();
        }
    }

    fn on_click(&mut self, target: NodeId) {
        let s = &mut self.state;
        if s.popups.is_close_button(&s.doc, target) {
            s.popups.hide_panel(&mut s.doc);
            return;
        }
        let chain = marker::enclosing_marker(&s.doc, target).and_then(|mark| {
            let text = s.doc.text_content(mark);
            let chain = s.marking.tables().chain_for(&text)?.clone();
            Some((mark, chain))
        });
        match chain {
            Some((mark, chain)) if s.marking.is_enabled() => {
                if let Some(anchor) = s.doc.client_rect(mark) {
                    s.popups.show_panel(&mut s.doc, &anchor, PanelView::from_chain(&chain));
                }
            }
            _ => {
                if s.popups.panel_visible(&s.doc) && !s.popups.panel_contains(&s.doc, target) {
                    s.popups.hide_panel(&mut s.doc);
                }
            }
        }
    }

    /// Run everything due in the next `dt_ms` milliseconds, in deadline order
    pub fn advance(&mut self, dt_ms: u64) {
        let until = self.state.scheduler.now() + dt_ms;
        while let Some(task) = self.state.scheduler.pop_due(until) {
            self.run_task(task);
        }
        self.state.scheduler.advance_to(until);
    }

    fn run_task(&mut self, task: Task) {
        let HighlightEngineState {
            doc,
            scheduler,
            listeners,
            marking,
            connection,
            ..
        } = &mut self.state;
        if task.is_marker_task() {
            marking.run_task(doc, scheduler, task);
            return;
        }
        let Some(id) = task.session() else {
            return;
        };
        let Some(session) = connection.as_mut().filter(|c| c.id() == id) else {
            debug!(?task, "Task for an inactive session; ignoring");
            return;
        };
        let alive = match task {
            Task::DrawOverlay(_) => session.draw(doc, scheduler),
            Task::ArmDismiss(_) => {
                session.arm_dismiss(listeners);
                true
            }
            Task::EntryComplete(_) => {
                session.entry_complete(listeners);
                true
            }
            Task::ScrollSettle(_) => {
                session.on_settle(scheduler);
                true
            }
            Task::SpringFrame(_) => session.on_frame(doc, scheduler),
            _ => true,
        };
        if !alive {
            info!(session = %id, "All connection targets detached");
            self.state.close_connection();
        }
    }
}
