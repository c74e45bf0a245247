//! Passive inline marking of analyzer phrases.
//!
//! A marking pass wraps matched text in `<mark>` elements tagged with a
//! [`Category`], and records which check or causal chain each phrase came
//! from so hover and click can show details. Hover/click handling is a single
//! delegate registered once on the document.

pub mod marker;
pub mod tables;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::analysis::HighlightData;
use crate::domain::document::{Document, NodeId};
use crate::domain::listeners::{ListenerId, ListenerKind, ListenerOwner, ListenerRegistry};
use crate::engine::scheduler::{Scheduler, Task};
use crate::resolver::normalize::char_len;
use crate::resolver::phrases::extract_highlight_phrase;

pub use marker::{Category, ACTIVE_CLASS, MARK_ATTR, MARK_TAG, TEMP_ATTR};
pub use tables::LookupTables;

/// How long a marker pulses after being scrolled to
pub const ACTIVE_PULSE_MS: u64 = 2000;

/// How long a temporary marker pulses before fading
pub const TEMP_PULSE_MS: u64 = 2000;

/// Fade time before a temporary marker is unwrapped
pub const TEMP_FADE_MS: u64 = 1500;

/// Where `scroll_to_highlight` landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "marker", rename_all = "snake_case")]
pub enum ScrollTarget {
    /// An existing marker
    Existing(NodeId),
    /// A temporary marker created for the occasion
    Temporary(NodeId),
    NotFound,
}

#[derive(Debug, Default)]
pub struct MarkingSession {
    enabled: bool,
    delegate: Vec<ListenerId>,
    tables: LookupTables,
}

impl MarkingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    pub fn delegate_attached(&self) -> bool {
        !self.delegate.is_empty()
    }

    /// Register the hover/click delegate; a second call is a no-op
    pub fn attach_delegate(&mut self, listeners: &mut ListenerRegistry) {
        if self.delegate_attached() {
            return;
        }
        self.delegate = [
            ListenerKind::PointerOver,
            ListenerKind::PointerOut,
            ListenerKind::Click,
        ]
        .into_iter()
        .map(|kind| listeners.add(kind, ListenerOwner::MarkerDelegate))
        .collect();
    }

    pub fn detach_delegate(&mut self, listeners: &mut ListenerRegistry) {
        for id in self.delegate.drain(..) {
            listeners.remove(id);
        }
    }

    /// Mark each keyword with one category and enable marking
    pub fn highlight_keywords(
        &mut self,
        doc: &mut Document,
        listeners: &mut ListenerRegistry,
        root: NodeId,
        keywords: &[String],
        category: Category,
    ) -> usize {
        self.attach_delegate(listeners);
        let mut total = 0;
        for keyword in keywords {
            total += marker::mark_keyword(doc, root, keyword, category).len();
        }
        self.enabled = true;
        total
    }

    /// Replace any previous pass with a fresh one built from `data`.
    ///
    /// Topics are marked first, then pass, warn and fail phrases, so earlier
    /// categories win where phrases overlap.
    pub fn apply(
        &mut self,
        doc: &mut Document,
        scheduler: &mut Scheduler,
        listeners: &mut ListenerRegistry,
        root: NodeId,
        data: &HighlightData,
    ) -> usize {
        self.clear(doc, scheduler);

        for chain in &data.causal_chains {
            self.tables.insert_chain(chain.clone());
        }

        let mut by_verdict: [(Category, Vec<String>); 3] = [
            (Category::Pass, Vec::new()),
            (Category::Warn, Vec::new()),
            (Category::Fail, Vec::new()),
        ];
        for check in &data.checks {
            let Some(phrase) = extract_highlight_phrase(&check.detail) else {
                continue;
            };
            self.tables.insert_check(&phrase, check.clone());
            let Some(verdict) = check.verdict() else {
                continue;
            };
            let category = Category::from_verdict(verdict);
            if let Some((_, phrases)) = by_verdict.iter_mut().find(|(c, _)| *c == category) {
                phrases.push(phrase);
            }
        }

        let mut total = 0;
        if !data.topics.is_empty() {
            total += self.highlight_keywords(doc, listeners, root, &data.topics, Category::Topic);
        }
        for (category, phrases) in &by_verdict {
            if !phrases.is_empty() {
                total += self.highlight_keywords(doc, listeners, root, phrases, *category);
            }
        }

        self.enabled = true;
        info!(
            markers = total,
            checks = self.tables.check_count(),
            chains = self.tables.chain_count(),
            "Highlights applied"
        );
        total
    }

    /// Unwrap every marker (temporary ones included) and reset the tables.
    /// Safe to call when nothing is marked.
    pub fn clear(&mut self, doc: &mut Document, scheduler: &mut Scheduler) -> usize {
        scheduler.cancel_matching(Task::is_marker_task);

        let root = doc.root();
        let markers: Vec<NodeId> = doc
            .elements_under(root)
            .into_iter()
            .filter(|id| marker::is_marker(doc, *id) || marker::is_temp_marker(doc, *id))
            .collect();
        // Innermost first so nested wrappers unwrap cleanly
        let mut removed = 0;
        for id in markers.into_iter().rev() {
            if doc.unwrap(id) {
                removed += 1;
            }
        }

        self.tables.clear();
        self.enabled = false;
        if removed > 0 {
            debug!(removed, "Highlights cleared");
        }
        removed
    }

    /// Clear if active, else apply `data` when given. Returns the resulting state.
    pub fn toggle(
        &mut self,
        doc: &mut Document,
        scheduler: &mut Scheduler,
        listeners: &mut ListenerRegistry,
        root: NodeId,
        data: Option<&HighlightData>,
    ) -> bool {
        if self.enabled {
            self.clear(doc, scheduler);
            return false;
        }
        match data {
            Some(data) => {
                self.apply(doc, scheduler, listeners, root, data);
                true
            }
            None => false,
        }
    }

    /// Bring `text` into view.
    ///
    /// Prefers an existing marker containing the text, then one whose text
    /// is contained in it, then wraps the first literal occurrence under
    /// `root` in a temporary marker that pulses and unwraps itself.
    pub fn scroll_to_highlight(
        &mut self,
        doc: &mut Document,
        scheduler: &mut Scheduler,
        root: NodeId,
        text: &str,
    ) -> ScrollTarget {
        if text.is_empty() {
            return ScrollTarget::NotFound;
        }

        let markers = marker::markers_under(doc, doc.root());
        let existing = markers
            .iter()
            .copied()
            .find(|m| doc.text_content(*m).contains(text))
            .or_else(|| {
                markers.iter().copied().find(|m| {
                    let mt = doc.text_content(*m);
                    char_len(&mt) >= 2 && text.contains(mt.as_str())
                })
            });
        if let Some(mark) = existing {
            self.activate(doc, scheduler, mark);
            return ScrollTarget::Existing(mark);
        }

        for run in doc.text_nodes(root) {
            if doc.is_overlay(run) {
                continue;
            }
            let Some(start) = doc.text(run).and_then(|t| t.find(text)) else {
                continue;
            };
            let Some(temp) = doc.wrap_text_range(run, start, start + text.len(), MARK_TAG) else {
                continue;
            };
            doc.set_attr(temp, TEMP_ATTR, "true");
            doc.add_class(temp, Category::Warn.class_name());
            doc.add_class(temp, ACTIVE_CLASS);
            doc.scroll_into_view(temp);
            scheduler.schedule(TEMP_PULSE_MS, Task::TempMarkerFade(temp));
            debug!(text, "Temporary marker created");
            return ScrollTarget::Temporary(temp);
        }

        debug!(text, "Nothing to scroll to");
        ScrollTarget::NotFound
    }

    fn activate(&mut self, doc: &mut Document, scheduler: &mut Scheduler, mark: NodeId) {
        let root = doc.root();
        for el in doc.elements_under(root) {
            if doc.has_class(el, ACTIVE_CLASS) {
                doc.remove_class(el, ACTIVE_CLASS);
            }
        }
        doc.add_class(mark, ACTIVE_CLASS);
        doc.scroll_into_view(mark);
        scheduler.schedule(ACTIVE_PULSE_MS, Task::ActiveMarkerExpire(mark));
    }

    /// Run a marker timer. Stale handles are ignored.
    pub fn run_task(&mut self, doc: &mut Document, scheduler: &mut Scheduler, task: Task) {
        match task {
            Task::ActiveMarkerExpire(mark) => doc.remove_class(mark, ACTIVE_CLASS),
            Task::TempMarkerFade(temp) => {
                if doc.exists(temp) {
                    doc.remove_class(temp, ACTIVE_CLASS);
                    scheduler.schedule(TEMP_FADE_MS, Task::TempMarkerUnwrap(temp));
                }
            }
            Task::TempMarkerUnwrap(temp) => {
                if doc.exists(temp) {
                    doc.unwrap(temp);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{CausalChain, CheckInfo, Impact};
    use crate::domain::geometry::Viewport;

    fn setup(texts: &[&str]) -> (Document, Scheduler, ListenerRegistry) {
        let mut doc = Document::new(Viewport::default());
        let root = doc.root();
        for t in texts {
            let p = doc.create_element("p");
            let run = doc.create_text(t);
            doc.append_child(p, run);
            doc.append_child(root, p);
        }
        (doc, Scheduler::default(), ListenerRegistry::new())
    }

    fn data() -> HighlightData {
        HighlightData {
            checks: vec![
                CheckInfo {
                    item: "근거 충실성".into(),
                    result: "WARN".into(),
                    detail: "'예산 근거'가 부족합니다".into(),
                },
                CheckInfo {
                    item: "목적 명확성".into(),
                    result: "PASS".into(),
                    detail: "'원가 절감'이 명시됨".into(),
                },
            ],
            topics: vec!["물류".into()],
            causal_chains: vec![CausalChain {
                keyword: "원가 절감".into(),
                chain: vec!["원가 절감".into(), "영업이익 개선".into()],
                kpis: vec!["원가율".into()],
                impact: Impact::High,
            }],
        }
    }

    #[test]
    fn test_apply_buckets_fail_and_skips_unknown_results() {
        let (mut doc, mut sched, mut reg) = setup(&["운송비가 증가함", "물류 센터 이전"]);
        let root = doc.root();
        let data = HighlightData {
            checks: vec![
                CheckInfo {
                    item: "비용 근거".into(),
                    result: "FAIL".into(),
                    detail: "'운송비' 산정 근거 없음".into(),
                },
                CheckInfo {
                    item: "일정".into(),
                    result: "N/A".into(),
                    detail: "'물류 센터' 이전 일정 미기재".into(),
                },
            ],
            topics: Vec::new(),
            causal_chains: Vec::new(),
        };
        let mut session = MarkingSession::new();
        let n = session.apply(&mut doc, &mut sched, &mut reg, root, &data);
        assert_eq!(n, 1);

        let marks = marker::markers_under(&doc, root);
        assert_eq!(marks.len(), 1);
        assert_eq!(Category::of(&doc, marks[0]), Category::Fail);
        assert_eq!(doc.text_content(marks[0]), "운송비");
    }

    #[test]
    fn test_apply_marks_by_category() {
        let (mut doc, mut sched, mut reg) = setup(&[
            "물류 센터 통합으로 원가 절감을 추진",
            "예산 근거는 별첨 참조",
        ]);
        let root = doc.root();
        let mut session = MarkingSession::new();
        let n = session.apply(&mut doc, &mut sched, &mut reg, root, &data());
        assert_eq!(n, 3);
        assert!(session.is_enabled());
        assert_eq!(reg.count(ListenerKind::PointerOver), 1);

        let marks = marker::markers_under(&doc, root);
        let cats: Vec<Category> = marks.iter().map(|m| Category::of(&doc, *m)).collect();
        assert_eq!(cats, vec![Category::Topic, Category::Pass, Category::Warn]);
    }

    #[test]
    fn test_clear_twice_is_noop() {
        let (mut doc, mut sched, mut reg) = setup(&["물류 센터 통합으로 원가 절감을 추진"]);
        let root = doc.root();
        let before = doc.text_content(root);
        let mut session = MarkingSession::new();
        session.apply(&mut doc, &mut sched, &mut reg, root, &data());

        assert!(session.clear(&mut doc, &mut sched) > 0);
        assert_eq!(session.clear(&mut doc, &mut sched), 0);
        assert!(marker::markers_under(&doc, root).is_empty());
        assert!(session.tables().is_empty());
        assert_eq!(doc.text_content(root), before);
    }

    #[test]
    fn test_toggle() {
        let (mut doc, mut sched, mut reg) = setup(&["원가 절감"]);
        let root = doc.root();
        let mut session = MarkingSession::new();
        assert!(!session.toggle(&mut doc, &mut sched, &mut reg, root, None));
        assert!(session.toggle(&mut doc, &mut sched, &mut reg, root, Some(&data())));
        assert!(!session.toggle(&mut doc, &mut sched, &mut reg, root, Some(&data())));
        assert!(!session.is_enabled());
    }

    #[test]
    fn test_delegate_attached_once() {
        let mut reg = ListenerRegistry::new();
        let mut session = MarkingSession::new();
        session.attach_delegate(&mut reg);
        session.attach_delegate(&mut reg);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_temporary_marker_lifecycle() {
        let (mut doc, mut sched, _) = setup(&["향후 3년간 약 15% 절감 효과"]);
        let root = doc.root();
        let mut session = MarkingSession::new();

        let ScrollTarget::Temporary(temp) =
            session.scroll_to_highlight(&mut doc, &mut sched, root, "15% 절감")
        else {
            panic!("expected a temporary marker");
        };
        assert!(doc.has_class(temp, ACTIVE_CLASS));

        while let Some(task) = sched.pop_due(2000) {
            session.run_task(&mut doc, &mut sched, task);
        }
        assert!(doc.exists(temp));
        assert!(!doc.has_class(temp, ACTIVE_CLASS));

        while let Some(task) = sched.pop_due(3500) {
            session.run_task(&mut doc, &mut sched, task);
        }
        assert!(!doc.exists(temp));
        assert_eq!(doc.text_content(root), "향후 3년간 약 15% 절감 효과");
    }

    #[test]
    fn test_scroll_prefers_existing_marker() {
        let (mut doc, mut sched, mut reg) = setup(&["물류 센터 통합"]);
        let root = doc.root();
        let mut session = MarkingSession::new();
        session.highlight_keywords(&mut doc, &mut reg, root, &["물류".to_string()], Category::Topic);

        let target = session.scroll_to_highlight(&mut doc, &mut sched, root, "물류 센터");
        let ScrollTarget::Existing(mark) = target else {
            panic!("expected existing marker");
        };
        assert!(doc.has_class(mark, ACTIVE_CLASS));
        assert_eq!(
            session.scroll_to_highlight(&mut doc, &mut sched, root, "없는 문구"),
            ScrollTarget::NotFound
        );
    }
}
