//! Deterministic virtual-time event loop.
//!
//! Timers fire at their deadline; animation frames fire on a fixed grid
//! (every [`FRAME_INTERVAL_MS`]). A frame requested while another frame is
//! running lands on the next grid point, so a self-rescheduling loop advances
//! one frame per tick. Hosts drive time explicitly through `pop_due`.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::domain::document::NodeId;

/// Animation frame period in milliseconds
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Deferred work. Every task names its owner so leftovers of a torn-down
/// session or a removed marker can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Draw the connection overlay once the scroll has settled
    DrawOverlay(Uuid),
    /// Start listening for outside clicks
    ArmDismiss(Uuid),
    /// Entry animation finished; begin tracking scroll/resize
    EntryComplete(Uuid),
    /// Scroll debounce elapsed
    ScrollSettle(Uuid),
    /// One spring-loop animation frame
    SpringFrame(Uuid),
    /// Drop the pulse from a temporary marker
    TempMarkerFade(NodeId),
    /// Unwrap a temporary marker back into text
    TempMarkerUnwrap(NodeId),
    /// Drop the active pulse from a regular marker
    ActiveMarkerExpire(NodeId),
}

impl Task {
    /// Connection session owning the task, if any
    pub fn session(&self) -> Option<Uuid> {
        match self {
            Task::DrawOverlay(id)
            | Task::ArmDismiss(id)
            | Task::EntryComplete(id)
            | Task::ScrollSettle(id)
            | Task::SpringFrame(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether the task belongs to the marking subsystem
    pub fn is_marker_task(&self) -> bool {
        matches!(
            self,
            Task::TempMarkerFade(_) | Task::TempMarkerUnwrap(_) | Task::ActiveMarkerExpire(_)
        )
    }
}

/// Handle to a pending timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerId(u64, u64);

/// Handle to a pending animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameId(u64, u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Timer(Task),
    Frame(Task),
}

impl Entry {
    fn task(&self) -> Task {
        match self {
            Entry::Timer(t) | Entry::Frame(t) => *t,
        }
    }
}

#[derive(Debug)]
pub struct Scheduler {
    now: u64,
    seq: u64,
    frame_interval: u64,
    /// Keyed by (fire time, insertion sequence)
    queue: BTreeMap<(u64, u64), Entry>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(FRAME_INTERVAL_MS)
    }
}

impl Scheduler {
    pub fn new(frame_interval: u64) -> Self {
        Self {
            now: 0,
            seq: 0,
            frame_interval: frame_interval.max(1),
            queue: BTreeMap::new(),
        }
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    fn push(&mut self, at: u64, entry: Entry) -> (u64, u64) {
        self.seq += 1;
        let key = (at, self.seq);
        self.queue.insert(key, entry);
        key
    }

    /// Run `task` once, `delay_ms` from now
    pub fn schedule(&mut self, delay_ms: u64, task: Task) -> TimerId {
        let (at, seq) = self.push(self.now + delay_ms, Entry::Timer(task));
        TimerId(at, seq)
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.queue.remove(&(id.0, id.1));
    }

    /// Run `task` on the next frame tick strictly after now
    pub fn request_frame(&mut self, task: Task) -> FrameId {
        let tick = (self.now / self.frame_interval + 1) * self.frame_interval;
        let (at, seq) = self.push(tick, Entry::Frame(task));
        FrameId(at, seq)
    }

    pub fn cancel_frame(&mut self, id: FrameId) {
        self.queue.remove(&(id.0, id.1));
    }

    /// Drop every pending timer and frame whose task matches
    pub fn cancel_matching<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Task) -> bool,
    {
        let before = self.queue.len();
        self.queue.retain(|_, entry| !pred(&entry.task()));
        before - self.queue.len()
    }

    /// Pop the earliest task due at or before `until`, moving the clock to it
    pub fn pop_due(&mut self, until: u64) -> Option<Task> {
        let (&key, _) = self.queue.iter().next()?;
        if key.0 > until {
            return None;
        }
        let entry = self.queue.remove(&key)?;
        self.now = self.now.max(key.0);
        Some(entry.task())
    }

    /// Move the clock forward without running anything
    pub fn advance_to(&mut self, t: u64) {
        self.now = self.now.max(t);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pending tasks matching `pred`
    pub fn pending_matching<F>(&self, pred: F) -> usize
    where
        F: Fn(&Task) -> bool,
    {
        self.queue.values().filter(|e| pred(&e.task())).count()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_pop_in_deadline_order() {
        let mut sched = Scheduler::default();
        let a = Uuid::new_v4();
        sched.schedule(600, Task::ArmDismiss(a));
        sched.schedule(500, Task::DrawOverlay(a));

        assert_eq!(sched.pop_due(1000), Some(Task::DrawOverlay(a)));
        assert_eq!(sched.now(), 500);
        assert_eq!(sched.pop_due(1000), Some(Task::ArmDismiss(a)));
        assert_eq!(sched.pop_due(1000), None);
    }

    #[test]
    fn test_frames_land_on_grid() {
        let mut sched = Scheduler::default();
        let s = Uuid::new_v4();
        sched.advance_to(5);
        sched.request_frame(Task::SpringFrame(s));
        assert_eq!(sched.pop_due(15), None);
        assert_eq!(sched.pop_due(16), Some(Task::SpringFrame(s)));

        // Requested from inside a frame: next tick, not the same one
        sched.request_frame(Task::SpringFrame(s));
        assert_eq!(sched.pop_due(16), None);
        assert_eq!(sched.pop_due(32), Some(Task::SpringFrame(s)));
    }

    #[test]
    fn test_cancel_matching_session() {
        let mut sched = Scheduler::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        sched.schedule(100, Task::ScrollSettle(a));
        sched.request_frame(Task::SpringFrame(a));
        sched.schedule(100, Task::ScrollSettle(b));

        assert_eq!(sched.cancel_matching(|t| t.session() == Some(a)), 2);
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn test_cancel_single_timer() {
        let mut sched = Scheduler::default();
        let s = Uuid::new_v4();
        let id = sched.schedule(100, Task::ScrollSettle(s));
        sched.cancel(id);
        assert!(sched.is_idle());
    }
}
