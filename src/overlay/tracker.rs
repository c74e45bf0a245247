//! Damped-spring tracking of the convergence node.
//!
//! The node's vertical anchor moves toward an ideal point (the mean midpoint
//! of the visible targets) by a fixed fraction each frame instead of
//! snapping. The frame loop runs for a bounded number of frames after each
//! scroll or resize burst and then stops.
//!
//! ```text
//! EntryAnimating --entry_complete--> Idle
//! Idle|Settling  --scroll----------> Tracking  (frames reset, debounce restarted)
//! any            --debounce|resize-> Settling  (frames reset)
//! Tracking|Settling --frame, 0 left-> Idle
//! ```

use serde::Serialize;

use crate::domain::geometry::Rect;

/// Fraction of the remaining distance covered per frame
pub const SPRING_FACTOR: f64 = 0.12;

/// Frames the loop keeps running after the last scroll/resize input
pub const SETTLE_FRAMES: u32 = 30;

/// Quiet period after the last scroll event before settling restarts
pub const SCROLL_DEBOUNCE_MS: u64 = 100;

/// The node centre never comes closer than this to the top or bottom edge
pub const EDGE_MARGIN_PX: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackerState {
    /// No frame loop running
    Idle,
    /// Paths are drawing in; scroll tracking not yet attached
    EntryAnimating,
    /// Converging after a burst has ended
    Settling { frames_left: u32 },
    /// Following an ongoing scroll burst
    Tracking { frames_left: u32 },
}

/// Keep a node centre inside `[EDGE_MARGIN_PX, viewport_height - EDGE_MARGIN_PX]`
pub fn clamp_to_band(y: f64, viewport_height: f64) -> f64 {
    y.min(viewport_height - EDGE_MARGIN_PX).max(EDGE_MARGIN_PX)
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean midpoint of the targets that are on screen, or of all targets when
/// none are, clamped into the edge band
pub fn ideal_y(rects: &[Rect], viewport_height: f64) -> Option<f64> {
    let visible: Vec<f64> = rects
        .iter()
        .filter(|r| r.bottom > 0.0 && r.top < viewport_height)
        .map(Rect::mid_y)
        .collect();
    let all: Vec<f64> = rects.iter().map(Rect::mid_y).collect();
    mean(&visible)
        .or_else(|| mean(&all))
        .map(|y| clamp_to_band(y, viewport_height))
}

/// What the session should do after an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    /// Ensure a frame is requested
    pub request_frame: bool,
    /// Restart the scroll debounce timer
    pub restart_debounce: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpringTracker {
    state: TrackerState,
    anchored_y: f64,
}

impl SpringTracker {
    /// Start in the entry phase with the node at `initial_y`
    pub fn new(initial_y: f64) -> Self {
        Self {
            state: TrackerState::EntryAnimating,
            anchored_y: initial_y,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Current node centre
    pub fn anchored_y(&self) -> f64 {
        self.anchored_y
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            TrackerState::Tracking { .. } | TrackerState::Settling { .. }
        )
    }

    pub fn entry_complete(&mut self) {
        if self.state == TrackerState::EntryAnimating {
            self.state = TrackerState::Idle;
        }
    }

    /// Scroll input: keep tracking and push the debounce out
    pub fn on_scroll(&mut self) -> Reaction {
        if self.state == TrackerState::EntryAnimating {
            return Reaction {
                request_frame: false,
                restart_debounce: false,
            };
        }
        self.state = TrackerState::Tracking {
            frames_left: SETTLE_FRAMES,
        };
        Reaction {
            request_frame: true,
            restart_debounce: true,
        }
    }

    /// Debounce elapsed or viewport resized: settle from here
    pub fn on_settle(&mut self) -> Reaction {
        if self.state == TrackerState::EntryAnimating {
            return Reaction {
                request_frame: false,
                restart_debounce: false,
            };
        }
        self.state = TrackerState::Settling {
            frames_left: SETTLE_FRAMES,
        };
        Reaction {
            request_frame: true,
            restart_debounce: false,
        }
    }

    /// Move one spring step toward `ideal`, then re-clamp for the current
    /// viewport (it may have shrunk since the last frame)
    pub fn step(&mut self, ideal: f64, viewport_height: f64) -> f64 {
        self.anchored_y += (ideal - self.anchored_y) * SPRING_FACTOR;
        self.anchored_y = clamp_to_band(self.anchored_y, viewport_height);
        self.anchored_y
    }

    /// Account for one loop frame. Returns whether another frame is needed.
    pub fn frame_done(&mut self) -> bool {
        match self.state {
            TrackerState::Tracking { frames_left } | TrackerState::Settling { frames_left } => {
                let left = frames_left.saturating_sub(1);
                if left == 0 {
                    self.state = TrackerState::Idle;
                    false
                } else {
                    self.state = match self.state {
                        TrackerState::Tracking { .. } => TrackerState::Tracking { frames_left: left },
                        _ => TrackerState::Settling { frames_left: left },
                    };
                    true
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_uses_visible_targets() {
        let rects = [
            Rect::new(0.0, 100.0, 10.0, 140.0),
            Rect::new(0.0, 2000.0, 10.0, 2040.0),
        ];
        assert_eq!(ideal_y(&rects, 800.0), Some(120.0));
    }

    #[test]
    fn test_ideal_falls_back_to_all_and_clamps() {
        let rects = [Rect::new(0.0, -500.0, 10.0, -460.0)];
        assert_eq!(ideal_y(&rects, 800.0), Some(EDGE_MARGIN_PX));
        let below = [Rect::new(0.0, 5000.0, 10.0, 5040.0)];
        assert_eq!(ideal_y(&below, 800.0), Some(740.0));
        assert_eq!(ideal_y(&[], 800.0), None);
    }

    #[test]
    fn test_spring_converges_without_overshoot() {
        let mut t = SpringTracker::new(100.0);
        let first = t.step(400.0, 800.0);
        assert!((first - 136.0).abs() < 1e-9);
        for _ in 0..200 {
            let y = t.step(400.0, 800.0);
            assert!(y <= 400.0);
        }
        assert!((t.anchored_y() - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_settle_budget() {
        let mut t = SpringTracker::new(400.0);
        assert!(!t.on_scroll().request_frame);
        t.entry_complete();
        assert_eq!(t.state(), TrackerState::Idle);

        assert_eq!(
            t.on_scroll(),
            Reaction {
                request_frame: true,
                restart_debounce: true
            }
        );
        let mut frames = 1;
        while t.frame_done() {
            frames += 1;
        }
        assert_eq!(frames, SETTLE_FRAMES);
        assert_eq!(t.state(), TrackerState::Idle);
    }

    #[test]
    fn test_debounce_switches_to_settling() {
        let mut t = SpringTracker::new(400.0);
        t.entry_complete();
        t.on_scroll();
        t.frame_done();
        t.on_settle();
        assert_eq!(
            t.state(),
            TrackerState::Settling {
                frames_left: SETTLE_FRAMES
            }
        );
    }
}
