//! anchorlight - Evidence anchoring and live connection overlays
//!
//! Locates short analyzer "evidence" fragments inside a live, unindexed
//! document tree and renders annotations for them: inline markers with
//! tooltips and causal panels, and connection overlays that link evidence
//! regions to a floating summary node while the view scrolls.
//!
//! # Architecture
//!
//! The engine is headless and single-threaded:
//! - The host's document is an arena tree of weak handles; geometry is read
//!   fresh on every use
//! - All deferred work runs on a virtual-time scheduler, so timers and
//!   animation frames are deterministic
//! - Every piece of mutable state lives in one `HighlightEngineState`
//!
//! # Modules
//!
//! - `domain`: Host model and analyzer payloads (Document, Selector, Verdict)
//! - `resolver`: Fragment-to-region resolution cascade
//! - `marking`: Inline markers and their lookup tables
//! - `popup`: Tooltip and causal-panel fixtures
//! - `overlay`: Connection overlays and the spring tracker
//! - `engine`: Commands, UI events and the scheduler
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Resolve a fragment against a captured document
//! anchorlight resolve page.yaml "향후 3년간 약 15% 절감"
//!
//! # Replay a scripted session and print overlay frames
//! anchorlight replay page.yaml session.yaml
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod marking;
pub mod overlay;
pub mod popup;
pub mod resolver;

// Re-export main types at crate root for convenience
pub use domain::{Document, HighlightData, NodeId, Snapshot, Verdict, Viewport};
pub use engine::{Command, CommandOutcome, HighlightEngine, UiEvent};
pub use marking::{Category, MarkingSession, ScrollTarget};
pub use overlay::{ConnectionRequest, OverlayFrame, TrackerState};
pub use resolver::{AnchorMatch, AnchorResolver, ResolveMode, ResolverSettings};
