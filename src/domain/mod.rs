//! Domain types for anchorlight.
//!
//! This module contains the host model and the analyzer payloads:
//! - Document: arena render tree with weak node handles and geometry
//! - Selector: the CSS-like subset used to find containers and labels
//! - Snapshot: loading documents from captured layouts, fingerprints
//! - Listeners: registrations owned by marking and overlay sessions
//! - Analysis: checks, verdicts and causal chains

pub mod analysis;
pub mod document;
pub mod geometry;
pub mod listeners;
pub mod selector;
pub mod snapshot;

// Re-export commonly used types
pub use analysis::{CausalChain, CheckInfo, CoherenceCheck, HighlightData, Impact, Verdict};
pub use document::{Document, NodeId, OVERLAY_ATTR};
pub use geometry::{Point, Rect, Viewport};
pub use listeners::{ListenerKind, ListenerOwner, ListenerRegistry};
pub use selector::{Selector, SelectorError};
pub use snapshot::{Snapshot, SnapshotError};
