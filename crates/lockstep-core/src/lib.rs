//! Presentation model for a synchronized two-pane diff viewer
//!
//! Linearizes a hierarchical diff (file -> hunks -> differences -> lines)
//! into a virtual scroll coordinate space shared by two panes whose local
//! content heights diverge, and keeps selection, scrolling and
//! apply/unapply state consistent between them.

pub mod apply;
pub mod coordinator;
pub mod layout;
pub mod model;
pub mod pane;

pub use apply::ApplyTracker;
pub use coordinator::{Coordinator, Event, SelectionState, Status};
pub use layout::{LayoutMetrics, SpanKey, VirtualLayout, VirtualSpan};
pub use model::{
    DiffKey, DiffModel, DiffStats, Difference, DifferenceType, Hunk, Line, ModelError,
};
pub use pane::{BackgroundClass, PaintPayload, PaneItem, PaneRow, PaneSide, PaneView};
