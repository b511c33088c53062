//! Timeline geometry and pointer interaction, independent of egui painting.

pub mod dependencies;
pub mod interaction;
pub mod layout;
pub mod today;

pub use dependencies::{dash_segments, route};
pub use interaction::{ChartEvent, CursorHint, InteractionController};
pub use layout::{BarGeometry, ChartLayout, VarianceKind};
pub use today::{scroll_offset_for, today_marker, DeferredScroll};
