//! Core types shared by the layout and presentation crates: document positions,
//! epochs, position mappings and page geometry.

/// Document epochs and render generations.
pub mod epoch;
/// Non-blocking future polling.
pub mod future;
/// Page-space geometry: points, sizes and rectangles.
pub mod geometry;
/// Document position types.
pub mod range;
/// Position mappings recorded per document transaction.
pub mod transaction;

pub use epoch::{Epoch, RenderGeneration};
pub use future::poll_once;
pub use geometry::{Point, Rect, Size};
pub use range::{Pos, PosLen, PosRange, Selection};
pub use transaction::{Bias, Change, ChangeSet, Mapped};
