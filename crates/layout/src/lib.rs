//! Paginated layout for flow documents.
//!
//! Flow blocks are measured through an injected [`Measurer`] and packed into
//! pages of fragments by the [`IncrementalLayoutEngine`], which reuses every
//! measure whose block content and constraints did not change since the
//! previous pass. The resulting [`Layout`] answers analytic geometry queries
//! and feeds [`compute_pins`] for windowed rendering.

/// Flow blocks: the paginatable units produced from document content.
pub mod block;
/// Incremental measurement and pagination.
pub mod engine;
mod error;
/// A monospace measurer for headless hosts and tests.
pub mod fixed;
/// Analytic position and hit-test geometry over a finished layout.
pub mod geometry;
/// The paginated result: pages, fragments and line boxes.
pub mod model;
/// Block measures and the measurer seam.
pub mod measure;
/// Page geometry, sections and view options.
pub mod options;
/// Pages that must stay mounted under windowed rendering.
pub mod pins;

pub use block::{BlockId, BlockKind, FlowBlock, FootnoteId, FootnoteRef, Image, Paragraph, SectionBreak, SectionBreakKind, Table, TableCell, TableRow};
pub use engine::{FootnoteInput, HeaderFooterInput, IncrementalLayoutEngine, LayoutInput, LayoutResult, LayoutStats, RegionContent, RegionLayout};
pub use error::LayoutError;
pub use fixed::FixedMetrics;
pub use geometry::{DocPoint, PageRect};
pub use measure::{Measure, MeasureConstraints, Measurer, Segment};
pub use model::{Fragment, FragmentKind, HeaderFooterVariant, Layout, LineBox, Page, RegionId, RegionKind};
pub use options::{Columns, LayoutMode, LayoutOptions, Margins};
pub use pins::{PinInput, VirtualWindow, VirtualizationPolicy, compute_pins, mounted_pages};
