//! Presentation pipeline for paginated documents.
//!
//! Keeps three timelines consistent: document edits (counted in epochs by
//! the [`EpochPositionMapper`]), asynchronous layout passes (run by the
//! [`PresentationEngine`]) and painting (indexed by the
//! [`RenderedPositionIndex`]). A caret or selection is only drawn once the
//! painted layout has caught up with the document.
//!
//! Collaborators (document source, block converter, measurer, painter and
//! selection overlay) are injected through the traits in [`source`] and
//! [`folio_layout::Measurer`].

/// Engine configuration loaded from TOML.
pub mod config;
/// Revision-keyed conversion cache.
pub mod convert;
pub mod error;
/// Engine events and their fan-out.
pub mod events;
/// Header/footer editing sessions.
pub mod header_footer;
pub mod health;
/// Epoch-to-epoch position mapping.
pub mod mapper;
/// Page mount publication and bounded waits.
pub mod mount;
/// The per-document presentation pipeline.
pub mod pipeline;
pub mod pointer;
/// Painted-geometry index.
pub mod position_index;
pub mod registry;
/// Selection paint scheduling.
pub mod selection_sync;
/// Collaborator seams.
pub mod source;

pub use config::EngineConfig;
pub use convert::CachedConverter;
pub use error::{ConfigError, ConvertError, ErrorKind, MountError, PaintError, PipelineError, RegistryError, SessionError};
pub use events::{EngineEvent, EventBus};
pub use header_footer::{ActiveSurface, HeaderFooterSession, HeaderFooterSessionManager, RegionTarget};
pub use health::Health;
pub use mapper::{EpochPositionMapper, MapOutcome, StaleReason};
pub use mount::PageMounts;
pub use pipeline::{Collaborators, PresentationEngine};
pub use position_index::{NodeId, PaintedHost, PaintedNode, RenderedPositionIndex};
pub use registry::EngineRegistry;
pub use selection_sync::{RenderDecision, SelectionSyncCoordinator, SyncState};
pub use source::{
	BlockConverter, ConvertOptions, Converted, DocTransaction, DocumentId, DocumentMode, DocumentSource, OverlayFrame, PaintFrame, Painter, SelectionOverlay,
	SurfaceKind, TransactionMeta, TransactionOrigin,
};
