//! Error types for the presentation pipeline.
//!
//! Mapping failures and index misses are values, not errors; see
//! [`crate::mapper::MapOutcome`] and [`crate::position_index::RenderedPositionIndex`].

use std::time::Duration;

use folio_layout::{LayoutError, RegionId, RegionKind};
use serde::Serialize;
use thiserror::Error;

use crate::source::DocumentId;

/// Content could not be turned into flow blocks.
#[derive(Debug, Error)]
pub enum ConvertError {
	/// The content tree is not in a shape the converter understands.
	#[error("invalid content: {0}")]
	InvalidContent(String),

	/// A node type has no block representation.
	#[error("unsupported node type `{0}`")]
	UnsupportedNode(String),
}

/// The painter could not present a layout.
///
/// A failing painter must leave its previous visual tree in place.
#[derive(Debug, Error)]
pub enum PaintError {
	/// The painter refused the frame.
	#[error("painter rejected frame: {0}")]
	Rejected(String),

	/// A mounted page does not exist in the layout.
	#[error("page {0} is not in the layout")]
	MissingPage(usize),
}

/// A header/footer session could not be entered.
#[derive(Debug, Error)]
pub enum SessionError {
	/// No layout has been presented yet.
	#[error("no layout to activate a region on")]
	NoLayout,

	/// The page index does not exist.
	#[error("page {page} is out of range ({count} pages)")]
	PageOutOfRange {
		/// Requested page index.
		page: usize,
		/// Pages in the current layout.
		count: usize,
	},

	/// The page shows no band of the requested kind.
	#[error("page {page} has no {kind:?} region")]
	NoRegion {
		/// Requested page index.
		page: usize,
		/// Requested band.
		kind: RegionKind,
	},

	/// The page references a region the converter did not produce.
	#[error("unknown region {0}")]
	UnknownRegion(RegionId),

	/// The region's own layout pass failed.
	#[error("region layout failed: {0}")]
	Layout(#[from] LayoutError),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("config parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid config: {0}")]
	Invalid(String),
}

/// A page-mount wait did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MountError {
	/// The page was not mounted within the bounded wait.
	#[error("page {page} not mounted after {waited:?}")]
	Timeout {
		/// Page that was awaited.
		page: usize,
		/// How long the wait lasted.
		waited: Duration,
	},

	/// The page does not exist in the presented layout.
	#[error("page {page} is out of range ({count} pages)")]
	OutOfRange {
		/// Requested page index.
		page: usize,
		/// Pages in the presented layout.
		count: usize,
	},
}

/// Engine registry misuse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
	/// An engine already exists for the document.
	#[error("an engine is already registered for {0}")]
	Duplicate(DocumentId),
}

/// Failure of one presentation pass.
///
/// Every variant leaves the previously presented layout on screen.
#[derive(Debug, Error)]
pub enum PipelineError {
	/// Content to block conversion failed; the layout engine was not entered.
	#[error("conversion failed: {0}")]
	Convert(#[from] ConvertError),

	/// Measurement or pagination failed.
	#[error("layout failed: {0}")]
	Layout(#[from] LayoutError),

	/// The layout task panicked or was cancelled.
	#[error("layout task failed: {0}")]
	Join(String),

	/// The painter rejected the new layout.
	#[error("paint failed: {0}")]
	Paint(#[from] PaintError),
}

impl PipelineError {
	/// Coarse classification carried by error events.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Convert(_) => ErrorKind::Conversion,
			Self::Layout(_) | Self::Join(_) => ErrorKind::Layout,
			Self::Paint(_) => ErrorKind::Paint,
		}
	}
}

/// Which stage of a pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	Conversion,
	Layout,
	Paint,
}
