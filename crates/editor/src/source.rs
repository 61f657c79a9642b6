//! Collaborator seams: the document, the block converter, the painter and
//! the selection overlay.
//!
//! The engine depends on these traits only. The document source never holds
//! a reference back to the engine; it hands out transaction receivers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use folio_layout::{FlowBlock, FootnoteId, Layout, PageRect, RegionContent, RegionLayout};
use folio_primitives::{ChangeSet, Epoch, Pos, PosLen, Selection};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{ConvertError, PaintError};
use crate::position_index::PaintedHost;

/// Identity of an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "doc{}", self.0)
	}
}

/// Where a transaction was authored. Both are handled identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionOrigin {
	#[default]
	Local,
	Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionMeta {
	/// Requests a rerender even when no position changed.
	pub rerender: bool,
	pub origin: TransactionOrigin,
}

/// One document transaction as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTransaction {
	pub mapping: ChangeSet,
	pub doc_changed: bool,
	pub meta: TransactionMeta,
}

impl DocTransaction {
	/// A structural edit.
	pub fn edit(mapping: ChangeSet) -> Self {
		Self {
			mapping,
			doc_changed: true,
			meta: TransactionMeta {
				rerender: true,
				origin: TransactionOrigin::Local,
			},
		}
	}

	/// A transaction that moves no position, optionally forcing a rerender.
	pub fn meta(rerender: bool) -> Self {
		Self {
			mapping: ChangeSet::new(),
			doc_changed: false,
			meta: TransactionMeta {
				rerender,
				origin: TransactionOrigin::Local,
			},
		}
	}

	pub fn with_origin(mut self, origin: TransactionOrigin) -> Self {
		self.meta.origin = origin;
		self
	}
}

/// The document model.
pub trait DocumentSource {
	/// Serializable content tree handed to the block converter.
	fn content(&self) -> serde_json::Value;

	fn selection(&self) -> Selection;

	fn doc_size(&self) -> PosLen;

	/// Opens a transaction stream. Transactions arrive in dispatch order.
	fn subscribe(&self) -> mpsc::UnboundedReceiver<DocTransaction>;
}

/// Inputs that change conversion without changing content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
	pub document_mode: DocumentMode,
	pub show_comments: bool,
	pub footnote_order: Vec<FootnoteId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMode {
	#[default]
	Editing,
	Suggesting,
	Viewing,
}

/// Converter output for one content revision.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Converted {
	pub blocks: Vec<FlowBlock>,
	pub bookmarks: BTreeMap<String, Pos>,
	pub regions: Vec<RegionContent>,
	pub footnotes: BTreeMap<FootnoteId, Vec<FlowBlock>>,
}

/// Turns document content into flow blocks.
pub trait BlockConverter {
	fn convert(&self, content: &serde_json::Value, options: &ConvertOptions) -> Result<Converted, ConvertError>;
}

/// Everything the painter needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct PaintFrame<'a> {
	pub layout: &'a Layout,
	pub headers: &'a [RegionLayout],
	pub footers: &'a [RegionLayout],
	/// Pages to materialize; the rest stay unmounted.
	pub mounted: &'a BTreeSet<usize>,
	/// Positional changes since the previous successful paint, when the
	/// painter can patch position attributes instead of rebuilding.
	pub mapping: Option<&'a ChangeSet>,
}

/// Renders layouts into a visual tree.
pub trait Painter {
	/// Presents a frame. On error the previous visual tree must stay intact.
	fn paint(&mut self, frame: PaintFrame<'_>) -> Result<(), PaintError>;

	/// The visual tree as currently painted.
	fn host(&self) -> &dyn PaintedHost;
}

/// Which surface a selection frame was computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
	Body,
	Header,
	Footer,
}

/// Caret and selection geometry for one overlay paint.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
	pub epoch: Epoch,
	pub surface: SurfaceKind,
	pub caret: Option<PageRect>,
	pub rects: Vec<PageRect>,
}

/// Draws the caret and selection over painted pages.
pub trait SelectionOverlay {
	fn render(&mut self, frame: &OverlayFrame);
}
