//! Pointer gesture state: drag selections and table cell anchors.

use folio_layout::BlockId;
use folio_primitives::{Bias, Epoch, Pos};

use crate::mapper::{EpochPositionMapper, MapOutcome};

/// An in-progress drag selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragState {
	pub anchor_pos: Pos,
	pub anchor_page: usize,
	pub last_hit_page: usize,
	/// Epoch `anchor_pos` is expressed in.
	pub epoch: Epoch,
}

impl DragState {
	pub fn is_stale(&self, current: Epoch) -> bool {
		self.epoch != current
	}
}

/// Anchor cell of a drag that started inside a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAnchorState {
	pub table: BlockId,
	pub row: usize,
	pub col: usize,
	pub epoch: Epoch,
}

#[derive(Debug, Default)]
pub struct PointerState {
	drag: Option<DragState>,
	cell_anchor: Option<CellAnchorState>,
}

impl PointerState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn drag(&self) -> Option<&DragState> {
		self.drag.as_ref()
	}

	pub fn cell_anchor(&self) -> Option<&CellAnchorState> {
		self.cell_anchor.as_ref()
	}

	/// Starts a drag; `cell` is `(table, row, col)` when it starts in a table.
	pub fn begin_drag(&mut self, pos: Pos, page: usize, epoch: Epoch, cell: Option<(BlockId, usize, usize)>) {
		self.drag = Some(DragState {
			anchor_pos: pos,
			anchor_page: page,
			last_hit_page: page,
			epoch,
		});
		self.cell_anchor = cell.map(|(table, row, col)| CellAnchorState { table, row, col, epoch });
	}

	pub fn drag_to(&mut self, page: usize) {
		if let Some(drag) = &mut self.drag {
			drag.last_hit_page = page;
		}
	}

	pub fn end_drag(&mut self) -> Option<DragState> {
		self.cell_anchor = None;
		self.drag.take()
	}

	/// Brings the drag anchor to the mapper's current epoch after a
	/// structural edit. The cell anchor never survives one.
	///
	/// A drag whose anchor was deleted is cancelled.
	pub fn on_structural_change(&mut self, mapper: &EpochPositionMapper) {
		self.cell_anchor = None;
		let Some(drag) = &mut self.drag else {
			return;
		};
		match mapper.map_position(drag.anchor_pos, drag.epoch, Bias::Left) {
			MapOutcome::Mapped { pos, to_epoch } => {
				drag.anchor_pos = pos;
				drag.epoch = to_epoch;
			}
			MapOutcome::Stale(reason) => {
				tracing::debug!(?reason, anchor = drag.anchor_pos, "drag anchor lost; cancelling drag");
				self.drag = None;
			}
		}
	}
}
