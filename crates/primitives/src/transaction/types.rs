use crate::range::{Pos, PosLen};

/// A single replacement expressed in positions of the pre-edit document.
///
/// Replaces `[start, end)` with `insert` new positions. A pure deletion has
/// `insert == 0`; a pure insertion has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
	/// First replaced position.
	pub start: Pos,
	/// First position past the replaced span (exclusive).
	pub end: Pos,
	/// Number of positions inserted in place of the span.
	pub insert: PosLen,
}

impl Change {
	/// An insertion of `len` positions at `at`.
	pub fn insert(at: Pos, len: PosLen) -> Self {
		Self {
			start: at,
			end: at,
			insert: len,
		}
	}

	/// A deletion of `[start, end)`.
	pub fn delete(start: Pos, end: Pos) -> Self {
		Self { start, end, insert: 0 }
	}

	/// A replacement of `[start, end)` by `insert` positions.
	pub fn replace(start: Pos, end: Pos, insert: PosLen) -> Self {
		Self { start, end, insert }
	}
}

/// Bias determines how positions at change boundaries are mapped.
///
/// When mapping a position through a change, bias determines whether the
/// position moves with insertions or stays before them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bias {
	/// Position stays before insertions at the same location.
	Left,
	/// Position moves after insertions at the same location.
	#[default]
	Right,
}

/// Result of a deletion-aware position mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapped {
	/// The mapped position (rounded by bias when `deleted`).
	pub pos: Pos,
	/// True when the content around the position was removed.
	pub deleted: bool,
}

/// A single operation in a changeset.
///
/// Operations are the atomic units that make up a `ChangeSet`. Only lengths
/// are tracked: the layout core never needs the inserted content itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	/// Retain the next N positions from the source document.
	Retain(PosLen),
	/// Delete the next N positions from the source document.
	Delete(PosLen),
	/// Insert N new positions at the current location.
	Insert(PosLen),
}

impl Operation {
	pub(super) fn len(self) -> PosLen {
		match self {
			Operation::Retain(n) | Operation::Delete(n) | Operation::Insert(n) => n,
		}
	}

	/// Same operation kind with a reduced length.
	pub(super) fn with_len(self, n: PosLen) -> Self {
		match self {
			Operation::Retain(_) => Operation::Retain(n),
			Operation::Delete(_) => Operation::Delete(n),
			Operation::Insert(_) => Operation::Insert(n),
		}
	}
}
