use smallvec::SmallVec;

use super::types::{Bias, Change, Mapped, Operation};
use crate::range::{Pos, PosLen, PosRange, Selection};

/// A sequence of operations describing how positions move through an edit.
///
/// ChangeSet follows Operational Transformation conventions: the source
/// document is walked by retain, delete and insert operations. Only lengths
/// are kept, which is all that position mapping, composition and inversion
/// need.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
	/// Sequence of retain/delete/insert operations.
	pub(super) changes: SmallVec<[Operation; 4]>,
	/// Length of the source document before changes.
	pub(super) len: PosLen,
	/// Length of the document after applying changes.
	pub(super) len_after: PosLen,
}

impl ChangeSet {
	/// Creates an empty changeset over an empty document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a changeset that leaves a document of `len` positions untouched.
	pub fn identity(len: PosLen) -> Self {
		let mut cs = Self::new();
		cs.retain(len);
		cs
	}

	/// Builds a changeset from replacements sorted by `start`.
	///
	/// Overlapping or out-of-order changes are clamped forward so the result
	/// always describes a valid walk over `doc_len` positions.
	pub fn from_changes(doc_len: PosLen, changes: impl IntoIterator<Item = Change>) -> Self {
		let mut cs = Self::new();
		let mut last = 0;

		for change in changes {
			let start = change.start.clamp(last, doc_len);
			let end = change.end.clamp(start, doc_len);

			cs.retain(start - last);
			cs.insert(change.insert);
			cs.delete(end - start);
			last = end;
		}

		cs.retain(doc_len - last);
		cs
	}

	/// Returns the length of the source document (before changes).
	pub fn len(&self) -> PosLen {
		self.len
	}

	/// Returns the length of the document after applying changes.
	pub fn len_after(&self) -> PosLen {
		self.len_after
	}

	/// Returns true if this changeset contains no operations.
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	/// Returns true if no position moves through this changeset.
	pub fn is_identity(&self) -> bool {
		self.changes.iter().all(|op| matches!(op, Operation::Retain(_)))
	}

	/// Returns a slice of all operations in this changeset.
	pub fn changes(&self) -> &[Operation] {
		&self.changes
	}

	/// Adds a retain operation, preserving N positions from the source.
	///
	/// Consecutive retain operations are merged.
	pub(crate) fn retain(&mut self, n: PosLen) {
		if n == 0 {
			return;
		}

		self.len += n;
		self.len_after += n;

		if let Some(Operation::Retain(count)) = self.changes.last_mut() {
			*count += n;
		} else {
			self.changes.push(Operation::Retain(n));
		}
	}

	/// Adds a delete operation, removing N positions from the source.
	///
	/// Consecutive delete operations are merged.
	pub(crate) fn delete(&mut self, n: PosLen) {
		if n == 0 {
			return;
		}

		self.len += n;

		if let Some(Operation::Delete(count)) = self.changes.last_mut() {
			*count += n;
		} else {
			self.changes.push(Operation::Delete(n));
		}
	}

	/// Adds an insert operation at the current location.
	///
	/// Inserts always precede deletes at the same location so that equal
	/// edits have a single canonical representation.
	pub(crate) fn insert(&mut self, n: PosLen) {
		if n == 0 {
			return;
		}

		self.len_after += n;

		match self.changes.as_mut_slice() {
			[.., Operation::Insert(prev)] | [.., Operation::Insert(prev), Operation::Delete(_)] => {
				*prev += n;
			}
			[.., last @ Operation::Delete(_)] => {
				let del = std::mem::replace(last, Operation::Insert(n));
				self.changes.push(del);
			}
			_ => {
				self.changes.push(Operation::Insert(n));
			}
		}
	}

	fn push(&mut self, op: Operation) {
		match op {
			Operation::Retain(n) => self.retain(n),
			Operation::Delete(n) => self.delete(n),
			Operation::Insert(n) => self.insert(n),
		}
	}

	/// Inverts this changeset to create one that undoes its positional effect.
	pub fn invert(&self) -> ChangeSet {
		let mut result = ChangeSet::new();
		for op in &self.changes {
			match *op {
				Operation::Retain(n) => result.retain(n),
				Operation::Delete(n) => result.insert(n),
				Operation::Insert(n) => result.delete(n),
			}
		}
		result
	}

	/// Maps a position through this changeset using the specified bias.
	///
	/// Positions inside deleted spans collapse onto the deletion point.
	pub fn map_pos(&self, pos: Pos, bias: Bias) -> Pos {
		self.map_pos_checked(pos, bias).pos
	}

	/// Maps a position and reports whether the content around it was deleted.
	///
	/// A position strictly inside a deleted span is `deleted`; its mapped
	/// value lands before (`Left`) or after (`Right`) any replacement text.
	/// Deletion boundaries are not deleted.
	pub fn map_pos_checked(&self, pos: Pos, bias: Bias) -> Mapped {
		let mut old_pos = 0;
		let mut new_pos = 0;
		// Length inserted at `old_pos`, used to round deleted positions left.
		let mut inserted_here = 0;

		for op in &self.changes {
			if old_pos > pos {
				break;
			}

			match *op {
				Operation::Retain(n) => {
					if old_pos + n > pos {
						return Mapped {
							pos: new_pos + (pos - old_pos),
							deleted: false,
						};
					}
					old_pos += n;
					new_pos += n;
					inserted_here = 0;
				}
				Operation::Delete(n) => {
					if old_pos + n > pos {
						let deleted = pos > old_pos;
						let pos = match bias {
							Bias::Left if deleted => new_pos - inserted_here,
							_ => new_pos,
						};
						return Mapped { pos, deleted };
					}
					old_pos += n;
					inserted_here = 0;
				}
				Operation::Insert(n) => {
					if old_pos == pos && bias == Bias::Left {
						// Position is exactly at insert point, stay before
					} else {
						new_pos += n;
						inserted_here += n;
					}
				}
			}
		}

		Mapped {
			pos: new_pos + pos.saturating_sub(old_pos),
			deleted: false,
		}
	}

	/// Maps both ends of a range; the start leans right and the end leans left
	/// so the range never swallows text inserted at its edges.
	pub fn map_range(&self, range: PosRange) -> PosRange {
		let start = self.map_pos(range.start, Bias::Right);
		let end = self.map_pos(range.end, Bias::Left);
		PosRange::new(start, end.max(start))
	}

	/// Maps a selection, keeping the anchor/head orientation.
	pub fn map_selection(&self, sel: &Selection) -> Selection {
		Selection::new(self.map_pos(sel.anchor, Bias::Right), self.map_pos(sel.head, Bias::Right))
	}

	/// Composes two changesets into a single equivalent changeset.
	///
	/// The result is equivalent to applying `self` then `other`.
	///
	/// # Debug Assertions
	/// Asserts that `self.len_after == other.len` (the changesets must be compatible).
	pub fn compose(self, other: ChangeSet) -> ChangeSet {
		debug_assert_eq!(self.len_after, other.len);

		let mut result = ChangeSet::new();
		let mut a_iter = self.changes.into_iter();
		let mut b_iter = other.changes.into_iter();
		let mut a = a_iter.next();
		let mut b = b_iter.next();

		// Shortens the current op by `used`, pulling the next one once exhausted.
		fn advance(
			op: Operation,
			used: PosLen,
			iter: &mut impl Iterator<Item = Operation>,
		) -> Option<Operation> {
			let rest = op.len() - used;
			if rest > 0 { Some(op.with_len(rest)) } else { iter.next() }
		}

		loop {
			match (a, b) {
				(None, None) => break,
				(Some(Operation::Delete(n)), _) => {
					result.delete(n);
					a = a_iter.next();
				}
				(_, Some(Operation::Insert(n))) => {
					result.insert(n);
					b = b_iter.next();
				}
				(Some(op_a), Some(op_b)) => {
					let len = op_a.len().min(op_b.len());
					match (op_a, op_b) {
						(Operation::Retain(_), Operation::Retain(_)) => result.retain(len),
						(Operation::Retain(_), Operation::Delete(_)) => result.delete(len),
						(Operation::Insert(_), Operation::Retain(_)) => result.insert(len),
						// Text inserted by `self` and deleted by `other` cancels out.
						(Operation::Insert(_), Operation::Delete(_)) => {}
						_ => unreachable!("deletes in self and inserts in other are handled above"),
					}
					a = advance(op_a, len, &mut a_iter);
					b = advance(op_b, len, &mut b_iter);
				}
				(Some(op), None) | (None, Some(op)) => {
					// Length mismatch; keep the tail so lengths stay consistent.
					result.push(op);
					a = a_iter.next();
					b = b_iter.next();
				}
			}
		}

		result
	}
}
