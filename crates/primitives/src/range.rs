use std::cmp;

/// A position in the document model's flat coordinate space.
///
/// Positions count the model's tokens (characters plus node boundaries);
/// the layout core never interprets them beyond ordering and arithmetic.
pub type Pos = usize;

/// A length or count measured in document positions.
///
/// Distinct from [`Pos`] to keep offsets and lengths from being swapped.
pub type PosLen = usize;

/// Selection direction (anchor to head).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Head is at or after anchor.
	Forward,
	/// Head is before anchor.
	Backward,
}

/// A half-open span `[start, end)` of document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PosRange {
	/// First position covered.
	pub start: Pos,
	/// First position past the span.
	pub end: Pos,
}

impl PosRange {
	/// Creates a range, swapping the bounds if given in reverse.
	pub fn new(start: Pos, end: Pos) -> Self {
		Self {
			start: cmp::min(start, end),
			end: cmp::max(start, end),
		}
	}

	/// Creates an empty range at `pos`.
	pub fn point(pos: Pos) -> Self {
		Self { start: pos, end: pos }
	}

	/// Returns the number of positions covered.
	#[inline]
	pub fn len(&self) -> PosLen {
		self.end - self.start
	}

	/// Returns true if the range covers no positions.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Returns true if `pos` lies in `[start, end)`.
	#[inline]
	pub fn contains(&self, pos: Pos) -> bool {
		pos >= self.start && pos < self.end
	}

	/// Returns true if `pos` lies in `[start, end]`.
	///
	/// Caret positions at the very end of a block belong to that block.
	#[inline]
	pub fn contains_inclusive(&self, pos: Pos) -> bool {
		pos >= self.start && pos <= self.end
	}

	/// Returns true if the two ranges share at least one position.
	pub fn overlaps(&self, other: &PosRange) -> bool {
		self.start < other.end && other.start < self.end
	}

	/// Returns the overlap of two ranges, if any.
	pub fn intersect(&self, other: &PosRange) -> Option<PosRange> {
		let start = cmp::max(self.start, other.start);
		let end = cmp::min(self.end, other.end);
		(start <= end).then_some(PosRange { start, end })
	}

	/// Shifts both bounds by `base`.
	#[must_use]
	pub fn offset(self, base: Pos) -> Self {
		Self {
			start: self.start + base,
			end: self.end + base,
		}
	}

	/// Clamps both bounds to `max`.
	#[must_use]
	pub fn clamp(self, max: Pos) -> Self {
		Self {
			start: self.start.min(max),
			end: self.end.min(max),
		}
	}
}

/// A document selection defined by anchor and head positions.
///
/// The anchor is the fixed end; the head moves while the selection is extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
	/// The fixed end of the selection.
	pub anchor: Pos,
	/// The moving end of the selection (caret position).
	pub head: Pos,
}

impl Selection {
	/// Creates a selection from anchor to head.
	pub fn new(anchor: Pos, head: Pos) -> Self {
		Self { anchor, head }
	}

	/// Creates a collapsed selection (caret) at `pos`.
	pub fn caret(pos: Pos) -> Self {
		Self::new(pos, pos)
	}

	/// Returns the smaller endpoint.
	#[inline]
	pub fn from(&self) -> Pos {
		cmp::min(self.anchor, self.head)
	}

	/// Returns the larger endpoint.
	#[inline]
	pub fn to(&self) -> Pos {
		cmp::max(self.anchor, self.head)
	}

	/// Returns true if anchor and head coincide.
	#[inline]
	pub fn is_collapsed(&self) -> bool {
		self.anchor == self.head
	}

	/// Returns the direction from anchor to head.
	pub fn direction(&self) -> Direction {
		if self.head < self.anchor {
			Direction::Backward
		} else {
			Direction::Forward
		}
	}

	/// Returns the covered span.
	pub fn range(&self) -> PosRange {
		PosRange::new(self.anchor, self.head)
	}

	/// Clamps both endpoints to `max`.
	#[must_use]
	pub fn clamp(self, max: Pos) -> Self {
		Self::new(self.anchor.min(max), self.head.min(max))
	}
}

impl From<PosRange> for Selection {
	fn from(range: PosRange) -> Self {
		Self::new(range.start, range.end)
	}
}
