use std::fmt;

/// Identifies a document state after a run of structural edits.
///
/// Epochs only advance when a transaction changes positions. The counter is
/// owned by the position mapper; everything else receives copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Epoch(u64);

impl Epoch {
	/// The epoch of a freshly loaded document.
	pub const INITIAL: Epoch = Epoch(0);

	/// Wraps a raw counter value.
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw counter value.
	pub const fn get(self) -> u64 {
		self.0
	}

	/// Returns the epoch produced by the next structural edit.
	#[must_use]
	pub const fn next(self) -> Self {
		Self(self.0 + 1)
	}

	/// Returns the epoch `n` edits earlier, saturating at [`Epoch::INITIAL`].
	#[must_use]
	pub const fn saturating_back(self, n: u64) -> Self {
		Self(self.0.saturating_sub(n))
	}

	/// Number of edits between `earlier` and `self`, or `None` if `earlier` is newer.
	pub fn distance_from(self, earlier: Epoch) -> Option<u64> {
		self.0.checked_sub(earlier.0)
	}
}

impl fmt::Display for Epoch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "e{}", self.0)
	}
}

/// Counts rerender-causing transactions, structural or not.
///
/// Meta-only transactions (visibility toggles, mode switches) bump this
/// without touching the [`Epoch`], so render caches can be invalidated
/// independently of position mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderGeneration(u64);

impl RenderGeneration {
	/// Wraps a raw counter value.
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw counter value.
	pub const fn get(self) -> u64 {
		self.0
	}

	/// Returns the following generation.
	#[must_use]
	pub const fn next(self) -> Self {
		Self(self.0.wrapping_add(1))
	}
}

impl fmt::Display for RenderGeneration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "g{}", self.0)
	}
}
