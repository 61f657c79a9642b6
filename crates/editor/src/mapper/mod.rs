//! Epochs and cross-epoch position mapping.
//!
//! Every structural transaction advances the epoch and appends its mapping.
//! A position captured under an older epoch is replayed through each later
//! mapping in order. When that is impossible the answer is an explicit
//! [`MapOutcome::Stale`]; callers keep their last good state rather than
//! guessing a nearby position.


use std::collections::VecDeque;

use folio_primitives::{Bias, ChangeSet, Epoch, Pos};

/// Why a position could not be brought to the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
	/// The epoch was pruned or never recorded.
	UnknownEpoch,
	/// The epoch is newer than the current one.
	FutureEpoch,
	/// An intervening edit removed the content around the position.
	Deleted,
}

/// Result of [`EpochPositionMapper::map_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOutcome {
	Mapped { pos: Pos, to_epoch: Epoch },
	Stale(StaleReason),
}

impl MapOutcome {
	/// The mapped position, if mapping succeeded.
	pub fn pos(self) -> Option<Pos> {
		match self {
			Self::Mapped { pos, .. } => Some(pos),
			Self::Stale(_) => None,
		}
	}

	pub fn is_mapped(self) -> bool {
		matches!(self, Self::Mapped { .. })
	}
}

/// Owner of the epoch counter and the recorded mappings.
///
/// Storage is append-only at the back; pruning only drops the oldest
/// mappings once no layout can still reference them.
#[derive(Debug)]
pub struct EpochPositionMapper {
	current: Epoch,
	/// Oldest epoch still mappable; `steps[i]` leads from `base + i` to `base + i + 1`.
	base: Epoch,
	steps: VecDeque<ChangeSet>,
	retained_epochs: u64,
	last_completed: Option<Epoch>,
}

impl Default for EpochPositionMapper {
	fn default() -> Self {
		Self::new(64)
	}
}

impl EpochPositionMapper {
	pub fn new(retained_epochs: u64) -> Self {
		Self {
			current: Epoch::INITIAL,
			base: Epoch::INITIAL,
			steps: VecDeque::new(),
			retained_epochs,
			last_completed: None,
		}
	}

	pub fn current_epoch(&self) -> Epoch {
		self.current
	}

	/// Oldest epoch [`map_position`](Self::map_position) still accepts.
	pub fn oldest_mappable(&self) -> Epoch {
		self.base
	}

	/// Epoch of the most recent completed layout pass.
	pub fn last_completed(&self) -> Option<Epoch> {
		self.last_completed
	}

	/// Records one structural transaction and returns the epoch it produced.
	pub fn record_transaction(&mut self, mapping: ChangeSet) -> Epoch {
		if let Some(prev) = self.steps.back()
			&& prev.len_after() != mapping.len()
		{
			tracing::warn!(
				expected = prev.len_after(),
				got = mapping.len(),
				epoch = %self.current,
				"mapping length does not continue the previous transaction"
			);
		}
		self.steps.push_back(mapping);
		self.current = self.current.next();
		tracing::trace!(epoch = %self.current, recorded = self.steps.len(), "epoch advanced");
		self.current
	}

	/// Maps `pos`, authored under `from`, to the current epoch.
	pub fn map_position(&self, pos: Pos, from: Epoch, bias: Bias) -> MapOutcome {
		if from > self.current {
			return MapOutcome::Stale(StaleReason::FutureEpoch);
		}
		let Some(skip) = from.distance_from(self.base) else {
			return MapOutcome::Stale(StaleReason::UnknownEpoch);
		};

		let mut pos = pos;
		for step in self.steps.iter().skip(skip as usize) {
			let mapped = step.map_pos_checked(pos, bias);
			if mapped.deleted {
				return MapOutcome::Stale(StaleReason::Deleted);
			}
			pos = mapped.pos;
		}
		MapOutcome::Mapped { pos, to_epoch: self.current }
	}

	/// Composes the mappings leading from `from` to `to`.
	///
	/// `None` when either end is outside the recorded window or nothing
	/// changed between them.
	pub fn compose_range(&self, from: Epoch, to: Epoch) -> Option<ChangeSet> {
		if from >= to || to > self.current {
			return None;
		}
		let skip = from.distance_from(self.base)? as usize;
		let take = to.distance_from(from)? as usize;
		self.steps.iter().skip(skip).take(take).cloned().reduce(ChangeSet::compose)
	}

	/// Notes a completed layout at `epoch` and prunes mappings no consumer
	/// can still need.
	pub fn on_layout_complete(&mut self, epoch: Epoch) {
		if epoch > self.current {
			tracing::warn!(epoch = %epoch, current = %self.current, "layout completed at a future epoch");
			return;
		}
		let completed = self.last_completed.map_or(epoch, |prev| prev.max(epoch));
		self.last_completed = Some(completed);

		let keep_from = completed.saturating_back(self.retained_epochs);
		let mut pruned = 0usize;
		while self.base < keep_from && self.steps.pop_front().is_some() {
			self.base = self.base.next();
			pruned += 1;
		}
		if pruned > 0 {
			tracing::debug!(pruned, oldest = %self.base, "pruned epoch mappings");
		}
	}
}
