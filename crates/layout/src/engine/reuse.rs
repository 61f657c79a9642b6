use std::mem;

use folio_primitives::PosRange;
use rustc_hash::FxHashMap;

use super::LayoutStats;
use crate::block::{BlockId, BlockKind, FlowBlock};
use crate::error::LayoutError;
use crate::measure::{Measure, MeasureConstraints, Measurer};
use crate::options::{LayoutOptions, SectionGeometry};

/// Measures from the previous pass, addressable by block id or by position.
///
/// Converters that regenerate ids still get reuse through the
/// `(pm_range, signature)` fallback as long as the block did not move.
pub(super) struct PrevMeasures<'a> {
	by_id: FxHashMap<BlockId, (u64, &'a Measure)>,
	by_range: FxHashMap<(PosRange, u64), &'a Measure>,
}

impl<'a> PrevMeasures<'a> {
	pub fn new(blocks: &'a [FlowBlock], measures: Option<&'a [Measure]>) -> Self {
		let mut by_id = FxHashMap::default();
		let mut by_range = FxHashMap::default();

		match measures {
			Some(measures) if measures.len() == blocks.len() => {
				by_id.reserve(blocks.len());
				for (block, measure) in blocks.iter().zip(measures) {
					let sig = block.signature();
					by_id.insert(block.id, (sig, measure));
					by_range.insert((block.pm_range, sig), measure);
				}
			}
			Some(measures) => {
				tracing::warn!(blocks = blocks.len(), measures = measures.len(), "previous measures misaligned; remeasuring everything");
			}
			None => {}
		}

		Self { by_id, by_range }
	}

	/// Returns a prior measure still valid for `block` under `constraints`.
	pub fn lookup(&self, block: &FlowBlock, sig: u64, constraints: MeasureConstraints) -> Option<&'a Measure> {
		let fits = |m: &Measure| m.constraints.key() == constraints.key();

		if let Some(&(prev_sig, measure)) = self.by_id.get(&block.id)
			&& prev_sig == sig
			&& fits(measure)
		{
			return Some(measure);
		}

		self.by_range.get(&(block.pm_range, sig)).copied().filter(|m| fits(*m))
	}
}

type CacheKey = (BlockId, u64, (u32, u32));

/// Cross-pass cache for blocks that arrive without prior measures
/// (header/footer regions and footnote bodies).
///
/// Entries not touched during a pass are dropped when it finishes.
#[derive(Default)]
pub(super) struct MeasureCache {
	entries: FxHashMap<CacheKey, Measure>,
	next: FxHashMap<CacheKey, Measure>,
}

impl MeasureCache {
	pub fn begin_pass(&mut self) {
		self.next.clear();
	}

	pub fn finish_pass(&mut self) {
		self.entries = mem::take(&mut self.next);
	}

	pub fn get_or_measure<M: Measurer + ?Sized>(
		&mut self,
		block: &FlowBlock,
		constraints: MeasureConstraints,
		measurer: &M,
		stats: &mut LayoutStats,
	) -> Result<Measure, LayoutError> {
		let key = (block.id, block.signature(), constraints.key());
		let measure = match self.entries.get(&key).or_else(|| self.next.get(&key)) {
			Some(hit) => {
				stats.reused += 1;
				hit.clone()
			}
			None => {
				stats.measured += 1;
				measure_block(block, constraints, measurer)?
			}
		};
		self.next.insert(key, measure.clone());
		Ok(measure)
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

/// Measures one block, rejecting shapes the paginator cannot place.
pub(super) fn measure_block<M: Measurer + ?Sized>(block: &FlowBlock, constraints: MeasureConstraints, measurer: &M) -> Result<Measure, LayoutError> {
	if !block.is_content() {
		return Ok(Measure::empty(constraints));
	}
	let measure = measurer.measure(block, constraints)?;
	measure.validate(block)?;
	Ok(measure)
}

/// Measures the body blocks, reusing every prior measure whose block
/// signature and constraints are unchanged.
///
/// Constraints follow the section geometry in effect at each block, so a
/// section break that changes columns only invalidates the blocks after it.
pub(super) fn measure_body<M: Measurer + ?Sized>(
	blocks: &[FlowBlock],
	options: &LayoutOptions,
	prev: &PrevMeasures<'_>,
	measurer: &M,
	stats: &mut LayoutStats,
) -> Result<Vec<Measure>, LayoutError> {
	let mut geom = SectionGeometry::from_options(options);
	let mut measures = Vec::with_capacity(blocks.len());

	for block in blocks {
		if let BlockKind::SectionBreak(sb) = &block.kind {
			geom = geom.apply(sb);
			geom.validate()?;
		}
		let constraints = MeasureConstraints::new(geom.column_width(), geom.body_height());

		if !block.is_content() {
			measures.push(Measure::empty(constraints));
			continue;
		}

		let sig = block.signature();
		match prev.lookup(block, sig, constraints) {
			Some(measure) => {
				stats.reused += 1;
				measures.push(measure.clone());
			}
			None => {
				tracing::trace!(block = %block.id, "measuring changed block");
				stats.measured += 1;
				measures.push(measure_block(block, constraints, measurer)?);
			}
		}
	}

	Ok(measures)
}
