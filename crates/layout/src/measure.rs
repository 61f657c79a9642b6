use folio_primitives::PosRange;

use crate::block::FlowBlock;
use crate::error::LayoutError;

/// Space available to a block while it is measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureConstraints {
	pub max_width: f32,
	/// Body height of a page; blocks taller than this are split or overflow.
	pub max_height: f32,
}

impl MeasureConstraints {
	pub fn new(max_width: f32, max_height: f32) -> Self {
		Self { max_width, max_height }
	}

	/// Bit-exact comparison key; two constraints reuse measures only when equal.
	pub fn key(&self) -> (u32, u32) {
		(self.max_width.to_bits(), self.max_height.to_bits())
	}
}

/// One unbreakable slice of a measured block (a line, a table row, an image).
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
	pub height: f32,
	/// Positions covered, relative to the block's `pm_range.start`.
	pub range: PosRange,
	/// Behind-text content that does not push following content down.
	pub decorative: bool,
}

impl Segment {
	pub fn new(height: f32, range: PosRange) -> Self {
		Self {
			height,
			range,
			decorative: false,
		}
	}
}

/// Computed shape of one block under one set of constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
	/// Constraints the measure was computed under.
	pub constraints: MeasureConstraints,
	pub width: f32,
	pub segments: Vec<Segment>,
	/// The block moves whole to the next column instead of splitting.
	pub keep_together: bool,
}

impl Measure {
	/// Measure of a block that produces no fragments (breaks).
	pub fn empty(constraints: MeasureConstraints) -> Self {
		Self {
			constraints,
			width: 0.0,
			segments: Vec::new(),
			keep_together: false,
		}
	}

	pub fn total_height(&self) -> f32 {
		self.segments.iter().map(|s| s.height).sum()
	}

	/// Rejects measures the paginator cannot place.
	pub(crate) fn validate(&self, block: &FlowBlock) -> Result<(), LayoutError> {
		let malformed = |reason| LayoutError::MalformedMeasure { block: block.id, reason };

		if block.is_content() && self.segments.is_empty() {
			return Err(malformed("content block has no segments"));
		}
		if !self.width.is_finite() || self.width < 0.0 {
			return Err(malformed("width is negative or not finite"));
		}
		let len = block.pm_range.len();
		for seg in &self.segments {
			if !seg.height.is_finite() || seg.height < 0.0 {
				return Err(malformed("segment height is negative or not finite"));
			}
			if seg.range.end > len {
				return Err(malformed("segment range exceeds block range"));
			}
		}
		Ok(())
	}
}

/// Sizes blocks. Must be pure: identical inputs yield identical measures.
///
/// Implemented for closures so tests and hosts can inject plain functions.
pub trait Measurer {
	fn measure(&self, block: &FlowBlock, constraints: MeasureConstraints) -> Result<Measure, LayoutError>;
}

impl<F> Measurer for F
where
	F: Fn(&FlowBlock, MeasureConstraints) -> Result<Measure, LayoutError>,
{
	fn measure(&self, block: &FlowBlock, constraints: MeasureConstraints) -> Result<Measure, LayoutError> {
		self(block, constraints)
	}
}
