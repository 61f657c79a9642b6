use std::sync::atomic::{AtomicUsize, Ordering};

use folio_primitives::PosRange;

use crate::block::{BlockKind, FlowBlock};
use crate::error::LayoutError;
use crate::measure::{Measure, MeasureConstraints, Measurer, Segment};

/// Monospace measurer: every line holds `chars_per_line` positions.
///
/// Deterministic and cheap, for headless hosts and tests. Counts its calls
/// so callers can observe measure reuse.
#[derive(Debug)]
pub struct FixedMetrics {
	pub chars_per_line: usize,
	pub line_height: f32,
	calls: AtomicUsize,
}

impl FixedMetrics {
	pub fn new(chars_per_line: usize, line_height: f32) -> Self {
		Self {
			chars_per_line: chars_per_line.max(1),
			line_height,
			calls: AtomicUsize::new(0),
		}
	}

	/// Number of blocks measured so far.
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::Relaxed)
	}

	fn lines(&self, len: usize) -> Vec<Segment> {
		let cpl = self.chars_per_line;
		let count = len.div_ceil(cpl).max(1);
		(0..count)
			.map(|i| Segment::new(self.line_height, PosRange::new(i * cpl, ((i + 1) * cpl).min(len))))
			.collect()
	}
}

impl Default for FixedMetrics {
	fn default() -> Self {
		Self::new(80, 20.0)
	}
}

impl Measurer for FixedMetrics {
	fn measure(&self, block: &FlowBlock, constraints: MeasureConstraints) -> Result<Measure, LayoutError> {
		self.calls.fetch_add(1, Ordering::Relaxed);
		let len = block.pm_range.len();

		let (segments, keep_together) = match &block.kind {
			BlockKind::Paragraph(_) => (self.lines(len), false),
			BlockKind::Table(table) => {
				let rows = table.rows.len().max(1);
				let per_row = len / rows;
				let segments = (0..rows)
					.map(|i| {
						let end = if i + 1 == rows { len } else { (i + 1) * per_row };
						Segment::new(self.line_height, PosRange::new(i * per_row, end))
					})
					.collect();
				(segments, false)
			}
			BlockKind::Image(image) => {
				if image.size.height < 0.0 {
					return Err(LayoutError::measure(block.id, "negative image height"));
				}
				let segment = Segment {
					height: image.size.height,
					range: PosRange::new(0, len),
					decorative: image.behind_doc,
				};
				(vec![segment], true)
			}
			BlockKind::SectionBreak(_) | BlockKind::PageBreak | BlockKind::ColumnBreak => (Vec::new(), false),
		};

		Ok(Measure {
			constraints,
			width: constraints.max_width,
			segments,
			keep_together,
		})
	}
}
