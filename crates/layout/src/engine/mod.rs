//! Incremental layout: measure what changed, then paginate everything.
//!
//! Measurement is the expensive half of a pass, so every block whose content
//! signature and constraints match the previous pass keeps its measure.
//! Pagination is cheap and always reruns over the full block list, which
//! keeps breaks, sections and footnote reservations globally consistent.

mod paginate;
mod regions;
mod reuse;

use std::collections::BTreeMap;

use paginate::{Notes, Paginator};
pub use regions::{HeaderFooterInput, RegionContent, RegionLayout};
use regions::Regions;
use reuse::{MeasureCache, PrevMeasures};

use crate::block::{FlowBlock, FootnoteId};
use crate::error::LayoutError;
use crate::measure::{Measure, MeasureConstraints, Measurer};
use crate::model::{Layout, Page};
use crate::options::{LayoutOptions, SectionGeometry};

/// Footnote bodies referenced from paragraph blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FootnoteInput {
	pub notes: BTreeMap<FootnoteId, Vec<FlowBlock>>,
	/// Space between body text and the first footnote on a page.
	pub separator_gap: f32,
}

/// Everything one layout pass reads. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
	pub prev_blocks: &'a [FlowBlock],
	pub prev_layout: Option<&'a Layout>,
	pub new_blocks: &'a [FlowBlock],
	pub options: &'a LayoutOptions,
	pub header_footer: Option<&'a HeaderFooterInput>,
	pub footnotes: Option<&'a FootnoteInput>,
	/// Measures of `prev_blocks`, index-aligned.
	pub prev_measures: Option<&'a [Measure]>,
}

impl<'a> LayoutInput<'a> {
	/// A first pass with nothing to reuse.
	pub fn new(new_blocks: &'a [FlowBlock], options: &'a LayoutOptions) -> Self {
		Self {
			prev_blocks: &[],
			prev_layout: None,
			new_blocks,
			options,
			header_footer: None,
			footnotes: None,
			prev_measures: None,
		}
	}

	/// Supplies the previous pass so unchanged blocks keep their measures.
	pub fn with_previous(mut self, blocks: &'a [FlowBlock], layout: Option<&'a Layout>, measures: &'a [Measure]) -> Self {
		self.prev_blocks = blocks;
		self.prev_layout = layout;
		self.prev_measures = Some(measures);
		self
	}

	pub fn with_header_footer(mut self, input: &'a HeaderFooterInput) -> Self {
		self.header_footer = Some(input);
		self
	}

	pub fn with_footnotes(mut self, input: &'a FootnoteInput) -> Self {
		self.footnotes = Some(input);
		self
	}
}

/// Measurement counters for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutStats {
	/// Measures carried over without calling the measurer.
	pub reused: usize,
	/// Calls made to the measurer.
	pub measured: usize,
}

/// Output of a successful pass.
#[derive(Debug, Clone)]
pub struct LayoutResult {
	pub layout: Layout,
	/// Index-aligned with the pass's `new_blocks`.
	pub measures: Vec<Measure>,
	/// Footnote blocks in note order; footnote fragments index into these.
	pub extra_blocks: Vec<FlowBlock>,
	pub extra_measures: Vec<Measure>,
	pub headers: Vec<RegionLayout>,
	pub footers: Vec<RegionLayout>,
	pub stats: LayoutStats,
	/// First page that differs from the previous layout, if any.
	pub first_dirty_page: Option<usize>,
}

/// Converts blocks into a paginated [`Layout`], reusing prior measures.
///
/// The engine only keeps a cache for header/footer and footnote blocks,
/// whose prior measures are not passed in by callers.
#[derive(Default)]
pub struct IncrementalLayoutEngine {
	aux: MeasureCache,
	passes: u64,
}

impl IncrementalLayoutEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of completed passes.
	pub fn passes(&self) -> u64 {
		self.passes
	}

	/// Runs one pass.
	///
	/// Fails without side effects on the inputs; a failed pass yields no layout.
	pub fn layout<M: Measurer + ?Sized>(&mut self, input: LayoutInput<'_>, measurer: &M) -> Result<LayoutResult, LayoutError> {
		input.options.validate()?;
		let base = SectionGeometry::from_options(input.options);
		let mut stats = LayoutStats::default();

		let prev = PrevMeasures::new(input.prev_blocks, input.prev_measures);
		let measures = reuse::measure_body(input.new_blocks, input.options, &prev, measurer, &mut stats)?;

		self.aux.begin_pass();
		let regions = Regions::layout(input.header_footer, &base, &mut self.aux, measurer, &mut stats)?;
		let (extra_blocks, extra_measures, spans) = self.measure_notes(input.footnotes, &base, measurer, &mut stats)?;
		self.aux.finish_pass();

		let notes = match input.footnotes {
			Some(f) => Notes::new(&extra_blocks, &extra_measures, spans, f.separator_gap),
			None => Notes::empty(),
		};
		let pages = Paginator::new(base, &regions, &notes).run(input.new_blocks, &measures)?;

		let first_dirty_page = first_dirty_page(input.prev_layout.map(|l| l.pages.as_slice()), &pages);
		let layout = Layout {
			pages,
			page_gap: input.options.page_gap,
			mode: input.options.mode,
			layout_epoch: input.options.epoch,
			render_generation: input.options.render_generation,
		};
		self.passes += 1;

		tracing::debug!(
			epoch = %layout.layout_epoch,
			pages = layout.page_count(),
			reused = stats.reused,
			measured = stats.measured,
			first_dirty_page = ?first_dirty_page,
			"layout pass complete"
		);

		let Regions { headers, footers } = regions;
		Ok(LayoutResult {
			layout,
			measures,
			extra_blocks,
			extra_measures,
			headers,
			footers,
			stats,
			first_dirty_page,
		})
	}

	/// Lays out a single header or footer against the base page geometry.
	///
	/// Used when a region becomes the active editing surface. Shares the
	/// auxiliary measure cache with full passes.
	pub fn layout_region<M: Measurer + ?Sized>(
		&mut self,
		content: &RegionContent,
		options: &LayoutOptions,
		overflow_base_height: f32,
		measurer: &M,
	) -> Result<RegionLayout, LayoutError> {
		options.validate()?;
		let base = SectionGeometry::from_options(options);
		let mut stats = LayoutStats::default();
		let region = regions::layout_region(content, &base, overflow_base_height, &mut self.aux, measurer, &mut stats)?;
		tracing::trace!(region = %content.id, reused = stats.reused, measured = stats.measured, height = region.height, "region pass complete");
		Ok(region)
	}

	#[allow(clippy::type_complexity)]
	fn measure_notes<M: Measurer + ?Sized>(
		&mut self,
		input: Option<&FootnoteInput>,
		base: &SectionGeometry,
		measurer: &M,
		stats: &mut LayoutStats,
	) -> Result<(Vec<FlowBlock>, Vec<Measure>, Vec<(FootnoteId, std::ops::Range<usize>)>), LayoutError> {
		let mut blocks = Vec::new();
		let mut measures = Vec::new();
		let mut spans = Vec::new();
		let Some(input) = input else {
			return Ok((blocks, measures, spans));
		};

		let constraints = MeasureConstraints::new(base.content_width(), base.body_height());
		for (id, note) in &input.notes {
			let start = blocks.len();
			for block in note {
				measures.push(self.aux.get_or_measure(block, constraints, measurer, stats)?);
				blocks.push(block.clone());
			}
			spans.push((*id, start..blocks.len()));
		}
		Ok((blocks, measures, spans))
	}
}

fn first_dirty_page(prev: Option<&[Page]>, next: &[Page]) -> Option<usize> {
	let Some(prev) = prev else {
		return (!next.is_empty()).then_some(0);
	};
	match prev.iter().zip(next).position(|(a, b)| a != b) {
		Some(i) => Some(i),
		None if prev.len() != next.len() => Some(prev.len().min(next.len())),
		None => None,
	}
}
