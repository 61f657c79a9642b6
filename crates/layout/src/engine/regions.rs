//! Header and footer sub-layouts.
//!
//! Regions are laid out once per pass against the band width of the base
//! page geometry, then attached to pages by variant. Their heights feed
//! back into each page's body band.

use folio_primitives::{Point, PosRange};

use super::LayoutStats;
use super::reuse::MeasureCache;
use crate::block::FlowBlock;
use crate::error::LayoutError;
use crate::measure::{Measure, MeasureConstraints, Measurer};
use crate::model::{Fragment, FragmentKind, HeaderFooterVariant, LineBox, Page, RegionId, RegionKind};
use crate::options::SectionGeometry;

/// Header/footer content handed to a layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderFooterInput {
	pub regions: Vec<RegionContent>,
	/// Decorative content extending past this height is left out of the
	/// band height.
	pub overflow_base_height: f32,
}

/// Blocks of one header or footer part.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionContent {
	pub id: RegionId,
	pub kind: RegionKind,
	pub variant: HeaderFooterVariant,
	pub blocks: Vec<FlowBlock>,
}

/// A laid-out header or footer.
///
/// Fragment coordinates are relative to the band's top-left corner; use
/// [`RegionLayout::origin_on`] to place the band on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLayout {
	pub id: RegionId,
	pub kind: RegionKind,
	pub variant: HeaderFooterVariant,
	pub width: f32,
	/// Height that counts against the page body.
	pub height: f32,
	pub blocks: Vec<FlowBlock>,
	pub measures: Vec<Measure>,
	pub fragments: Vec<Fragment>,
}

impl RegionLayout {
	/// Top-left corner of the band on `page`.
	pub fn origin_on(&self, page: &Page) -> Point {
		match self.kind {
			RegionKind::Header => Point::new(page.margins.left, page.margins.header),
			RegionKind::Footer => Point::new(page.margins.left, page.size.height - page.margins.footer - self.height),
		}
	}

	/// Positions covered by the region's own content.
	pub fn pm_range(&self) -> Option<PosRange> {
		let start = self.blocks.iter().map(|b| b.pm_range.start).min()?;
		let end = self.blocks.iter().map(|b| b.pm_range.end).max()?;
		Some(PosRange::new(start, end))
	}
}

/// All regions of a pass, resolved per page variant.
#[derive(Debug, Default)]
pub(super) struct Regions {
	pub headers: Vec<RegionLayout>,
	pub footers: Vec<RegionLayout>,
}

impl Regions {
	pub fn layout<M: Measurer + ?Sized>(
		input: Option<&HeaderFooterInput>,
		geom: &SectionGeometry,
		cache: &mut MeasureCache,
		measurer: &M,
		stats: &mut LayoutStats,
	) -> Result<Self, LayoutError> {
		let mut regions = Self::default();
		let Some(input) = input else {
			return Ok(regions);
		};

		for content in &input.regions {
			let laid_out = layout_region(content, geom, input.overflow_base_height, cache, measurer, stats)?;
			match content.kind {
				RegionKind::Header => regions.headers.push(laid_out),
				RegionKind::Footer => regions.footers.push(laid_out),
			}
		}
		Ok(regions)
	}

	fn find(&self, kind: RegionKind, variant: HeaderFooterVariant) -> Option<&RegionLayout> {
		let list = match kind {
			RegionKind::Header => &self.headers,
			RegionKind::Footer => &self.footers,
		};
		list.iter().find(|r| r.variant == variant)
	}

	/// Picks the header and footer for a page, falling back to the default
	/// variant when the requested one has no content.
	pub fn resolve(&self, requested: HeaderFooterVariant) -> (HeaderFooterVariant, Option<&RegionLayout>, Option<&RegionLayout>) {
		let header = self.find(RegionKind::Header, requested);
		let footer = self.find(RegionKind::Footer, requested);
		if header.is_some() || footer.is_some() {
			let header = header.or_else(|| self.find(RegionKind::Header, HeaderFooterVariant::Default));
			let footer = footer.or_else(|| self.find(RegionKind::Footer, HeaderFooterVariant::Default));
			return (requested, header, footer);
		}
		let default = HeaderFooterVariant::Default;
		(default, self.find(RegionKind::Header, default), self.find(RegionKind::Footer, default))
	}
}

/// Stacks a region's blocks top to bottom without splitting.
///
/// Decorative segments are placed at the cursor but do not advance it, and
/// they only count toward the band height while their bottom edge stays
/// within `overflow_base_height`.
pub(super) fn layout_region<M: Measurer + ?Sized>(
	content: &RegionContent,
	geom: &SectionGeometry,
	overflow_base_height: f32,
	cache: &mut MeasureCache,
	measurer: &M,
	stats: &mut LayoutStats,
) -> Result<RegionLayout, LayoutError> {
	let width = geom.content_width();
	let constraints = MeasureConstraints::new(width, geom.body_height());
	let mut measures = Vec::with_capacity(content.blocks.len());
	let mut fragments = Vec::new();
	let mut cursor = 0.0f32;
	let mut decorative_extent = 0.0f32;

	for (index, block) in content.blocks.iter().enumerate() {
		let measure = cache.get_or_measure(block, constraints, measurer, stats)?;
		if !measure.segments.is_empty() {
			let top = cursor;
			let mut lines = Vec::with_capacity(measure.segments.len());
			let mut y = 0.0f32;
			let mut extent = 0.0f32;
			for seg in &measure.segments {
				lines.push(LineBox {
					y,
					height: seg.height,
					pm_range: seg.range.offset(block.pm_range.start),
				});
				if seg.decorative {
					let bottom = top + y + seg.height;
					if bottom <= overflow_base_height {
						decorative_extent = decorative_extent.max(bottom);
					} else {
						tracing::debug!(region = %content.id, block = %block.id, bottom, "decorative content exceeds overflow base height");
					}
					extent = extent.max(y + seg.height);
				} else {
					y += seg.height;
					extent = extent.max(y);
				}
			}
			cursor += y;
			fragments.push(Fragment {
				block_id: block.id,
				block_index: index,
				kind: FragmentKind::Region,
				column: 0,
				x: 0.0,
				y: top,
				width,
				height: extent,
				pm_range: block.pm_range,
				lines,
				continues_from_prev: false,
				continues_on_next: false,
			});
		}
		measures.push(measure);
	}

	Ok(RegionLayout {
		id: content.id,
		kind: content.kind,
		variant: content.variant,
		width,
		height: cursor.max(decorative_extent),
		blocks: content.blocks.clone(),
		measures,
		fragments,
	})
}
