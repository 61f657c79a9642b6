use std::fmt;

use folio_primitives::{Epoch, Point, PosRange, Rect, RenderGeneration, Size};
use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::options::{LayoutMode, Margins};

/// Which header/footer a page displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFooterVariant {
	#[default]
	Default,
	/// First page of a section with a distinct title page.
	First,
	Even,
	Odd,
}

/// Header or footer band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
	Header,
	Footer,
}

/// Identity of one header or footer content part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "r{}", self.0)
	}
}

/// Where a fragment lives on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
	Body,
	Footnote,
	/// Header/footer content; coordinates are relative to the band origin.
	Region,
}

/// One placed segment inside a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBox {
	/// Offset from the fragment's top edge.
	pub y: f32,
	pub height: f32,
	/// Absolute document positions.
	pub pm_range: PosRange,
}

/// A placed, possibly split piece of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
	pub block_id: BlockId,
	/// Index of the source block in the pass's block list.
	pub block_index: usize,
	pub kind: FragmentKind,
	pub column: u16,
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
	pub pm_range: PosRange,
	pub lines: Vec<LineBox>,
	/// Earlier segments of the block sit on a previous column or page.
	pub continues_from_prev: bool,
	/// Later segments of the block sit on a following column or page.
	pub continues_on_next: bool,
}

impl Fragment {
	/// Bounding box in page coordinates.
	pub fn rect(&self) -> Rect {
		Rect::new(self.x, self.y, self.width, self.height)
	}
}

/// One page of a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
	pub index: usize,
	/// Displayed page number.
	pub number: u32,
	pub size: Size,
	pub margins: Margins,
	/// Index of the section the page starts in.
	pub section: usize,
	pub variant: HeaderFooterVariant,
	pub header: Option<RegionId>,
	pub footer: Option<RegionId>,
	/// Body band after header/footer heights were accounted for.
	pub body_top: f32,
	pub body_bottom: f32,
	pub fragments: Vec<Fragment>,
	/// Footnote bodies placed at the bottom of the body band.
	pub footnotes: Vec<Fragment>,
}

impl Page {
	/// Document positions covered by body content on this page.
	pub fn pm_range(&self) -> Option<PosRange> {
		let start = self.fragments.iter().map(|f| f.pm_range.start).min()?;
		let end = self.fragments.iter().map(|f| f.pm_range.end).max()?;
		Some(PosRange::new(start, end))
	}

	/// Pages inserted to satisfy even/odd section starts carry no content.
	pub fn is_blank(&self) -> bool {
		self.fragments.is_empty() && self.footnotes.is_empty()
	}
}

/// The paginated result of one layout pass.
///
/// Replaced wholesale on every successful pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
	pub pages: Vec<Page>,
	pub page_gap: f32,
	pub mode: LayoutMode,
	/// Document epoch the layout reflects.
	pub layout_epoch: Epoch,
	pub render_generation: RenderGeneration,
}

impl Layout {
	pub fn page_count(&self) -> usize {
		self.pages.len()
	}

	pub fn page(&self, index: usize) -> Option<&Page> {
		self.pages.get(index)
	}

	/// Top-left corner of a page on the scroll surface.
	pub fn page_origin(&self, index: usize) -> Option<Point> {
		self.pages.get(index)?;
		let gap = self.page_gap;
		let origin = match self.mode {
			LayoutMode::Vertical => Point::new(0.0, self.pages[..index].iter().map(|p| p.size.height + gap).sum()),
			LayoutMode::Horizontal => Point::new(self.pages[..index].iter().map(|p| p.size.width + gap).sum(), 0.0),
			LayoutMode::Book => {
				let spread = index / 2;
				let y: f32 = self.pages[..spread * 2]
					.chunks(2)
					.map(|pair| pair.iter().map(|p| p.size.height).fold(0.0, f32::max) + gap)
					.sum();
				let x = if index % 2 == 1 { self.pages[index - 1].size.width + gap } else { 0.0 };
				Point::new(x, y)
			}
		};
		Some(origin)
	}

	/// Bounds of a page on the scroll surface.
	pub fn page_rect(&self, index: usize) -> Option<Rect> {
		let origin = self.page_origin(index)?;
		Some(Rect::from_origin_size(origin, self.pages[index].size))
	}
}
