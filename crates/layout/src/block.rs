use std::fmt;
use std::hash::{Hash, Hasher};

use folio_primitives::{Pos, PosRange, Size};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::options::{Columns, Margins};

/// Stable identity of a flow block across conversion passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "b{}", self.0)
	}
}

/// Identity of a footnote body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FootnoteId(pub u32);

impl fmt::Display for FootnoteId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "fn{}", self.0)
	}
}

/// A position-tagged unit of paginatable content.
///
/// Blocks are immutable for the duration of a pass. Identity (`id`) and
/// position (`pm_range`) may shift between passes; the content
/// [`signature`](Self::signature) decides whether a prior measure still applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBlock {
	pub id: BlockId,
	/// Document positions covered by the block.
	pub pm_range: PosRange,
	pub kind: BlockKind,
}

impl FlowBlock {
	pub fn new(id: BlockId, pm_range: PosRange, kind: BlockKind) -> Self {
		Self { id, pm_range, kind }
	}

	/// Shorthand for a paragraph block without footnote references.
	pub fn paragraph(id: u64, pm_range: PosRange, text: impl Into<String>) -> Self {
		Self::new(
			BlockId(id),
			pm_range,
			BlockKind::Paragraph(Paragraph {
				text: text.into(),
				footnote_refs: SmallVec::new(),
			}),
		)
	}

	/// Hash of everything that influences measurement.
	///
	/// Neither the id nor the absolute position participate: a paragraph that
	/// only moved because text was inserted above it keeps its signature.
	pub fn signature(&self) -> u64 {
		let mut h = FxHasher::default();
		self.kind.hash_content(&mut h);
		self.pm_range.len().hash(&mut h);
		h.finish()
	}

	/// Returns true for blocks that produce fragments.
	pub fn is_content(&self) -> bool {
		matches!(self.kind, BlockKind::Paragraph(_) | BlockKind::Table(_) | BlockKind::Image(_))
	}

	/// Footnotes referenced from this block, if it is a paragraph.
	pub fn footnote_refs(&self) -> &[FootnoteRef] {
		match &self.kind {
			BlockKind::Paragraph(p) => &p.footnote_refs,
			_ => &[],
		}
	}
}

/// Block payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
	Paragraph(Paragraph),
	Table(Table),
	Image(Image),
	/// Starts a new section; its properties apply to the blocks that follow.
	SectionBreak(SectionBreak),
	PageBreak,
	ColumnBreak,
}

impl BlockKind {
	fn hash_content(&self, h: &mut FxHasher) {
		std::mem::discriminant(self).hash(h);
		match self {
			BlockKind::Paragraph(p) => {
				p.text.hash(h);
				for r in &p.footnote_refs {
					r.hash(h);
				}
			}
			BlockKind::Table(t) => {
				for row in &t.rows {
					row.cant_split.hash(h);
					row.cells.len().hash(h);
					for cell in &row.cells {
						cell.text.hash(h);
					}
				}
			}
			BlockKind::Image(img) => {
				img.size.width.to_bits().hash(h);
				img.size.height.to_bits().hash(h);
				img.behind_doc.hash(h);
			}
			BlockKind::SectionBreak(sb) => sb.hash_content(h),
			BlockKind::PageBreak | BlockKind::ColumnBreak => {}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
	pub text: String,
	#[serde(default)]
	pub footnote_refs: SmallVec<[FootnoteRef; 1]>,
}

/// A footnote reference mark inside a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FootnoteRef {
	pub id: FootnoteId,
	/// Offset of the reference mark from the start of the block.
	pub offset: Pos,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
	pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
	pub cells: SmallVec<[TableCell; 4]>,
	/// Row must not break across pages.
	#[serde(default)]
	pub cant_split: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
	pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Image {
	pub size: Size,
	/// Anchored behind the text; decorative for height accounting.
	#[serde(default)]
	pub behind_doc: bool,
}

/// How a new section starts relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionBreakKind {
	#[default]
	NextPage,
	Continuous,
	EvenPage,
	OddPage,
}

/// Section properties applied from the break onward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionBreak {
	#[serde(default)]
	pub kind: SectionBreakKind,
	#[serde(default)]
	pub page_size: Option<Size>,
	#[serde(default)]
	pub margins: Option<Margins>,
	#[serde(default)]
	pub columns: Option<Columns>,
	/// First page of the section uses the `First` header/footer.
	#[serde(default)]
	pub title_page: bool,
	/// Restart page numbering at this value.
	#[serde(default)]
	pub page_number_start: Option<u32>,
}

impl SectionBreak {
	fn hash_content(&self, h: &mut FxHasher) {
		self.kind.hash(h);
		if let Some(size) = self.page_size {
			size.width.to_bits().hash(h);
			size.height.to_bits().hash(h);
		}
		if let Some(m) = self.margins {
			for v in [m.top, m.right, m.bottom, m.left, m.header, m.footer] {
				v.to_bits().hash(h);
			}
		}
		if let Some(c) = self.columns {
			c.count.hash(h);
			c.gap.to_bits().hash(h);
		}
		self.title_page.hash(h);
		self.page_number_start.hash(h);
	}
}
