use std::ops::Range;

use folio_primitives::PosRange;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::regions::Regions;
use crate::block::{BlockKind, FlowBlock, FootnoteId, SectionBreak, SectionBreakKind};
use crate::error::LayoutError;
use crate::measure::{Measure, Segment};
use crate::model::{Fragment, FragmentKind, HeaderFooterVariant, LineBox, Page};
use crate::options::SectionGeometry;

/// Measured footnote bodies, addressable by id.
pub(super) struct Notes<'a> {
	entries: FxHashMap<FootnoteId, NoteEntry>,
	blocks: &'a [FlowBlock],
	measures: &'a [Measure],
	/// Space between the body and the first footnote on a page.
	gap: f32,
}

struct NoteEntry {
	height: f32,
	/// Indices into the pass's extra blocks.
	blocks: Range<usize>,
}

impl<'a> Notes<'a> {
	pub fn new(blocks: &'a [FlowBlock], measures: &'a [Measure], spans: impl IntoIterator<Item = (FootnoteId, Range<usize>)>, gap: f32) -> Self {
		let entries = spans
			.into_iter()
			.map(|(id, range)| {
				let height = measures[range.clone()].iter().map(Measure::total_height).sum();
				(id, NoteEntry { height, blocks: range })
			})
			.collect();
		Self {
			entries,
			blocks,
			measures,
			gap,
		}
	}

	pub fn empty() -> Self {
		Self {
			entries: FxHashMap::default(),
			blocks: &[],
			measures: &[],
			gap: 0.0,
		}
	}

	fn height(&self, id: FootnoteId) -> Option<f32> {
		self.entries.get(&id).map(|e| e.height)
	}
}

#[derive(Clone, Copy)]
enum Parity {
	Even,
	Odd,
}

impl Parity {
	fn matches(self, number: u32) -> bool {
		match self {
			Parity::Even => number % 2 == 0,
			Parity::Odd => number % 2 == 1,
		}
	}
}

/// Packs measured blocks into pages.
///
/// Pages are opened lazily: breaks only request a new page, and the page is
/// created when content (or a second consecutive break) needs it.
pub(super) struct Paginator<'a> {
	geom: SectionGeometry,
	regions: &'a Regions,
	notes: &'a Notes<'a>,
	pages: Vec<Page>,
	need_page: bool,
	section: usize,
	title_page: bool,
	section_first_pending: bool,
	required_parity: Option<Parity>,
	pending_restart: Option<u32>,
	next_number: u32,
	column: u16,
	cursor_y: f32,
	region_top: f32,
	content_bottom: f32,
	note_reserve: f32,
	page_notes: Vec<FootnoteId>,
	placed_notes: FxHashSet<FootnoteId>,
}

impl<'a> Paginator<'a> {
	pub fn new(geom: SectionGeometry, regions: &'a Regions, notes: &'a Notes<'a>) -> Self {
		Self {
			geom,
			regions,
			notes,
			pages: Vec::new(),
			need_page: true,
			section: 0,
			title_page: false,
			section_first_pending: true,
			required_parity: None,
			pending_restart: None,
			next_number: 1,
			column: 0,
			cursor_y: 0.0,
			region_top: 0.0,
			content_bottom: 0.0,
			note_reserve: 0.0,
			page_notes: Vec::new(),
			placed_notes: FxHashSet::default(),
		}
	}

	pub fn run(mut self, blocks: &[FlowBlock], measures: &[Measure]) -> Result<Vec<Page>, LayoutError> {
		for (index, (block, measure)) in blocks.iter().zip(measures).enumerate() {
			match &block.kind {
				BlockKind::SectionBreak(sb) => self.section_break(sb)?,
				BlockKind::PageBreak => {
					if self.need_page {
						self.start_page();
					}
					self.need_page = true;
				}
				BlockKind::ColumnBreak => {
					self.ensure_page();
					self.advance_column();
				}
				BlockKind::Paragraph(_) | BlockKind::Table(_) | BlockKind::Image(_) => self.place(index, block, measure),
			}
		}

		if self.pages.is_empty() {
			self.start_page();
		}
		self.finish_page();
		Ok(self.pages)
	}

	fn section_break(&mut self, sb: &SectionBreak) -> Result<(), LayoutError> {
		let next = self.geom.apply(sb);
		next.validate()?;
		self.section += 1;
		self.title_page = sb.title_page;
		if let Some(start) = sb.page_number_start {
			self.pending_restart = Some(start);
		}

		let same_page_size = next.page_size == self.geom.page_size;
		self.geom = next;

		if sb.kind == SectionBreakKind::Continuous && !self.need_page && same_page_size {
			// New column set starts below everything already on the page.
			self.region_top = self.content_bottom.max(self.cursor_y);
			self.cursor_y = self.region_top;
			self.column = 0;
			return Ok(());
		}

		self.section_first_pending = true;
		self.required_parity = match sb.kind {
			SectionBreakKind::EvenPage => Some(Parity::Even),
			SectionBreakKind::OddPage => Some(Parity::Odd),
			SectionBreakKind::NextPage | SectionBreakKind::Continuous => None,
		};
		self.need_page = true;
		Ok(())
	}

	fn ensure_page(&mut self) {
		if self.need_page || self.pages.is_empty() {
			self.start_page();
			self.need_page = false;
		}
	}

	fn start_page(&mut self) {
		self.finish_page();
		if let Some(parity) = self.required_parity.take() {
			let number = self.pending_restart.unwrap_or(self.next_number);
			if !parity.matches(number) {
				let blank = self.next_number;
				self.push_page(blank, false);
			}
		}
		let number = self.pending_restart.take().unwrap_or(self.next_number);
		let first = std::mem::take(&mut self.section_first_pending);
		self.push_page(number, first);
	}

	fn push_page(&mut self, number: u32, first_of_section: bool) {
		let requested = if first_of_section && self.title_page {
			HeaderFooterVariant::First
		} else if number % 2 == 0 {
			HeaderFooterVariant::Even
		} else {
			HeaderFooterVariant::Odd
		};
		let (variant, header, footer) = self.regions.resolve(requested);

		let g = &self.geom;
		let height = g.page_size.height;
		let header_h = header.map_or(0.0, |r| r.height);
		let footer_h = footer.map_or(0.0, |r| r.height);
		let body_top = g.margins.top.max(g.margins.header + header_h);
		let body_bottom = (height - g.margins.bottom).min(height - g.margins.footer - footer_h).max(body_top);

		self.pages.push(Page {
			index: self.pages.len(),
			number,
			size: g.page_size,
			margins: g.margins,
			section: self.section,
			variant,
			header: header.map(|r| r.id),
			footer: footer.map(|r| r.id),
			body_top,
			body_bottom,
			fragments: Vec::new(),
			footnotes: Vec::new(),
		});

		self.next_number = number + 1;
		self.column = 0;
		self.cursor_y = body_top;
		self.region_top = body_top;
		self.content_bottom = body_top;
		self.note_reserve = 0.0;
	}

	fn advance_column(&mut self) {
		if self.column + 1 < self.geom.column_count() {
			self.column += 1;
			self.cursor_y = self.region_top;
		} else {
			self.start_page();
		}
	}

	fn body_bottom(&self) -> f32 {
		self.pages.last().map_or(0.0, |p| p.body_bottom)
	}

	/// True until the current page holds a body fragment.
	fn page_is_empty(&self) -> bool {
		self.pages.last().is_none_or(|p| p.fragments.is_empty())
	}

	/// Whether a piece ending at `bottom` fits above `floor`. A piece that
	/// grows the footnote reservation also needs every column on the page to
	/// end above the new floor.
	fn fits(&self, bottom: f32, floor: f32, note_need: f32) -> bool {
		bottom <= floor && (note_need <= 0.0 || self.content_bottom <= floor)
	}

	/// Footnotes whose reference falls in each segment; references past the
	/// last segment attach to it.
	fn notes_per_segment(&self, block: &FlowBlock, segments: &[Segment]) -> Vec<SmallVec<[FootnoteId; 1]>> {
		let mut out = vec![SmallVec::new(); segments.len()];
		for r in block.footnote_refs() {
			if self.notes.height(r.id).is_none() {
				tracing::trace!(footnote = %r.id, block = %block.id, "footnote reference without body");
				continue;
			}
			let slot = segments.iter().position(|s| s.range.contains(r.offset)).unwrap_or(segments.len() - 1);
			out[slot].push(r.id);
		}
		out
	}

	/// Extra height needed to reserve `ids` on the current page, given what
	/// the piece being built has already reserved.
	fn note_need(&self, ids: &[FootnoteId], taken: &[FootnoteId]) -> f32 {
		let mut need = 0.0;
		let mut any = !self.page_notes.is_empty() || !taken.is_empty();
		for id in ids {
			if self.placed_notes.contains(id) || taken.contains(id) {
				continue;
			}
			if !any {
				need += self.notes.gap;
				any = true;
			}
			need += self.notes.height(*id).unwrap_or(0.0);
		}
		need
	}

	fn place(&mut self, index: usize, block: &FlowBlock, measure: &Measure) {
		let segments = &measure.segments;
		if segments.is_empty() {
			return;
		}
		let seg_notes = self.notes_per_segment(block, segments);
		let mut next = 0;

		while next < segments.len() {
			self.ensure_page();
			let limit = self.body_bottom();
			let mut used = 0.0f32;
			let mut reserve = 0.0f32;
			let mut taken_notes: SmallVec<[FootnoteId; 2]> = SmallVec::new();
			let mut take = 0;

			if measure.keep_together {
				let ids: SmallVec<[FootnoteId; 2]> = seg_notes[next..].iter().flatten().copied().collect();
				let need = self.note_need(&ids, &[]);
				let total: f32 = segments[next..].iter().map(|s| s.height).sum();
				let fits = self.fits(self.cursor_y + total, limit - self.note_reserve - need, need);
				if !fits && !self.page_is_empty() {
					self.advance_column();
					continue;
				}
				used = total;
				reserve = need;
				take = segments.len() - next;
				taken_notes = ids;
			} else {
				while next + take < segments.len() {
					let i = next + take;
					let need = self.note_need(&seg_notes[i], &taken_notes);
					let fits = self.fits(self.cursor_y + used + segments[i].height, limit - self.note_reserve - reserve - need, need);
					if !fits && (take > 0 || !self.page_is_empty()) {
						break;
					}
					// An empty page always accepts one segment, even oversized.
					used += segments[i].height;
					reserve += need;
					taken_notes.extend(seg_notes[i].iter().copied().filter(|id| !self.placed_notes.contains(id)));
					take += 1;
					if !fits {
						break;
					}
				}
				if take == 0 {
					self.advance_column();
					continue;
				}
			}

			self.emit(index, block, &segments[next..next + take], next > 0, next + take < segments.len());
			self.cursor_y += used;
			self.content_bottom = self.content_bottom.max(self.cursor_y);
			self.note_reserve += reserve;
			for id in taken_notes {
				if self.placed_notes.insert(id) {
					self.page_notes.push(id);
				}
			}

			next += take;
			if next < segments.len() {
				self.advance_column();
			}
		}
	}

	fn emit(&mut self, index: usize, block: &FlowBlock, segments: &[Segment], from_prev: bool, on_next: bool) {
		let base = block.pm_range.start;
		let mut lines = Vec::with_capacity(segments.len());
		let mut y = 0.0f32;
		for seg in segments {
			lines.push(LineBox {
				y,
				height: seg.height,
				pm_range: seg.range.offset(base),
			});
			y += seg.height;
		}
		let pm_range = piece_range(&lines).unwrap_or(block.pm_range);

		let fragment = Fragment {
			block_id: block.id,
			block_index: index,
			kind: FragmentKind::Body,
			column: self.column,
			x: self.geom.column_x(self.column),
			y: self.cursor_y,
			width: self.geom.column_width(),
			height: y,
			pm_range,
			lines,
			continues_from_prev: from_prev,
			continues_on_next: on_next,
		};
		if let Some(page) = self.pages.last_mut() {
			page.fragments.push(fragment);
		}
	}

	/// Places the current page's footnote bodies at the bottom of its body band.
	fn finish_page(&mut self) {
		if self.page_notes.is_empty() {
			return;
		}
		let notes = std::mem::take(&mut self.page_notes);
		let Some(page) = self.pages.last_mut() else {
			return;
		};

		let x = page.margins.left;
		let width = page.size.width - page.margins.left - page.margins.right;
		let mut y = page.body_bottom - self.note_reserve + self.notes.gap;

		for id in notes {
			let Some(entry) = self.notes.entries.get(&id) else {
				continue;
			};
			for extra in entry.blocks.clone() {
				let block = &self.notes.blocks[extra];
				let measure = &self.notes.measures[extra];
				if measure.segments.is_empty() {
					continue;
				}
				let mut lines = Vec::with_capacity(measure.segments.len());
				let mut dy = 0.0f32;
				for seg in &measure.segments {
					lines.push(LineBox {
						y: dy,
						height: seg.height,
						pm_range: seg.range.offset(block.pm_range.start),
					});
					dy += seg.height;
				}
				page.footnotes.push(Fragment {
					block_id: block.id,
					block_index: extra,
					kind: FragmentKind::Footnote,
					column: 0,
					x,
					y,
					width,
					height: dy,
					pm_range: block.pm_range,
					lines,
					continues_from_prev: false,
					continues_on_next: false,
				});
				y += dy;
			}
		}
		self.note_reserve = 0.0;
	}
}

fn piece_range(lines: &[LineBox]) -> Option<PosRange> {
	let start = lines.iter().map(|l| l.pm_range.start).min()?;
	let end = lines.iter().map(|l| l.pm_range.end).max()?;
	Some(PosRange::new(start, end))
}
