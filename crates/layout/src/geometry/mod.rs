//! Analytic geometry computed from fragment line boxes.
//!
//! Within a line, positions are interpolated linearly across the fragment
//! width. This is the fallback used when a page is not mounted and painted
//! geometry is unavailable.


use folio_primitives::{Point, Pos, PosRange, Rect};

use crate::engine::RegionLayout;
use crate::model::{Fragment, Layout, LineBox, Page};

/// A point on a specific page, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocPoint {
	pub page: usize,
	pub point: Point,
}

impl DocPoint {
	pub fn new(page: usize, x: f32, y: f32) -> Self {
		Self {
			page,
			point: Point::new(x, y),
		}
	}
}

/// A rectangle on a specific page, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
	pub page: usize,
	pub rect: Rect,
}

impl Layout {
	/// Finds the fragment displaying `pos`, body first, then footnotes.
	///
	/// A position at the very end of a block belongs to that block when no
	/// other fragment covers it.
	pub fn fragment_for_pos(&self, pos: Pos) -> Option<(&Page, &Fragment)> {
		let all = || self.pages.iter().flat_map(|p| p.fragments.iter().chain(&p.footnotes).map(move |f| (p, f)));
		all()
			.find(|(_, f)| f.lines.iter().any(|l| l.pm_range.contains(pos)))
			.or_else(|| all().find(|(_, f)| f.pm_range.contains_inclusive(pos)))
	}

	/// Index of the page displaying `pos`.
	pub fn page_for_pos(&self, pos: Pos) -> Option<usize> {
		self.fragment_for_pos(pos).map(|(p, _)| p.index)
	}

	/// Like [`page_for_pos`](Self::page_for_pos), but positions between
	/// fragments (break blocks, unpainted nodes) resolve to the page of the
	/// closest preceding content. Only an empty layout yields `None`.
	pub fn nearest_page_for_pos(&self, pos: Pos) -> Option<usize> {
		if let Some(page) = self.page_for_pos(pos) {
			return Some(page);
		}
		let preceding = self
			.pages
			.iter()
			.filter(|p| p.pm_range().is_some_and(|r| r.start <= pos))
			.map(|p| p.index)
			.last();
		preceding.or_else(|| self.pages.first().map(|p| p.index))
	}

	/// Zero-width caret rectangle at `pos`.
	pub fn caret_rect(&self, pos: Pos) -> Option<PageRect> {
		let (page, fragment) = self.fragment_for_pos(pos)?;
		Some(PageRect {
			page: page.index,
			rect: caret_in_fragment(fragment, pos)?,
		})
	}

	/// One rectangle per line box overlapping `range`.
	pub fn selection_rects(&self, range: PosRange) -> Vec<PageRect> {
		let mut out = Vec::new();
		if range.is_empty() {
			return out;
		}
		for page in &self.pages {
			for fragment in page.fragments.iter().chain(&page.footnotes) {
				if !fragment.pm_range.overlaps(&range) {
					continue;
				}
				out.extend(rects_in_fragment(fragment, range).map(|rect| PageRect { page: page.index, rect }));
			}
		}
		out
	}

	/// Resolves a page-local point to the closest document position.
	pub fn hit_test(&self, at: DocPoint) -> Option<Pos> {
		let page = self.pages.get(at.page)?;
		hit_fragments(page.fragments.iter().chain(&page.footnotes), at.point)
	}

	/// Converts a point on the scroll surface into a page-local point.
	pub fn doc_point_at(&self, surface: Point) -> Option<DocPoint> {
		(0..self.pages.len()).find_map(|index| {
			let rect = self.page_rect(index)?;
			rect.contains(surface).then(|| DocPoint::new(index, surface.x - rect.x, surface.y - rect.y))
		})
	}
}

impl RegionLayout {
	/// Caret rectangle in page coordinates for a band shown on `page`.
	pub fn caret_rect(&self, page: &Page, pos: Pos) -> Option<Rect> {
		let origin = self.origin_on(page);
		let fragment = self
			.fragments
			.iter()
			.find(|f| f.lines.iter().any(|l| l.pm_range.contains(pos)))
			.or_else(|| self.fragments.iter().find(|f| f.pm_range.contains_inclusive(pos)))?;
		Some(caret_in_fragment(fragment, pos)?.translate(origin.x, origin.y))
	}

	/// Selection rectangles in page coordinates for a band shown on `page`.
	pub fn selection_rects(&self, page: &Page, range: PosRange) -> Vec<Rect> {
		if range.is_empty() {
			return Vec::new();
		}
		let origin = self.origin_on(page);
		self.fragments
			.iter()
			.filter(|f| f.pm_range.overlaps(&range))
			.flat_map(|f| rects_in_fragment(f, range))
			.map(|r| r.translate(origin.x, origin.y))
			.collect()
	}

	/// Resolves a page-local point inside the band to a region position.
	///
	/// Points outside the band's bounds resolve to `None`.
	pub fn hit_test(&self, page: &Page, point: Point) -> Option<Pos> {
		let origin = self.origin_on(page);
		let local = Point::new(point.x - origin.x, point.y - origin.y);
		if !self.bounds().contains(local) {
			return None;
		}
		hit_fragments(self.fragments.iter(), local)
	}

	/// Band bounds relative to its origin, including decorative overflow.
	pub fn bounds(&self) -> Rect {
		let extent = self.fragments.iter().map(|f| f.y + f.height).fold(self.height, f32::max);
		Rect::new(0.0, 0.0, self.width, extent)
	}
}

fn line_for_pos(fragment: &Fragment, pos: Pos) -> Option<&LineBox> {
	fragment
		.lines
		.iter()
		.find(|l| l.pm_range.contains(pos))
		.or_else(|| fragment.lines.iter().rev().find(|l| l.pm_range.contains_inclusive(pos)))
}

fn x_at(fragment: &Fragment, line: &LineBox, pos: Pos) -> f32 {
	let len = line.pm_range.len();
	if len == 0 {
		return fragment.x;
	}
	let offset = pos.clamp(line.pm_range.start, line.pm_range.end) - line.pm_range.start;
	fragment.x + fragment.width * (offset as f32 / len as f32)
}

fn caret_in_fragment(fragment: &Fragment, pos: Pos) -> Option<Rect> {
	let line = line_for_pos(fragment, pos)?;
	Some(Rect::new(x_at(fragment, line, pos), fragment.y + line.y, 0.0, line.height))
}

fn rects_in_fragment(fragment: &Fragment, range: PosRange) -> impl Iterator<Item = Rect> + '_ {
	fragment.lines.iter().filter_map(move |line| {
		let covered = line.pm_range.intersect(&range).filter(|r| !r.is_empty())?;
		let x0 = x_at(fragment, line, covered.start);
		let x1 = x_at(fragment, line, covered.end);
		Some(Rect::new(x0, fragment.y + line.y, x1 - x0, line.height))
	})
}

fn vertical_distance(fragment: &Fragment, point: Point) -> f32 {
	let r = fragment.rect();
	if point.y < r.top() {
		r.top() - point.y
	} else if point.y >= r.bottom() {
		point.y - r.bottom()
	} else {
		0.0
	}
}

fn hit_fragments<'a>(fragments: impl Iterator<Item = &'a Fragment> + Clone, point: Point) -> Option<Pos> {
	let closer = |a: &&'a Fragment, b: &&'a Fragment| vertical_distance(a, point).total_cmp(&vertical_distance(b, point));
	let fragment = fragments
		.clone()
		.find(|f| f.rect().contains(point))
		.or_else(|| fragments.clone().filter(|f| point.x >= f.x && point.x < f.x + f.width).min_by(closer))
		.or_else(|| fragments.clone().min_by(closer))?;

	let local_y = point.y - fragment.y;
	let line = fragment
		.lines
		.iter()
		.find(|l| local_y >= l.y && local_y < l.y + l.height)
		.or_else(|| if local_y < 0.0 { fragment.lines.first() } else { fragment.lines.last() })?;

	let len = line.pm_range.len();
	if len == 0 || fragment.width <= 0.0 {
		return Some(line.pm_range.start);
	}
	let frac = ((point.x - fragment.x) / fragment.width).clamp(0.0, 1.0);
	let offset = (frac * len as f32).round() as usize;
	Some(line.pm_range.start + offset.min(len))
}
