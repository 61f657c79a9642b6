//! Page pinning for windowed rendering.
//!
//! Only pages near the viewport are mounted. Pins name pages that must be
//! mounted anyway: the pages holding the selection ends, pages under an
//! active drag, and any caller-supplied pages. Pins are recomputed on demand
//! and never stored.

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use folio_primitives::{PosLen, Selection};

use crate::model::Layout;
use crate::options::LayoutMode;

/// When windowed rendering applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtualizationPolicy {
	pub enabled: bool,
	pub mode: LayoutMode,
}

impl VirtualizationPolicy {
	/// Pins matter only for virtualized vertical layouts.
	pub fn is_active(&self) -> bool {
		self.enabled && self.mode == LayoutMode::Vertical
	}
}

/// Inputs to [`compute_pins`].
#[derive(Debug, Clone, Copy)]
pub struct PinInput<'a> {
	pub layout: &'a Layout,
	pub selection: Option<Selection>,
	/// Document size; selection ends are clamped to it.
	pub doc_size: PosLen,
	/// Also pin the pages adjacent to drag pages, so autoscroll lands on
	/// mounted content.
	pub include_drag_buffer: bool,
	pub drag_anchor_page_index: Option<usize>,
	pub drag_last_hit_page_index: Option<usize>,
	pub extra_pages: &'a [usize],
	pub policy: VirtualizationPolicy,
}

impl<'a> PinInput<'a> {
	pub fn new(layout: &'a Layout, policy: VirtualizationPolicy) -> Self {
		Self {
			layout,
			selection: None,
			doc_size: 0,
			include_drag_buffer: false,
			drag_anchor_page_index: None,
			drag_last_hit_page_index: None,
			extra_pages: &[],
			policy,
		}
	}
}

/// Pages that must stay mounted regardless of scroll position.
///
/// Empty when the policy is inactive. Out-of-range pages are dropped.
pub fn compute_pins(input: &PinInput<'_>) -> BTreeSet<usize> {
	let mut pins = BTreeSet::new();
	let count = input.layout.page_count();
	if !input.policy.is_active() || count == 0 {
		return pins;
	}

	if let Some(sel) = input.selection {
		for pos in [sel.from(), sel.to()] {
			if let Some(page) = input.layout.nearest_page_for_pos(pos.min(input.doc_size)) {
				pins.insert(page);
			}
		}
	}

	for page in [input.drag_anchor_page_index, input.drag_last_hit_page_index].into_iter().flatten() {
		if page >= count {
			continue;
		}
		pins.insert(page);
		if input.include_drag_buffer {
			pins.extend(page.checked_sub(1));
			pins.extend(Some(page + 1).filter(|p| *p < count));
		}
	}

	pins.extend(input.extra_pages.iter().copied().filter(|p| *p < count));
	pins
}

/// Inclusive range of pages mounted around the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualWindow {
	pub first: usize,
	pub last: usize,
}

impl VirtualWindow {
	/// Window of `before` pages above and `after` pages below `page`.
	pub fn around(page: usize, before: usize, after: usize, page_count: usize) -> Option<Self> {
		if page_count == 0 {
			return None;
		}
		let page = page.min(page_count - 1);
		Some(Self {
			first: page.saturating_sub(before),
			last: (page + after).min(page_count - 1),
		})
	}

	/// Pages intersecting a vertical viewport, widened by `overscan` pages.
	pub fn for_viewport(layout: &Layout, top: f32, height: f32, overscan: usize) -> Option<Self> {
		let bottom = top + height.max(0.0);
		let mut visible = (0..layout.page_count()).filter(|&i| layout.page_rect(i).is_some_and(|r| r.bottom() > top && r.top() < bottom));
		let first = visible.next()?;
		let last = visible.last().unwrap_or(first);
		let count = layout.page_count();
		Some(Self {
			first: first.saturating_sub(overscan),
			last: (last + overscan).min(count - 1),
		})
	}

	pub fn contains(&self, page: usize) -> bool {
		page >= self.first && page <= self.last
	}

	pub fn pages(self) -> RangeInclusive<usize> {
		self.first..=self.last
	}
}

/// Union of the natural window and the pins.
pub fn mounted_pages(window: Option<VirtualWindow>, pins: &BTreeSet<usize>) -> BTreeSet<usize> {
	let mut mounted: BTreeSet<usize> = window.into_iter().flat_map(|w| w.pages()).collect();
	mounted.extend(pins.iter().copied());
	mounted
}
