use folio_layout::{DocPoint, Layout, Page, PageRect, RegionKind, RegionLayout};
use folio_primitives::{Pos, PosRange};

use crate::source::SurfaceKind;

/// Position-space queries routed to the active editing surface.
///
/// Region positions live in the band's own position space, and band
/// geometry is only reachable on the page the session was entered from.
#[derive(Debug, Clone, Copy)]
pub enum ActiveSurface<'a> {
	Body(&'a Layout),
	Region {
		kind: RegionKind,
		region: &'a RegionLayout,
		page: &'a Page,
	},
}

impl ActiveSurface<'_> {
	pub fn kind(&self) -> SurfaceKind {
		match self {
			Self::Body(_) => SurfaceKind::Body,
			Self::Region { kind: RegionKind::Header, .. } => SurfaceKind::Header,
			Self::Region { kind: RegionKind::Footer, .. } => SurfaceKind::Footer,
		}
	}

	pub fn hit_test(&self, at: DocPoint) -> Option<Pos> {
		match self {
			Self::Body(layout) => layout.hit_test(at),
			Self::Region { region, page, .. } if at.page == page.index => region.hit_test(page, at.point),
			Self::Region { .. } => None,
		}
	}

	pub fn caret_rect(&self, pos: Pos) -> Option<PageRect> {
		match self {
			Self::Body(layout) => layout.caret_rect(pos),
			Self::Region { region, page, .. } => region.caret_rect(page, pos).map(|rect| PageRect { page: page.index, rect }),
		}
	}

	pub fn selection_rects(&self, range: PosRange) -> Vec<PageRect> {
		match self {
			Self::Body(layout) => layout.selection_rects(range),
			Self::Region { region, page, .. } => region
				.selection_rects(page, range)
				.into_iter()
				.map(|rect| PageRect { page: page.index, rect })
				.collect(),
		}
	}
}
