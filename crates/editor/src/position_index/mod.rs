//! Index from document positions to painted visual nodes.
//!
//! Rebuilt in one pass over the painted tree after every paint. Lookups only
//! see mounted nodes; a position on an unmounted page is a miss, never an
//! approximation.

mod observer;

use std::collections::BTreeSet;

use folio_layout::{Layout, PageRect};
use folio_primitives::{Pos, PosRange, Rect};
pub use observer::IndexObserver;

/// Identity of a painted node, assigned by the painter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// A node of the painted visual tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedNode {
	pub id: NodeId,
	/// Page the node is mounted on.
	pub page: usize,
	/// Page-local bounds.
	pub rect: Rect,
	/// Document positions the node displays, if any.
	pub range: Option<PosRange>,
	pub children: Vec<PaintedNode>,
}

impl PaintedNode {
	pub fn new(id: u64, page: usize, rect: Rect, range: Option<PosRange>) -> Self {
		Self {
			id: NodeId(id),
			page,
			rect,
			range,
			children: Vec::new(),
		}
	}

	pub fn with_children(mut self, children: Vec<PaintedNode>) -> Self {
		self.children = children;
		self
	}
}

/// Read access to the painted tree.
pub trait PaintedHost {
	/// Mounted page roots in page order.
	fn roots(&self) -> &[PaintedNode];
}

/// A position-annotated node captured by the last rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedNode {
	pub id: NodeId,
	pub page: usize,
	pub rect: Rect,
	pub range: PosRange,
	/// Nesting depth in the painted tree; deeper nodes win lookups.
	pub depth: u16,
}

/// Interval tree over painted nodes.
///
/// `entries` sorted by start form an implicit balanced tree: the root of
/// `lo..hi` is its midpoint. A lookup visits only subtrees that can still
/// reach the position, so a page-wide node does not drag every line in.
#[derive(Debug, Default)]
pub struct RenderedPositionIndex {
	/// Sorted by `range.start`.
	entries: Vec<IndexedNode>,
	/// `max_end[i]` is the largest `range.end` in the subtree rooted at `i`.
	max_end: Vec<Pos>,
	mounted: BTreeSet<usize>,
	rebuilds: u64,
}

impl RenderedPositionIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the index with the nodes currently painted in `host`.
	pub fn rebuild(&mut self, host: &dyn PaintedHost) {
		let mut entries = Vec::new();
		let mut mounted = BTreeSet::new();
		let mut stack: Vec<(&PaintedNode, u16)> = host.roots().iter().rev().map(|n| (n, 0)).collect();

		while let Some((node, depth)) = stack.pop() {
			mounted.insert(node.page);
			if let Some(range) = node.range {
				entries.push(IndexedNode {
					id: node.id,
					page: node.page,
					rect: node.rect,
					range,
					depth,
				});
			}
			stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
		}

		entries.sort_by_key(|e| e.range.start);
		let mut max_end = vec![0; entries.len()];
		subtree_max(&entries, &mut max_end, 0, entries.len());

		self.entries = entries;
		self.max_end = max_end;
		self.mounted = mounted;
		self.rebuilds += 1;
		tracing::trace!(nodes = self.entries.len(), pages = self.mounted.len(), "position index rebuilt");
	}

	/// Innermost painted node whose range contains `pos` (end inclusive).
	///
	/// On equal depth the node starting later wins, so a position on a
	/// boundary resolves to the node it begins.
	pub fn find_element_at_position(&self, pos: Pos) -> Option<&IndexedNode> {
		let mut best: Option<&IndexedNode> = None;
		self.stab(0, self.entries.len(), pos, &mut |entry| {
			if best.is_none_or(|b| (entry.depth, entry.range.start) > (b.depth, b.range.start)) {
				best = Some(entry);
			}
		});
		best
	}

	/// Calls `f` with every entry of `lo..hi` containing `pos`. Returns the
	/// number of tree nodes visited.
	fn stab<'a>(&'a self, lo: usize, hi: usize, pos: Pos, f: &mut impl FnMut(&'a IndexedNode)) -> usize {
		if lo >= hi {
			return 0;
		}
		let mid = lo + (hi - lo) / 2;
		if self.max_end[mid] < pos {
			return 1;
		}
		let mut visited = 1 + self.stab(lo, mid, pos, f);
		let entry = &self.entries[mid];
		if entry.range.start <= pos {
			if entry.range.contains_inclusive(pos) {
				f(entry);
			}
			visited += self.stab(mid + 1, hi, pos, f);
		}
		visited
	}

	/// Caret geometry at `pos`, preferring painted truth.
	///
	/// Falls back to the analytic layout only for pages that are not
	/// mounted. When both sources exist and disagree by more than
	/// `tolerance` the answer is `None`.
	pub fn rect_for_pos(&self, pos: Pos, layout: &Layout, tolerance: f32) -> Option<PageRect> {
		let painted = self.find_element_at_position(pos).map(|node| PageRect {
			page: node.page,
			rect: caret_in_node(node, pos),
		});
		let analytic = layout.caret_rect(pos);

		match (painted, analytic) {
			(Some(p), Some(a)) => {
				let agree = p.page == a.page && p.rect.approx_eq(&a.rect, tolerance);
				if !agree {
					tracing::debug!(pos, painted = ?p, analytic = ?a, "painted and analytic geometry disagree");
				}
				agree.then_some(p)
			}
			(Some(p), None) => Some(p),
			(None, Some(a)) => (!self.mounted.contains(&a.page)).then_some(a),
			(None, None) => None,
		}
	}

	pub fn is_mounted(&self, page: usize) -> bool {
		self.mounted.contains(&page)
	}

	pub fn mounted_pages(&self) -> &BTreeSet<usize> {
		&self.mounted
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of rebuilds since creation.
	pub fn rebuilds(&self) -> u64 {
		self.rebuilds
	}
}

/// Fills `max_end` for the subtree over `lo..hi` and returns its maximum.
fn subtree_max(entries: &[IndexedNode], max_end: &mut [Pos], lo: usize, hi: usize) -> Pos {
	if lo >= hi {
		return 0;
	}
	let mid = lo + (hi - lo) / 2;
	let left = subtree_max(entries, max_end, lo, mid);
	let right = subtree_max(entries, max_end, mid + 1, hi);
	max_end[mid] = entries[mid].range.end.max(left).max(right);
	max_end[mid]
}

fn caret_in_node(node: &IndexedNode, pos: Pos) -> Rect {
	let len = node.range.len();
	let x = if len == 0 {
		node.rect.x
	} else {
		let offset = pos.clamp(node.range.start, node.range.end) - node.range.start;
		node.rect.x + node.rect.width * (offset as f32 / len as f32)
	};
	Rect::new(x, node.rect.y, 0.0, node.rect.height)
}
