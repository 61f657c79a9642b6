use folio_primitives::{PosRange, Selection};
use proptest::prelude::*;

use super::*;
use crate::block::FlowBlock;
use crate::engine::{IncrementalLayoutEngine, LayoutInput};
use crate::fixed::FixedMetrics;
use crate::options::LayoutOptions;

/// Three pages: [0, 430), [430, 860), [860, 1000).
fn three_pages() -> Layout {
	let blocks = vec![FlowBlock::paragraph(0, PosRange::new(0, 1000), "x")];
	let options = LayoutOptions::default();
	IncrementalLayoutEngine::new()
		.layout(LayoutInput::new(&blocks, &options), &FixedMetrics::new(10, 20.0))
		.expect("layout")
		.layout
}

fn active() -> VirtualizationPolicy {
	VirtualizationPolicy {
		enabled: true,
		mode: LayoutMode::Vertical,
	}
}

#[test]
fn selection_ends_outside_window_are_mounted() {
	let layout = three_pages();
	assert_eq!(layout.page_count(), 3);

	let window = VirtualWindow::around(0, 0, 1, layout.page_count());
	assert_eq!(window, Some(VirtualWindow { first: 0, last: 1 }));

	let input = PinInput {
		selection: Some(Selection::new(5, 900)),
		doc_size: 1000,
		..PinInput::new(&layout, active())
	};
	let pins = compute_pins(&input);
	assert_eq!(pins, BTreeSet::from([0, 2]));
	assert_eq!(mounted_pages(window, &pins), BTreeSet::from([0, 1, 2]));
}

#[test]
fn drag_buffer_pins_neighbours() {
	let layout = three_pages();
	let input = PinInput {
		drag_anchor_page_index: Some(0),
		drag_last_hit_page_index: Some(2),
		..PinInput::new(&layout, active())
	};
	assert_eq!(compute_pins(&input), BTreeSet::from([0, 2]));

	let buffered = PinInput {
		include_drag_buffer: true,
		..input
	};
	assert_eq!(compute_pins(&buffered), BTreeSet::from([0, 1, 2]));
}

#[test]
fn selection_is_clamped_to_document() {
	let layout = three_pages();
	let input = PinInput {
		selection: Some(Selection::new(5000, 5000)),
		doc_size: 1000,
		..PinInput::new(&layout, active())
	};
	assert_eq!(compute_pins(&input), BTreeSet::from([2]));
}

#[test]
fn inactive_policy_pins_nothing() {
	let layout = three_pages();
	let selection = Some(Selection::new(5, 900));

	let disabled = PinInput {
		selection,
		doc_size: 1000,
		..PinInput::new(&layout, VirtualizationPolicy::default())
	};
	assert!(compute_pins(&disabled).is_empty());

	let horizontal = PinInput {
		selection,
		doc_size: 1000,
		..PinInput::new(
			&layout,
			VirtualizationPolicy {
				enabled: true,
				mode: LayoutMode::Horizontal,
			},
		)
	};
	assert!(compute_pins(&horizontal).is_empty());
}

#[test]
fn out_of_range_extras_are_dropped() {
	let layout = three_pages();
	let extras = [1, 7];
	let input = PinInput {
		extra_pages: &extras,
		drag_last_hit_page_index: Some(9),
		include_drag_buffer: true,
		..PinInput::new(&layout, active())
	};
	assert_eq!(compute_pins(&input), BTreeSet::from([1]));
}

#[test]
fn viewport_window_covers_intersecting_pages() {
	let layout = three_pages();
	let window = VirtualWindow::for_viewport(&layout, 1000.0, 200.0, 0).expect("window");
	assert_eq!(window.pages(), 0..=1);
	assert!(!window.contains(2));

	let widened = VirtualWindow::for_viewport(&layout, 1000.0, 200.0, 1).expect("window");
	assert_eq!(widened, VirtualWindow { first: 0, last: 2 });
	assert_eq!(VirtualWindow::around(0, 1, 1, 0), None);
}

proptest! {
	#[test]
	fn selection_pages_are_always_pinned(anchor in 0usize..1200, head in 0usize..1200) {
		let layout = three_pages();
		let input = PinInput {
			selection: Some(Selection::new(anchor, head)),
			doc_size: 1000,
			..PinInput::new(&layout, active())
		};
		let pins = compute_pins(&input);
		for pos in [anchor.min(1000), head.min(1000)] {
			let page = layout.nearest_page_for_pos(pos).expect("page");
			prop_assert!(pins.contains(&page));
		}
		prop_assert!(pins.iter().all(|p| *p < layout.page_count()));
	}
}
