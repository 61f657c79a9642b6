use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use folio_layout::{DocPoint, PageRect, RegionId, RegionKind};
use folio_primitives::{Bias, Epoch, Rect, RenderGeneration, Selection};
use pretty_assertions::assert_eq;

use super::harness::{Doc, Harness};
use super::*;
use crate::error::ErrorKind;
use crate::header_footer::RegionTarget;
use crate::source::{DocumentMode, SurfaceKind};

fn last_mounted(h: &Harness) -> BTreeSet<usize> {
	h.frames().last().map(|f| f.mounted.clone()).unwrap_or_default()
}

#[tokio::test]
async fn first_frame_lays_out_paints_and_draws_the_caret() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	assert!(h.engine.layout().is_none());
	h.engine.settle().await;

	assert_eq!(h.engine.passes_started(), 1);
	assert_eq!(h.engine.painted_epoch(), Some(Epoch::INITIAL));
	assert_eq!(h.engine.health(), Health::Healthy);
	assert_eq!(h.engine.index().len(), 1);
	assert_eq!(
		h.drain_events(),
		vec![
			EngineEvent::LayoutUpdated {
				epoch: Epoch::INITIAL,
				render_generation: RenderGeneration::default(),
				page_count: 1,
				reused: 0,
				measured: 1,
			},
			EngineEvent::SelectionPainted { epoch: Epoch::INITIAL },
		]
	);

	let overlay = h.overlay_frames();
	assert_eq!(overlay.len(), 1);
	assert_eq!(overlay[0].surface, SurfaceKind::Body);
	assert_eq!(
		overlay[0].caret,
		Some(PageRect {
			page: 0,
			rect: Rect::new(96.0, 96.0, 0.0, 20.0)
		})
	);
	assert!(overlay[0].rects.is_empty());
}

#[tokio::test]
async fn caret_position_maps_across_an_insert() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;
	let before = h.engine.current_epoch();

	h.source.insert(5, "X");
	h.engine.on_frame();
	assert_eq!(h.engine.current_epoch(), before.next());
	assert_eq!(
		h.engine.map_position(7, before, Bias::Right),
		MapOutcome::Mapped {
			pos: 8,
			to_epoch: before.next()
		}
	);
	assert_eq!(h.engine.map_position(3, before, Bias::Right).pos(), Some(3));
}

#[tokio::test]
async fn meta_transactions_rerender_without_advancing_the_epoch() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;
	assert_eq!(h.convert_calls.load(Ordering::SeqCst), 1);

	h.source.send(DocTransaction::meta(false));
	h.engine.settle().await;
	assert_eq!(h.engine.passes_started(), 1);

	h.source.send(DocTransaction::meta(true).with_origin(crate::source::TransactionOrigin::Remote));
	h.engine.settle().await;
	assert_eq!(h.engine.current_epoch(), Epoch::INITIAL);
	assert_eq!(h.engine.render_generation(), RenderGeneration::new(1));
	assert_eq!(h.engine.passes_started(), 2);
	assert_eq!(h.convert_calls.load(Ordering::SeqCst), 2, "new render generation reconverts");
	assert_eq!(h.metrics.calls(), 1, "unchanged blocks reuse their measures");
}

#[tokio::test]
async fn convert_option_changes_reconvert_at_the_same_generation() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;

	h.engine.set_convert_options(ConvertOptions::default());
	h.engine.settle().await;
	assert_eq!(h.engine.passes_started(), 1);

	h.engine.set_convert_options(ConvertOptions {
		document_mode: DocumentMode::Viewing,
		..ConvertOptions::default()
	});
	h.engine.settle().await;
	assert_eq!(h.engine.passes_started(), 2);
	assert_eq!(h.convert_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn first_pass_failure_is_fatal_health() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.convert_fail.store(true, Ordering::SeqCst);
	h.engine.settle().await;

	assert_eq!(h.engine.health(), Health::Failed);
	assert!(h.engine.layout().is_none());
	assert!(h.frames().is_empty());
	let events = h.drain_events();
	assert_eq!(
		events[0],
		EngineEvent::HealthChanged {
			from: Health::Healthy,
			to: Health::Failed
		}
	);
	assert!(matches!(events[1], EngineEvent::Error { kind: ErrorKind::Conversion, epoch, .. } if epoch == Epoch::INITIAL));
}

#[tokio::test]
async fn header_session_redirects_hit_tests() {
	let mut h = Harness::new(Doc::long(1000).with_header(&"h".repeat(20)));
	assert!(matches!(h.engine.activate_region(RegionKind::Header, 0), Err(SessionError::NoLayout)));
	h.engine.settle().await;
	assert_eq!(h.engine.layout().map(Layout::page_count), Some(3));
	h.drain_events();

	let in_band = DocPoint::new(2, 408.0, 73.0);
	assert_eq!(h.engine.hit_test(in_band), Some(865));

	h.engine.activate_region(RegionKind::Header, 2).unwrap();
	assert_eq!(
		h.engine.session(),
		HeaderFooterSession::Header(RegionTarget {
			region: RegionId(1),
			page_index: 2,
			page_number: 3,
		})
	);
	assert_eq!(h.engine.hit_test(in_band), Some(15));
	assert_eq!(h.engine.hit_test(DocPoint::new(1, 408.0, 73.0)), None);
	assert_eq!(h.engine.caret_rect(15).map(|r| r.page), Some(2));

	// The session survives the relayout its activation scheduled.
	h.engine.settle().await;
	assert_eq!(h.engine.hit_test(in_band), Some(15));
	assert_eq!(h.overlay_frames().last().map(|f| f.surface), Some(SurfaceKind::Header));

	assert!(h.engine.exit_mode());
	assert!(!h.engine.exit_mode());
	assert_eq!(h.engine.hit_test(in_band), Some(865));

	let sessions: Vec<_> = h
		.drain_events()
		.into_iter()
		.filter_map(|e| match e {
			EngineEvent::SessionChanged { session } => Some(session),
			_ => None,
		})
		.collect();
	assert_eq!(sessions.len(), 2);
	assert_eq!(sessions[1], HeaderFooterSession::Body);

	assert!(matches!(
		h.engine.activate_region(RegionKind::Footer, 0),
		Err(SessionError::NoRegion { page: 0, kind: RegionKind::Footer })
	));
}

#[tokio::test]
async fn removed_band_ends_the_session() {
	let mut h = Harness::new(Doc::long(1000).with_header("header"));
	h.engine.settle().await;
	h.engine.activate_region(RegionKind::Header, 1).unwrap();
	h.engine.settle().await;

	h.source.set_header(None);
	h.source.send(DocTransaction::meta(true));
	h.engine.settle().await;
	assert!(h.engine.session().is_body());
}

#[tokio::test]
async fn selection_pins_force_mount_pages_outside_the_window() {
	let mut h = Harness::new(Doc::long(1000).with_selection(Selection::new(5, 900)));
	h.engine.settle().await;
	assert_eq!(h.engine.layout().map(Layout::page_count), Some(3));
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1, 2]));
	assert_eq!(h.overlay_frames().last().map(|f| f.rects.len()), Some(90));

	h.source.set_selection(Selection::caret(5));
	h.engine.schedule_rerender();
	h.engine.settle().await;
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1]));
	let mounts = h.engine.mounts();
	assert!(!mounts.is_mounted(2));
	assert_eq!(
		mounts.wait_mounted(2, Duration::from_millis(20)).await,
		Err(crate::error::MountError::Timeout {
			page: 2,
			waited: Duration::from_millis(20)
		})
	);

	h.engine.pin_pages(vec![2, 7]);
	h.engine.settle().await;
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1, 2]));
	assert_eq!(mounts.wait_mounted(2, Duration::from_millis(20)).await, Ok(()));
}

#[tokio::test]
async fn viewport_moves_the_window() {
	let mut h = Harness::new(Doc::long(1000));
	h.engine.set_viewport(2300.0, 100.0);
	h.engine.settle().await;
	// Page 2 is visible, page 1 is the overscan, page 0 holds the caret.
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1, 2]));

	let mut config = EngineConfig::default();
	config.view.window_before = 0;
	h.engine.set_config(config).unwrap();
	h.engine.settle().await;
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 2]));
}

#[tokio::test]
async fn everything_mounts_without_virtualization() {
	let mut config = EngineConfig::default();
	config.view.virtualize = false;
	let mut h = Harness::with_config(Doc::long(1000), config);
	h.engine.set_viewport(0.0, 10.0);
	h.engine.settle().await;
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1, 2]));
}

#[tokio::test]
async fn drag_pages_stay_mounted() {
	let mut h = Harness::new(Doc::long(1000));
	h.engine.settle().await;
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1]));

	let anchor = h.engine.begin_drag(DocPoint::new(0, 100.0, 100.0), None);
	assert_eq!(anchor, Some(0));
	assert!(h.engine.drag_to(DocPoint::new(2, 100.0, 100.0)).is_some());
	h.engine.settle().await;
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1, 2]));

	h.source.insert(0, "abc");
	h.engine.settle().await;
	let drag = h.engine.pointer().drag().copied().unwrap();
	assert_eq!((drag.anchor_pos, drag.epoch), (0, Epoch::new(1)));

	h.engine.end_drag();
	h.engine.settle().await;
	assert!(h.engine.pointer().drag().is_none());
	assert_eq!(last_mounted(&h), BTreeSet::from([0, 1]));
}

#[tokio::test]
async fn caret_geometry_prefers_painted_and_falls_back_when_unmounted() {
	let mut h = Harness::new(Doc::long(1000));
	h.engine.settle().await;

	assert_eq!(
		h.engine.caret_rect(15),
		Some(PageRect {
			page: 0,
			rect: Rect::new(408.0, 116.0, 0.0, 20.0)
		})
	);
	assert!(!h.engine.index().is_mounted(2));
	assert!(h.engine.index().find_element_at_position(900).is_none());
	let analytic = h.engine.caret_rect(900).unwrap();
	assert_eq!((analytic.page, analytic.rect.y), (2, 176.0));

	h.engine.pin_pages(vec![2]);
	h.engine.settle().await;
	assert!(h.engine.index().find_element_at_position(900).is_some());
	assert_eq!(h.engine.caret_rect(900), Some(analytic));
}

#[tokio::test]
async fn host_mutations_rebuild_once_per_batch() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;
	let rebuilds = h.engine.index().rebuilds();
	h.engine.on_host_mutation();
	assert_eq!(h.engine.index().rebuilds(), rebuilds + 1);

	h.engine.begin_host_mutations();
	h.engine.begin_host_mutations();
	for _ in 0..5 {
		h.engine.on_host_mutation();
	}
	h.engine.end_host_mutations();
	assert_eq!(h.engine.index().rebuilds(), rebuilds + 1, "inner close defers");
	h.engine.end_host_mutations();
	assert_eq!(h.engine.index().rebuilds(), rebuilds + 2, "one rebuild for the batch");

	h.engine.begin_host_mutations();
	h.engine.end_host_mutations();
	assert_eq!(h.engine.index().rebuilds(), rebuilds + 2, "empty batch rebuilds nothing");
}

#[tokio::test]
async fn paint_rebuilds_the_index_exactly_once() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;
	let rebuilds = h.engine.index().rebuilds();

	h.source.insert(5, "X");
	h.engine.settle().await;
	assert_eq!(h.frames().len(), 2);
	assert_eq!(h.engine.index().rebuilds(), rebuilds + 1);
}

#[tokio::test]
async fn reset_relays_from_scratch_and_keeps_counting_epochs() {
	let mut h = Harness::new(Doc::paras(&["0123456789", "abc"]));
	h.engine.settle().await;
	h.source.insert(2, "zz");
	h.engine.settle().await;
	let epoch = h.engine.current_epoch();
	let measured = h.metrics.calls();

	h.engine.reset();
	assert!(h.engine.layout().is_none());
	h.engine.settle().await;

	assert_eq!(h.engine.current_epoch(), epoch);
	assert_eq!(h.engine.painted_epoch(), Some(epoch));
	assert_eq!(h.metrics.calls(), measured + 2, "every block is measured again");
	assert!(h.frames().last().is_some_and(|f| f.mapping.is_none()));
}
