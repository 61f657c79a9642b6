use folio_primitives::{Change, ChangeSet, Epoch, Selection};
use pretty_assertions::assert_eq;

use crate::error::ErrorKind;
use crate::events::EngineEvent;
use crate::health::Health;
use crate::pipeline::harness::{Doc, Harness};
use crate::source::DocTransaction;

/// Must advance the epoch exactly once per structural transaction and never for meta
/// transactions.
///
/// - Enforced in: `PresentationEngine::apply_transaction`, `EpochPositionMapper::record_transaction`
/// - Failure symptom: Positions recorded between edits map to the wrong place.
#[cfg_attr(test, tokio::test)]
pub(crate) async fn test_epoch_counts_structural_transactions() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;
	let generation = h.engine.render_generation();

	h.source.insert(5, "X");
	h.source.insert(0, "ab");
	h.source.send(DocTransaction::meta(true));
	h.source.send(DocTransaction::meta(false));
	h.engine.settle().await;

	assert_eq!(h.engine.current_epoch(), Epoch::new(2));
	assert_eq!(h.engine.render_generation(), generation.next().next().next());
	assert_eq!(h.engine.painted_epoch(), Some(Epoch::new(2)));
}

/// Must keep at most one layout pass in flight.
///
/// - Enforced in: `PresentationEngine::on_frame`, `PresentationEngine::schedule_rerender`
/// - Failure symptom: Concurrent passes race on the shared engine cache.
#[cfg_attr(test, tokio::test)]
pub(crate) async fn test_rerender_requests_coalesce() {
	let mut h = Harness::new(Doc::paras(&["hello", "world"]));
	h.engine.settle().await;
	assert_eq!(h.engine.passes_started(), 1);
	assert_eq!(h.metrics.calls(), 2);

	h.engine.schedule_rerender();
	h.engine.schedule_rerender();
	h.engine.schedule_rerender();
	h.engine.on_frame();
	assert!(h.engine.is_layout_in_flight());
	h.engine.schedule_rerender();
	h.engine.on_frame();
	h.engine.settle().await;

	// One pass for the burst, one follow-up for the request made mid-flight.
	assert_eq!(h.engine.passes_started(), 3);
	assert_eq!(h.metrics.calls(), 2, "unchanged blocks reuse their measures");
}

/// Must start exactly one follow-up pass for any number of rerender requests made while a
/// pass was running.
///
/// - Enforced in: `PresentationEngine::start_follow_up`
/// - Failure symptom: Edits typed during a slow pass never reach the screen.
#[cfg_attr(test, tokio::test)]
pub(crate) async fn test_edits_during_pass_trigger_one_follow_up() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;

	h.source.insert(5, "X");
	h.engine.on_frame();
	assert!(h.engine.is_layout_in_flight());

	h.source.insert(0, "a");
	h.source.insert(0, "b");
	h.engine.on_frame();
	h.engine.settle().await;

	assert_eq!(h.engine.passes_started(), 3);
	assert_eq!(h.engine.current_epoch(), Epoch::new(3));
	assert_eq!(h.engine.painted_epoch(), Some(Epoch::new(3)));
}

/// Must not paint a selection against a layout whose epoch differs from the document's.
///
/// - Enforced in: `SelectionSyncCoordinator::can_render`, `PresentationEngine::paint_selection`
/// - Failure symptom: The caret jumps ahead of or lags behind typed text.
#[cfg_attr(test, tokio::test)]
pub(crate) async fn test_stale_layout_keeps_previous_overlay() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]).with_selection(Selection::caret(7)));
	h.engine.settle().await;
	let before = h.overlay_frames();
	assert_eq!(before.len(), 1);
	assert_eq!(before[0].epoch, Epoch::INITIAL);

	// Transaction applied, layout not yet started.
	h.engine
		.apply_transaction(DocTransaction::edit(ChangeSet::from_changes(10, [Change::insert(5, 1)])));
	h.source.set_selection(Selection::caret(8));
	h.engine.request_selection_render(true);
	assert_eq!(h.overlay_frames(), before);

	// Layout started, not yet installed.
	h.engine.on_frame();
	h.engine.request_selection_render(true);
	assert_eq!(h.overlay_frames(), before);

	h.engine.settle().await;
	let after = h.overlay_frames();
	assert_eq!(after.len(), 2);
	assert_eq!(after[1].epoch, Epoch::new(1));
}

/// Must hand the painter the mapping composed since the last successful paint, and only once.
///
/// - Enforced in: `PresentationEngine::present`
/// - Failure symptom: Painted position attributes drift after several quick edits.
#[cfg_attr(test, tokio::test)]
pub(crate) async fn test_paint_receives_composed_mapping() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;

	h.source.insert(5, "X");
	h.source.insert(0, "ab");
	h.engine.settle().await;
	h.engine.schedule_rerender();
	h.engine.settle().await;

	let frames = h.frames();
	assert_eq!(frames.len(), 3);
	assert!(frames[0].mapping.is_none());
	let mapping = frames[1].mapping.clone().expect("composed mapping");
	assert_eq!((mapping.len(), mapping.len_after()), (10, 13));
	assert_eq!(mapping.map_pos(7, Default::default()), 10);
	assert!(frames[2].mapping.is_none(), "mapping consumed by the previous paint");
}

/// Must keep the previous layout and visual tree when conversion, layout or paint fails.
///
/// - Enforced in: `PresentationEngine::start_pass`, `PresentationEngine::present`
/// - Failure symptom: A transient converter error blanks the document.
#[cfg_attr(test, tokio::test)]
pub(crate) async fn test_failed_pass_retains_layout() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;
	h.drain_events();
	let rebuilds = h.engine.index().rebuilds();

	h.convert_fail.store(true, std::sync::atomic::Ordering::SeqCst);
	h.source.insert(5, "X");
	h.engine.settle().await;

	assert_eq!(h.engine.health(), Health::Degraded);
	assert_eq!(h.engine.painted_epoch(), Some(Epoch::INITIAL));
	assert_eq!(h.frames().len(), 1);
	assert_eq!(
		h.drain_events(),
		vec![
			EngineEvent::HealthChanged {
				from: Health::Healthy,
				to: Health::Degraded
			},
			EngineEvent::Error {
				kind: ErrorKind::Conversion,
				message: "conversion failed: invalid content: scripted failure".into(),
				epoch: Epoch::new(1),
			},
		]
	);

	h.convert_fail.store(false, std::sync::atomic::Ordering::SeqCst);
	h.paints.lock().fail = true;
	h.engine.schedule_rerender();
	h.engine.settle().await;
	assert_eq!(h.engine.painted_epoch(), Some(Epoch::INITIAL));
	assert_eq!(h.engine.index().rebuilds(), rebuilds);
	assert!(
		h.drain_events()
			.iter()
			.any(|e| matches!(e, EngineEvent::Error { kind: ErrorKind::Paint, .. }))
	);

	h.paints.lock().fail = false;
	h.engine.schedule_rerender();
	h.engine.settle().await;
	assert_eq!(h.engine.health(), Health::Healthy);
	assert_eq!(h.engine.painted_epoch(), Some(Epoch::new(1)));
}

/// Must discard a pass whose pass generation changed while it ran, and queue a replacement.
///
/// - Enforced in: `PresentationEngine::complete_pass`
/// - Failure symptom: A layout computed under the old configuration is painted.
#[cfg_attr(test, tokio::test)]
pub(crate) async fn test_superseded_pass_is_discarded() {
	let mut h = Harness::new(Doc::paras(&["0123456789"]));
	h.engine.settle().await;
	assert!(h.engine.layout_completed());

	h.source.insert(5, "X");
	h.engine.on_frame();
	h.engine.set_config(Default::default()).unwrap();
	h.wait_pass_finished().await;
	h.engine.on_frame();

	assert!(!h.engine.layout_completed());
	assert_eq!(h.frames().len(), 1);
	assert!(h.engine.is_layout_in_flight(), "replacement pass queued");

	h.engine.settle().await;
	assert!(h.engine.layout_completed());
	assert_eq!(h.frames().len(), 2);
	assert_eq!(h.engine.painted_epoch(), Some(Epoch::new(1)));
	assert_eq!(h.engine.passes_started(), 3);
}
