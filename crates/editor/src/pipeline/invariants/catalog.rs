//! Invariant catalog for [`crate::pipeline::PresentationEngine`].
#![allow(dead_code)]

/// Must advance the epoch exactly once per structural transaction and never for meta
/// transactions.
///
/// - Enforced in: [`crate::pipeline::PresentationEngine::apply_transaction`], [`crate::mapper::EpochPositionMapper::record_transaction`]
/// - Tested by: [`crate::pipeline::invariants::test_epoch_counts_structural_transactions`]
/// - Failure symptom: Positions recorded between edits map to the wrong place, or meta toggles
///   make every outstanding caret stale.
pub(crate) const EPOCH_COUNTS_STRUCTURAL_TRANSACTIONS: () = ();

/// Must keep at most one layout pass in flight.
///
/// - Enforced in: `PresentationEngine::on_frame`, `PresentationEngine::schedule_rerender`, `PresentationEngine::start_follow_up`
/// - Tested by: [`crate::pipeline::invariants::test_rerender_requests_coalesce`]
/// - Failure symptom: Concurrent passes race on the shared engine cache and paint out of order.
pub(crate) const SINGLE_PASS_IN_FLIGHT: () = ();

/// Must start exactly one follow-up pass for any number of rerender requests made while a
/// pass was running.
///
/// - Enforced in: `PresentationEngine::start_follow_up`
/// - Tested by: [`crate::pipeline::invariants::test_edits_during_pass_trigger_one_follow_up`]
/// - Failure symptom: Edits typed during a slow pass never reach the screen, or passes pile up.
pub(crate) const PENDING_TRIGGERS_ONE_FOLLOW_UP: () = ();

/// Must not paint a selection against a layout whose epoch differs from the document's.
///
/// - Enforced in: [`crate::selection_sync::SelectionSyncCoordinator::can_render`], `PresentationEngine::paint_selection`
/// - Tested by: [`crate::pipeline::invariants::test_stale_layout_keeps_previous_overlay`]
/// - Failure symptom: The caret jumps ahead of or lags behind typed text.
pub(crate) const SELECTION_GATED_ON_EPOCH: () = ();

/// Must hand the painter the mapping composed since the last successful paint, and only once.
///
/// - Enforced in: `PresentationEngine::present`
/// - Tested by: [`crate::pipeline::invariants::test_paint_receives_composed_mapping`]
/// - Failure symptom: Painted position attributes drift after several quick edits.
pub(crate) const PENDING_MAPPING_TAKEN_ONCE: () = ();

/// Must keep the previous layout and visual tree when conversion, layout or paint fails.
///
/// - Enforced in: `PresentationEngine::start_pass`, `PresentationEngine::complete_pass`, `PresentationEngine::present`
/// - Tested by: [`crate::pipeline::invariants::test_failed_pass_retains_layout`]
/// - Failure symptom: A transient converter error blanks the document.
pub(crate) const FAILED_PASS_RETAINS_LAYOUT: () = ();

/// Must discard a pass whose pass generation changed while it ran, and queue a replacement.
///
/// - Enforced in: `PresentationEngine::complete_pass`
/// - Tested by: [`crate::pipeline::invariants::test_superseded_pass_is_discarded`]
/// - Failure symptom: A layout computed under the old configuration or session is painted.
pub(crate) const SUPERSEDED_PASS_DISCARDED: () = ();
