//! Machine-checkable invariant catalog and proof entrypoints for the presentation pipeline.
#![allow(dead_code)]

pub(crate) mod catalog;

#[allow(unused_imports)]
pub(crate) use catalog::{
	EPOCH_COUNTS_STRUCTURAL_TRANSACTIONS, FAILED_PASS_RETAINS_LAYOUT, PENDING_MAPPING_TAKEN_ONCE, PENDING_TRIGGERS_ONE_FOLLOW_UP, SELECTION_GATED_ON_EPOCH,
	SINGLE_PASS_IN_FLIGHT, SUPERSEDED_PASS_DISCARDED,
};

#[cfg(doc)]
pub(crate) fn test_epoch_counts_structural_transactions() {}

#[cfg(doc)]
pub(crate) fn test_rerender_requests_coalesce() {}

#[cfg(doc)]
pub(crate) fn test_edits_during_pass_trigger_one_follow_up() {}

#[cfg(doc)]
pub(crate) fn test_stale_layout_keeps_previous_overlay() {}

#[cfg(doc)]
pub(crate) fn test_paint_receives_composed_mapping() {}

#[cfg(doc)]
pub(crate) fn test_failed_pass_retains_layout() {}

#[cfg(doc)]
pub(crate) fn test_superseded_pass_is_discarded() {}

#[cfg(test)]
mod proofs;

#[cfg(test)]
#[allow(unused_imports)]
pub(crate) use proofs::{
	test_edits_during_pass_trigger_one_follow_up, test_epoch_counts_structural_transactions, test_failed_pass_retains_layout, test_paint_receives_composed_mapping,
	test_rerender_requests_coalesce, test_stale_layout_keeps_previous_overlay, test_superseded_pass_is_discarded,
};
