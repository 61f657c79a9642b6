//! Observable set of mounted pages with bounded waits.
//!
//! The pipeline publishes the mounted set after every paint; callers that
//! need a page materialized (scroll-to-position, focus into a far page)
//! wait on it with a timeout instead of polling the painter.


use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::MountError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountState {
	pub mounted: BTreeSet<usize>,
	pub page_count: usize,
}

#[derive(Debug)]
pub struct PageMounts {
	tx: watch::Sender<MountState>,
}

impl Default for PageMounts {
	fn default() -> Self {
		Self::new()
	}
}

impl PageMounts {
	pub fn new() -> Self {
		let (tx, _) = watch::channel(MountState::default());
		Self { tx }
	}

	/// Replaces the published state; waiters re-check on change.
	pub fn publish(&self, mounted: BTreeSet<usize>, page_count: usize) {
		self.tx.send_replace(MountState { mounted, page_count });
	}

	pub fn state(&self) -> MountState {
		self.tx.borrow().clone()
	}

	pub fn is_mounted(&self, page: usize) -> bool {
		self.tx.borrow().mounted.contains(&page)
	}

	pub fn subscribe(&self) -> watch::Receiver<MountState> {
		self.tx.subscribe()
	}

	/// Waits until `page` is mounted, at most `timeout`.
	///
	/// A page beyond the published layout may still appear if a later layout
	/// grows; it is reported out of range only once the wait runs out.
	pub async fn wait_mounted(&self, page: usize, timeout: Duration) -> Result<(), MountError> {
		let mut rx = self.tx.subscribe();
		if rx.borrow_and_update().mounted.contains(&page) {
			return Ok(());
		}

		let waited = tokio::time::timeout(timeout, rx.wait_for(|s| s.mounted.contains(&page))).await;
		if let Ok(Ok(_)) = waited {
			return Ok(());
		}
		// The sender lives in `self`, so a closed channel cannot outlive this borrow.
		let count = self.tx.borrow().page_count;
		if page >= count {
			tracing::debug!(page, count, "page mount wait ended out of range");
			return Err(MountError::OutOfRange { page, count });
		}
		tracing::warn!(page, ?timeout, "page mount wait timed out");
		Err(MountError::Timeout { page, waited: timeout })
	}
}
