//! Scheduling of caret and selection paints.
//!
//! A selection paint is only allowed against a layout stamped with the
//! document's current epoch and while no layout pass is running. Requests
//! that cannot be honored wait in `Pending`; an aborted pass drops them.


use folio_primitives::Epoch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
	#[default]
	Idle,
	/// A paint was requested and waits for a consistent layout or a frame.
	Pending,
	/// A paint is being performed; call
	/// [`SelectionSyncCoordinator::finish_render`] when done.
	Rendering,
}

/// What the caller should do after [`SelectionSyncCoordinator::request_render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDecision {
	/// Paint now, synchronously.
	Now,
	/// Wait for the running layout pass to complete.
	AfterLayout,
	/// Paint on the next frame callback.
	NextFrame,
}

#[derive(Debug, Default)]
pub struct SelectionSyncCoordinator {
	state: SyncState,
	layout_in_flight: bool,
	/// Epoch of the layout currently on screen.
	layout_epoch: Option<Epoch>,
	doc_epoch: Epoch,
}

impl SelectionSyncCoordinator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> SyncState {
		self.state
	}

	pub fn layout_epoch(&self) -> Option<Epoch> {
		self.layout_epoch
	}

	pub fn is_layout_in_flight(&self) -> bool {
		self.layout_in_flight
	}

	/// True when the on-screen layout matches the document and no pass runs.
	pub fn can_render(&self) -> bool {
		!self.layout_in_flight && self.layout_epoch == Some(self.doc_epoch)
	}

	/// Tracks the document's current epoch.
	pub fn on_doc_epoch(&mut self, epoch: Epoch) {
		self.doc_epoch = epoch;
	}

	pub fn request_render(&mut self, immediate: bool) -> RenderDecision {
		if immediate && self.can_render() {
			self.state = SyncState::Rendering;
			return RenderDecision::Now;
		}
		self.state = SyncState::Pending;
		if immediate && self.layout_in_flight {
			tracing::trace!("selection paint deferred until layout completes");
			RenderDecision::AfterLayout
		} else {
			RenderDecision::NextFrame
		}
	}

	pub fn on_layout_start(&mut self) {
		self.layout_in_flight = true;
	}

	/// Records a completed pass. Returns true when a pending paint may run now.
	pub fn on_layout_complete(&mut self, epoch: Epoch) -> bool {
		self.layout_in_flight = false;
		self.layout_epoch = Some(epoch);
		self.take_pending()
	}

	/// Drops any pending paint; the screen keeps its last overlay.
	pub fn on_layout_abort(&mut self) {
		self.layout_in_flight = false;
		if self.state == SyncState::Pending {
			tracing::trace!("pending selection paint discarded after layout abort");
			self.state = SyncState::Idle;
		}
	}

	/// Frame callback. Returns true when a pending paint may run now.
	pub fn on_frame(&mut self) -> bool {
		self.take_pending()
	}

	pub fn finish_render(&mut self) {
		if self.state == SyncState::Rendering {
			self.state = SyncState::Idle;
		}
	}

	/// Returns to `Idle` without painting.
	pub fn abort(&mut self) {
		self.state = SyncState::Idle;
	}

	fn take_pending(&mut self) -> bool {
		if self.state == SyncState::Pending && self.can_render() {
			self.state = SyncState::Rendering;
			return true;
		}
		false
	}
}
