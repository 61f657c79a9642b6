//! Engine events published to hosts over unbounded channels.

use folio_primitives::{Epoch, RenderGeneration};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::ErrorKind;
use crate::header_footer::HeaderFooterSession;
use crate::health::Health;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
	/// A pass was painted.
	LayoutUpdated {
		epoch: Epoch,
		render_generation: RenderGeneration,
		page_count: usize,
		/// Blocks whose measure was reused.
		reused: usize,
		measured: usize,
	},
	SelectionPainted {
		epoch: Epoch,
	},
	HealthChanged {
		from: Health,
		to: Health,
	},
	/// A pass failed; the previous layout stays on screen.
	Error {
		kind: ErrorKind,
		message: String,
		epoch: Epoch,
	},
	SessionChanged {
		session: HeaderFooterSession,
	},
}

/// Fan-out to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
	subscribers: Vec<mpsc::UnboundedSender<EngineEvent>>,
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.push(tx);
		rx
	}

	/// Sends to every subscriber, dropping the ones whose receiver is gone.
	pub fn emit(&mut self, event: EngineEvent) {
		tracing::trace!(?event, "engine event");
		self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.len()
	}
}
