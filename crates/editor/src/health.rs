//! Pipeline health derived from pass outcomes.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
	#[default]
	Healthy,
	/// A pass failed while an earlier good layout is still shown.
	Degraded,
	/// The first pass failed; nothing has been shown.
	Failed,
}

#[derive(Debug, Default)]
pub struct HealthTracker {
	health: Health,
	has_good_layout: bool,
}

impl HealthTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn health(&self) -> Health {
		self.health
	}

	/// Returns `(from, to)` when the state changed.
	pub fn on_success(&mut self) -> Option<(Health, Health)> {
		self.has_good_layout = true;
		self.transition(Health::Healthy)
	}

	/// Returns `(from, to)` when the state changed.
	pub fn on_error(&mut self) -> Option<(Health, Health)> {
		let to = if self.has_good_layout { Health::Degraded } else { Health::Failed };
		self.transition(to)
	}

	/// Forgets the good layout, as after a reset.
	pub fn reset(&mut self) {
		self.health = Health::Healthy;
		self.has_good_layout = false;
	}

	fn transition(&mut self, to: Health) -> Option<(Health, Health)> {
		let from = std::mem::replace(&mut self.health, to);
		(from != to).then_some((from, to))
	}
}
