//! Explicit per-document engine registry.
//!
//! Owned by the host and passed where needed; lifetimes follow explicit
//! `create`/`destroy` calls.

use rustc_hash::FxHashMap;

use crate::error::RegistryError;
use crate::source::DocumentId;

#[derive(Debug)]
pub struct EngineRegistry<E> {
	engines: FxHashMap<DocumentId, E>,
}

impl<E> Default for EngineRegistry<E> {
	fn default() -> Self {
		Self {
			engines: FxHashMap::default(),
		}
	}
}

impl<E> EngineRegistry<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `engine` for `id`. An existing engine is left in place.
	pub fn create(&mut self, id: DocumentId, engine: E) -> Result<&mut E, RegistryError> {
		use std::collections::hash_map::Entry;
		match self.engines.entry(id) {
			Entry::Occupied(_) => Err(RegistryError::Duplicate(id)),
			Entry::Vacant(slot) => {
				tracing::debug!(doc = %id, "engine registered");
				Ok(slot.insert(engine))
			}
		}
	}

	pub fn get(&self, id: DocumentId) -> Option<&E> {
		self.engines.get(&id)
	}

	pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut E> {
		self.engines.get_mut(&id)
	}

	/// Removes and returns the engine so the caller controls its teardown.
	pub fn destroy(&mut self, id: DocumentId) -> Option<E> {
		let engine = self.engines.remove(&id);
		if engine.is_some() {
			tracing::debug!(doc = %id, "engine destroyed");
		}
		engine
	}

	pub fn len(&self) -> usize {
		self.engines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.engines.is_empty()
	}

	/// Registered documents in ascending id order.
	pub fn ids(&self) -> Vec<DocumentId> {
		let mut ids: Vec<_> = self.engines.keys().copied().collect();
		ids.sort_unstable();
		ids
	}
}
