/// Gate between visual-tree mutation reports and index rebuilds.
///
/// While paused (during a bulk repaint) mutations only mark the index
/// dirty; the final [`resume`](Self::resume) reports whether one rebuild
/// is owed.
#[derive(Debug, Default)]
pub struct IndexObserver {
	paused: u32,
	dirty: bool,
}

impl IndexObserver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Suspends immediate rebuilds. Nests.
	pub fn pause(&mut self) {
		self.paused += 1;
	}

	/// Leaves one pause level. Returns true when this was the outermost
	/// level and mutations arrived while paused.
	pub fn resume(&mut self) -> bool {
		if self.paused == 0 {
			tracing::warn!("index observer resumed without pause");
			return false;
		}
		self.paused -= 1;
		self.paused == 0 && std::mem::take(&mut self.dirty)
	}

	/// Reports a structural mutation of the painted tree. Returns true when
	/// the caller should rebuild now.
	pub fn record_mutation(&mut self) -> bool {
		if self.paused > 0 {
			self.dirty = true;
			return false;
		}
		true
	}

	pub fn is_paused(&self) -> bool {
		self.paused > 0
	}

	pub fn is_dirty(&self) -> bool {
		self.dirty
	}
}
