//! Revision-keyed cache in front of the block converter.
//!
//! Conversion is keyed by `(content revision, options revision)`. Any input
//! that changes conversion without touching content (document mode, comment
//! visibility, footnote order) bumps the options revision, so a stale block
//! list is never handed to layout.


use std::sync::Arc;

use folio_primitives::RenderGeneration;

use crate::error::ConvertError;
use crate::source::{BlockConverter, ConvertOptions, Converted};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
	content: RenderGeneration,
	options: u64,
}

pub struct CachedConverter {
	inner: Box<dyn BlockConverter>,
	options: ConvertOptions,
	options_revision: u64,
	cached: Option<(CacheKey, Arc<Converted>)>,
	hits: u64,
	misses: u64,
}

impl CachedConverter {
	pub fn new(inner: Box<dyn BlockConverter>) -> Self {
		Self {
			inner,
			options: ConvertOptions::default(),
			options_revision: 0,
			cached: None,
			hits: 0,
			misses: 0,
		}
	}

	pub fn options(&self) -> &ConvertOptions {
		&self.options
	}

	/// Replaces the conversion options. Returns whether they changed.
	pub fn set_options(&mut self, options: ConvertOptions) -> bool {
		if options == self.options {
			return false;
		}
		self.options = options;
		self.options_revision += 1;
		tracing::debug!(revision = self.options_revision, "convert options changed");
		true
	}

	/// Drops the cached conversion.
	pub fn invalidate(&mut self) {
		self.cached = None;
	}

	/// Converts `content`, reusing the previous result when neither the
	/// content revision nor the options changed. Failures are not cached.
	pub fn convert(&mut self, content: &serde_json::Value, revision: RenderGeneration) -> Result<Arc<Converted>, ConvertError> {
		let key = CacheKey {
			content: revision,
			options: self.options_revision,
		};
		if let Some((cached_key, converted)) = &self.cached
			&& *cached_key == key
		{
			self.hits += 1;
			return Ok(Arc::clone(converted));
		}

		self.misses += 1;
		let converted = Arc::new(self.inner.convert(content, &self.options)?);
		self.cached = Some((key, Arc::clone(&converted)));
		Ok(converted)
	}

	pub fn hits(&self) -> u64 {
		self.hits
	}

	pub fn misses(&self) -> u64 {
		self.misses
	}
}
