use thiserror::Error;

use crate::block::BlockId;

/// Defects raised while measuring or packing blocks.
///
/// A failed pass never yields a partial [`Layout`](crate::Layout); callers
/// keep showing the previous one.
#[derive(Debug, Error)]
pub enum LayoutError {
	/// The measurer could not size a block.
	#[error("measuring block {block} failed: {message}")]
	Measure {
		/// Block that failed to measure.
		block: BlockId,
		/// Measurer-provided description.
		message: String,
	},

	/// The measurer returned a shape the paginator cannot place.
	#[error("malformed measure for block {block}: {reason}")]
	MalformedMeasure {
		/// Block whose measure was rejected.
		block: BlockId,
		/// What was wrong with it.
		reason: &'static str,
	},

	/// Page geometry leaves no room for content.
	#[error("invalid layout options: {0}")]
	InvalidOptions(&'static str),
}

impl LayoutError {
	/// Builds a [`LayoutError::Measure`] from any displayable failure.
	pub fn measure(block: BlockId, message: impl std::fmt::Display) -> Self {
		Self::Measure {
			block,
			message: message.to_string(),
		}
	}
}
