use folio_primitives::{Epoch, RenderGeneration, Size};
use serde::{Deserialize, Serialize};

use crate::block::SectionBreak;
use crate::error::LayoutError;

/// US-Letter at 96 dpi.
pub const DEFAULT_PAGE_SIZE: Size = Size::new(816.0, 1056.0);

/// Page margins in pixels.
///
/// `header` and `footer` are the distances from the page edge to the
/// header and footer bands; the body starts at `top` unless a taller
/// header pushes it down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
	pub top: f32,
	pub right: f32,
	pub bottom: f32,
	pub left: f32,
	pub header: f32,
	pub footer: f32,
}

impl Default for Margins {
	fn default() -> Self {
		Self {
			top: 96.0,
			right: 96.0,
			bottom: 96.0,
			left: 96.0,
			header: 48.0,
			footer: 48.0,
		}
	}
}

/// Newspaper-style columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
	pub count: u16,
	pub gap: f32,
}

impl Default for Columns {
	fn default() -> Self {
		Self { count: 1, gap: 48.0 }
	}
}

/// How pages are arranged on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
	/// Pages stacked top to bottom. The only mode that virtualizes.
	#[default]
	Vertical,
	/// Pages side by side.
	Horizontal,
	/// Two-page spreads stacked vertically.
	Book,
}

/// Inputs that shape a layout pass besides the blocks themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
	pub page_size: Size,
	pub margins: Margins,
	pub columns: Columns,
	/// Vertical space between pages.
	pub page_gap: f32,
	pub mode: LayoutMode,
	/// Document epoch the blocks were produced from; stamped on the layout.
	pub epoch: Epoch,
	pub render_generation: RenderGeneration,
}

impl Default for LayoutOptions {
	fn default() -> Self {
		Self {
			page_size: DEFAULT_PAGE_SIZE,
			margins: Margins::default(),
			columns: Columns::default(),
			page_gap: 24.0,
			mode: LayoutMode::default(),
			epoch: Epoch::INITIAL,
			render_generation: RenderGeneration::default(),
		}
	}
}

impl LayoutOptions {
	/// Rejects page geometry that leaves no room for content.
	pub fn validate(&self) -> Result<(), LayoutError> {
		SectionGeometry::from_options(self).validate()
	}
}

/// Resolved page geometry for one section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SectionGeometry {
	pub page_size: Size,
	pub margins: Margins,
	pub columns: Columns,
}

impl SectionGeometry {
	pub fn from_options(options: &LayoutOptions) -> Self {
		Self {
			page_size: options.page_size,
			margins: options.margins,
			columns: options.columns,
		}
	}

	/// Geometry after a section break, inheriting anything it leaves unset.
	pub fn apply(&self, sb: &SectionBreak) -> Self {
		Self {
			page_size: sb.page_size.unwrap_or(self.page_size),
			margins: sb.margins.unwrap_or(self.margins),
			columns: sb.columns.unwrap_or(self.columns),
		}
	}

	pub fn validate(&self) -> Result<(), LayoutError> {
		if self.content_width() <= 0.0 {
			return Err(LayoutError::InvalidOptions("horizontal margins exceed page width"));
		}
		if self.body_height() <= 0.0 {
			return Err(LayoutError::InvalidOptions("vertical margins exceed page height"));
		}
		if self.column_width() <= 0.0 {
			return Err(LayoutError::InvalidOptions("column gaps exceed content width"));
		}
		Ok(())
	}

	pub fn column_count(&self) -> u16 {
		self.columns.count.max(1)
	}

	pub fn content_width(&self) -> f32 {
		self.page_size.width - self.margins.left - self.margins.right
	}

	pub fn body_height(&self) -> f32 {
		self.page_size.height - self.margins.top - self.margins.bottom
	}

	pub fn column_width(&self) -> f32 {
		let n = f32::from(self.column_count());
		(self.content_width() - self.columns.gap * (n - 1.0)) / n
	}

	pub fn column_x(&self, column: u16) -> f32 {
		self.margins.left + f32::from(column) * (self.column_width() + self.columns.gap)
	}
}
