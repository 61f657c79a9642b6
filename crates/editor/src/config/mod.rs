//! Engine configuration loaded from TOML.
//!
//! Every section is optional; missing keys fall back to US-Letter at 96 dpi
//! with a single column and windowed rendering enabled.


use std::time::Duration;

use folio_layout::{Columns, LayoutMode, LayoutOptions, Margins, VirtualizationPolicy};
use folio_primitives::{Epoch, RenderGeneration, Size};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	pub page: PageConfig,
	pub view: ViewConfig,
	pub mapper: MapperConfig,
	pub index: IndexConfig,
	pub header_footer: HeaderFooterConfig,
}

/// Page geometry shared by every section that does not override it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
	pub width: f32,
	pub height: f32,
	pub margins: Margins,
	/// Space between consecutive pages on the scroll surface.
	pub gap: f32,
	pub columns: Columns,
	/// Space between body text and the footnote area.
	pub footnote_gap: f32,
}

impl Default for PageConfig {
	fn default() -> Self {
		Self {
			width: 816.0,
			height: 1056.0,
			margins: Margins::default(),
			gap: 24.0,
			columns: Columns::default(),
			footnote_gap: 12.0,
		}
	}
}

/// Scroll surface and windowed rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
	pub mode: LayoutMode,
	pub virtualize: bool,
	/// Pages kept mounted above the first visible page.
	pub window_before: usize,
	/// Pages kept mounted below the last visible page.
	pub window_after: usize,
	pub mount_timeout_ms: u64,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			mode: LayoutMode::Vertical,
			virtualize: true,
			window_before: 1,
			window_after: 1,
			mount_timeout_ms: 2000,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
	/// Epochs behind the last completed layout that stay mappable.
	pub retained_epochs: u64,
}

impl Default for MapperConfig {
	fn default() -> Self {
		Self { retained_epochs: 64 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
	/// Largest disagreement, in pixels, between painted and analytic
	/// geometry that still counts as agreement.
	pub rect_tolerance: f32,
}

impl Default for IndexConfig {
	fn default() -> Self {
		Self { rect_tolerance: 2.0 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderFooterConfig {
	/// Decorative band content reaching past this height does not grow the band.
	pub overflow_base_height: f32,
}

impl Default for HeaderFooterConfig {
	fn default() -> Self {
		Self { overflow_base_height: 96.0 }
	}
}

impl EngineConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects values that parse but cannot produce a layout.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let page = &self.page;
		if !(page.width.is_finite() && page.height.is_finite()) || page.width <= 0.0 || page.height <= 0.0 {
			return Err(ConfigError::Invalid(format!("page size {}x{} must be positive", page.width, page.height)));
		}
		let m = &page.margins;
		if [m.top, m.right, m.bottom, m.left, m.header, m.footer, page.gap, page.footnote_gap]
			.iter()
			.any(|v| !v.is_finite() || *v < 0.0)
		{
			return Err(ConfigError::Invalid("margins and gaps must be finite and non-negative".into()));
		}
		if page.columns.count == 0 {
			return Err(ConfigError::Invalid("columns.count must be at least 1".into()));
		}
		if !self.index.rect_tolerance.is_finite() || self.index.rect_tolerance < 0.0 {
			return Err(ConfigError::Invalid("index.rect_tolerance must be non-negative".into()));
		}
		if !self.header_footer.overflow_base_height.is_finite() || self.header_footer.overflow_base_height < 0.0 {
			return Err(ConfigError::Invalid("header_footer.overflow_base_height must be non-negative".into()));
		}
		self.layout_options(Epoch::INITIAL, RenderGeneration::default())
			.validate()
			.map_err(|e| ConfigError::Invalid(e.to_string()))
	}

	/// Options for a pass over the document at `epoch`.
	pub fn layout_options(&self, epoch: Epoch, render_generation: RenderGeneration) -> LayoutOptions {
		LayoutOptions {
			page_size: Size::new(self.page.width, self.page.height),
			margins: self.page.margins,
			columns: self.page.columns,
			page_gap: self.page.gap,
			mode: self.view.mode,
			epoch,
			render_generation,
		}
	}

	pub fn virtualization(&self) -> VirtualizationPolicy {
		VirtualizationPolicy {
			enabled: self.view.virtualize,
			mode: self.view.mode,
		}
	}

	pub fn mount_timeout(&self) -> Duration {
		Duration::from_millis(self.view.mount_timeout_ms)
	}
}
