//! The active editing surface: the document body or one header/footer band.
//!
//! Activating a band lays it out on its own (against the band constraints)
//! and redirects every position-space query to that layout until the
//! session exits. Entering and leaving both flag a pending document change
//! so the body reflows around the band height.

mod surface;

use folio_layout::{IncrementalLayoutEngine, Layout, LayoutOptions, Measurer, RegionContent, RegionId, RegionKind, RegionLayout};
pub use surface::ActiveSurface;
use serde::Serialize;

use crate::error::SessionError;

/// Band being edited and where it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionTarget {
	pub region: RegionId,
	pub page_index: usize,
	/// Display number of the page the band was entered from.
	pub page_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HeaderFooterSession {
	#[default]
	Body,
	Header(RegionTarget),
	Footer(RegionTarget),
}

impl HeaderFooterSession {
	pub fn is_body(&self) -> bool {
		matches!(self, Self::Body)
	}

	pub fn kind(&self) -> Option<RegionKind> {
		match self {
			Self::Body => None,
			Self::Header(_) => Some(RegionKind::Header),
			Self::Footer(_) => Some(RegionKind::Footer),
		}
	}

	pub fn target(&self) -> Option<RegionTarget> {
		match self {
			Self::Body => None,
			Self::Header(t) | Self::Footer(t) => Some(*t),
		}
	}
}

/// A session change, for event reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTransition {
	pub from: HeaderFooterSession,
	pub to: HeaderFooterSession,
}

/// What activation needs from the rest of the engine.
pub struct RegionContext<'a> {
	pub layout: &'a Layout,
	pub regions: &'a [RegionContent],
	pub options: &'a LayoutOptions,
	pub overflow_base_height: f32,
	pub measurer: &'a dyn Measurer,
}

#[derive(Default)]
pub struct HeaderFooterSessionManager {
	session: HeaderFooterSession,
	active: Option<RegionLayout>,
	/// Band passes run here, never on the body engine.
	engine: IncrementalLayoutEngine,
	pending_doc_change: bool,
}

impl HeaderFooterSessionManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn session(&self) -> HeaderFooterSession {
		self.session
	}

	/// Layout of the active band, if a band is active.
	pub fn active_region(&self) -> Option<&RegionLayout> {
		self.active.as_ref()
	}

	/// Enters the `kind` band shown on `page_index`.
	pub fn activate_region(&mut self, kind: RegionKind, page_index: usize, ctx: &RegionContext<'_>) -> Result<SessionTransition, SessionError> {
		let count = ctx.layout.page_count();
		let page = ctx.layout.page(page_index).ok_or(SessionError::PageOutOfRange { page: page_index, count })?;
		let region = match kind {
			RegionKind::Header => page.header,
			RegionKind::Footer => page.footer,
		}
		.ok_or(SessionError::NoRegion { page: page_index, kind })?;
		let content = ctx
			.regions
			.iter()
			.find(|r| r.id == region)
			.ok_or(SessionError::UnknownRegion(region))?;

		let laid_out = self.engine.layout_region(content, ctx.options, ctx.overflow_base_height, ctx.measurer)?;
		let target = RegionTarget {
			region,
			page_index,
			page_number: page.number,
		};
		let to = match kind {
			RegionKind::Header => HeaderFooterSession::Header(target),
			RegionKind::Footer => HeaderFooterSession::Footer(target),
		};

		let from = std::mem::replace(&mut self.session, to);
		self.active = Some(laid_out);
		self.pending_doc_change = true;
		tracing::debug!(region = %region, page = page_index, ?kind, "header/footer session entered");
		Ok(SessionTransition { from, to })
	}

	/// Returns to body editing. `None` when already in the body.
	pub fn exit_mode(&mut self) -> Option<SessionTransition> {
		if self.session.is_body() {
			return None;
		}
		let from = std::mem::take(&mut self.session);
		self.active = None;
		self.pending_doc_change = true;
		tracing::debug!("header/footer session exited");
		Some(SessionTransition {
			from,
			to: HeaderFooterSession::Body,
		})
	}

	/// Consumes the flag raised by entering or leaving a band.
	pub fn take_pending_doc_change(&mut self) -> bool {
		std::mem::take(&mut self.pending_doc_change)
	}

	/// Re-lays the active band after a body pass.
	///
	/// Exits to the body when the band's page or content disappeared.
	pub fn refresh(&mut self, ctx: &RegionContext<'_>) -> Result<Option<SessionTransition>, SessionError> {
		let (Some(kind), Some(target)) = (self.session.kind(), self.session.target()) else {
			return Ok(None);
		};
		let still_there = ctx.layout.page(target.page_index).is_some_and(|p| match kind {
			RegionKind::Header => p.header == Some(target.region),
			RegionKind::Footer => p.footer == Some(target.region),
		});
		let content = ctx.regions.iter().find(|r| r.id == target.region);
		let Some(content) = content.filter(|_| still_there) else {
			tracing::debug!(region = %target.region, "active band no longer shown; leaving session");
			return Ok(self.exit_mode());
		};

		let laid_out = self.engine.layout_region(content, ctx.options, ctx.overflow_base_height, ctx.measurer)?;
		self.active = Some(laid_out);
		Ok(None)
	}

	/// Surface every position-space query should use.
	pub fn surface<'a>(&'a self, body: &'a Layout) -> ActiveSurface<'a> {
		match (self.session.kind(), self.session.target(), self.active.as_ref()) {
			(Some(kind), Some(target), Some(region)) => match body.page(target.page_index) {
				Some(page) => ActiveSurface::Region { kind, region, page },
				None => ActiveSurface::Body(body),
			},
			_ => ActiveSurface::Body(body),
		}
	}
}
