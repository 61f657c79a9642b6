//! The presentation pipeline: document transactions in, painted pages and
//! selection overlays out.
//!
//! One [`PresentationEngine`] serves one document. It is driven by the
//! host's frame callback ([`PresentationEngine::on_frame`]) and never blocks
//! on layout: passes run on the blocking pool and are polled for completion
//! on the next frame. At most one pass is in flight; requests arriving
//! meanwhile collapse into a single follow-up pass.
//!
//! # Pass lifecycle
//!
//! 1. A structural transaction advances the epoch and schedules a pass.
//! 2. The next frame converts content (cached per render generation) and
//!    spawns the layout pass stamped with the current epoch.
//! 3. A later frame polls the pass. On success the layout is painted with
//!    the composed mapping since the last paint, the position index is
//!    rebuilt and mounts are published.
//! 4. The selection coordinator is told the painted epoch and paints the
//!    overlay only when it equals the document's current epoch.
//!
//! A failure at any stage leaves the previous layout and visual tree on
//! screen and is reported as [`EngineEvent::Error`].

#[cfg(test)]
mod harness;
mod invariants;
#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use folio_layout::{
	BlockId, DocPoint, FootnoteInput, HeaderFooterInput, IncrementalLayoutEngine, Layout, LayoutError, LayoutInput, LayoutResult, Measurer, PageRect, PinInput,
	RegionKind, VirtualWindow, compute_pins, mounted_pages,
};
use folio_primitives::{Bias, Epoch, Pos, PosRange, RenderGeneration, poll_once};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::config::EngineConfig;
use crate::convert::CachedConverter;
use crate::error::{ConfigError, PipelineError, SessionError};
use crate::events::{EngineEvent, EventBus};
use crate::header_footer::{ActiveSurface, HeaderFooterSession, HeaderFooterSessionManager, RegionContext, SessionTransition};
use crate::health::{Health, HealthTracker};
use crate::mapper::{EpochPositionMapper, MapOutcome};
use crate::mount::PageMounts;
use crate::pointer::PointerState;
use crate::position_index::{IndexObserver, RenderedPositionIndex};
use crate::selection_sync::{RenderDecision, SelectionSyncCoordinator};
use crate::source::{BlockConverter, ConvertOptions, Converted, DocTransaction, DocumentSource, OverlayFrame, PaintFrame, Painter, SelectionOverlay};

/// External collaborators of one engine.
pub struct Collaborators {
	pub source: Arc<dyn DocumentSource>,
	pub converter: Box<dyn BlockConverter>,
	/// Shared with the blocking pool; must be pure.
	pub measurer: Arc<dyn Measurer + Send + Sync>,
	pub painter: Box<dyn Painter>,
	pub overlay: Box<dyn SelectionOverlay>,
}

/// The converted input and layout currently on screen.
#[derive(Debug)]
pub struct Presented {
	pub converted: Arc<Converted>,
	pub result: LayoutResult,
}

struct PassDone {
	result: Result<LayoutResult, LayoutError>,
	elapsed: Duration,
}

struct InFlight {
	handle: JoinHandle<PassDone>,
	/// Pass generation at spawn; a mismatch at completion discards the pass.
	generation: u64,
	epoch: Epoch,
	render_generation: RenderGeneration,
	converted: Arc<Converted>,
}

pub struct PresentationEngine {
	config: EngineConfig,
	source: Arc<dyn DocumentSource>,
	measurer: Arc<dyn Measurer + Send + Sync>,
	painter: Box<dyn Painter>,
	overlay: Box<dyn SelectionOverlay>,
	transactions: mpsc::UnboundedReceiver<DocTransaction>,

	mapper: EpochPositionMapper,
	render_generation: RenderGeneration,
	converter: CachedConverter,
	engine: Arc<Mutex<IncrementalLayoutEngine>>,

	index: RenderedPositionIndex,
	observer: IndexObserver,
	selection_sync: SelectionSyncCoordinator,
	sessions: HeaderFooterSessionManager,
	pointer: PointerState,
	health: HealthTracker,
	events: EventBus,
	mounts: Arc<PageMounts>,

	presented: Option<Arc<Presented>>,
	/// Epoch of the last successful paint; the next paint's mapping starts here.
	painted_epoch: Option<Epoch>,
	/// Bumped by reset, session switches and config changes.
	pass_generation: u64,
	in_flight: Option<InFlight>,
	rerender_requested: bool,
	/// A rerender arrived while a pass was in flight.
	pending: bool,
	layout_completed: bool,
	passes_started: u64,

	/// `(top, height)` of the scroll viewport in surface coordinates.
	viewport: Option<(f32, f32)>,
	extra_pins: Vec<usize>,
}

impl PresentationEngine {
	/// Builds an engine and subscribes to the source. No pass runs until
	/// the first frame.
	pub fn new(config: EngineConfig, collab: Collaborators) -> Result<Self, ConfigError> {
		config.validate()?;
		let Collaborators {
			source,
			converter,
			measurer,
			painter,
			overlay,
		} = collab;
		let transactions = source.subscribe();
		let mapper = EpochPositionMapper::new(config.mapper.retained_epochs);
		let mut selection_sync = SelectionSyncCoordinator::new();
		selection_sync.on_doc_epoch(mapper.current_epoch());
		Ok(Self {
			config,
			source,
			measurer,
			painter,
			overlay,
			transactions,
			mapper,
			render_generation: RenderGeneration::default(),
			converter: CachedConverter::new(converter),
			engine: Arc::new(Mutex::new(IncrementalLayoutEngine::new())),
			index: RenderedPositionIndex::new(),
			observer: IndexObserver::new(),
			selection_sync,
			sessions: HeaderFooterSessionManager::new(),
			pointer: PointerState::new(),
			health: HealthTracker::new(),
			events: EventBus::new(),
			mounts: Arc::new(PageMounts::new()),
			presented: None,
			painted_epoch: None,
			pass_generation: 0,
			in_flight: None,
			rerender_requested: true,
			pending: false,
			layout_completed: false,
			passes_started: 0,
			viewport: None,
			extra_pins: Vec::new(),
		})
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn health(&self) -> Health {
		self.health.health()
	}

	pub fn current_epoch(&self) -> Epoch {
		self.mapper.current_epoch()
	}

	pub fn render_generation(&self) -> RenderGeneration {
		self.render_generation
	}

	/// Epoch of the layout last painted.
	pub fn painted_epoch(&self) -> Option<Epoch> {
		self.painted_epoch
	}

	/// False after a pass was discarded as superseded, until the next
	/// successful pass.
	pub fn layout_completed(&self) -> bool {
		self.layout_completed
	}

	pub fn is_layout_in_flight(&self) -> bool {
		self.in_flight.is_some()
	}

	/// Layout passes spawned so far.
	pub fn passes_started(&self) -> u64 {
		self.passes_started
	}

	pub fn presented(&self) -> Option<&Presented> {
		self.presented.as_deref()
	}

	pub fn layout(&self) -> Option<&Layout> {
		self.presented.as_deref().map(|p| &p.result.layout)
	}

	pub fn session(&self) -> HeaderFooterSession {
		self.sessions.session()
	}

	pub fn index(&self) -> &RenderedPositionIndex {
		&self.index
	}

	pub fn pointer(&self) -> &PointerState {
		&self.pointer
	}

	pub fn mounts(&self) -> Arc<PageMounts> {
		Arc::clone(&self.mounts)
	}

	pub fn subscribe_events(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
		self.events.subscribe()
	}

	/// Applies one document transaction.
	///
	/// Only structural transactions advance the epoch. Meta transactions
	/// asking for a rerender bump the render generation alone.
	pub fn apply_transaction(&mut self, tx: DocTransaction) {
		if tx.doc_changed {
			let epoch = self.mapper.record_transaction(tx.mapping);
			self.selection_sync.on_doc_epoch(epoch);
			self.pointer.on_structural_change(&self.mapper);
		} else if !tx.meta.rerender {
			return;
		}
		self.render_generation = self.render_generation.next();
		tracing::trace!(
			epoch = %self.mapper.current_epoch(),
			generation = %self.render_generation,
			origin = ?tx.meta.origin,
			"transaction applied"
		);
		self.schedule_rerender();
	}

	/// Requests a layout pass. Repeated calls before the next frame, or
	/// while a pass runs, yield exactly one pass.
	pub fn schedule_rerender(&mut self) {
		if self.in_flight.is_some() {
			self.pending = true;
			tracing::trace!("rerender queued behind in-flight pass");
		} else {
			self.rerender_requested = true;
		}
	}

	/// Frame callback: drains transactions, installs a finished pass, starts
	/// a requested one and paints a selection that became paintable.
	pub fn on_frame(&mut self) {
		while let Ok(tx) = self.transactions.try_recv() {
			self.apply_transaction(tx);
		}

		let finished = self.in_flight.as_mut().and_then(|flight| poll_once(&mut flight.handle));
		if let Some(joined) = finished
			&& let Some(flight) = self.in_flight.take()
		{
			self.complete_pass(flight, joined);
		}

		if self.rerender_requested && self.in_flight.is_none() {
			self.start_pass();
		}

		if self.selection_sync.on_frame() {
			self.paint_selection();
		}
	}

	/// Runs frames until no pass is in flight or requested.
	pub async fn settle(&mut self) {
		loop {
			self.on_frame();
			let joined = match self.in_flight.as_mut() {
				Some(flight) => (&mut flight.handle).await,
				None => break,
			};
			if let Some(flight) = self.in_flight.take() {
				self.complete_pass(flight, joined);
			}
		}
	}

	/// Asks for a caret/selection paint.
	pub fn request_selection_render(&mut self, immediate: bool) -> RenderDecision {
		let decision = self.selection_sync.request_render(immediate);
		if decision == RenderDecision::Now {
			self.paint_selection();
		}
		decision
	}

	/// Maps a position authored at `from` into the current epoch.
	pub fn map_position(&self, pos: Pos, from: Epoch, bias: Bias) -> MapOutcome {
		self.mapper.map_position(pos, from, bias)
	}

	/// Document position under `at` on the active surface.
	pub fn hit_test(&self, at: DocPoint) -> Option<Pos> {
		let presented = self.presented.as_deref()?;
		self.sessions.surface(&presented.result.layout).hit_test(at)
	}

	/// Caret geometry on the active surface. Body carets prefer painted
	/// geometry and never guess across a disagreement.
	pub fn caret_rect(&self, pos: Pos) -> Option<PageRect> {
		let presented = self.presented.as_deref()?;
		match self.sessions.surface(&presented.result.layout) {
			ActiveSurface::Body(layout) => self.index.rect_for_pos(pos, layout, self.config.index.rect_tolerance),
			surface => surface.caret_rect(pos),
		}
	}

	pub fn selection_rects(&self, range: PosRange) -> Vec<PageRect> {
		match self.presented.as_deref() {
			Some(presented) => self.sessions.surface(&presented.result.layout).selection_rects(range),
			None => Vec::new(),
		}
	}

	/// Enters the `kind` band shown on `page`.
	pub fn activate_region(&mut self, kind: RegionKind, page: usize) -> Result<(), SessionError> {
		let presented = self.presented.clone().ok_or(SessionError::NoLayout)?;
		let options = self.config.layout_options(self.mapper.current_epoch(), self.render_generation);
		let ctx = RegionContext {
			layout: &presented.result.layout,
			regions: &presented.converted.regions,
			options: &options,
			overflow_base_height: self.config.header_footer.overflow_base_height,
			measurer: &*self.measurer,
		};
		let transition = self.sessions.activate_region(kind, page, &ctx)?;
		self.on_session_transition(transition);
		Ok(())
	}

	/// Returns to body editing. False when already there.
	pub fn exit_mode(&mut self) -> bool {
		match self.sessions.exit_mode() {
			Some(transition) => {
				self.on_session_transition(transition);
				true
			}
			None => false,
		}
	}

	/// Sets the scroll viewport that drives the mounted window.
	pub fn set_viewport(&mut self, top: f32, height: f32) {
		self.viewport = Some((top, height));
		self.schedule_rerender();
	}

	/// Pages that must stay mounted in addition to the selection and drag pins.
	pub fn pin_pages(&mut self, pages: Vec<usize>) {
		self.extra_pins = pages;
		self.schedule_rerender();
	}

	/// Starts a drag at `at`; `cell` names the table cell under the pointer.
	pub fn begin_drag(&mut self, at: DocPoint, cell: Option<(BlockId, usize, usize)>) -> Option<Pos> {
		let pos = self.hit_test(at)?;
		self.pointer.begin_drag(pos, at.page, self.mapper.current_epoch(), cell);
		Some(pos)
	}

	/// Extends the drag; pages under the pointer stay mounted.
	pub fn drag_to(&mut self, at: DocPoint) -> Option<Pos> {
		let last = self.pointer.drag().map(|d| d.last_hit_page)?;
		self.pointer.drag_to(at.page);
		if last != at.page {
			self.schedule_rerender();
		}
		self.hit_test(at)
	}

	pub fn end_drag(&mut self) {
		if self.pointer.end_drag().is_some() {
			self.schedule_rerender();
		}
	}

	/// Reports a structural mutation of the painted tree made outside a paint.
	pub fn on_host_mutation(&mut self) {
		if self.observer.record_mutation() {
			self.index.rebuild(self.painter.host());
		}
	}

	/// Opens a batch of host-side mutations; reports inside it are coalesced.
	/// Batches nest.
	pub fn begin_host_mutations(&mut self) {
		self.observer.pause();
	}

	/// Closes a batch. The outermost close rebuilds the index once if any
	/// mutation was reported inside.
	pub fn end_host_mutations(&mut self) {
		if self.observer.resume() {
			self.index.rebuild(self.painter.host());
		}
	}

	/// Replaces the configuration. A pass in flight is discarded.
	pub fn set_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
		config.validate()?;
		self.config = config;
		self.supersede_in_flight();
		self.schedule_rerender();
		Ok(())
	}

	pub fn set_convert_options(&mut self, options: ConvertOptions) {
		if self.converter.set_options(options) {
			self.schedule_rerender();
		}
	}

	/// Forgets every incremental cache and relays the document from scratch.
	///
	/// The epoch keeps counting; positions recorded before the reset still map.
	pub fn reset(&mut self) {
		self.supersede_in_flight();
		self.converter.invalidate();
		self.presented = None;
		self.painted_epoch = None;
		self.layout_completed = false;
		if let Some(transition) = self.sessions.exit_mode() {
			self.events.emit(EngineEvent::SessionChanged { session: transition.to });
		}
		self.sessions.take_pending_doc_change();
		self.pointer = PointerState::new();
		self.health.reset();
		self.selection_sync.abort();
		self.render_generation = self.render_generation.next();
		tracing::debug!(generation = self.pass_generation, "engine reset");
		self.schedule_rerender();
	}

	fn supersede_in_flight(&mut self) {
		self.pass_generation += 1;
	}

	fn on_session_transition(&mut self, transition: SessionTransition) {
		self.events.emit(EngineEvent::SessionChanged { session: transition.to });
		if self.sessions.take_pending_doc_change() {
			self.supersede_in_flight();
			self.schedule_rerender();
		}
		self.selection_sync.request_render(false);
	}

	fn start_pass(&mut self) {
		self.rerender_requested = false;
		let epoch = self.mapper.current_epoch();
		let render_generation = self.render_generation;

		let content = self.source.content();
		let converted = match self.converter.convert(&content, render_generation) {
			Ok(converted) => converted,
			Err(err) => {
				self.fail_pass(PipelineError::Convert(err), epoch);
				return;
			}
		};

		let options = self.config.layout_options(epoch, render_generation);
		let header_footer = HeaderFooterInput {
			regions: converted.regions.clone(),
			overflow_base_height: self.config.header_footer.overflow_base_height,
		};
		let footnotes = FootnoteInput {
			notes: converted.footnotes.clone(),
			separator_gap: self.config.page.footnote_gap,
		};
		let previous = self.presented.clone();
		let engine = Arc::clone(&self.engine);
		let measurer = Arc::clone(&self.measurer);
		let blocks = Arc::clone(&converted);

		let handle = tokio::task::spawn_blocking(move || {
			let started = Instant::now();
			let mut input = LayoutInput::new(&blocks.blocks, &options)
				.with_header_footer(&header_footer)
				.with_footnotes(&footnotes);
			if let Some(prev) = &previous {
				input = input.with_previous(&prev.converted.blocks, Some(&prev.result.layout), &prev.result.measures);
			}
			let result = engine.lock().layout(input, &*measurer);
			PassDone {
				result,
				elapsed: started.elapsed(),
			}
		});

		self.selection_sync.on_layout_start();
		self.passes_started += 1;
		self.in_flight = Some(InFlight {
			handle,
			generation: self.pass_generation,
			epoch,
			render_generation,
			converted,
		});
		tracing::trace!(epoch = %epoch, generation = %render_generation, "layout pass started");
	}

	fn complete_pass(&mut self, flight: InFlight, joined: Result<PassDone, JoinError>) {
		let epoch = flight.epoch;
		if flight.generation != self.pass_generation {
			tracing::debug!(epoch = %epoch, "discarding superseded layout pass");
			self.layout_completed = false;
			self.selection_sync.on_layout_abort();
			self.start_follow_up(true);
			return;
		}

		let outcome = match joined {
			Ok(done) => {
				tracing::trace!(epoch = %epoch, elapsed_ms = done.elapsed.as_millis() as u64, "layout pass finished");
				done.result.map_err(PipelineError::Layout)
			}
			Err(err) => {
				tracing::error!(error = %err, epoch = %epoch, "layout task failed");
				Err(PipelineError::Join(err.to_string()))
			}
		};

		if let Err(err) = outcome.and_then(|result| self.present(flight.converted, result, epoch, flight.render_generation)) {
			self.fail_pass(err, epoch);
		}
		self.start_follow_up(false);
	}

	/// Starts the single follow-up pass owed to requests made during the
	/// last one. A discarded pass always owes one.
	fn start_follow_up(&mut self, discarded: bool) {
		if std::mem::take(&mut self.pending) || discarded {
			self.rerender_requested = true;
		}
		if self.rerender_requested && self.in_flight.is_none() {
			self.start_pass();
		}
	}

	fn present(&mut self, converted: Arc<Converted>, result: LayoutResult, epoch: Epoch, render_generation: RenderGeneration) -> Result<(), PipelineError> {
		let mapping = self.painted_epoch.and_then(|from| self.mapper.compose_range(from, epoch));
		let mounted = self.mounted_for(&result.layout);

		self.painter.paint(PaintFrame {
			layout: &result.layout,
			headers: &result.headers,
			footers: &result.footers,
			mounted: &mounted,
			mapping: mapping.as_ref(),
		})?;

		// A paint replaces the whole tree.
		self.index.rebuild(self.painter.host());
		let page_count = result.layout.page_count();
		let stats = result.stats;
		self.mounts.publish(mounted, page_count);
		self.presented = Some(Arc::new(Presented { converted, result }));
		self.painted_epoch = Some(epoch);
		self.layout_completed = true;
		self.mapper.on_layout_complete(epoch);
		self.refresh_session();

		tracing::debug!(
			epoch = %epoch,
			pages = page_count,
			reused = stats.reused,
			measured = stats.measured,
			"layout presented"
		);
		if let Some((from, to)) = self.health.on_success() {
			self.events.emit(EngineEvent::HealthChanged { from, to });
		}
		self.events.emit(EngineEvent::LayoutUpdated {
			epoch,
			render_generation,
			page_count,
			reused: stats.reused,
			measured: stats.measured,
		});

		self.selection_sync.request_render(false);
		if self.selection_sync.on_layout_complete(epoch) {
			self.paint_selection();
		}
		Ok(())
	}

	fn refresh_session(&mut self) {
		let Some(presented) = self.presented.clone() else {
			return;
		};
		let options = self.config.layout_options(self.mapper.current_epoch(), self.render_generation);
		let ctx = RegionContext {
			layout: &presented.result.layout,
			regions: &presented.converted.regions,
			options: &options,
			overflow_base_height: self.config.header_footer.overflow_base_height,
			measurer: &*self.measurer,
		};
		let transition = match self.sessions.refresh(&ctx) {
			Ok(transition) => transition,
			Err(err) => {
				tracing::warn!(error = %err, "header/footer relayout failed; leaving session");
				self.sessions.exit_mode()
			}
		};
		if let Some(transition) = transition {
			self.events.emit(EngineEvent::SessionChanged { session: transition.to });
			// The band is gone from this layout, so the body needs no reflow.
			self.sessions.take_pending_doc_change();
		}
	}

	/// Pages to mount: the viewport window plus pins, or every page when
	/// windowed rendering is off.
	fn mounted_for(&self, layout: &Layout) -> BTreeSet<usize> {
		let policy = self.config.virtualization();
		let count = layout.page_count();
		if !policy.is_active() {
			return (0..count).collect();
		}

		let (before, after) = (self.config.view.window_before, self.config.view.window_after);
		let window = match self.viewport {
			Some((top, height)) => VirtualWindow::for_viewport(layout, top, height, 0).map(|w| VirtualWindow {
				first: w.first.saturating_sub(before),
				last: (w.last + after).min(count.saturating_sub(1)),
			}),
			None => VirtualWindow::around(0, before, after, count),
		};

		let drag = self.pointer.drag();
		let pins = compute_pins(&PinInput {
			selection: Some(self.source.selection()),
			doc_size: self.source.doc_size(),
			include_drag_buffer: drag.is_some(),
			drag_anchor_page_index: drag.map(|d| d.anchor_page),
			drag_last_hit_page_index: drag.map(|d| d.last_hit_page),
			extra_pages: &self.extra_pins,
			..PinInput::new(layout, policy)
		});
		mounted_pages(window, &pins)
	}

	/// Paints the overlay against the presented layout, or leaves the
	/// previous overlay untouched when that layout is behind the document.
	fn paint_selection(&mut self) {
		let epoch = self.mapper.current_epoch();
		let Some(presented) = self.presented.clone() else {
			self.selection_sync.abort();
			return;
		};
		if self.selection_sync.layout_epoch() != Some(epoch) {
			tracing::trace!(epoch = %epoch, layout = ?self.selection_sync.layout_epoch(), "selection paint refused against stale layout");
			self.selection_sync.abort();
			return;
		}

		let selection = self.source.selection();
		let surface = self.sessions.surface(&presented.result.layout);
		let caret = match surface {
			ActiveSurface::Body(layout) => self.index.rect_for_pos(selection.head, layout, self.config.index.rect_tolerance),
			_ => surface.caret_rect(selection.head),
		};
		let rects = if selection.is_collapsed() { Vec::new() } else { surface.selection_rects(selection.range()) };
		let frame = OverlayFrame {
			epoch,
			surface: surface.kind(),
			caret,
			rects,
		};

		self.overlay.render(&frame);
		self.selection_sync.finish_render();
		self.events.emit(EngineEvent::SelectionPainted { epoch });
	}

	fn fail_pass(&mut self, err: PipelineError, epoch: Epoch) {
		tracing::warn!(error = %err, epoch = %epoch, kind = ?err.kind(), "presentation pass failed; keeping previous layout");
		self.selection_sync.on_layout_abort();
		if let Some((from, to)) = self.health.on_error() {
			self.events.emit(EngineEvent::HealthChanged { from, to });
		}
		self.events.emit(EngineEvent::Error {
			kind: err.kind(),
			message: err.to_string(),
			epoch,
		});
	}
}
