//! Scripted collaborators for pipeline tests.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use folio_layout::{FixedMetrics, FlowBlock, HeaderFooterVariant, RegionContent, RegionId, RegionKind};
use folio_primitives::{Change, ChangeSet, Epoch, PosLen, PosRange, Rect, Selection};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use super::{Collaborators, PresentationEngine};
use crate::config::EngineConfig;
use crate::error::{ConvertError, PaintError};
use crate::events::EngineEvent;
use crate::position_index::{PaintedHost, PaintedNode};
use crate::source::{BlockConverter, ConvertOptions, Converted, DocTransaction, DocumentSource, OverlayFrame, PaintFrame, Painter, SelectionOverlay};

/// Paragraphs separated by one position, plus an optional default header.
#[derive(Debug, Clone, Default)]
pub(crate) struct Doc {
	pub paras: Vec<String>,
	pub header: Option<String>,
	pub selection: Selection,
}

impl Doc {
	pub fn paras(paras: &[&str]) -> Self {
		Self {
			paras: paras.iter().map(|p| (*p).to_owned()).collect(),
			..Self::default()
		}
	}

	/// One paragraph of `len` positions: three pages at ten per line.
	pub fn long(len: usize) -> Self {
		Self {
			paras: vec!["x".repeat(len)],
			..Self::default()
		}
	}

	pub fn with_header(mut self, text: &str) -> Self {
		self.header = Some(text.to_owned());
		self
	}

	pub fn with_selection(mut self, selection: Selection) -> Self {
		self.selection = selection;
		self
	}

	fn ranges(&self) -> Vec<PosRange> {
		let mut start = 0;
		self.paras
			.iter()
			.map(|p| {
				let range = PosRange::new(start, start + p.len());
				start += p.len() + 1;
				range
			})
			.collect()
	}

	fn size(&self) -> PosLen {
		self.ranges().last().map_or(0, |r| r.end)
	}
}

pub(crate) struct FakeSource {
	doc: Mutex<Doc>,
	subscribers: Mutex<Vec<mpsc::UnboundedSender<DocTransaction>>>,
}

impl FakeSource {
	pub fn new(doc: Doc) -> Arc<Self> {
		Arc::new(Self {
			doc: Mutex::new(doc),
			subscribers: Mutex::new(Vec::new()),
		})
	}

	/// Inserts `text` at `pos` inside the paragraph containing it.
	pub fn insert(&self, pos: usize, text: &str) {
		let mapping = {
			let mut doc = self.doc.lock();
			let before = doc.size();
			let (i, range) = doc
				.ranges()
				.into_iter()
				.enumerate()
				.find(|(_, r)| r.contains_inclusive(pos))
				.expect("position inside a paragraph");
			doc.paras[i].insert_str(pos - range.start, text);
			ChangeSet::from_changes(before, [Change::insert(pos, text.len())])
		};
		self.send(DocTransaction::edit(mapping));
	}

	pub fn send(&self, tx: DocTransaction) {
		self.subscribers.lock().retain(|s| s.send(tx.clone()).is_ok());
	}

	pub fn set_selection(&self, selection: Selection) {
		self.doc.lock().selection = selection;
	}

	pub fn set_header(&self, header: Option<&str>) {
		self.doc.lock().header = header.map(str::to_owned);
	}
}

impl DocumentSource for FakeSource {
	fn content(&self) -> serde_json::Value {
		let doc = self.doc.lock();
		json!({ "paras": doc.paras, "header": doc.header })
	}

	fn selection(&self) -> Selection {
		self.doc.lock().selection
	}

	fn doc_size(&self) -> PosLen {
		self.doc.lock().size()
	}

	fn subscribe(&self) -> mpsc::UnboundedReceiver<DocTransaction> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.lock().push(tx);
		rx
	}
}

pub(crate) struct FakeConverter {
	pub fail: Arc<AtomicBool>,
	pub calls: Arc<AtomicUsize>,
}

impl BlockConverter for FakeConverter {
	fn convert(&self, content: &serde_json::Value, _options: &ConvertOptions) -> Result<Converted, ConvertError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.fail.load(Ordering::SeqCst) {
			return Err(ConvertError::InvalidContent("scripted failure".into()));
		}
		let paras = content["paras"].as_array().ok_or_else(|| ConvertError::InvalidContent("no paras".into()))?;
		let mut start = 0;
		let mut blocks = Vec::new();
		for (i, para) in paras.iter().enumerate() {
			let text = para.as_str().unwrap_or_default();
			blocks.push(FlowBlock::paragraph(i as u64, PosRange::new(start, start + text.len()), text));
			start += text.len() + 1;
		}
		let regions = content["header"]
			.as_str()
			.map(|text| RegionContent {
				id: RegionId(1),
				kind: RegionKind::Header,
				variant: HeaderFooterVariant::Default,
				blocks: vec![FlowBlock::paragraph(100, PosRange::new(0, text.len()), text)],
			})
			.into_iter()
			.collect();
		Ok(Converted {
			blocks,
			regions,
			..Converted::default()
		})
	}
}

#[derive(Debug, Clone)]
pub(crate) struct FrameRecord {
	pub epoch: Epoch,
	pub page_count: usize,
	pub mounted: BTreeSet<usize>,
	pub mapping: Option<ChangeSet>,
}

#[derive(Debug, Default)]
pub(crate) struct PaintLog {
	pub frames: Vec<FrameRecord>,
	pub fail: bool,
}

/// Paints one node per line box of every mounted page.
pub(crate) struct FakePainter {
	log: Arc<Mutex<PaintLog>>,
	roots: Vec<PaintedNode>,
}

impl Painter for FakePainter {
	fn paint(&mut self, frame: PaintFrame<'_>) -> Result<(), PaintError> {
		let mut log = self.log.lock();
		if log.fail {
			return Err(PaintError::Rejected("scripted failure".into()));
		}
		let mut next_id = 0;
		let mut roots = Vec::new();
		for &index in frame.mounted {
			let page = frame.layout.page(index).ok_or(PaintError::MissingPage(index))?;
			let mut lines = Vec::new();
			for fragment in &page.fragments {
				for line in &fragment.lines {
					next_id += 1;
					let rect = Rect::new(fragment.x, fragment.y + line.y, fragment.width, line.height);
					lines.push(PaintedNode::new(next_id, index, rect, Some(line.pm_range)));
				}
			}
			next_id += 1;
			let bounds = Rect::new(0.0, 0.0, page.size.width, page.size.height);
			roots.push(PaintedNode::new(next_id, index, bounds, None).with_children(lines));
		}
		self.roots = roots;
		log.frames.push(FrameRecord {
			epoch: frame.layout.layout_epoch,
			page_count: frame.layout.page_count(),
			mounted: frame.mounted.clone(),
			mapping: frame.mapping.cloned(),
		});
		Ok(())
	}

	fn host(&self) -> &dyn PaintedHost {
		self
	}
}

impl PaintedHost for FakePainter {
	fn roots(&self) -> &[PaintedNode] {
		&self.roots
	}
}

pub(crate) struct FakeOverlay {
	frames: Arc<Mutex<Vec<OverlayFrame>>>,
}

impl SelectionOverlay for FakeOverlay {
	fn render(&mut self, frame: &OverlayFrame) {
		self.frames.lock().push(frame.clone());
	}
}

pub(crate) struct Harness {
	pub engine: PresentationEngine,
	pub source: Arc<FakeSource>,
	pub convert_fail: Arc<AtomicBool>,
	pub convert_calls: Arc<AtomicUsize>,
	pub paints: Arc<Mutex<PaintLog>>,
	pub overlays: Arc<Mutex<Vec<OverlayFrame>>>,
	pub metrics: Arc<FixedMetrics>,
	pub events: mpsc::UnboundedReceiver<EngineEvent>,
}

impl Harness {
	pub fn new(doc: Doc) -> Self {
		Self::with_config(doc, EngineConfig::default())
	}

	pub fn with_config(doc: Doc, config: EngineConfig) -> Self {
		let _ = tracing_subscriber::fmt::try_init();
		let source = FakeSource::new(doc);
		let convert_fail = Arc::new(AtomicBool::new(false));
		let convert_calls = Arc::new(AtomicUsize::new(0));
		let paints = Arc::new(Mutex::new(PaintLog::default()));
		let overlays = Arc::new(Mutex::new(Vec::new()));
		let metrics = Arc::new(FixedMetrics::new(10, 20.0));

		let mut engine = PresentationEngine::new(
			config,
			Collaborators {
				source: source.clone(),
				converter: Box::new(FakeConverter {
					fail: convert_fail.clone(),
					calls: convert_calls.clone(),
				}),
				measurer: metrics.clone(),
				painter: Box::new(FakePainter {
					log: paints.clone(),
					roots: Vec::new(),
				}),
				overlay: Box::new(FakeOverlay { frames: overlays.clone() }),
			},
		)
		.expect("valid config");
		let events = engine.subscribe_events();

		Self {
			engine,
			source,
			convert_fail,
			convert_calls,
			paints,
			overlays,
			metrics,
			events,
		}
	}

	pub fn drain_events(&mut self) -> Vec<EngineEvent> {
		let mut out = Vec::new();
		while let Ok(event) = self.events.try_recv() {
			out.push(event);
		}
		out
	}

	pub fn frames(&self) -> Vec<FrameRecord> {
		self.paints.lock().frames.clone()
	}

	pub fn overlay_frames(&self) -> Vec<OverlayFrame> {
		self.overlays.lock().clone()
	}

	/// Waits until the in-flight pass has finished on the blocking pool,
	/// without installing it.
	pub async fn wait_pass_finished(&self) {
		tokio::time::timeout(Duration::from_secs(5), async {
			while self.engine.in_flight.as_ref().is_some_and(|f| !f.handle.is_finished()) {
				tokio::time::sleep(Duration::from_millis(1)).await;
			}
		})
		.await
		.expect("layout pass finished");
	}
}
