//! A small in-memory host for driving the engine through its public API.
#![allow(dead_code)]

use std::sync::Arc;

use folio_editor::{
	BlockConverter, Collaborators, ConvertError, ConvertOptions, Converted, DocTransaction, DocumentSource, EngineConfig, EngineEvent, OverlayFrame, PaintError,
	PaintFrame, PaintedHost, PaintedNode, Painter, PresentationEngine, SelectionOverlay,
};
use folio_layout::{FixedMetrics, FlowBlock, HeaderFooterVariant, RegionContent, RegionId, RegionKind};
use folio_primitives::{Change, ChangeSet, PosLen, PosRange, Rect, Selection};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

/// One paragraph of text plus an optional default header.
#[derive(Default)]
struct Text {
	body: String,
	header: Option<String>,
	selection: Selection,
}

#[derive(Default)]
pub struct Document {
	text: Mutex<Text>,
	listeners: Mutex<Vec<mpsc::UnboundedSender<DocTransaction>>>,
}

impl Document {
	pub fn new(body: &str) -> Arc<Self> {
		let doc = Self::default();
		doc.text.lock().body = body.to_owned();
		Arc::new(doc)
	}

	pub fn set_header(&self, header: &str) {
		self.text.lock().header = Some(header.to_owned());
	}

	pub fn select(&self, selection: Selection) {
		self.text.lock().selection = selection;
	}

	/// Inserts at `pos` and dispatches the transaction.
	pub fn type_at(&self, pos: usize, s: &str) {
		let before = {
			let mut text = self.text.lock();
			let before = text.body.len();
			text.body.insert_str(pos, s);
			before
		};
		self.dispatch(DocTransaction::edit(ChangeSet::from_changes(before, [Change::insert(pos, s.len())])));
	}

	pub fn dispatch(&self, tx: DocTransaction) {
		self.listeners.lock().retain(|l| l.send(tx.clone()).is_ok());
	}
}

impl DocumentSource for Document {
	fn content(&self) -> serde_json::Value {
		let text = self.text.lock();
		json!({ "body": text.body, "header": text.header })
	}

	fn selection(&self) -> Selection {
		self.text.lock().selection
	}

	fn doc_size(&self) -> PosLen {
		self.text.lock().body.len()
	}

	fn subscribe(&self) -> mpsc::UnboundedReceiver<DocTransaction> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.listeners.lock().push(tx);
		rx
	}
}

struct Blocks;

impl BlockConverter for Blocks {
	fn convert(&self, content: &serde_json::Value, _options: &ConvertOptions) -> Result<Converted, ConvertError> {
		let body = content["body"].as_str().ok_or_else(|| ConvertError::InvalidContent("missing body".into()))?;
		let regions = content["header"]
			.as_str()
			.map(|h| RegionContent {
				id: RegionId(7),
				kind: RegionKind::Header,
				variant: HeaderFooterVariant::Default,
				blocks: vec![FlowBlock::paragraph(1_000, PosRange::new(0, h.len()), h)],
			})
			.into_iter()
			.collect();
		Ok(Converted {
			blocks: vec![FlowBlock::paragraph(0, PosRange::new(0, body.len()), body)],
			regions,
			..Converted::default()
		})
	}
}

/// Paints one node per line box on mounted pages.
#[derive(Default)]
struct Pages {
	roots: Vec<PaintedNode>,
	painted: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl Painter for Pages {
	fn paint(&mut self, frame: PaintFrame<'_>) -> Result<(), PaintError> {
		let mut id = 0;
		let mut roots = Vec::with_capacity(frame.mounted.len());
		for &index in frame.mounted {
			let page = frame.layout.page(index).ok_or(PaintError::MissingPage(index))?;
			let lines = page
				.fragments
				.iter()
				.flat_map(|f| f.lines.iter().map(move |l| (f, l)))
				.map(|(f, l)| {
					id += 1;
					PaintedNode::new(id, index, Rect::new(f.x, f.y + l.y, f.width, l.height), Some(l.pm_range))
				})
				.collect();
			id += 1;
			roots.push(PaintedNode::new(id, index, Rect::new(0.0, 0.0, page.size.width, page.size.height), None).with_children(lines));
		}
		self.roots = roots;
		self.painted.lock().push(frame.mounted.iter().copied().collect());
		Ok(())
	}

	fn host(&self) -> &dyn PaintedHost {
		self
	}
}

impl PaintedHost for Pages {
	fn roots(&self) -> &[PaintedNode] {
		&self.roots
	}
}

#[derive(Default)]
struct Overlay(Arc<Mutex<Vec<OverlayFrame>>>);

impl SelectionOverlay for Overlay {
	fn render(&mut self, frame: &OverlayFrame) {
		self.0.lock().push(frame.clone());
	}
}

pub struct Host {
	pub engine: PresentationEngine,
	pub doc: Arc<Document>,
	pub painted: Arc<Mutex<Vec<Vec<usize>>>>,
	pub overlay: Arc<Mutex<Vec<OverlayFrame>>>,
	pub events: mpsc::UnboundedReceiver<EngineEvent>,
}

impl Host {
	/// Ten characters per line, 20px lines, US-Letter pages.
	pub fn open(doc: Arc<Document>, config: EngineConfig) -> Self {
		let _ = tracing_subscriber::fmt::try_init();
		let painter = Pages::default();
		let painted = painter.painted.clone();
		let overlay = Overlay::default();
		let frames = overlay.0.clone();
		let mut engine = PresentationEngine::new(
			config,
			Collaborators {
				source: doc.clone(),
				converter: Box::new(Blocks),
				measurer: Arc::new(FixedMetrics::new(10, 20.0)),
				painter: Box::new(painter),
				overlay: Box::new(overlay),
			},
		)
		.expect("valid config");
		let events = engine.subscribe_events();
		Self {
			engine,
			doc,
			painted,
			overlay: frames,
			events,
		}
	}

	pub fn events(&mut self) -> Vec<EngineEvent> {
		std::iter::from_fn(|| self.events.try_recv().ok()).collect()
	}

	pub fn last_overlay(&self) -> Option<OverlayFrame> {
		self.overlay.lock().last().cloned()
	}

	pub fn last_mounted(&self) -> Vec<usize> {
		self.painted.lock().last().cloned().unwrap_or_default()
	}
}
