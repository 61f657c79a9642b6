//! Page-space geometry in CSS pixels.


/// A point in page or viewport space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
	pub x: f32,
	pub y: f32,
}

impl Point {
	pub const fn new(x: f32, y: f32) -> Self {
		Self { x, y }
	}
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
	pub width: f32,
	pub height: f32,
}

impl Size {
	pub const fn new(width: f32, height: f32) -> Self {
		Self { width, height }
	}
}

/// An axis-aligned rectangle.
///
/// Negative dimensions are clamped to zero on construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
}

impl Rect {
	pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
		Self {
			x,
			y,
			width: width.max(0.0),
			height: height.max(0.0),
		}
	}

	pub fn from_origin_size(origin: Point, size: Size) -> Self {
		Self::new(origin.x, origin.y, size.width, size.height)
	}

	#[inline]
	pub fn left(&self) -> f32 {
		self.x
	}

	#[inline]
	pub fn right(&self) -> f32 {
		self.x + self.width
	}

	#[inline]
	pub fn top(&self) -> f32 {
		self.y
	}

	#[inline]
	pub fn bottom(&self) -> f32 {
		self.y + self.height
	}

	/// Returns true if `p` lies inside, with inclusive origin and exclusive far edges.
	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
	}

	/// Returns true if the vertical extent covers `y` (inclusive origin, exclusive bottom).
	pub fn spans_y(&self, y: f32) -> bool {
		y >= self.top() && y < self.bottom()
	}

	#[must_use]
	pub fn translate(self, dx: f32, dy: f32) -> Self {
		Self { x: self.x + dx, y: self.y + dy, ..self }
	}

	/// Smallest rectangle covering both.
	#[must_use]
	pub fn union(self, other: Rect) -> Self {
		let x = self.left().min(other.left());
		let y = self.top().min(other.top());
		let right = self.right().max(other.right());
		let bottom = self.bottom().max(other.bottom());
		Self::new(x, y, right - x, bottom - y)
	}

	/// Returns true if every edge of the two rectangles is within `tolerance`.
	pub fn approx_eq(&self, other: &Rect, tolerance: f32) -> bool {
		(self.left() - other.left()).abs() <= tolerance
			&& (self.top() - other.top()).abs() <= tolerance
			&& (self.right() - other.right()).abs() <= tolerance
			&& (self.bottom() - other.bottom()).abs() <= tolerance
	}
}
