use super::Vec2;

/// Layout box of a document node, top-left origin.
///
/// Hosts that measure real layout write it; the runtime reads it for
/// scroll and resize arithmetic. A zero box means "not measured".
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::from_origin_size(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn top(self) -> f32 {
        self.origin.y
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.top() + self.size.y
    }

    /// No area, typically an unmeasured node.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// The whole vertical extent lies inside `[top, bottom]`, as a row
    /// must to count as visible in a scrolled view.
    #[inline]
    pub fn within_band(self, top: f32, bottom: f32) -> bool {
        self.top() >= top && self.bottom() <= bottom
    }
}
