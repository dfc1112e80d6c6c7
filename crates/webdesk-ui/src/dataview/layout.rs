//! Geometry used when the host has not measured the view.
//!
//! Hosts with a layout engine record boxes with `Document::set_layout`;
//! those always win. Headless hosts get a fixed model: list and tree rows
//! stack at `row_height`, icon cells flow left to right at `cell` size.

use webdesk_engine::coords::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    /// Visible size of the view, header included.
    pub viewport: Vec2,
    pub row_height: f32,
    pub header_height: f32,
    pub cell: Vec2,
}

impl Default for ViewGeometry {
    fn default() -> Self {
        Self {
            viewport: Vec2::new(400.0, 300.0),
            row_height: 22.0,
            header_height: 22.0,
            cell: Vec2::new(80.0, 80.0),
        }
    }
}

impl ViewGeometry {
    /// Icon cells per row.
    pub fn columns(&self) -> usize {
        if self.cell.x <= 0.0 {
            return 1;
        }
        ((self.viewport.x / self.cell.x).floor() as usize).max(1)
    }

    /// Body-relative box of the `index`th row (`grid` for icon views).
    pub fn row_rect(&self, index: usize, grid: bool) -> Rect {
        if grid {
            let cols = self.columns();
            let (row, col) = (index / cols, index % cols);
            Rect::new(col as f32 * self.cell.x, row as f32 * self.cell.y, self.cell.x, self.cell.y)
        } else {
            Rect::new(0.0, index as f32 * self.row_height, self.viewport.x, self.row_height)
        }
    }
}

/// Number of measured boxes sharing the first box's top edge.
pub fn measured_row_size(boxes: &[Rect]) -> Option<usize> {
    let first = boxes.first().filter(|r| !r.is_empty())?;
    Some(boxes.iter().take_while(|r| r.top() == first.top()).count())
}

/// New scroll offset that aligns `row` (body coordinates) to the top of a
/// band of `visible` pixels, or `None` when it is already fully visible.
pub fn scroll_target(row: Rect, scroll_top: f32, visible: f32) -> Option<f32> {
    if row.within_band(scroll_top, scroll_top + visible) {
        None
    } else {
        Some(row.top().max(0.0))
    }
}
