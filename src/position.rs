//! Canvas geometry: pointer cells to percentages of the two-screen canvas.
//!
//! `top` spans 0..200 (main screen 0..100, stock screen 100..200) and `left`
//! spans 0..100. Percentages keep the layout independent of terminal size.

use crate::model::Position;

pub const SCREEN_SPAN: f64 = 100.0;
pub const CANVAS_TOP_MAX: f64 = 2.0 * SCREEN_SPAN;
pub const CANVAS_LEFT_MAX: f64 = 100.0;
/// Distance an out-of-range coordinate is pulled back inside the canvas.
pub const EDGE_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Main,
    Stock,
}

impl Screen {
    pub fn other(self) -> Screen {
        match self {
            Screen::Main => Screen::Stock,
            Screen::Stock => Screen::Main,
        }
    }

    pub fn containing(top: f64) -> Screen {
        if top < SCREEN_SPAN {
            Screen::Main
        } else {
            Screen::Stock
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Screen::Main => "main",
            Screen::Stock => "stock",
        }
    }
}

/// The visible part of the canvas, measured in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub screen: Screen,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Viewport {
            width: f64::from(width.max(1)),
            height: f64::from(height.max(1)),
            screen: Screen::Main,
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = f64::from(width.max(1));
        self.height = f64::from(height.max(1));
    }

    /// Rows scrolled past the top of the document.
    pub fn scroll_offset(&self) -> f64 {
        match self.screen {
            Screen::Main => 0.0,
            Screen::Stock => self.height,
        }
    }

    pub fn is_scrolled(&self) -> bool {
        self.screen == Screen::Stock
    }

    pub fn to_canvas_percent(&self, x: f64, y: f64) -> Position {
        Position {
            top: (y + self.scroll_offset()) * 100.0 / self.height,
            left: x * 100.0 / self.width,
        }
    }

    /// Cell coordinates of `position` relative to the viewport's top-left.
    pub fn to_cells(&self, position: Position) -> (f64, f64) {
        (
            position.left * self.width / 100.0,
            position.top * self.height / 100.0 - self.scroll_offset(),
        )
    }

    /// Size of a `cols` x `rows` block expressed as (top, left) percentages.
    pub fn extent_percent(&self, cols: u16, rows: u16) -> Position {
        Position {
            top: f64::from(rows) * 100.0 / self.height,
            left: f64::from(cols) * 100.0 / self.width,
        }
    }

    pub fn at_top_edge(&self, y: f64) -> bool {
        y <= 0.0
    }

    pub fn at_bottom_edge(&self, y: f64) -> bool {
        y >= self.height - 1.0
    }
}

pub fn clamp(position: Position) -> Position {
    Position {
        top: pull_back(position.top, CANVAS_TOP_MAX),
        left: pull_back(position.left, CANVAS_LEFT_MAX),
    }
}

pub fn in_bounds(position: Position) -> bool {
    (0.0..CANVAS_TOP_MAX).contains(&position.top) && (0.0..CANVAS_LEFT_MAX).contains(&position.left)
}

fn pull_back(value: f64, max: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        EDGE_MARGIN
    } else if value >= max {
        max - EDGE_MARGIN
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_maps_to_percent_of_viewport() {
        let vp = Viewport::new(200, 50);
        let pos = vp.to_canvas_percent(50.0, 10.0);
        assert_eq!(pos, Position::new(20.0, 25.0));
    }

    #[test]
    fn scroll_offset_shifts_top_onto_stock_screen() {
        let mut vp = Viewport::new(100, 40);
        vp.screen = Screen::Stock;
        let pos = vp.to_canvas_percent(0.0, 20.0);
        assert_eq!(pos.top, 150.0);
        assert_eq!(vp.to_cells(pos), (0.0, 20.0));
    }

    #[test]
    fn in_range_positions_are_untouched() {
        let pos = Position::new(199.0, 0.0);
        assert_eq!(clamp(pos), pos);
    }

    #[test]
    fn out_of_range_values_are_pulled_in_by_margin() {
        let clamped = clamp(Position::new(230.0, -4.0));
        assert_eq!(clamped, Position::new(190.0, EDGE_MARGIN));
        let clamped = clamp(Position::new(-0.5, 100.0));
        assert_eq!(clamped, Position::new(EDGE_MARGIN, 90.0));
    }

    #[test]
    fn clamped_values_are_never_flush_with_an_edge() {
        for raw in [-1000.0, -0.01, 200.0, 200.01, 1e9] {
            let c = clamp(Position::new(raw, raw));
            assert!(in_bounds(c));
            assert!(c.top > 0.0 && c.top < CANVAS_TOP_MAX - 1.0);
            assert!(c.left > 0.0 && c.left < CANVAS_LEFT_MAX - 1.0);
        }
    }

    #[test]
    fn malformed_geometry_is_clamped() {
        let c = clamp(Position::new(f64::NAN, f64::INFINITY));
        assert!(in_bounds(c));
    }

    #[test]
    fn degenerate_viewport_has_unit_size() {
        let vp = Viewport::new(0, 0);
        let pos = vp.to_canvas_percent(0.0, 0.0);
        assert!(pos.top.is_finite() && pos.left.is_finite());
    }

    #[test]
    fn edges_are_detected_on_first_and_last_rows() {
        let vp = Viewport::new(80, 24);
        assert!(vp.at_top_edge(0.0));
        assert!(vp.at_bottom_edge(23.0));
        assert!(!vp.at_bottom_edge(22.0));
    }
}
