//! Grid/zoom coordinate system.
//!
//! Three spaces are involved:
//! - grid: whole cells, the unit node positions are stored in
//! - canvas: zoomed pixels with the grid origin at (0, 0)
//! - screen: canvas pixels minus the scroll offset, the unit pointer events arrive in

use nodecanvas_core::{GridPoint, GridRect, GridSize, Rect, Vec2};
use parking_lot::RwLock;
use std::sync::Arc;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    zoom: f32,
    scroll: Vec2,
    cell_width: f32,
    cell_height: f32,
}

impl ViewTransform {
    pub fn new(grid_width: i32, grid_height: i32) -> Self {
        Self {
            zoom: 1.0,
            scroll: Vec2::ZERO,
            cell_width: grid_width.max(1) as f32,
            cell_height: grid_height.max(1) as f32,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom, clamped to [`MIN_ZOOM`, `MAX_ZOOM`]. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom
    }

    /// Change the zoom while keeping the canvas point under `focal_screen` in place.
    pub fn zoom_around(&mut self, zoom: f32, focal_screen: Vec2) -> f32 {
        let old = self.zoom;
        let focal_canvas = self.screen_to_canvas(focal_screen);
        let new = self.set_zoom(zoom);
        let rescaled = focal_canvas * (new / old);
        self.scroll = rescaled - focal_screen;
        new
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn set_scroll(&mut self, scroll: Vec2) {
        self.scroll = scroll;
    }

    /// Unzoomed cell size in pixels.
    pub fn cell(&self) -> Vec2 {
        Vec2::new(self.cell_width, self.cell_height)
    }

    /// Zoomed cell size in pixels.
    pub fn zoomed_cell(&self) -> Vec2 {
        self.cell() * self.zoom
    }

    pub fn grid_to_canvas(&self, point: GridPoint) -> Vec2 {
        let cell = self.zoomed_cell();
        Vec2::new(point.x as f32 * cell.x, point.y as f32 * cell.y)
    }

    /// Closest grid point to a canvas position.
    pub fn canvas_to_grid(&self, point: Vec2) -> GridPoint {
        let cell = self.zoomed_cell();
        GridPoint::new(
            (point.x / cell.x).round() as i32,
            (point.y / cell.y).round() as i32,
        )
    }

    pub fn screen_to_canvas(&self, point: Vec2) -> Vec2 {
        point + self.scroll
    }

    pub fn canvas_to_screen(&self, point: Vec2) -> Vec2 {
        point - self.scroll
    }

    pub fn to_screen(&self, point: GridPoint) -> Vec2 {
        self.canvas_to_screen(self.grid_to_canvas(point))
    }

    pub fn to_grid(&self, point: Vec2) -> GridPoint {
        self.canvas_to_grid(self.screen_to_canvas(point))
    }

    pub fn grid_size_to_canvas(&self, size: GridSize) -> Vec2 {
        let cell = self.zoomed_cell();
        Vec2::new(size.width as f32 * cell.x, size.height as f32 * cell.y)
    }

    pub fn grid_rect_to_canvas(&self, rect: GridRect) -> Rect {
        Rect::from_pos_size(
            self.grid_to_canvas(rect.origin()),
            self.grid_size_to_canvas(rect.size()),
        )
    }

    /// Whole grid cells covered by a canvas rectangle, shrunk inwards.
    pub fn canvas_rect_to_grid(&self, rect: Rect) -> GridRect {
        let cell = self.zoomed_cell();
        let x = (rect.min.x / cell.x).ceil() as i32;
        let y = (rect.min.y / cell.y).ceil() as i32;
        let right = (rect.max.x / cell.x).floor() as i32;
        let bottom = (rect.max.y / cell.y).floor() as i32;
        GridRect::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }
}

/// The logical edit cursor: where new nodes appear and keyboard actions aim.
///
/// Stored in canvas pixels. Clones share the same position so a background
/// reader (layout, journal replay) always sees a complete point.
#[derive(Debug, Clone, Default)]
pub struct EditCursor {
    position: Arc<RwLock<Option<Vec2>>>,
}

impl EditCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A second handle onto the same cursor, safe to move to another thread.
    pub fn handle(&self) -> EditCursor {
        self.clone()
    }

    pub fn get(&self) -> Option<Vec2> {
        *self.position.read()
    }

    pub fn set(&self, position: Option<Vec2>) {
        *self.position.write() = position;
    }

    pub fn set_position(&self, position: Vec2) {
        self.set(Some(position));
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// Scale the cursor after a zoom change so it stays on the same grid location.
    pub fn rescale(&self, factor: f32) {
        let mut guard = self.position.write();
        if let Some(position) = guard.as_mut() {
            *position = *position * factor;
        }
    }

    pub fn translate(&self, offset: Vec2) {
        let mut guard = self.position.write();
        if let Some(position) = guard.as_mut() {
            *position += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_to_canvas_scales_with_zoom() {
        let mut t = ViewTransform::new(25, 25);
        assert_eq!(t.grid_to_canvas(GridPoint::new(2, 3)), Vec2::new(50.0, 75.0));
        t.set_zoom(2.0);
        assert_eq!(t.grid_to_canvas(GridPoint::new(2, 3)), Vec2::new(100.0, 150.0));
    }

    #[test]
    fn test_canvas_to_grid_rounds_to_closest_point() {
        let t = ViewTransform::new(25, 25);
        assert_eq!(t.canvas_to_grid(Vec2::new(37.0, 12.0)), GridPoint::new(1, 0));
        assert_eq!(t.canvas_to_grid(Vec2::new(38.0, 13.0)), GridPoint::new(2, 1));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut t = ViewTransform::new(25, 25);
        assert_eq!(t.set_zoom(10.0), MAX_ZOOM);
        assert_eq!(t.set_zoom(0.0), MIN_ZOOM);
    }

    #[test]
    fn test_zoom_around_keeps_focal_point() {
        let mut t = ViewTransform::new(25, 25);
        t.set_scroll(Vec2::new(40.0, 10.0));
        let focal = Vec2::new(200.0, 120.0);
        let before = t.screen_to_canvas(focal) * (1.0 / t.zoom());
        t.zoom_around(1.5, focal);
        let after = t.screen_to_canvas(focal) * (1.0 / t.zoom());
        assert!((before.x - after.x).abs() < 1e-3);
        assert!((before.y - after.y).abs() < 1e-3);
    }

    #[test]
    fn test_canvas_rect_to_grid_shrinks_inwards() {
        let t = ViewTransform::new(25, 25);
        let rect = Rect::from_pos_size(Vec2::new(10.0, 0.0), Vec2::new(100.0, 60.0));
        assert_eq!(t.canvas_rect_to_grid(rect), GridRect::new(1, 0, 3, 2));
    }

    #[test]
    fn test_cursor_rescale_and_share() {
        let cursor = EditCursor::new();
        let reader = cursor.handle();
        assert_eq!(reader.get(), None);
        cursor.set_position(Vec2::new(100.0, 50.0));
        cursor.rescale(2.0);
        assert_eq!(reader.get(), Some(Vec2::new(200.0, 100.0)));
        reader.clear();
        assert_eq!(cursor.get(), None);
    }

    #[test]
    fn test_cursor_reads_across_threads() {
        let cursor = EditCursor::new();
        cursor.set_position(Vec2::new(10.0, 10.0));
        let reader = cursor.handle();
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..1000 {
                if let Some(p) = reader.get() {
                    seen.push(p);
                }
            }
            seen
        });
        for i in 0..1000 {
            let v = i as f32;
            cursor.set_position(Vec2::new(v, v));
        }
        for p in handle.join().unwrap() {
            assert_eq!(p.x, p.y);
        }
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_grid_round_trip(
            x in -500i32..500,
            y in -500i32..500,
            zoom in MIN_ZOOM..MAX_ZOOM,
            sx in -1000.0f32..1000.0,
            sy in -1000.0f32..1000.0,
        ) {
            let mut t = ViewTransform::new(25, 25);
            t.set_zoom(zoom);
            t.set_scroll(Vec2::new(sx, sy));
            let g = GridPoint::new(x, y);
            let back = t.to_grid(t.to_screen(g));
            prop_assert!((back.x - g.x).abs() <= 1);
            prop_assert!((back.y - g.y).abs() <= 1);
        }

        #[test]
        fn prop_cursor_stays_on_grid_location_under_zoom(
            gx in 0i32..200,
            gy in 0i32..200,
            z0 in MIN_ZOOM..MAX_ZOOM,
            z1 in MIN_ZOOM..MAX_ZOOM,
        ) {
            let mut t = ViewTransform::new(25, 25);
            t.set_zoom(z0);
            let cursor = EditCursor::new();
            cursor.set_position(t.grid_to_canvas(GridPoint::new(gx, gy)));
            let old = t.zoom();
            let new = t.set_zoom(z1);
            cursor.rescale(new / old);
            let p = cursor.get().unwrap();
            prop_assert_eq!(t.canvas_to_grid(p), GridPoint::new(gx, gy));
        }
    }
}
