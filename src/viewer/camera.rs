/*
 * Camera Module
 *
 * Zoom and pan for the viewer, plus the transforms between window space and
 * world space. The cursor's world position is what the flock steers toward.
 */

use nannou::prelude::*;

pub struct Camera {
    pub position: Vec2,
    pub zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub is_dragging: bool,
    pub last_cursor_pos: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.05,
            max_zoom: 8.0,
            is_dragging: false,
            last_cursor_pos: Vec2::ZERO,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn world_to_screen(&self, point: Vec2, window_rect: Rect) -> Vec2 {
        (point - self.position) * self.zoom + window_rect.xy()
    }

    pub fn screen_to_world(&self, point: Vec2, window_rect: Rect) -> Vec2 {
        (point - window_rect.xy()) / self.zoom + self.position
    }

    /// World-space rectangle covered by the window, grown by `margin` pixels.
    pub fn visible_world(&self, window_rect: Rect, margin: f32) -> (Vec2, Vec2) {
        let pad = Vec2::splat(margin / self.zoom);
        let min = self.screen_to_world(pt2(window_rect.left(), window_rect.bottom()), window_rect) - pad;
        let max = self.screen_to_world(pt2(window_rect.right(), window_rect.top()), window_rect) + pad;
        (min, max)
    }

    // Zoom around the cursor so the world point under it stays put
    pub fn zoom(&mut self, scroll_delta: Vec2, cursor_position: Vec2, window_rect: Rect) {
        let zoom_factor = 1.0 + scroll_delta.y * 0.1;
        let before = self.screen_to_world(cursor_position, window_rect);
        self.zoom = (self.zoom * zoom_factor).clamp(self.min_zoom, self.max_zoom);
        let after = self.screen_to_world(cursor_position, window_rect);
        self.position += before - after;
    }

    pub fn start_drag(&mut self, position: Vec2) {
        self.last_cursor_pos = position;
        self.is_dragging = true;
    }

    pub fn drag(&mut self, position: Vec2) {
        if self.is_dragging {
            let delta = position - self.last_cursor_pos;
            if delta.length_squared() > 0.0 {
                self.position -= delta / self.zoom;
                self.last_cursor_pos = position;
            }
        }
    }

    pub fn end_drag(&mut self) {
        self.is_dragging = false;
    }
}
