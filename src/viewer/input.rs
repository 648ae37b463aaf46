/*
 * Input Module
 *
 * Mouse handling for the viewer:
 * - Cursor position becomes the steering target
 * - Left drag pans, the wheel zooms
 * - Right click toggles between seek and flee
 */

use nannou::prelude::*;
use nannou::winit::event::{MouseButton, MouseScrollDelta, TouchPhase};

use super::Model;

pub fn mouse_moved(_app: &App, model: &mut Model, pos: Point2) {
    if model.camera.is_dragging {
        model.camera.drag(pos);
    }
    model.mouse_position = pos;
}

pub fn mouse_pressed(_app: &App, model: &mut Model, button: MouseButton) {
    if model.egui.ctx().is_pointer_over_area() {
        return;
    }

    match button {
        MouseButton::Left => model.camera.start_drag(model.mouse_position),
        MouseButton::Right => {
            model.params.target_mode = model.params.target_mode.toggled();
            model.apply_params();
        }
        _ => {}
    }
}

pub fn mouse_released(_app: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        model.camera.end_drag();
    }
}

pub fn mouse_wheel(app: &App, model: &mut Model, delta: MouseScrollDelta, _phase: TouchPhase) {
    let window_rect = app.window_rect();
    match delta {
        MouseScrollDelta::LineDelta(x, y) => {
            model.camera.zoom(vec2(x, y), model.mouse_position, window_rect);
        }
        MouseScrollDelta::PixelDelta(pos) => {
            model.camera.zoom(vec2(pos.x as f32, pos.y as f32) * 0.01, model.mouse_position, window_rect);
        }
    }
}

pub fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    model.egui.handle_raw_event(event);
}
