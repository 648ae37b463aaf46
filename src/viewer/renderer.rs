/*
 * Renderer Module
 *
 * Draws the world boundary, the agents inside the visible area, the steering
 * target and, when debug is on, the perception radii of the agent nearest to
 * the cursor. Visible agents come from a rectangle query on the current index.
 */

use nannou::prelude::*;

use super::Model;
use crate::quadtree::QueryPoint;
use crate::steering::TargetMode;

const AGENT_SIZE: f32 = 6.0;

fn to_screen_space(v: crate::Vec2) -> Vec2 {
    vec2(v.x, v.y)
}

pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let window_rect = app.window_rect();
    let camera = &model.camera;

    let bounds = model.sim.index().bounds();
    let corner_a = camera.world_to_screen(to_screen_space(bounds.min), window_rect);
    let corner_b = camera.world_to_screen(to_screen_space(bounds.max), window_rect);
    let world_rect = Rect::from_corners(corner_a, corner_b);
    draw.rect()
        .xy(world_rect.xy())
        .wh(world_rect.wh())
        .no_fill()
        .stroke_weight(1.0)
        .stroke(rgba(0.3, 0.3, 0.3, 1.0));

    let (min, max) = camera.visible_world(window_rect, AGENT_SIZE * 2.0);
    let mut visible: Vec<QueryPoint> = Vec::new();
    model.sim.index().query_rect(
        crate::Vec2::new(min.x, min.y),
        crate::Vec2::new(max.x, max.y),
        &mut visible,
    );

    let scaled_size = AGENT_SIZE * camera.zoom;
    let points = [
        pt2(scaled_size, 0.0),
        pt2(-scaled_size, scaled_size / 2.0),
        pt2(-scaled_size, -scaled_size / 2.0),
    ];

    let agents = model.sim.agents();
    for p in &visible {
        let heading = agents
            .get(p.agent.index())
            .map(|a| a.heading)
            .unwrap_or_else(|| p.velocity.y.atan2(p.velocity.x));
        let screen_pos = camera.world_to_screen(to_screen_space(p.position), window_rect);
        draw.polygon()
            .color(rgb(220u8, 220, 220))
            .points(points.iter().cloned())
            .xy(screen_pos)
            .rotate(heading);
    }

    let target_color = match model.sim.params().target_mode {
        TargetMode::Seek => GREEN,
        TargetMode::Flee => RED,
    };
    draw.ellipse()
        .xy(model.mouse_position)
        .radius(8.0)
        .no_fill()
        .stroke(target_color)
        .stroke_weight(2.0);

    if model.show_debug {
        draw_perception(&draw, model, window_rect, &visible);
        super::ui::draw_debug_info(
            &draw,
            model.sim.last_stats(),
            window_rect,
            visible.len(),
            model.sim.index().node_count(),
            camera.zoom,
        );
    }

    if let Some(message) = &model.last_error {
        draw.text(message)
            .x_y(0.0, window_rect.bottom() + 20.0)
            .w(window_rect.w() - 40.0)
            .color(RED)
            .font_size(14);
    }

    draw.to_frame(app, &frame).unwrap();
    model.egui.draw_to_frame(&frame).unwrap();
}

// Radii around the visible agent closest to the cursor
fn draw_perception(draw: &Draw, model: &Model, window_rect: Rect, visible: &[QueryPoint]) {
    let cursor = model.target(window_rect);
    let Some(nearest) = visible
        .iter()
        .min_by(|a, b| a.position.distance_squared(cursor).total_cmp(&b.position.distance_squared(cursor)))
    else {
        return;
    };

    let center = model.camera.world_to_screen(to_screen_space(nearest.position), window_rect);
    let radii = model.sim.params().radii;
    for (radius, color) in [
        (radii.separation, rgba(1.0, 0.2, 0.2, 0.8)),
        (radii.alignment, rgba(0.2, 1.0, 0.2, 0.8)),
        (radii.cohesion, rgba(0.2, 0.4, 1.0, 0.8)),
    ] {
        draw.ellipse()
            .xy(center)
            .radius(radius * model.camera.zoom)
            .no_fill()
            .stroke(color)
            .stroke_weight(1.0);
    }
}
