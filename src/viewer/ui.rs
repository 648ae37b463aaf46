/*
 * UI Module
 *
 * The egui control panel of the viewer. It edits a copy of the simulation
 * parameters; the caller decides whether the edits need a retune or a full
 * rebuild of the simulation.
 */

use nannou_egui::{egui, Egui};

use crate::params::SimulationParams;
use crate::scheduler::{FailurePolicy, FrameStats};
use crate::steering::TargetMode;

#[derive(Debug, Default, Clone, Copy)]
pub struct UiActions {
    pub rebuild: bool,
    pub reset_camera: bool,
}

pub fn update_ui(
    egui: &mut Egui,
    params: &mut SimulationParams,
    stats: Option<&FrameStats>,
    fps: f32,
    paused: &mut bool,
    show_debug: &mut bool,
) -> UiActions {
    let mut actions = UiActions::default();
    let ctx = egui.begin_frame();

    egui::Window::new("Flock Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.collapsing("Population", |ui| {
                ui.add(egui::Slider::new(&mut params.num_agents, SimulationParams::get_num_agents_range()).text("Agents"));
                if ui.button("Respawn").clicked() {
                    actions.rebuild = true;
                }
                ui.add(egui::Slider::new(&mut params.max_speed, SimulationParams::get_max_speed_range()).text("Max Speed"));
                ui.add(egui::Slider::new(&mut params.drag, SimulationParams::get_drag_range()).text("Drag"));
                ui.add(
                    egui::Slider::new(&mut params.speed_multiplier, SimulationParams::get_speed_multiplier_range())
                        .text("Speed Multiplier"),
                );
            });

            ui.collapsing("Steering", |ui| {
                ui.horizontal(|ui| {
                    ui.radio_value(&mut params.target_mode, TargetMode::Seek, "Seek");
                    ui.radio_value(&mut params.target_mode, TargetMode::Flee, "Flee");
                });
                ui.add(egui::Slider::new(&mut params.weights.target, SimulationParams::get_weight_range()).text("Target Weight"));
                ui.add(egui::Slider::new(&mut params.weights.separation, SimulationParams::get_weight_range()).text("Separation Weight"));
                ui.add(egui::Slider::new(&mut params.weights.alignment, SimulationParams::get_weight_range()).text("Alignment Weight"));
                ui.add(egui::Slider::new(&mut params.weights.cohesion, SimulationParams::get_weight_range()).text("Cohesion Weight"));
                ui.add(egui::Slider::new(&mut params.radii.separation, SimulationParams::get_radius_range()).text("Separation Radius"));
                ui.add(egui::Slider::new(&mut params.radii.alignment, SimulationParams::get_radius_range()).text("Alignment Radius"));
                ui.add(egui::Slider::new(&mut params.radii.cohesion, SimulationParams::get_radius_range()).text("Cohesion Radius"));
            });

            ui.collapsing("Workers", |ui| {
                ui.add(egui::Slider::new(&mut params.worker_count, SimulationParams::get_worker_count_range()).text("Workers"));
                ui.horizontal(|ui| {
                    ui.radio_value(&mut params.failure_policy, FailurePolicy::Abort, "Abort on failure");
                    ui.radio_value(&mut params.failure_policy, FailurePolicy::SerialFallback, "Serial fallback");
                });

                ui.separator();
                ui.label(format!("FPS: {:.1}", fps));
                if let Some(stats) = stats {
                    ui.label(format!("Frame: {}", stats.frame));
                    ui.label(format!("Step time: {:.2} ms", stats.elapsed.as_secs_f64() * 1000.0));
                    ui.label(format!("Partitions: {}", stats.partitions));
                    ui.label(format!("Neighbors visited: {}", stats.neighbors_visited));
                }
            });

            if ui.button("Reset Camera").clicked() {
                actions.reset_camera = true;
            }
            ui.checkbox(show_debug, "Show Debug Info");
            ui.checkbox(paused, "Pause Simulation");
        });

    actions
}

// Draw frame statistics in the top-left corner
pub fn draw_debug_info(
    draw: &nannou::Draw,
    stats: Option<&FrameStats>,
    window_rect: nannou::geom::Rect,
    visible: usize,
    index_nodes: usize,
    camera_zoom: f32,
) {
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 220.0;
    let panel_height = line_height * 6.0 + margin;

    draw.rect()
        .x_y(window_rect.left() + panel_width / 2.0, window_rect.top() - panel_height / 2.0)
        .w_h(panel_width, panel_height)
        .color(nannou::color::rgba(0.0, 0.0, 0.0, 0.7));

    let (agents, elapsed_ms, skipped) = stats
        .map(|s| (s.agents, s.elapsed.as_secs_f64() * 1000.0, s.skipped_partitions))
        .unwrap_or((0, 0.0, 0));

    let lines = [
        format!("Agents: {}", agents),
        format!("Visible: {}", visible),
        format!("Step: {:.2} ms", elapsed_ms),
        format!("Skipped partitions: {}", skipped),
        format!("Index nodes: {}", index_nodes),
        format!("Zoom: {:.2}x", camera_zoom),
    ];

    let text_x = window_rect.left() + margin;
    let text_y = window_rect.top() - margin;
    for (i, text) in lines.iter().enumerate() {
        draw.text(text)
            .x_y(text_x + 80.0, text_y - i as f32 * line_height)
            .color(nannou::color::WHITE)
            .font_size(14);
    }
}
