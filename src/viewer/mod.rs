/*
 * Viewer Module
 *
 * An interactive nannou host for the flocking engine. Every frame the egui
 * panel may edit the parameters, the cursor's world position becomes the
 * steering target, and the simulation advances by the elapsed frame time.
 *
 * Controls:
 * - Left drag pans, the wheel zooms
 * - Right click switches between seeking and fleeing the cursor
 */

use nannou::prelude::*;
use nannou_egui::Egui;
use tracing::{error, info};

use crate::params::SimulationParams;
use crate::simulation::Simulation;

pub mod camera;
pub mod input;
pub mod renderer;
pub mod ui;

use camera::Camera;

// Slow frames are stepped as if they took this long
const MAX_FRAME_DT: f32 = 0.1;

pub struct Model {
    pub sim: Simulation,
    // Edited by the UI, applied to `sim` after each UI pass
    pub params: SimulationParams,
    pub egui: Egui,
    pub camera: Camera,
    pub mouse_position: Vec2,
    pub paused: bool,
    pub show_debug: bool,
    pub fps: f32,
    pub last_error: Option<String>,
}

impl Model {
    /// Pushes the edited parameters into the live simulation.
    pub fn apply_params(&mut self) {
        if let Err(e) = self.sim.retune(self.params.clone()) {
            error!("Rejected parameter change: {e}");
            self.last_error = Some(e.to_string());
            self.params = self.sim.params().clone();
        }
    }

    /// Replaces the simulation with a freshly spawned one.
    pub fn rebuild(&mut self) {
        match Simulation::new(self.params.clone()) {
            Ok(sim) => {
                info!(agents = self.params.num_agents, "Respawned flock");
                self.sim = sim;
                self.last_error = None;
            }
            Err(e) => {
                error!("Could not respawn flock: {e}");
                self.last_error = Some(e.to_string());
                self.params = self.sim.params().clone();
            }
        }
    }

    /// Steering target in world coordinates.
    pub fn target(&self, window_rect: Rect) -> crate::Vec2 {
        let world = self.camera.screen_to_world(self.mouse_position, window_rect);
        crate::Vec2::new(world.x, world.y)
    }
}

pub fn run() {
    nannou::app(model).update(update).run();
}

fn model(app: &App) -> Model {
    let window_id = app
        .new_window()
        .title("Flocking")
        .size(1280, 800)
        .view(renderer::view)
        .mouse_moved(input::mouse_moved)
        .mouse_pressed(input::mouse_pressed)
        .mouse_released(input::mouse_released)
        .mouse_wheel(input::mouse_wheel)
        .raw_event(input::raw_window_event)
        .build()
        .expect("failed to open the viewer window");

    let window = app.window(window_id).expect("viewer window was just built");
    let egui = Egui::from_window(&window);

    let params = SimulationParams::default();
    let sim = Simulation::new(params.clone()).expect("default parameters are valid");

    Model {
        sim,
        params,
        egui,
        camera: Camera::new(),
        mouse_position: Vec2::ZERO,
        paused: false,
        show_debug: true,
        fps: 0.0,
        last_error: None,
    }
}

fn update(app: &App, model: &mut Model, update: Update) {
    model.fps = app.fps();

    let before = model.params.clone();
    let actions = ui::update_ui(
        &mut model.egui,
        &mut model.params,
        model.sim.last_stats(),
        model.fps,
        &mut model.paused,
        &mut model.show_debug,
    );

    if actions.reset_camera {
        model.camera.reset();
    }
    if actions.rebuild || model.params.num_agents != before.num_agents {
        model.rebuild();
    } else if model.params != before {
        model.apply_params();
    }

    if model.paused {
        return;
    }

    let dt = update.since_last.as_secs_f32().min(MAX_FRAME_DT);
    if dt <= 0.0 {
        return;
    }

    let target = model.target(app.window_rect());
    if let Err(e) = model.sim.step(target, dt) {
        error!("Frame failed: {e}");
        model.last_error = Some(e.to_string());
        model.paused = true;
    }
}
