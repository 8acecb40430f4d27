//! Application state
//!
//! Owns everything that persists between frames: the camera, the loaded
//! meshes and the render settings. Input arrives once per frame as a
//! `FrameInput`, so the state can be driven without a window.

use std::f32::consts::TAU;

use log::{error, info, warn};

use crate::config::{Controls, ModelConfig, SceneConfig};
use crate::rasterizer::{Camera, Color, DrawStats, Framebuffer, RasterSettings, Vec2, Vec3};
use crate::world::{load_model_dir, Mesh};

/// Input gathered for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Mouse drag in pixels (x, y) while looking
    pub mouse_delta: Vec2,
    /// Movement axes (right, up, forward), each in -1..=1
    pub movement: Vec3,
    pub sprint: bool,
    pub toggle_pause: bool,
    pub toggle_wireframe: bool,
}

/// Mesh placed in the scene
pub struct SceneObject {
    pub mesh: Mesh,
    /// Radians per second about each axis
    pub spin: Vec3,
}

pub struct AppState {
    pub camera: Camera,
    pub objects: Vec<SceneObject>,
    pub controls: Controls,
    pub settings: RasterSettings,
    pub clear_color: Color,
    /// Stops mesh spin; the camera still moves
    pub paused: bool,
}

impl AppState {
    /// Camera and settings from the scene; models are loaded separately
    pub fn new(scene: &SceneConfig) -> Self {
        let cam = &scene.camera;
        let mut camera = Camera::new(cam.fov_deg, cam.near, cam.far);
        camera.set_position(Vec3::new(cam.position));
        camera.set_rotation(Vec2::new(cam.rotation));
        info!(
            "camera: fov {} deg, near {}, far {}, at {}",
            camera.fov_deg(),
            camera.near(),
            camera.far(),
            camera.position()
        );

        Self {
            camera,
            objects: Vec::new(),
            controls: scene.controls.clone(),
            settings: scene.raster.clone(),
            clear_color: scene.clear_color,
            paused: false,
        }
    }

    /// Load every model in the scene. A model that fails to load is logged and skipped.
    pub fn load_models(&mut self, models: &[ModelConfig]) {
        for model in models {
            match load_model_dir(&model.path) {
                Ok(mesh) => self.add_model(mesh, model),
                Err(e) => error!("failed to load {}: {}", model.path.display(), e),
            }
        }
        if self.objects.is_empty() {
            warn!("scene has no meshes");
        }
    }

    /// Place a loaded mesh according to its scene entry
    pub fn add_model(&mut self, mut mesh: Mesh, model: &ModelConfig) {
        if model.center {
            let center = mesh.center_of_mass();
            mesh.set_center(center);
        }
        if let Some(shading) = model.shading {
            for material in &mut mesh.materials {
                material.shading = shading;
            }
        }
        mesh.set_scale(model.scale);
        mesh.set_rotation(Vec3::new(model.rotation));
        mesh.set_position(Vec3::new(model.position));
        info!("placed {} at {}", model.path.display(), mesh.position());

        self.objects.push(SceneObject { mesh, spin: Vec3::new(model.spin) });
    }

    pub fn update(&mut self, dt: f32, input: &FrameInput) {
        if input.toggle_pause {
            self.paused = !self.paused;
            info!("{}", if self.paused { "paused" } else { "resumed" });
        }
        if input.toggle_wireframe {
            self.settings.wireframe = !self.settings.wireframe;
            info!("wireframe {}", if self.settings.wireframe { "on" } else { "off" });
        }

        if input.mouse_delta != Vec2::zeros() {
            // Vertical drag pitches, horizontal drag yaws
            let look = Vec2::new([input.mouse_delta.y(), input.mouse_delta.x()]) * self.controls.sensitivity;
            self.camera.set_rotation(self.camera.rotation() + look);
        }

        if input.movement != Vec3::zeros() {
            let speed = if input.sprint { self.controls.sprint_speed } else { self.controls.base_speed };
            let m = input.movement;
            let direction = self.camera.right() * m.x() + self.camera.up() * m.y() + self.camera.forward() * m.z();
            self.camera.set_position(self.camera.position() + direction * (speed * dt));
        }

        if !self.paused {
            for object in &mut self.objects {
                if object.spin == Vec3::zeros() {
                    continue;
                }
                let rotation = (object.mesh.rotation() + object.spin * dt) % TAU;
                object.mesh.set_rotation(rotation);
            }
        }
    }

    /// Clear `fb` and draw every mesh. A mesh whose draw fails is skipped.
    pub fn render(&self, fb: &mut Framebuffer) -> DrawStats {
        fb.clear(self.clear_color);
        let mut total = DrawStats::default();
        for object in &self.objects {
            match object.mesh.draw(&self.camera, fb, &self.settings, None) {
                Ok(stats) => total += stats,
                Err(e) => warn!("skipping mesh: {}", e),
            }
        }
        total
    }
}
