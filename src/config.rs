//! Scene configuration
//!
//! Uses RON (Rusty Object Notation) for a human-readable scene file. Every
//! field has a default, so a partial file (or none at all) still gives a
//! runnable scene.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rasterizer::{Color, RasterSettings, Shading};

/// Error type for scene config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "softpipe".to_string(),
            width: crate::rasterizer::WIDTH as i32,
            height: crate::rasterizer::HEIGHT as i32,
            resizable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    /// (pitch, yaw) in radians
    pub rotation: [f32; 2],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 60.0,
            near: 0.1,
            far: 100.0,
            position: [0.0; 3],
            rotation: [0.0; 2],
        }
    }
}

/// Fly-camera tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    /// World units per second
    pub base_speed: f32,
    /// Speed while sprint is held
    pub sprint_speed: f32,
    /// Radians per pixel of mouse drag
    pub sensitivity: f32,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            base_speed: 2.0,
            sprint_speed: 4.0,
            sensitivity: 0.003,
        }
    }
}

/// One model directory placed in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Recenter on the vertex center of mass after loading
    pub center: bool,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: f32,
    /// Radians per second added to `rotation`
    pub spin: [f32; 3],
    /// Overrides the shading of every material in the model
    pub shading: Option<Shading>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/cube"),
            center: true,
            position: [0.0, 0.0, -5.0],
            rotation: [0.0; 3],
            scale: 1.0,
            spin: [0.0; 3],
            shading: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub controls: Controls,
    pub raster: RasterSettings,
    pub clear_color: Color,
    /// env_logger filter, e.g. "softpipe=debug"
    pub log_filter: Option<String>,
    pub models: Vec<ModelConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            controls: Controls::default(),
            raster: RasterSettings::default(),
            clear_color: Color::BLACK,
            log_filter: None,
            models: vec![ModelConfig::default()],
        }
    }
}

/// Load a scene from a RON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    load_scene_from_str(&contents)
}

/// Load a scene from a RON string (for embedded scenes or testing)
pub fn load_scene_from_str(s: &str) -> Result<SceneConfig, ConfigError> {
    Ok(ron::from_str(s)?)
}

/// Save a scene to a RON file
pub fn save_scene<P: AsRef<Path>>(scene: &SceneConfig, path: P) -> Result<(), ConfigError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(scene, config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load `path` if it exists, otherwise fall back to the built-in scene.
/// A file that exists but fails to parse is still an error.
pub fn load_scene_or_default<P: AsRef<Path>>(path: P) -> Result<SceneConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("scene file {} not found, using defaults", path.display());
        return Ok(SceneConfig::default());
    }
    let scene = load_scene(path)?;
    info!("loaded scene {} ({} models)", path.display(), scene.models.len());
    Ok(scene)
}
