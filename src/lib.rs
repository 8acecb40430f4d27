//! softpipe: CPU software 3D rendering pipeline
//!
//! Triangle meshes in, colored pixels out. Transform, clipping,
//! rasterization, perspective-correct interpolation and depth testing all run
//! on the CPU:
//! - `rasterizer`: linear algebra, camera, fragment shading and triangle fill
//! - `world`: meshes, the geometry stage and the OBJ/MTL loader
//! - `app`: per-frame scene state driven by `FrameInput`

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod config;
pub mod logging;
pub mod rasterizer;
pub mod world;
