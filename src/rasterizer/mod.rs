//! CPU software rasterizer
//!
//! Features:
//! - Const-generic vectors and matrices
//! - Perspective camera with near-plane clipping
//! - Edge-function fill with the top-left rule and sub-pixel precision
//! - Perspective-correct attributes and a float depth buffer
//! - Band-parallel rasterization on the rayon pool

mod camera;
mod math;
mod render;
mod shading;
mod types;

pub use camera::*;
pub use math::*;
pub use render::*;
pub use shading::*;
pub use types::*;

/// Default window size
pub const WIDTH: usize = 800;
pub const HEIGHT: usize = 600;
