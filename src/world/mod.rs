//! World module - meshes and the model loader
//!
//! - Objects, triangles and materials as loaded from disk
//! - The per-frame geometry stage (transform, clip, classify)
//! - Wavefront OBJ/MTL parsing

mod loader;
mod mesh;

pub use loader::*;
pub use mesh::*;
