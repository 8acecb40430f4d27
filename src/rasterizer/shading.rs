//! Per-pixel fragment functions
//!
//! The rasterizer hands every pixel that passes the depth test to a
//! `FragmentShader`. Materials pick a built-in one through `Shading`; a draw
//! call can override it with any closure.

use serde::{Deserialize, Serialize};

use super::math::{Vec2, Vec3};
use super::types::{Color, Material};

/// Texels with alpha below this are discarded
pub const ALPHA_CUTOFF: u8 = 128;

/// Inputs for one covered pixel
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub x: usize,
    pub y: usize,
    /// Interpolated view depth (clip w)
    pub depth: f32,
    pub uv: Vec2,
    pub normal: Vec3,
}

/// Pixel color function; `None` discards the pixel
pub trait FragmentShader: Sync {
    fn shade(&self, fragment: &Fragment, material: &Material) -> Option<Color>;
}

impl<F> FragmentShader for F
where
    F: Fn(&Fragment, &Material) -> Option<Color> + Sync,
{
    fn shade(&self, fragment: &Fragment, material: &Material) -> Option<Color> {
        self(fragment, material)
    }
}

/// Built-in shading strategies, selectable per material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shading {
    /// Texture if requested, otherwise normals
    #[default]
    Standard,
    /// Normal direction as color
    Normals,
    /// Diffuse material color lit by a headlight
    Diffuse,
    /// Texture only (MISSING color without an image)
    Textured,
}

impl Shading {
    pub fn shader(self) -> &'static dyn FragmentShader {
        match self {
            Shading::Standard => &standard_shader,
            Shading::Normals => &normal_shader,
            Shading::Diffuse => &diffuse_shader,
            Shading::Textured => &texture_shader,
        }
    }
}

/// |n| per axis scaled to 0-255
pub fn normal_shader(fragment: &Fragment, _material: &Material) -> Option<Color> {
    let channel = |v: f32| (v.abs().min(1.0) * 255.0) as u8;
    let n = fragment.normal;
    Some(Color::new(channel(n.x()), channel(n.y()), channel(n.z())))
}

/// Sample the material texture, discarding transparent texels
pub fn texture_shader(fragment: &Fragment, material: &Material) -> Option<Color> {
    let Some(texture) = &material.texture else {
        return Some(Color::MISSING);
    };
    let texel = texture.sample(fragment.uv);
    if texel.a < ALPHA_CUTOFF {
        return None;
    }
    Some(texel)
}

pub fn standard_shader(fragment: &Fragment, material: &Material) -> Option<Color> {
    if material.wants_texture() {
        texture_shader(fragment, material)
    } else {
        normal_shader(fragment, material)
    }
}

/// Kd lit by a light at the eye; view-space normals face +z toward the camera
pub fn diffuse_shader(fragment: &Fragment, material: &Material) -> Option<Color> {
    let intensity = fragment.normal.z().max(0.0);
    let ambient = material.ambient.component_mul(&material.diffuse) * 0.2;
    Some(Color::from_unit(ambient + material.diffuse * (0.8 * intensity)))
}
