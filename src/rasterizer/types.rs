//! Core types for the rasterizer

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::math::{Vec2, Vec3};
use super::shading::Shading;

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    /// Shown where a material asks for a texture that failed to load
    pub const MISSING: Color = Color { r: 255, g: 0, b: 255, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack 0xRRGGBBAA
    pub const fn from_u32(c: u32) -> Self {
        Self {
            r: (c >> 24) as u8,
            g: (c >> 16) as u8,
            b: (c >> 8) as u8,
            a: c as u8,
        }
    }

    /// Build from 0.0-1.0 floats (material colors)
    pub fn from_unit(v: Vec3) -> Self {
        let c = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(c(v.x()), c(v.y()), c(v.z()))
    }

    /// Pack as 0xRRGGBBAA
    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 24) | ((self.g as u32) << 16) | ((self.b as u32) << 8) | (self.a as u32)
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Decoded texture image (array of colors)
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; width * height],
            name: String::new(),
        }
    }

    /// Load texture from an image file (png, jpeg, bmp)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, image::ImageError> {
        let path = path.as_ref();
        let img = image::open(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: image::DynamicImage, name: String) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels: Vec<Color> = rgba
            .pixels()
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();

        Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        }
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self { width, height, pixels, name: "checkerboard".to_string() }
    }

    /// Nearest-neighbour sample with wrap-around; v = 0 is the bottom row
    pub fn sample(&self, uv: Vec2) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::MISSING;
        }
        let tx = ((uv.x() * self.width as f32).floor() as i64).rem_euclid(self.width as i64) as usize;
        let row = ((uv.y() * self.height as f32).floor() as i64).rem_euclid(self.height as i64) as usize;
        let ty = self.height - 1 - row;
        self.pixels[ty * self.width + tx]
    }
}

/// Surface description shared by the triangles that reference it
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    /// Set when the material asks for a diffuse map, even if decoding failed
    pub texture_path: Option<PathBuf>,
    pub texture: Option<Texture>,
    pub shading: Shading,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ambient: Vec3::splat(1.0),
            diffuse: Vec3::splat(1.0),
            specular: Vec3::zeros(),
            shininess: 0.0,
            texture_path: None,
            texture: None,
            shading: Shading::default(),
        }
    }

    /// True when a texture was requested (it may still be missing)
    pub fn wants_texture(&self) -> bool {
        self.texture_path.is_some() || self.texture.is_some()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Rasterizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Draw triangle outlines instead of filling
    pub wireframe: bool,
    /// Discard triangles wound clockwise in NDC
    pub backface_cull: bool,
    /// Clip triangles against the near plane before the perspective divide
    pub near_clip: bool,
    /// Transform vertices and rasterize bands on the rayon pool
    pub parallel: bool,
    /// Rows per band when rasterizing in parallel
    pub band_rows: usize,
    /// Depth tolerance for coplanar fragments
    pub depth_epsilon: f32,
    /// Edge color in wireframe mode
    pub wireframe_color: Color,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            wireframe: false,
            backface_cull: true,
            near_clip: true,
            parallel: true,
            band_rows: 32,
            depth_epsilon: 1e-6,
            wireframe_color: Color::from_u32(0xFF0000FF),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_packing() {
        let c = Color::from_u32(0x11223344);
        assert_eq!(c, Color::with_alpha(0x11, 0x22, 0x33, 0x44));
        assert_eq!(c.to_u32(), 0x11223344);
        assert_eq!(Color::from_u32(0xFF0000FF), Color::RED);
    }

    #[test]
    fn test_color_from_unit() {
        let c = Color::from_unit(Vec3::new([1.0, 0.5, -2.0]));
        assert_eq!(c, Color::new(255, 128, 0));
    }

    #[test]
    fn test_sample_wraps() {
        let mut tex = Texture::new(2, 2);
        tex.pixels = vec![Color::RED, Color::GREEN, Color::BLUE, Color::WHITE];
        // v = 0 is the bottom row
        assert_eq!(tex.sample(Vec2::new([0.25, 0.0])), Color::BLUE);
        assert_eq!(tex.sample(Vec2::new([0.75, 0.99])), Color::GREEN);
        assert_eq!(tex.sample(Vec2::new([1.25, 0.99])), Color::RED);
        assert_eq!(tex.sample(Vec2::new([-0.25, 0.99])), Color::GREEN);
    }

    #[test]
    fn test_empty_texture_samples_missing() {
        let tex = Texture::new(0, 0);
        assert_eq!(tex.sample(Vec2::zeros()), Color::MISSING);
    }

    #[test]
    fn test_material_wants_texture() {
        let mut m = Material::new("brick");
        assert!(!m.wants_texture());
        m.texture_path = Some(PathBuf::from("brick.png"));
        assert!(m.wants_texture());
    }
}
