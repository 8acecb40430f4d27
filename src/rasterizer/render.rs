//! Triangle rasterization
//!
//! Edge-function fill over the triangle's bounding box. Vertices are snapped to
//! a 1/16 pixel grid so edge values are exact integers; the top-left rule then
//! hands every pixel on a shared edge to exactly one triangle. Attributes are
//! interpolated perspective-correctly with 1/w weights.

use std::ops::AddAssign;

use rayon::prelude::*;

use super::camera::Viewport;
use super::math::{Vec2, Vec3, Vec4, Vector};
use super::shading::{Fragment, FragmentShader};
use super::types::{Color, Material, RasterSettings};

const SUBPIXEL_BITS: u32 = 4;
const SUBPIXEL: i64 = 1 << SUBPIXEL_BITS;
const HALF_PIXEL: i64 = SUBPIXEL / 2;
/// Device coordinates beyond this many pixels would overflow the fixed-point
/// edge math. Clipped triangles never get here; only reachable with near
/// clipping off.
const GUARD_BAND: f32 = (1 << 24) as f32;

/// Framebuffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>,   // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f32>, // Depth buffer, f32::MAX = far
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![f32::MAX; width * height],
            width,
            height,
        }
    }

    /// Match the presentation surface; contents are undefined until the next clear
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height * 4, 0);
        self.zbuffer.resize(width * height, f32::MAX);
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.zbuffer.fill(f32::MAX);
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        self.target().set_pixel(x as i64, y as i64, color);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        let p = &self.pixels[idx..idx + 4];
        Some(Color::with_alpha(p[0], p[1], p[2], p[3]))
    }

    pub fn depth(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.zbuffer[y * self.width + x])
    }

    /// Draw a line from (x0, y0) to (x1, y1) using Bresenham's algorithm
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        self.target().draw_line(x0 as i64, y0 as i64, x1 as i64, y1 as i64, color);
    }

    /// Whole framebuffer as a single render target
    pub fn target(&mut self) -> Target<'_> {
        Target {
            pixels: &mut self.pixels,
            depth: &mut self.zbuffer,
            width: self.width,
            y0: 0,
            rows: self.height,
        }
    }
}

/// Exclusive view of a horizontal band of framebuffer rows
pub struct Target<'a> {
    pixels: &'a mut [u8],
    depth: &'a mut [f32],
    width: usize,
    y0: usize,
    rows: usize,
}

impl Target<'_> {
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let in_x = x >= 0 && (x as usize) < self.width;
        let in_y = y >= self.y0 as i64 && y < (self.y0 + self.rows) as i64;
        (in_x && in_y).then(|| (y as usize - self.y0) * self.width + x as usize)
    }

    /// No-op outside the band
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Color) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
        }
    }

    pub fn draw_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Device-space vertex handed to the rasterizer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenVertex {
    /// (pixel x, pixel y, NDC z, clip w)
    pub pos: Vec4,
    /// View-space normal
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Triangle ready for rasterization, produced once per frame
#[derive(Debug, Clone, Copy)]
pub struct ScreenTriangle {
    pub verts: [ScreenVertex; 3],
    pub material: usize,
}

/// Per-frame counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrawStats {
    /// Triangles handed to the pipeline
    pub submitted: usize,
    /// Dropped by frustum classification or near clipping
    pub clipped: usize,
    /// Back-facing or degenerate
    pub culled: usize,
    pub rasterized: usize,
    pub pixels: usize,
}

impl AddAssign for DrawStats {
    fn add_assign(&mut self, other: Self) {
        self.submitted += other.submitted;
        self.clipped += other.clipped;
        self.culled += other.culled;
        self.rasterized += other.rasterized;
        self.pixels += other.pixels;
    }
}

/// 2D cross product of (b - a) and (c - a)
pub fn edge(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let ab = b - a;
    let ac = c - a;
    ab.x() * ac.y() - ab.y() * ac.x()
}

/// Barycentric weights of `p` (summing to 1), or `None` for a degenerate triangle
pub fn barycentric(p: Vec2, v0: Vec2, v1: Vec2, v2: Vec2) -> Option<Vec3> {
    let area = edge(v0, v1, v2);
    if area.abs() < 1.0 {
        return None;
    }
    Some(Vec3::new([edge(v1, v2, p), edge(v2, v0, p), edge(v0, v1, p)]) / area)
}

/// Screen-space barycentrics to perspective-correct weights.
/// Returns the corrected weights and the interpolated 1/w.
pub fn perspective_weights(bary: [f32; 3], zinv: [f32; 3]) -> ([f32; 3], f32) {
    let scaled = [bary[0] * zinv[0], bary[1] * zinv[1], bary[2] * zinv[2]];
    let zinv_at = scaled[0] + scaled[1] + scaled[2];
    let weights = [scaled[0] / zinv_at, scaled[1] / zinv_at, scaled[2] / zinv_at];
    (weights, zinv_at)
}

/// Weighted sum of three per-vertex attributes
pub fn interpolate<const N: usize>(weights: [f32; 3], attrs: [Vector<f32, N>; 3]) -> Vector<f32, N> {
    attrs[0] * weights[0] + attrs[1] * weights[1] + attrs[2] * weights[2]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    BackFacing,
    Degenerate,
    OutOfRange,
}

/// Everything about a triangle that does not change from pixel to pixel
struct TriangleSetup {
    verts: [ScreenVertex; 3],
    /// Edge endpoints in fixed point: edge i is opposite vertex i
    edges: [([i64; 2], [i64; 2]); 3],
    bias: [i64; 3],
    delta_col: [i64; 3],
    delta_row: [i64; 3],
    area: f32,
    zinv: [f32; 3],
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
    material: usize,
}

fn to_fixed(v: f32) -> i64 {
    (v * SUBPIXEL as f32).round() as i64
}

fn fixed_edge(a: [i64; 2], b: [i64; 2], p: [i64; 2]) -> i64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn fixed_top_left(a: [i64; 2], b: [i64; 2]) -> bool {
    a[1] > b[1] || (a[1] == b[1] && a[0] < b[0])
}

impl TriangleSetup {
    fn new(tri: &ScreenTriangle, backface_cull: bool, viewport: Viewport) -> Result<Self, Rejection> {
        let mut verts = tri.verts;
        let in_range = verts.iter().all(|v| {
            v.pos.x().abs() < GUARD_BAND && v.pos.y().abs() < GUARD_BAND && v.pos.w().is_finite() && v.pos.w() != 0.0
        });
        if !in_range {
            return Err(Rejection::OutOfRange);
        }

        let fixed = |v: &ScreenVertex| [to_fixed(v.pos.x()), to_fixed(v.pos.y())];
        let mut p = [fixed(&verts[0]), fixed(&verts[1]), fixed(&verts[2])];
        let mut area = fixed_edge(p[0], p[1], p[2]);

        // Counter-clockwise in NDC is clockwise on the y-down grid, so front faces have negative area
        if area > 0 && backface_cull {
            return Err(Rejection::BackFacing);
        }
        if area < 0 {
            verts.swap(1, 2);
            p.swap(1, 2);
            area = -area;
        }
        // Less than one pixel of twice-area
        if area < SUBPIXEL * SUBPIXEL {
            return Err(Rejection::Degenerate);
        }

        let edges = [(p[1], p[2]), (p[2], p[0]), (p[0], p[1])];
        let mut bias = [0; 3];
        let mut delta_col = [0; 3];
        let mut delta_row = [0; 3];
        for (i, (a, b)) in edges.iter().enumerate() {
            bias[i] = fixed_top_left(*a, *b) as i64;
            delta_col[i] = (a[1] - b[1]) * SUBPIXEL;
            delta_row[i] = (b[0] - a[0]) * SUBPIXEL;
        }

        let xs = p.map(|v| v[0]);
        let ys = p.map(|v| v[1]);
        let floor_px = |v: i64| v >> SUBPIXEL_BITS;
        let ceil_px = |v: i64| (v + SUBPIXEL - 1) >> SUBPIXEL_BITS;
        let min_x = floor_px(xs.iter().copied().min().unwrap_or(0)).max(0);
        let max_x = ceil_px(xs.iter().copied().max().unwrap_or(0)).min(viewport.width as i64 - 1);
        let min_y = floor_px(ys.iter().copied().min().unwrap_or(0)).max(0);
        let max_y = ceil_px(ys.iter().copied().max().unwrap_or(0)).min(viewport.height as i64 - 1);

        Ok(Self {
            verts,
            edges,
            bias,
            delta_col,
            delta_row,
            area: area as f32,
            zinv: verts.map(|v| 1.0 / v.pos.w()),
            min_x,
            max_x,
            min_y,
            max_y,
            material: tri.material,
        })
    }

    fn fill(&self, target: &mut Target<'_>, material: &Material, shader: &dyn FragmentShader, epsilon: f32) -> usize {
        let y_start = self.min_y.max(target.y0 as i64);
        let y_end = self.max_y.min((target.y0 + target.rows) as i64 - 1);
        if y_start > y_end || self.min_x > self.max_x {
            return 0;
        }

        let origin = [self.min_x * SUBPIXEL + HALF_PIXEL, y_start * SUBPIXEL + HALF_PIXEL];
        let mut w_row = self.edges.map(|(a, b)| fixed_edge(a, b, origin));
        let mut written = 0;

        for y in y_start..=y_end {
            let mut w = w_row;
            for x in self.min_x..=self.max_x {
                let inside = (0..3).all(|i| w[i] + self.bias[i] > 0);
                if inside && self.shade_pixel(target, x, y, w, material, shader, epsilon) {
                    written += 1;
                }
                for i in 0..3 {
                    w[i] += self.delta_col[i];
                }
            }
            for i in 0..3 {
                w_row[i] += self.delta_row[i];
            }
        }
        written
    }

    #[allow(clippy::too_many_arguments)]
    fn shade_pixel(
        &self,
        target: &mut Target<'_>,
        x: i64,
        y: i64,
        w: [i64; 3],
        material: &Material,
        shader: &dyn FragmentShader,
        epsilon: f32,
    ) -> bool {
        let Some(idx) = target.index(x, y) else {
            return false;
        };

        let bary = w.map(|v| v as f32 / self.area);
        let (weights, zinv) = perspective_weights(bary, self.zinv);
        if zinv.is_nan() || zinv <= 0.0 {
            return false;
        }
        let depth = 1.0 / zinv;

        let stored = target.depth[idx];
        if depth > stored + epsilon {
            return false;
        }

        let fragment = Fragment {
            x: x as usize,
            y: y as usize,
            depth,
            uv: interpolate(weights, self.verts.map(|v| v.uv)),
            normal: interpolate(weights, self.verts.map(|v| v.normal)).normalize(),
        };
        let Some(color) = shader.shade(&fragment, material) else {
            return false;
        };

        target.depth[idx] = stored.min(depth);
        target.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
        true
    }
}

/// Fill one triangle into a target (used directly by tests and tools)
pub fn fill_triangle(
    target: &mut Target<'_>,
    viewport: Viewport,
    tri: &ScreenTriangle,
    material: &Material,
    shader: &dyn FragmentShader,
    settings: &RasterSettings,
) -> usize {
    match TriangleSetup::new(tri, settings.backface_cull, viewport) {
        Ok(setup) => setup.fill(target, material, shader, settings.depth_epsilon),
        Err(_) => 0,
    }
}

/// Outline one triangle with Bresenham lines, clipped per pixel
pub fn draw_wireframe(target: &mut Target<'_>, verts: &[ScreenVertex; 3], color: Color) {
    for i in 0..3 {
        let a = verts[i].pos;
        let b = verts[(i + 1) % 3].pos;
        if [a, b].iter().any(|v| v.x().abs() >= GUARD_BAND || v.y().abs() >= GUARD_BAND) {
            continue;
        }
        target.draw_line(a.x() as i64, a.y() as i64, b.x() as i64, b.y() as i64, color);
    }
}

/// Rasterize a frame's triangles in submission order.
///
/// `shader` overrides each material's own shading when set. With
/// `settings.parallel` the framebuffer is split into bands of
/// `settings.band_rows` rows and each band runs on the rayon pool; every band
/// owns its rows of color and depth, so the result matches the serial path.
pub fn rasterize(
    fb: &mut Framebuffer,
    triangles: &[ScreenTriangle],
    materials: &[Material],
    shader: Option<&dyn FragmentShader>,
    settings: &RasterSettings,
) -> DrawStats {
    let mut stats = DrawStats::default();
    if fb.width == 0 || fb.height == 0 {
        return stats;
    }

    let viewport = fb.viewport();
    let mut setups = Vec::with_capacity(triangles.len());
    for tri in triangles {
        match TriangleSetup::new(tri, settings.backface_cull && !settings.wireframe, viewport) {
            Ok(setup) => setups.push(setup),
            Err(Rejection::OutOfRange) => stats.clipped += 1,
            Err(Rejection::BackFacing | Rejection::Degenerate) => stats.culled += 1,
        }
    }
    stats.rasterized = setups.len();

    let fallback = Material::default();
    let material_of = |setup: &TriangleSetup| materials.get(setup.material).unwrap_or(&fallback);

    let draw_band = |target: &mut Target<'_>| -> usize {
        setups
            .iter()
            .map(|setup| {
                if settings.wireframe {
                    draw_wireframe(target, &setup.verts, settings.wireframe_color);
                    0
                } else {
                    let material = material_of(setup);
                    let shader = shader.unwrap_or_else(|| material.shading.shader());
                    setup.fill(target, material, shader, settings.depth_epsilon)
                }
            })
            .sum()
    };

    stats.pixels = if settings.parallel {
        let width = fb.width;
        let band_rows = settings.band_rows.max(1);
        fb.pixels
            .par_chunks_mut(band_rows * width * 4)
            .zip(fb.zbuffer.par_chunks_mut(band_rows * width))
            .enumerate()
            .map(|(band, (pixels, depth))| {
                let rows = depth.len() / width;
                let mut target = Target { pixels, depth, width, y0: band * band_rows, rows };
                draw_band(&mut target)
            })
            .sum()
    } else {
        draw_band(&mut fb.target())
    };

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::shading::normal_shader;

    const RED: Color = Color::RED;
    const BLUE: Color = Color::BLUE;

    fn vert(x: f32, y: f32, w: f32) -> ScreenVertex {
        ScreenVertex {
            pos: Vec4::new([x, y, 0.0, w]),
            normal: Vec3::new([0.0, 0.0, 1.0]),
            uv: Vec2::zeros(),
        }
    }

    fn tri(points: [(f32, f32); 3], w: f32) -> ScreenTriangle {
        ScreenTriangle {
            verts: points.map(|(x, y)| vert(x, y, w)),
            material: 0,
        }
    }

    fn flat(color: Color) -> impl Fn(&Fragment, &Material) -> Option<Color> + Sync {
        move |_: &Fragment, _: &Material| Some(color)
    }

    fn serial() -> RasterSettings {
        RasterSettings { parallel: false, ..Default::default() }
    }

    fn fill(fb: &mut Framebuffer, t: &ScreenTriangle, shader: &dyn FragmentShader) -> usize {
        let viewport = fb.viewport();
        fill_triangle(&mut fb.target(), viewport, t, &Material::default(), shader, &serial())
    }

    #[test]
    fn test_barycentric_inside() {
        let v1 = Vec2::new([0.0, 0.0]);
        let v2 = Vec2::new([10.0, 0.0]);
        let v3 = Vec2::new([5.0, 10.0]);
        let bc = barycentric(Vec2::new([5.0, 3.0]), v1, v2, v3).unwrap();
        assert!(bc.x() >= 0.0 && bc.y() >= 0.0 && bc.z() >= 0.0);
        assert!((bc.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_barycentric_sign_matches_geometry() {
        // Positive area in device space
        let (v0, v1, v2) = (Vec2::new([2.0, 1.0]), Vec2::new([17.0, 4.0]), Vec2::new([6.0, 15.0]));
        for y in 0..20 {
            for x in 0..20 {
                let p = Vec2::new([x as f32 + 0.5, y as f32 + 0.5]);
                let e = [edge(v1, v2, p), edge(v2, v0, p), edge(v0, v1, p)];
                let bc = barycentric(p, v0, v1, v2).unwrap();
                if e.iter().all(|&v| v > 0.0) {
                    assert!(bc.x() >= 0.0 && bc.y() >= 0.0 && bc.z() >= 0.0);
                } else if e.iter().any(|&v| v < 0.0) {
                    assert!(bc.x() < 0.0 || bc.y() < 0.0 || bc.z() < 0.0);
                }
            }
        }
    }

    #[test]
    fn test_fill_covers_exactly_interior_centers() {
        let (a, b, c) = ((2.0, 1.0), (6.0, 15.0), (17.0, 4.0));
        let mut fb = Framebuffer::new(20, 20);
        fb.clear(Color::BLACK);
        fill(&mut fb, &tri([a, b, c], 1.0), &flat(RED));

        let (v0, v1, v2) = (Vec2::new([a.0, a.1]), Vec2::new([b.0, b.1]), Vec2::new([c.0, c.1]));
        for y in 0..20 {
            for x in 0..20 {
                let bc = barycentric(Vec2::new([x as f32 + 0.5, y as f32 + 0.5]), v0, v1, v2).unwrap();
                let inside = bc.x() > 0.0 && bc.y() > 0.0 && bc.z() > 0.0;
                let outside = bc.x() < 0.0 || bc.y() < 0.0 || bc.z() < 0.0;
                let colored = fb.pixel(x, y) == Some(RED);
                if inside {
                    assert!(colored, "interior pixel ({x}, {y}) not filled");
                }
                if outside {
                    assert!(!colored, "exterior pixel ({x}, {y}) filled");
                }
            }
        }
    }

    /// Per-pixel claim counts for triangles drawn into separate buffers, so
    /// the depth test never hides a double claim
    fn coverage(tris: &[ScreenTriangle], settings: &RasterSettings) -> Vec<u32> {
        let mut counts = vec![0u32; 100];
        for t in tris {
            let mut fb = Framebuffer::new(10, 10);
            fb.clear(Color::BLACK);
            let viewport = fb.viewport();
            fill_triangle(&mut fb.target(), viewport, t, &Material::default(), &flat(RED), settings);
            for y in 0..10 {
                for x in 0..10 {
                    if fb.depth(x, y) != Some(f32::MAX) {
                        counts[y * 10 + x] += 1;
                    }
                }
            }
        }
        counts
    }

    #[test]
    fn test_shared_edge_claims_each_pixel_once() {
        // Listed (0,0)-(10,0)-(0,10) is clockwise in NDC (y flips), a back face.
        // Front-facing order swaps the last two vertices.
        let first = tri([(0.0, 0.0), (0.0, 10.0), (10.0, 0.0)], 1.0);
        let second = tri([(10.0, 0.0), (0.0, 10.0), (10.0, 10.0)], 1.0);
        let counts = coverage(&[first, second], &serial());
        assert!(counts.iter().all(|&c| c == 1), "coverage counts: {:?}", counts);

        // The same pair in its listed order, with culling off
        let first = tri([(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], 1.0);
        let second = tri([(10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], 1.0);
        let no_cull = RasterSettings { backface_cull: false, ..serial() };
        let counts = coverage(&[first, second], &no_cull);
        assert!(counts.iter().all(|&c| c == 1), "coverage counts: {:?}", counts);
        assert!(coverage(&[first, second], &serial()).iter().all(|&c| c == 0));
    }

    #[test]
    fn test_depth_epsilon_tolerance() {
        let settings = RasterSettings { depth_epsilon: 0.01, ..serial() };
        let points = [(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)];
        let draw = |second_w: f32| {
            let mut fb = Framebuffer::new(16, 16);
            fb.clear(Color::BLACK);
            let viewport = fb.viewport();
            let material = Material::default();
            fill_triangle(&mut fb.target(), viewport, &tri(points, 1.0), &material, &flat(RED), &settings);
            fill_triangle(&mut fb.target(), viewport, &tri(points, second_w), &material, &flat(BLUE), &settings);
            fb
        };

        // Coplanar: the later triangle wins
        let fb = draw(1.0);
        assert_eq!(fb.pixel(2, 2), Some(BLUE));

        // Slightly behind but inside the tolerance: still wins, depth keeps the nearer value
        let fb = draw(1.005);
        assert_eq!(fb.pixel(2, 2), Some(BLUE));
        assert!((fb.depth(2, 2).unwrap() - 1.0).abs() < 1e-5);

        // Beyond the tolerance: hidden
        let fb = draw(1.02);
        assert_eq!(fb.pixel(2, 2), Some(RED));
    }

    #[test]
    fn test_depth_order_independent() {
        let near = tri([(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)], 0.2);
        let far = tri([(0.0, 0.0), (0.0, 16.0), (16.0, 0.0)], 0.8);

        let mut a = Framebuffer::new(16, 16);
        a.clear(Color::BLACK);
        fill(&mut a, &far, &flat(BLUE));
        fill(&mut a, &near, &flat(RED));

        let mut b = Framebuffer::new(16, 16);
        b.clear(Color::BLACK);
        fill(&mut b, &near, &flat(RED));
        fill(&mut b, &far, &flat(BLUE));

        assert_eq!(a.pixels, b.pixels);
        assert_eq!(a.pixel(2, 2), Some(RED));
        assert!((a.depth(2, 2).unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(a.zbuffer, b.zbuffer);
    }

    #[test]
    fn test_perspective_weights_reproduce_vertex_attributes() {
        let uvs = [Vec2::new([0.125, 0.75]), Vec2::new([0.9, 0.1]), Vec2::new([0.3, 0.3])];
        let zinv = [1.0 / 1.0, 1.0 / 5.0, 1.0 / 100.0];
        for corner in 0..3 {
            let mut bary = [0.0; 3];
            bary[corner] = 1.0;
            let (weights, z) = perspective_weights(bary, zinv);
            assert_eq!(interpolate(weights, uvs), uvs[corner]);
            assert_eq!(z, zinv[corner]);
        }
    }

    #[test]
    fn test_perspective_midpoint_leans_toward_near_vertex() {
        let (weights, _) = perspective_weights([0.5, 0.5, 0.0], [1.0, 0.1, 1.0]);
        assert!(weights[0] > 0.9);
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_triangles_draw_nothing() {
        let mut fb = Framebuffer::new(16, 16);
        fb.clear(Color::BLACK);
        let colinear = tri([(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)], 1.0);
        let coincident = tri([(3.0, 3.0), (3.0, 3.0), (3.0, 3.0)], 1.0);
        assert_eq!(fill(&mut fb, &colinear, &flat(RED)), 0);
        assert_eq!(fill(&mut fb, &coincident, &flat(RED)), 0);
        assert!(fb.pixels.chunks(4).all(|p| p == Color::BLACK.to_bytes()));
    }

    #[test]
    fn test_back_faces_culled_unless_disabled() {
        let mut fb = Framebuffer::new(16, 16);
        let back = tri([(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], 1.0);
        assert_eq!(fill(&mut fb, &back, &flat(RED)), 0);

        let settings = RasterSettings { backface_cull: false, parallel: false, ..Default::default() };
        let viewport = fb.viewport();
        let drawn = fill_triangle(&mut fb.target(), viewport, &back, &Material::default(), &flat(RED), &settings);
        assert!(drawn > 0);
    }

    #[test]
    fn test_fill_clamps_to_framebuffer() {
        let mut fb = Framebuffer::new(8, 8);
        fb.clear(Color::BLACK);
        let huge = tri([(-50.0, -50.0), (-50.0, 200.0), (200.0, -50.0)], 1.0);
        assert_eq!(fill(&mut fb, &huge, &flat(RED)), 64);
    }

    #[test]
    fn test_discarded_fragment_keeps_depth() {
        let mut fb = Framebuffer::new(8, 8);
        fb.clear(Color::BLACK);
        let t = tri([(0.0, 0.0), (0.0, 8.0), (8.0, 0.0)], 1.0);
        let discard = |_: &Fragment, _: &Material| None;
        assert_eq!(fill(&mut fb, &t, &discard), 0);
        assert_eq!(fb.depth(1, 1), Some(f32::MAX));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let tris = [
            tri([(1.0, 1.0), (5.0, 70.0), (60.0, 3.0)], 2.0),
            tri([(10.0, 5.0), (0.0, 50.0), (63.0, 63.0)], 1.0),
            tri([(30.0, 0.0), (20.0, 40.0), (64.0, 20.0)], 3.0),
        ];
        let materials = [Material::default()];

        let mut serial_fb = Framebuffer::new(64, 80);
        serial_fb.clear(Color::BLACK);
        let serial_stats = rasterize(&mut serial_fb, &tris, &materials, Some(&normal_shader), &serial());

        let mut parallel_fb = Framebuffer::new(64, 80);
        parallel_fb.clear(Color::BLACK);
        let settings = RasterSettings { parallel: true, band_rows: 7, ..Default::default() };
        let parallel_stats = rasterize(&mut parallel_fb, &tris, &materials, Some(&normal_shader), &settings);

        assert_eq!(serial_stats, parallel_stats);
        assert_eq!(serial_fb.pixels, parallel_fb.pixels);
        assert_eq!(serial_fb.zbuffer, parallel_fb.zbuffer);
    }

    #[test]
    fn test_wireframe_outlines() {
        let mut fb = Framebuffer::new(16, 16);
        fb.clear(Color::BLACK);
        let t = tri([(1.0, 1.0), (12.0, 1.0), (1.0, 12.0)], 1.0);
        let settings = RasterSettings { wireframe: true, parallel: false, ..Default::default() };
        rasterize(&mut fb, &[t], &[Material::default()], None, &settings);

        let edge_color = settings.wireframe_color;
        assert_eq!(fb.pixel(6, 1), Some(edge_color));
        assert_eq!(fb.pixel(1, 6), Some(edge_color));
        // Interior untouched
        assert_eq!(fb.pixel(3, 3), Some(Color::BLACK));
    }

    #[test]
    fn test_draw_line_clips() {
        let mut fb = Framebuffer::new(4, 4);
        fb.clear(Color::BLACK);
        fb.draw_line(-10, 1, 10, 1, RED);
        for x in 0..4 {
            assert_eq!(fb.pixel(x, 1), Some(RED));
        }
        assert_eq!(fb.pixel(0, 0), Some(Color::BLACK));
    }

    #[test]
    fn test_resize_and_clear() {
        let mut fb = Framebuffer::new(2, 2);
        fb.resize(3, 5);
        assert_eq!(fb.pixels.len(), 3 * 5 * 4);
        assert_eq!(fb.zbuffer.len(), 15);
        fb.clear(Color::GREEN);
        assert_eq!(fb.pixel(2, 4), Some(Color::GREEN));
        assert_eq!(fb.pixel(3, 0), None);
        assert_eq!(fb.depth(1, 1), Some(f32::MAX));
    }
}
