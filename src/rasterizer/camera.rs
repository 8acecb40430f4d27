//! Perspective camera and the clip-to-device stage
//!
//! The camera looks down -Z in view space. `view` maps world space straight to
//! camera space; `projection` maps camera space to clip space with w = -z.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use super::math::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Target dimensions in pixels, re-read every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Clip-space vertex with the attributes that get interpolated
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipVertex {
    pub pos: Vec4,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl ClipVertex {
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            pos: self.pos.lerp(&other.pos, t),
            normal: self.normal.lerp(&other.normal, t),
            uv: self.uv.lerp(&other.uv, t),
        }
    }
}

/// Half-width of the guard band in NDC units. Clipping to it keeps device
/// coordinates far inside the rasterizer's fixed-point range.
pub const GUARD_BAND_NDC: f32 = 256.0;

/// A triangle gains at most one vertex per clip plane: 3 + near + 4 guard planes
const MAX_CLIPPED: usize = 8;

/// Convex polygon left after clipping one triangle
#[derive(Debug, Clone, Copy)]
pub struct ClippedPolygon {
    verts: [ClipVertex; MAX_CLIPPED],
    len: usize,
}

impl ClippedPolygon {
    fn new(tri: [ClipVertex; 3]) -> Self {
        let mut poly = Self { verts: [ClipVertex::default(); MAX_CLIPPED], len: 0 };
        for v in tri {
            poly.push(v);
        }
        poly
    }

    fn push(&mut self, v: ClipVertex) {
        if self.len < MAX_CLIPPED {
            self.verts[self.len] = v;
            self.len += 1;
        }
    }

    /// Sutherland-Hodgman against one plane; `dist >= 0` is kept
    fn clip(&self, dist: impl Fn(&Vec4) -> f32) -> Self {
        let mut out = Self { verts: [ClipVertex::default(); MAX_CLIPPED], len: 0 };
        if self.is_empty() {
            return out;
        }
        for i in 0..self.len {
            let a = &self.verts[i];
            let b = &self.verts[(i + 1) % self.len];
            let (da, db) = (dist(&a.pos), dist(&b.pos));

            if da >= 0.0 {
                out.push(*a);
            }
            if (da >= 0.0) != (db >= 0.0) {
                out.push(a.lerp(b, da / (da - db)));
            }
        }
        out
    }

    pub fn vertices(&self) -> &[ClipVertex] {
        &self.verts[..self.len]
    }

    /// Fan-triangulate the clipped polygon
    pub fn triangles(&self) -> impl Iterator<Item = [ClipVertex; 3]> + '_ {
        (1..self.len.saturating_sub(1)).map(move |i| [self.verts[0], self.verts[i], self.verts[i + 1]])
    }

    pub fn is_empty(&self) -> bool {
        self.len < 3
    }
}

/// Camera state
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    position: Vec3,
    /// (pitch, yaw) in radians
    rotation: Vec2,
    fov_deg: f32,
    near: f32,
    far: f32,
}

impl Camera {
    pub fn new(fov_deg: f32, near: f32, far: f32) -> Self {
        let oo_tan = 1.0 / (fov_deg * PI / 360.0).tan();

        let mut projection = Mat4::identity();
        projection[0][0] = oo_tan;
        projection[1][1] = oo_tan;
        projection[2][2] = -(far + near) / (far - near);
        projection[2][3] = -2.0 * far * near / (far - near);
        projection[3][2] = -1.0;
        projection[3][3] = 0.0;

        Self {
            projection,
            view: Mat4::identity(),
            position: Vec3::zeros(),
            rotation: Vec2::zeros(),
            fov_deg,
            near,
            far,
        }
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    pub fn fov_deg(&self) -> f32 {
        self.fov_deg
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Camera-to-world rotation (transpose of the view rotation)
    pub fn rotation_matrix(&self) -> Mat3 {
        self.view.project_to::<3, 3>().transpose()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation_matrix() * Vec3::new([0.0, 0.0, -1.0])
    }

    pub fn right(&self) -> Vec3 {
        self.rotation_matrix() * Vec3::new([1.0, 0.0, 0.0])
    }

    pub fn up(&self) -> Vec3 {
        self.rotation_matrix() * Vec3::new([0.0, 1.0, 0.0])
    }

    /// Set (pitch, yaw). Pitch is clamped to +-90 degrees, yaw wraps at 360.
    pub fn set_rotation(&mut self, rotation: Vec2) {
        let pitch = rotation[0].clamp(-FRAC_PI_2, FRAC_PI_2);
        let yaw = rotation[1] % TAU;
        self.rotation = Vec2::new([pitch, yaw]);
        self.view.set_view(pitch, yaw);
        self.set_position(self.position);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        let rotation: Mat3 = self.view.project_to::<3, 3>();
        self.view.set_position(-(rotation * position));
    }

    /// projection * view
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Perspective divide and viewport map. Returns the device vertex
    /// (pixel x, pixel y, NDC z, clip w) and whether it lies inside the frustum.
    pub fn to_device(&self, clip: Vec4, viewport: Viewport) -> (Vec4, bool) {
        let w = clip.w();
        let ndc = clip / w;
        let inside = self.is_inside(clip);

        let width = viewport.width as f32;
        let height = viewport.height as f32;
        let span = width.max(height);
        let device = Vec4::new([
            (width + ndc.x() * span) / 2.0,
            (height - ndc.y() * span) / 2.0,
            ndc.z(),
            w,
        ]);
        (device, inside)
    }

    /// Device coordinates of all three vertices
    pub fn triangle_to_device(&self, verts: [Vec4; 3], viewport: Viewport) -> [Vec4; 3] {
        verts.map(|v| self.to_device(v, viewport).0)
    }

    /// Whether a clip-space vertex lands inside the frustum after the divide
    pub fn is_inside(&self, clip: Vec4) -> bool {
        let ndc = clip / clip.w();
        ndc.x().abs() <= 1.0 && ndc.y().abs() <= 1.0 && ndc.z().abs() <= 1.0
    }

    /// False when all three vertices are outside the frustum and the triangle
    /// should be skipped
    pub fn triangle_visible(&self, verts: &[Vec4; 3]) -> bool {
        verts.iter().any(|v| self.is_inside(*v))
    }

    /// Clip against the near plane (z >= -w in clip space) and the guard band
    /// (|x|, |y| <= GUARD_BAND_NDC * w)
    pub fn clip_near(&self, tri: [ClipVertex; 3]) -> ClippedPolygon {
        let k = GUARD_BAND_NDC;
        ClippedPolygon::new(tri)
            .clip(|p| p.z() + p.w())
            .clip(|p| k * p.w() - p.x())
            .clip(|p| k * p.w() + p.x())
            .clip(|p| k * p.w() - p.y())
            .clip(|p| k * p.w() + p.y())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(60.0, 0.1, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_vec3(a: Vec3, b: [f32; 3]) {
        for i in 0..3 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_projection_matrix() {
        let cam = Camera::new(90.0, 1.0, 3.0);
        let p = cam.projection();
        assert_relative_eq!(p[0][0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(p[1][1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(p[2][2], -2.0);
        assert_relative_eq!(p[2][3], -3.0);
        assert_eq!(p[3][2], -1.0);
        assert_eq!(p[3][3], 0.0);
    }

    #[test]
    fn test_near_and_far_map_to_ndc_bounds() {
        let cam = Camera::new(60.0, 0.5, 50.0);
        let near = *cam.projection() * Vec4::new([0.0, 0.0, -0.5, 1.0]);
        let far = *cam.projection() * Vec4::new([0.0, 0.0, -50.0, 1.0]);
        assert_relative_eq!(near.z() / near.w(), -1.0, epsilon = 1e-5);
        assert_relative_eq!(far.z() / far.w(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(far.w(), 50.0);
    }

    #[test]
    fn test_default_basis() {
        let cam = Camera::default();
        assert_vec3(cam.forward(), [0.0, 0.0, -1.0]);
        assert_vec3(cam.right(), [1.0, 0.0, 0.0]);
        assert_vec3(cam.up(), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_yaw_turns_right() {
        let mut cam = Camera::default();
        cam.set_rotation(Vec2::new([0.0, FRAC_PI_2]));
        assert_vec3(cam.forward(), [1.0, 0.0, 0.0]);
        assert_vec3(cam.right(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rotation_clamps_and_wraps() {
        let mut cam = Camera::default();
        cam.set_rotation(Vec2::new([3.0, 7.0]));
        assert_eq!(cam.rotation()[0], FRAC_PI_2);
        assert_relative_eq!(cam.rotation()[1], 7.0 - TAU, epsilon = 1e-6);
    }

    #[test]
    fn test_view_maps_world_to_camera() {
        let mut cam = Camera::default();
        cam.set_position(Vec3::new([0.0, 0.0, 5.0]));
        let p = *cam.view() * Vec4::new([0.0, 0.0, 0.0, 1.0]);
        assert_vec3(p.project_to::<3>(), [0.0, 0.0, -5.0]);

        // Rotating keeps the camera where it was
        cam.set_rotation(Vec2::new([0.2, 1.0]));
        let eye = *cam.view() * Vec4::new([0.0, 0.0, 5.0, 1.0]);
        assert_vec3(eye.project_to::<3>(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_device_mapping_uses_larger_dimension() {
        let cam = Camera::default();
        let viewport = Viewport::new(800, 600);
        let (center, inside) = cam.to_device(Vec4::new([0.0, 0.0, 0.0, 2.0]), viewport);
        assert!(inside);
        assert_eq!(center, Vec4::new([400.0, 300.0, 0.0, 2.0]));

        let (corner, inside) = cam.to_device(Vec4::new([1.0, 1.0, 0.0, 1.0]), viewport);
        assert!(inside);
        assert_eq!(corner.x(), 800.0);
        assert_eq!(corner.y(), -100.0);
    }

    #[test]
    fn test_triangle_skipped_only_when_all_outside() {
        let cam = Camera::default();
        let viewport = Viewport::new(100, 100);
        let outside = Vec4::new([5.0, 0.0, 0.0, 1.0]);
        let inside = Vec4::new([0.0, 0.0, 0.0, 1.0]);

        let partly = [outside, outside, inside];
        assert!(cam.triangle_visible(&partly));
        let device = cam.triangle_to_device(partly, viewport);
        assert_eq!(device[2], Vec4::new([50.0, 50.0, 0.0, 1.0]));
        assert_eq!(device[0].x(), 300.0);

        let all_out = [outside, outside, Vec4::new([0.0, 0.0, 3.0, 1.0])];
        assert!(!cam.triangle_visible(&all_out));
    }

    #[test]
    fn test_clip_near() {
        let cam = Camera::default();
        let v = |z: f32, w: f32| ClipVertex { pos: Vec4::new([0.0, 0.0, z, w]), ..Default::default() };

        let inside = cam.clip_near([v(0.0, 1.0), v(0.5, 1.0), v(0.2, 2.0)]);
        assert_eq!(inside.triangles().count(), 1);

        let behind = cam.clip_near([v(-3.0, 1.0), v(-3.0, 1.0), v(-4.0, 2.0)]);
        assert!(behind.is_empty());
        assert_eq!(behind.triangles().count(), 0);

        // One vertex behind: quad, two triangles, all on or in front of the plane
        let split = cam.clip_near([v(0.0, 1.0), v(0.0, 1.0), v(-3.0, 1.0)]);
        let tris: Vec<_> = split.triangles().collect();
        assert_eq!(tris.len(), 2);
        for tri in tris {
            for vert in tri {
                assert!(vert.pos.z() + vert.pos.w() >= -1e-6);
            }
        }

        // Two vertices behind: single smaller triangle
        let shrunk = cam.clip_near([v(0.0, 1.0), v(-3.0, 1.0), v(-3.0, 1.0)]);
        assert_eq!(shrunk.triangles().count(), 1);
    }

    #[test]
    fn test_clip_guard_band() {
        let cam = Camera::default();
        let v = |x: f32, y: f32| ClipVertex { pos: Vec4::new([x, y, 0.0, 1.0]), ..Default::default() };
        let k = GUARD_BAND_NDC;

        // Well inside the band: untouched
        let small = cam.clip_near([v(-10.0, -10.0), v(10.0, -10.0), v(0.0, 10.0)]);
        assert_eq!(small.vertices().len(), 3);

        // Reaching far past the band on the right and top: trimmed, not dropped
        let wide = cam.clip_near([v(0.0, 0.0), v(1e7, 0.0), v(0.0, 1e7)]);
        assert!(!wide.is_empty());
        assert!(wide.vertices().iter().any(|c| c.pos == Vec4::new([0.0, 0.0, 0.0, 1.0])));
        for c in wide.vertices() {
            assert!(c.pos.x() <= k * c.pos.w() + 1e-3);
            assert!(c.pos.y() <= k * c.pos.w() + 1e-3);
        }
        assert_eq!(wide.triangles().count(), wide.vertices().len() - 2);
    }
}
