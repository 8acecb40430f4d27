//! Mesh data and the geometry stage
//!
//! Objects own their vertex arrays and triangles hold indices into them. A draw
//! call transforms every vertex once, near-clips and classifies each triangle,
//! and hands the surviving screen-space triangles to the rasterizer.

use std::fmt::Write as _;

use log::{debug, trace};
use rayon::prelude::*;
use thiserror::Error;

use crate::rasterizer::{
    rasterize, Camera, ClipVertex, DrawStats, FragmentShader, Framebuffer, Mat4, Material, RasterSettings,
    ScreenTriangle, ScreenVertex, Vec2, Vec3, Vec4, Viewport,
};

/// Error type for mesh draw calls
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("object '{object}': {kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        object: String,
        kind: &'static str,
        index: usize,
        len: usize,
    },
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that any point expands
    pub fn empty() -> Self {
        Self::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN))
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Expand bounds to include a point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.zip_with(&point, f32::min);
        self.max = self.max.zip_with(&point, f32::max);
    }

    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            let pick = |axis: usize| if i & (1 << axis) == 0 { self.min[axis] } else { self.max[axis] };
            Vec3::new([pick(0), pick(1), pick(2)])
        })
    }

    /// True when the box lies entirely outside one frustum plane of `clip`
    /// (model to clip space). Every point of the box is a convex combination
    /// of its corners, so one shared outside plane rejects all of it.
    pub fn outside_frustum(&self, clip: &Mat4) -> bool {
        if self.is_empty() {
            return false;
        }
        let corners = self.corners().map(|c| *clip * homogeneous(c));
        let planes: [fn(&Vec4) -> f32; 6] = [
            |p| p.w() + p.x(),
            |p| p.w() - p.x(),
            |p| p.w() + p.y(),
            |p| p.w() - p.y(),
            |p| p.w() + p.z(),
            |p| p.w() - p.z(),
        ];
        planes.iter().any(|dist| corners.iter().all(|c| dist(c) < 0.0))
    }
}

/// Indices into the owning object's arrays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [usize; 3],
    /// `None` where the face gave no texture coordinate
    pub uvs: [Option<usize>; 3],
    pub normals: [usize; 3],
    /// Index into the mesh's material table
    pub material: usize,
}

/// Named group of model-space geometry
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
}

impl Object {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn add_vertex(&mut self, position: Vec3) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    /// Add a triangle using the outward face normal and no texture coordinates
    pub fn add_flat_triangle(&mut self, vertices: [usize; 3], material: usize) {
        let [a, b, c] = vertices.map(|i| self.vertices.get(i).copied().unwrap_or_default());
        self.normals.push((b - a).cross(&(c - a)).normalize());
        let n = self.normals.len() - 1;
        self.triangles.push(Triangle { vertices, uvs: [None; 3], normals: [n; 3], material });
    }

    fn check(&self, kind: &'static str, index: usize, len: usize) -> Result<(), RenderError> {
        if index < len {
            Ok(())
        } else {
            Err(RenderError::IndexOutOfRange { object: self.name.clone(), kind, index, len })
        }
    }

    /// Verify every triangle index against this object's arrays and the material table
    pub fn validate(&self, materials: usize) -> Result<(), RenderError> {
        for tri in &self.triangles {
            for i in 0..3 {
                self.check("vertex", tri.vertices[i], self.vertices.len())?;
                self.check("normal", tri.normals[i], self.normals.len())?;
                if let Some(uv) = tri.uvs[i] {
                    self.check("uv", uv, self.uvs.len())?;
                }
            }
            self.check("material", tri.material, materials)?;
        }
        Ok(())
    }
}

/// Renderable mesh: objects, their materials, and a model transform
#[derive(Debug, Clone)]
pub struct Mesh {
    pub objects: Vec<Object>,
    pub materials: Vec<Material>,
    transform: Mat4,
    rotation: Vec3,
    scale: Vec3,
}

fn homogeneous(v: Vec3) -> Vec4 {
    let mut h: Vec4 = v.embed_in();
    h[3] = 1.0;
    h
}

impl Mesh {
    pub fn new(objects: Vec<Object>, materials: Vec<Material>) -> Self {
        Self {
            objects,
            materials,
            transform: Mat4::identity(),
            rotation: Vec3::zeros(),
            scale: Vec3::splat(1.0),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.triangles.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.objects.iter().map(|o| o.vertices.len()).sum()
    }

    /// Model-space bounds of every vertex
    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for v in self.objects.iter().flat_map(|o| &o.vertices) {
            bounds.expand(*v);
        }
        bounds
    }

    /// Average of all vertex positions; zero for an empty mesh
    pub fn center_of_mass(&self) -> Vec3 {
        let count = self.vertex_count();
        if count == 0 {
            return Vec3::zeros();
        }
        let sum = self
            .objects
            .iter()
            .flat_map(|o| &o.vertices)
            .fold(Vec3::zeros(), |acc, v| acc + *v);
        sum / count as f32
    }

    /// Shift every vertex so that `center` becomes the model-space origin
    pub fn set_center(&mut self, center: Vec3) {
        for v in self.objects.iter_mut().flat_map(|o| o.vertices.iter_mut()) {
            *v -= center;
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.get_position()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
    }

    /// Euler angles last passed to `set_rotation`
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn set_rotation(&mut self, angles: Vec3) {
        self.rotation = angles;
        self.rebuild_linear();
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.set_scale_axes(Vec3::splat(scale));
    }

    pub fn set_scale_axes(&mut self, scale: Vec3) {
        self.scale = scale;
        self.rebuild_linear();
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Replace the model matrix; cached rotation and scale are left untouched
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    fn rebuild_linear(&mut self) {
        self.transform.set_rotation3(self.rotation);
        self.transform.scale_axes(self.scale);
    }

    /// One-line-per-object description for debug logs
    pub fn summary(&self) -> String {
        let bounds = self.bounds();
        let mut out = format!(
            "{} objects, {} materials, {} vertices, {} triangles, bounds {} .. {}\n",
            self.objects.len(),
            self.materials.len(),
            self.vertex_count(),
            self.triangle_count(),
            bounds.min,
            bounds.max
        );
        for object in &self.objects {
            writeln!(
                out,
                "  object '{}': {} vertices, {} uvs, {} normals, {} triangles",
                object.name,
                object.vertices.len(),
                object.uvs.len(),
                object.normals.len(),
                object.triangles.len()
            )
            .ok();
        }
        for material in &self.materials {
            let texture = match (&material.texture, &material.texture_path) {
                (Some(t), _) => format!("{}x{}", t.width, t.height),
                (None, Some(path)) => format!("missing {}", path.display()),
                (None, None) => "none".to_string(),
            };
            writeln!(out, "  material '{}': Kd {} texture {}", material.name, material.diffuse, texture).ok();
        }
        out.truncate(out.trim_end().len());
        out
    }

    /// Transform, clip and classify every triangle, producing the frame's
    /// screen-space triangles. Nothing is drawn.
    pub fn prepare(
        &self,
        camera: &Camera,
        viewport: Viewport,
        settings: &RasterSettings,
    ) -> Result<(Vec<ScreenTriangle>, DrawStats), RenderError> {
        for object in &self.objects {
            object.validate(self.materials.len())?;
        }

        let model_view = *camera.view() * self.transform;
        let full = camera.view_projection() * self.transform;
        let mut stats = DrawStats::default();

        // With near clipping every drawn point has w >= near, so a mesh fully
        // outside one plane cannot reach the screen
        if settings.near_clip && self.bounds().outside_frustum(&full) {
            stats.submitted = self.triangle_count();
            stats.clipped = stats.submitted;
            trace!("mesh outside the frustum, {} triangles skipped", stats.submitted);
            return Ok((Vec::new(), stats));
        }

        let mut out = Vec::with_capacity(self.triangle_count());

        for object in &self.objects {
            let to_clip = |v: &Vec3| full * homogeneous(*v);
            let to_view = |n: &Vec3| (model_view * n.embed_in::<4>()).project_to::<3>().normalize();
            let (clip, normals): (Vec<Vec4>, Vec<Vec3>) = if settings.parallel {
                (
                    object.vertices.par_iter().map(to_clip).collect(),
                    object.normals.par_iter().map(to_view).collect(),
                )
            } else {
                (
                    object.vertices.iter().map(to_clip).collect(),
                    object.normals.iter().map(to_view).collect(),
                )
            };

            for tri in &object.triangles {
                stats.submitted += 1;
                let corner = |i: usize| ClipVertex {
                    pos: clip[tri.vertices[i]],
                    normal: normals[tri.normals[i]],
                    uv: tri.uvs[i].map(|uv| object.uvs[uv]).unwrap_or_default(),
                };
                let corners = [corner(0), corner(1), corner(2)];

                if !camera.triangle_visible(&corners.map(|c| c.pos)) {
                    stats.clipped += 1;
                    continue;
                }
                if settings.near_clip {
                    let clipped = camera.clip_near(corners);
                    if clipped.is_empty() {
                        stats.clipped += 1;
                        continue;
                    }
                    out.extend(clipped.triangles().map(|piece| to_screen(camera, viewport, piece, tri.material)));
                } else {
                    out.push(to_screen(camera, viewport, corners, tri.material));
                }
            }
        }

        trace!("prepared {} screen triangles from {}", out.len(), stats.submitted);
        Ok((out, stats))
    }

    /// Draw into `fb`. `shader` replaces every material's own shading when set.
    pub fn draw(
        &self,
        camera: &Camera,
        fb: &mut Framebuffer,
        settings: &RasterSettings,
        shader: Option<&dyn FragmentShader>,
    ) -> Result<DrawStats, RenderError> {
        let (triangles, mut stats) = self.prepare(camera, fb.viewport(), settings)?;
        stats += rasterize(fb, &triangles, &self.materials, shader, settings);
        debug!(
            "mesh drawn: {} submitted, {} clipped, {} culled, {} pixels",
            stats.submitted, stats.clipped, stats.culled, stats.pixels
        );
        Ok(stats)
    }
}

fn to_screen(camera: &Camera, viewport: Viewport, corners: [ClipVertex; 3], material: usize) -> ScreenTriangle {
    let positions = camera.triangle_to_device(corners.map(|c| c.pos), viewport);
    let verts = std::array::from_fn(|i| ScreenVertex {
        pos: positions[i],
        normal: corners[i].normal,
        uv: corners[i].uv,
    });
    ScreenTriangle { verts, material }
}
