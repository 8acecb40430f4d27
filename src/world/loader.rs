//! Wavefront OBJ/MTL loading
//!
//! Parsing is done by `tobj`; this module turns its models into `Object`s
//! and its materials into `Material`s. A model directory holds any number of
//! `.mtl` files and one `.obj`. Whatever `mtllib` the OBJ names, it is served
//! the directory's combined MTL text.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use super::{Mesh, Object, Triangle};
use crate::rasterizer::{Material, Texture, Vec2, Vec3};

/// Error type for model loading
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no .obj file in {0}")]
    MissingObj(PathBuf),
    #[error("OBJ/MTL error: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("object '{object}': {kind} index {index} out of range")]
    Index {
        object: String,
        kind: &'static str,
        index: usize,
    },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        ..Default::default()
    }
}

fn convert_material(material: &tobj::Material, dir: &Path) -> Material {
    let mut out = Material::new(&material.name);
    if let Some(ka) = material.ambient {
        out.ambient = Vec3::new(ka);
    }
    if let Some(kd) = material.diffuse {
        out.diffuse = Vec3::new(kd);
    }
    if let Some(ks) = material.specular {
        out.specular = Vec3::new(ks);
    }
    if let Some(ns) = material.shininess {
        out.shininess = ns;
    }
    out.texture_path = material.diffuse_texture.as_ref().map(|file| dir.join(file));
    out
}

/// Parse MTL text. `map_Kd` paths are resolved against `dir` but not decoded.
pub fn parse_mtl(src: &str, dir: &Path) -> Result<Vec<Material>, LoadError> {
    let (materials, _) = tobj::load_mtl_buf(&mut Cursor::new(src.as_bytes()))?;
    Ok(materials.iter().map(|m| convert_material(m, dir)).collect())
}

/// Decode one texture; failures are returned so the caller can decide how loud to be
pub fn load_texture(path: &Path) -> Result<Texture, LoadError> {
    Ok(Texture::from_file(path)?)
}

/// Decode every requested texture, leaving a material untextured (shown as
/// MISSING) when its image cannot be read
pub fn load_textures(materials: &mut [Material]) {
    for material in materials.iter_mut() {
        let Some(path) = material.texture_path.clone() else {
            continue;
        };
        match load_texture(&path) {
            Ok(texture) => {
                debug!("texture {} ({}x{})", path.display(), texture.width, texture.height);
                material.texture = Some(texture);
            }
            Err(e) => warn!("material '{}': failed to load {}: {}", material.name, path.display(), e),
        }
    }
}

fn vec3s(flat: &[f32]) -> Vec<Vec3> {
    flat.chunks_exact(3).map(|c| Vec3::new([c[0], c[1], c[2]])).collect()
}

fn vec2s(flat: &[f32]) -> Vec<Vec2> {
    flat.chunks_exact(2).map(|c| Vec2::new([c[0], c[1]])).collect()
}

/// One triangulated tobj model as an `Object`. Faces without normals get the
/// outward face normal, faces without texture coordinates get `None`.
fn convert_model(model: &tobj::Model, material: usize) -> Result<Object, LoadError> {
    let mesh = &model.mesh;
    // tobj names geometry that precedes any `o` statement
    let name = match model.name.as_str() {
        "" | "unnamed_object" => "default",
        name => name,
    };
    let mut object = Object::new(name);
    object.vertices = vec3s(&mesh.positions);
    object.uvs = vec2s(&mesh.texcoords);
    object.normals = vec3s(&mesh.normals);

    let has_uvs = mesh.texcoord_indices.len() == mesh.indices.len();
    let has_normals = mesh.normal_indices.len() == mesh.indices.len();

    for (face, idx) in mesh.indices.chunks_exact(3).enumerate() {
        let corner = |i: usize| face * 3 + i;
        let vertices = [0, 1, 2].map(|i| idx[i] as usize);

        let uvs = if has_uvs {
            [0, 1, 2].map(|i| Some(mesh.texcoord_indices[corner(i)] as usize))
        } else {
            [None; 3]
        };

        let normals = if has_normals {
            [0, 1, 2].map(|i| mesh.normal_indices[corner(i)] as usize)
        } else {
            let mut corners = [Vec3::zeros(); 3];
            for (slot, &v) in corners.iter_mut().zip(&vertices) {
                *slot = *object.vertices.get(v).ok_or_else(|| LoadError::Index {
                    object: object.name.clone(),
                    kind: "vertex",
                    index: v,
                })?;
            }
            let [a, b, c] = corners;
            object.normals.push((b - a).cross(&(c - a)).normalize());
            [object.normals.len() - 1; 3]
        };

        object.triangles.push(Triangle { vertices, uvs, normals, material });
    }
    Ok(object)
}

/// Convert parsed models, binding each to its material. Models without a
/// known material share one appended `default` entry.
fn build_mesh(models: &[tobj::Model], mut materials: Vec<Material>) -> Result<Mesh, LoadError> {
    let known = materials.len();
    let mut fallback = None;
    let mut objects = Vec::with_capacity(models.len());

    for model in models {
        let material = match model.mesh.material_id.filter(|&id| id < known) {
            Some(id) => id,
            None => *fallback.get_or_insert_with(|| {
                materials.push(Material::default());
                materials.len() - 1
            }),
        };
        let object = convert_model(model, material)?;
        if !object.triangles.is_empty() {
            objects.push(object);
        }
    }
    Ok(Mesh::new(objects, materials))
}

/// Parse OBJ text, serving `mtl` to every `mtllib` it names. Texture paths
/// resolve against `dir`.
pub fn parse_obj(obj: &str, mtl: &str, dir: &Path) -> Result<Mesh, LoadError> {
    let (models, materials) = tobj::load_obj_buf(&mut Cursor::new(obj.as_bytes()), &load_options(), |_| {
        tobj::load_mtl_buf(&mut Cursor::new(mtl.as_bytes()))
    })?;
    let materials = materials?.iter().map(|m| convert_material(m, dir)).collect();
    build_mesh(&models, materials)
}

impl Mesh {
    /// Build a mesh from OBJ and MTL text; textures are requested but not decoded
    pub fn from_obj_str(obj: &str, mtl: &str) -> Result<Self, LoadError> {
        parse_obj(obj, mtl, Path::new("."))
    }
}

fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every `.mtl` and the first `.obj` (by name) from a model directory
pub fn load_model_dir<P: AsRef<Path>>(dir: P) -> Result<Mesh, LoadError> {
    let dir = dir.as_ref();

    let mut mtl = String::new();
    for path in files_with_extension(dir, "mtl")? {
        mtl.push_str(&fs::read_to_string(&path)?);
        mtl.push('\n');
    }

    let obj = files_with_extension(dir, "obj")?
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::MissingObj(dir.to_path_buf()))?;
    let contents = fs::read_to_string(&obj)?;

    let mut mesh = parse_obj(&contents, &mtl, dir)?;
    load_textures(&mut mesh.materials);
    info!(
        "loaded {}: {} objects, {} triangles",
        obj.display(),
        mesh.objects.len(),
        mesh.triangle_count()
    );
    debug!("{}", mesh.summary());
    Ok(mesh)
}
