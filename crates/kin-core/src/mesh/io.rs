//! Mesh file loading (STL, OBJ) and STL writing

use std::io::BufReader;
use std::path::Path;

use glam::DVec3;

use super::Mesh;
use super::normals::calculate_triangle_normal;

/// Mesh-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Write error: {0}")]
    Write(String),
    #[error("Empty mesh: no geometry found")]
    EmptyMesh,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Detect mesh format from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    Unknown,
}

impl MeshFormat {
    /// Detect format from file path
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("stl") => MeshFormat::Stl,
            Some("obj") => MeshFormat::Obj,
            _ => MeshFormat::Unknown,
        }
    }
}

/// Load any supported mesh format
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    match MeshFormat::from_path(path) {
        MeshFormat::Stl => load_stl(path),
        MeshFormat::Obj => load_obj(path),
        MeshFormat::Unknown => Err(MeshError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        )),
    }
}

/// Load an STL file (binary or ASCII)
pub fn load_stl(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| MeshError::Io(e.to_string()))?;
    let mut reader = BufReader::new(file);
    let stl = stl_io::read_stl(&mut reader).map_err(|e| MeshError::Parse(e.to_string()))?;

    if stl.faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    let vertices = stl
        .vertices
        .iter()
        .map(|v| DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();
    let triangles = stl
        .faces
        .iter()
        .map(|f| {
            [
                f.vertices[0] as u32,
                f.vertices[1] as u32,
                f.vertices[2] as u32,
            ]
        })
        .collect();

    let mut mesh = Mesh::new(vertices, triangles);
    mesh.compute_normals();
    Ok(mesh)
}

/// Load an OBJ file, merging all models into one mesh
pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
    let (models, _materials) = tobj::load_obj(
        path.as_ref(),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| MeshError::Parse(e.to_string()))?;

    let mut mesh = Mesh::default();
    for model in &models {
        let offset = mesh.vertices.len() as u32;
        mesh.vertices.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|c| DVec3::new(c[0] as f64, c[1] as f64, c[2] as f64)),
        );
        mesh.triangles.extend(
            model
                .mesh
                .indices
                .chunks_exact(3)
                .map(|t| [offset + t[0], offset + t[1], offset + t[2]]),
        );
    }

    if mesh.vertices.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    mesh.compute_normals();
    Ok(mesh)
}

/// Save a mesh as a binary STL file
pub fn save_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<(), MeshError> {
    let to_f32 = |v: DVec3| [v.x as f32, v.y as f32, v.z as f32];

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|&[a, b, c]| {
            let (v0, v1, v2) = (
                mesh.vertices[a as usize],
                mesh.vertices[b as usize],
                mesh.vertices[c as usize],
            );
            stl_io::Triangle {
                normal: stl_io::Normal::new(to_f32(calculate_triangle_normal(v0, v1, v2))),
                vertices: [
                    stl_io::Vertex::new(to_f32(v0)),
                    stl_io::Vertex::new(to_f32(v1)),
                    stl_io::Vertex::new(to_f32(v2)),
                ],
            }
        })
        .collect();

    let mut file = std::fs::File::create(path.as_ref()).map_err(|e| MeshError::Io(e.to_string()))?;
    stl_io::write_stl(&mut file, triangles.iter()).map_err(|e| MeshError::Write(e.to_string()))?;
    Ok(())
}
