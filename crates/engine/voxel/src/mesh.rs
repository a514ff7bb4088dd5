//! Triangle meshes loaded from scene files

use crate::types::{Result, VoxelError};
use glam::DVec3;
use std::path::Path;

/// Indexed triangle mesh in scene units
///
/// All objects of a scene file are merged into one mesh, since the occupancy
/// grid does not distinguish between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    /// Vertex positions
    pub vertices: Vec<DVec3>,
    /// Triangle faces as vertex indices [v0, v1, v2]
    pub faces: Vec<[u32; 3]>,
}

impl TriMesh {
    pub fn new(vertices: Vec<DVec3>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Load every object of a Wavefront OBJ file, triangulating polygons
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };

        let (models, _materials) =
            tobj::load_obj(path, &options).map_err(|err| VoxelError::Load {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        let mut mesh = TriMesh::default();
        for model in &models {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend(
                model
                    .mesh
                    .positions
                    .chunks_exact(3)
                    .map(|p| DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64)),
            );
            mesh.faces.extend(
                model
                    .mesh
                    .indices
                    .chunks_exact(3)
                    .map(|f| [base + f[0], base + f[1], base + f[2]]),
            );
        }

        mesh.validate().map_err(|reason| VoxelError::Load {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::debug!(
            "Loaded {} objects ({} vertices, {} faces) from {}",
            models.len(),
            mesh.vertices.len(),
            mesh.faces.len(),
            path.display()
        );

        Ok(mesh)
    }

    /// Check the mesh has geometry and every face index is in range
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.vertices.is_empty() {
            return Err("mesh has no vertices".to_string());
        }
        if self.faces.is_empty() {
            return Err("mesh has no faces".to_string());
        }

        let vertex_count = self.vertices.len() as u32;
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(&idx) = face.iter().find(|&&idx| idx >= vertex_count) {
                return Err(format!(
                    "face {} has invalid vertex index {} (max: {})",
                    i,
                    idx,
                    vertex_count - 1
                ));
            }
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for a mesh without vertices
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(min, max), &v| (min.min(v), max.max(v))),
        )
    }

    /// `max - min` per axis
    pub fn extent(&self) -> Option<DVec3> {
        self.bounds().map(|(min, max)| max - min)
    }

    pub fn apply_scale(&mut self, factor: f64) {
        for v in &mut self.vertices {
            *v *= factor;
        }
    }

    pub fn apply_translation(&mut self, offset: DVec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Corner positions of every face
    pub fn triangles(&self) -> impl Iterator<Item = [DVec3; 3]> + '_ {
        self.faces.iter().map(move |&[a, b, c]| {
            [
                self.vertices[a as usize],
                self.vertices[b as usize],
                self.vertices[c as usize],
            ]
        })
    }

    /// Axis-aligned box between `min` and `max` (12 triangles, outward winding)
    pub fn cuboid(min: DVec3, max: DVec3) -> Self {
        let vertices = vec![
            DVec3::new(min.x, min.y, min.z),
            DVec3::new(max.x, min.y, min.z),
            DVec3::new(max.x, max.y, min.z),
            DVec3::new(min.x, max.y, min.z),
            DVec3::new(min.x, min.y, max.z),
            DVec3::new(max.x, min.y, max.z),
            DVec3::new(max.x, max.y, max.z),
            DVec3::new(min.x, max.y, max.z),
        ];
        let faces = vec![
            // Back
            [0, 2, 1],
            [0, 3, 2],
            // Front
            [4, 5, 6],
            [4, 6, 7],
            // Left
            [0, 7, 3],
            [0, 4, 7],
            // Right
            [1, 2, 6],
            [1, 6, 5],
            // Bottom
            [0, 1, 5],
            [0, 5, 4],
            // Top
            [3, 6, 2],
            [3, 7, 6],
        ];
        Self { vertices, faces }
    }
}
