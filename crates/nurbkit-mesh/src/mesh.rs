use nurbkit_core::traits::{BoundingBox, Validate};
use nurbkit_core::{KernelError, Result};
use nurbkit_math::{Aabb3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles in the mesh.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Area-weighted vertex normals accumulated from adjacent faces.
    ///
    /// Vertices with no non-degenerate face keep a zero normal.
    pub fn vertex_normals(&self) -> Vec<Vector3> {
        let mut normals = vec![Vector3::ZERO; self.vertices.len()];

        for &[i0, i1, i2] in &self.faces {
            let (i0, i1, i2) = (i0 as usize, i1 as usize, i2 as usize);
            let p0 = self.vertices[i0];
            let normal = (self.vertices[i1] - p0).cross(self.vertices[i2] - p0);
            normals[i0] += normal;
            normals[i1] += normal;
            normals[i2] += normal;
        }

        for n in &mut normals {
            let len = n.length();
            if len > 1e-12 {
                *n /= len;
            }
        }
        normals
    }

    /// Vertex positions as plain coordinate triples.
    pub fn vertex_triples(&self) -> Vec<[f64; 3]> {
        self.vertices.iter().map(|p| p.to_array()).collect()
    }
}

impl Validate for Mesh {
    fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (k, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&i| i as usize >= n) {
                return Err(KernelError::InvalidMesh(format!(
                    "face {k} references vertex {bad}, mesh has {n}"
                )));
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(KernelError::InvalidMesh(format!(
                    "face {k} repeats a vertex: {face:?}"
                )));
            }
        }
        Ok(())
    }
}

impl BoundingBox for Mesh {
    type Point = Point3;

    fn bounding_box(&self) -> (Point3, Point3) {
        let aabb = Aabb3::from_points(&self.vertices)
            .unwrap_or(Aabb3::new(Point3::ZERO, Point3::ZERO));
        (aabb.min, aabb.max)
    }
}
