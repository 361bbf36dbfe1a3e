//! Mesh geometry for the renderer's world.
//!
//! A mesh owns its object-space faces and the world-space triangles derived
//! from them. The two are kept in sync through `set_o2w`, which is the only
//! way to move a mesh.

use std::sync::Arc;

use lux_math::{BoundingBox, Mat4, ObjectTransform, Vec2, Vec3};

use crate::error::SceneError;
use crate::material::Material;
use crate::triangle::Triangle;

/// One corner of an object-space face.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// A triangle mesh with a transform and an optional shared material.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Mesh name, for diagnostics
    pub name: String,

    /// Shared material; meshes without one contribute no light
    pub material: Option<Arc<Material>>,

    /// Interpolate vertex normals for shading (otherwise use the geometric normal)
    pub smooth: bool,

    faces: Vec<[Vertex; 3]>,
    triangles: Vec<Triangle>,
    transform: ObjectTransform,
}

impl Mesh {
    /// Create a mesh from object-space faces with an identity transform.
    pub fn new(name: impl Into<String>, faces: Vec<[Vertex; 3]>) -> Self {
        let mut mesh = Self {
            name: name.into(),
            material: None,
            smooth: true,
            faces,
            triangles: Vec::new(),
            transform: ObjectTransform::IDENTITY,
        };
        mesh.rebuild_triangles();
        mesh
    }

    /// Create a flat-shaded mesh from triangle corner positions.
    pub fn from_triangles(name: impl Into<String>, triangles: &[[Vec3; 3]]) -> Self {
        let faces = triangles
            .iter()
            .map(|p| {
                let n = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
                [
                    Vertex::new(p[0], n, Vec2::ZERO),
                    Vertex::new(p[1], n, Vec2::X),
                    Vertex::new(p[2], n, Vec2::Y),
                ]
            })
            .collect();
        let mut mesh = Self::new(name, faces);
        mesh.smooth = false;
        mesh
    }

    /// Parallelogram spanned by `corner`, `corner + edge_u` and
    /// `corner + edge_v`. The face normal is `edge_u × edge_v`.
    pub fn quad(name: impl Into<String>, corner: Vec3, edge_u: Vec3, edge_v: Vec3) -> Self {
        let p00 = corner;
        let p10 = corner + edge_u;
        let p11 = corner + edge_u + edge_v;
        let p01 = corner + edge_v;
        let n = edge_u.cross(edge_v).normalize_or_zero();
        let faces = vec![
            [
                Vertex::new(p00, n, Vec2::new(0.0, 0.0)),
                Vertex::new(p10, n, Vec2::new(1.0, 0.0)),
                Vertex::new(p11, n, Vec2::new(1.0, 1.0)),
            ],
            [
                Vertex::new(p00, n, Vec2::new(0.0, 0.0)),
                Vertex::new(p11, n, Vec2::new(1.0, 1.0)),
                Vertex::new(p01, n, Vec2::new(0.0, 1.0)),
            ],
        ];
        let mut mesh = Self::new(name, faces);
        mesh.smooth = false;
        mesh
    }

    /// Create a mesh from indexed geometry.
    ///
    /// Every three indices form a counter-clockwise triangle. When `normals`
    /// is `None`, smooth vertex normals are computed by averaging the
    /// adjacent face normals. `uvs` default to zero.
    pub fn from_indexed(
        name: impl Into<String>,
        positions: &[Vec3],
        indices: &[u32],
        normals: Option<&[Vec3]>,
        uvs: Option<&[Vec2]>,
    ) -> Result<Self, SceneError> {
        let name = name.into();
        let vertex_count = positions.len();

        if indices.len() % 3 != 0 {
            return Err(SceneError::IncompleteTriangle {
                mesh: name,
                count: indices.len(),
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            log::warn!("Mesh '{}' references vertex {} of {}", name, index, vertex_count);
            return Err(SceneError::IndexOutOfRange {
                mesh: name,
                index,
                vertex_count,
            });
        }
        if let Some(normals) = normals {
            if normals.len() != vertex_count {
                return Err(SceneError::MismatchedAttribute {
                    mesh: name,
                    attribute: "normals",
                    found: normals.len(),
                    expected: vertex_count,
                });
            }
        }
        if let Some(uvs) = uvs {
            if uvs.len() != vertex_count {
                return Err(SceneError::MismatchedAttribute {
                    mesh: name,
                    attribute: "uvs",
                    found: uvs.len(),
                    expected: vertex_count,
                });
            }
        }

        let normals = match normals {
            Some(normals) => normals.iter().map(|n| n.normalize_or_zero()).collect(),
            None => compute_normals(positions, indices),
        };

        let vertex = |i: u32| {
            let i = i as usize;
            Vertex {
                position: positions[i],
                normal: normals[i],
                uv: uvs.map_or(Vec2::ZERO, |uvs| uvs[i]),
            }
        };

        let faces: Vec<[Vertex; 3]> = indices
            .chunks_exact(3)
            .map(|f| [vertex(f[0]), vertex(f[1]), vertex(f[2])])
            .collect();

        let mesh = Self::new(name, faces);
        let degenerate = mesh.triangles.iter().filter(|t| t.area() == 0.0).count();
        if degenerate > 0 {
            log::warn!(
                "Mesh '{}' has {} degenerate triangles, they will never be hit",
                mesh.name,
                degenerate
            );
        }
        Ok(mesh)
    }

    /// Builder method to bind a material.
    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    /// Builder method to select smooth or flat shading.
    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    /// Builder method to place the mesh.
    pub fn with_o2w(mut self, o2w: Mat4) -> Result<Self, SceneError> {
        self.set_o2w(o2w)?;
        Ok(self)
    }

    /// Set the object-to-world transform and rebuild the world-space
    /// triangles. Singular or non-finite matrices are rejected and leave the
    /// mesh unchanged.
    pub fn set_o2w(&mut self, o2w: Mat4) -> Result<(), SceneError> {
        let transform = ObjectTransform::new(o2w)
            .ok_or_else(|| SceneError::SingularTransform(self.name.clone()))?;
        self.transform = transform;
        self.rebuild_triangles();
        Ok(())
    }

    #[inline]
    pub fn transform(&self) -> &ObjectTransform {
        &self.transform
    }

    #[inline]
    pub fn o2w(&self) -> Mat4 {
        self.transform.o2w()
    }

    #[inline]
    pub fn w2o(&self) -> Mat4 {
        self.transform.w2o()
    }

    /// Object-space faces.
    pub fn faces(&self) -> &[[Vertex; 3]] {
        &self.faces
    }

    /// World-space triangles, one per face.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// World-space bounding box.
    pub fn bounding_box(&self) -> BoundingBox {
        self.triangles
            .iter()
            .fold(BoundingBox::EMPTY, |acc, t| acc.union(&t.bounding_box()))
    }

    /// Check if the bound material emits light.
    pub fn is_emissive(&self) -> bool {
        self.material.as_ref().is_some_and(|m| m.is_emissive())
    }

    /// Total world-space surface area.
    pub fn area(&self) -> f32 {
        self.triangles.iter().map(Triangle::area).sum()
    }

    fn rebuild_triangles(&mut self) {
        let xf = &self.transform;
        self.triangles = self
            .faces
            .iter()
            .map(|face| {
                Triangle::new(
                    face.map(|v| xf.point_to_world(v.position)),
                    face.map(|v| xf.normal_to_world(v.normal)),
                    face.map(|v| v.uv),
                )
            })
            .collect();
    }
}

/// Smooth vertex normals by averaging the area-weighted normals of the
/// faces sharing each vertex. Vertices not used by any face get `+Y`.
pub fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for face in indices.chunks_exact(3) {
        let i0 = face[0] as usize;
        let i1 = face[1] as usize;
        let i2 = face[2] as usize;

        let face_normal = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);

        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    for normal in &mut normals {
        let len = normal.length();
        if len > 0.0 {
            *normal /= len;
        } else {
            *normal = Vec3::Y;
        }
    }

    normals
}
