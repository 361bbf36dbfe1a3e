//! World-space triangle with cached derived data.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use lux_math::{BoundingBox, Interval, Ray, Vec2, Vec3};

/// Determinants with a smaller magnitude are treated as degenerate.
const DET_EPSILON: f32 = 1e-12;

/// Parametric hit on a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray
    pub t: f32,
    /// Barycentric weight of the second vertex
    pub u: f32,
    /// Barycentric weight of the third vertex
    pub v: f32,
    /// The ray arrived against the geometric normal
    pub front_face: bool,
}

/// A triangle in world space.
///
/// Triangles are values: the owning mesh rebuilds them whenever its transform
/// changes, so the cached edges, normal, area and tangent always match the
/// vertex positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    positions: [Vec3; 3],
    normals: [Vec3; 3],
    uvs: [Vec2; 3],
    edge1: Vec3,
    edge2: Vec3,
    /// Unit geometric normal (zero for degenerate triangles)
    normal: Vec3,
    area: f32,
    tangent: Vec3,
}

impl Triangle {
    /// Create a triangle from world-space vertex data.
    pub fn new(positions: [Vec3; 3], normals: [Vec3; 3], uvs: [Vec2; 3]) -> Self {
        let edge1 = positions[1] - positions[0];
        let edge2 = positions[2] - positions[0];
        let cross = edge1.cross(edge2);
        let normal = cross.normalize_or_zero();
        let area = 0.5 * cross.length();
        let tangent = compute_tangent(edge1, edge2, uvs, normal);

        Self {
            positions,
            normals,
            uvs,
            edge1,
            edge2,
            normal,
            area,
            tangent,
        }
    }

    /// Create a flat-shaded triangle with default UVs.
    pub fn flat(positions: [Vec3; 3]) -> Self {
        let n = (positions[1] - positions[0])
            .cross(positions[2] - positions[0])
            .normalize_or_zero();
        Self::new(
            positions,
            [n; 3],
            [Vec2::ZERO, Vec2::X, Vec2::Y],
        )
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3; 3] {
        &self.positions
    }

    #[inline]
    pub fn vertex_normals(&self) -> &[Vec3; 3] {
        &self.normals
    }

    #[inline]
    pub fn uvs(&self) -> &[Vec2; 3] {
        &self.uvs
    }

    /// The two edges leaving the first vertex.
    #[inline]
    pub fn edges(&self) -> (Vec3, Vec3) {
        (self.edge1, self.edge2)
    }

    /// Unit geometric normal, following the vertex winding.
    #[inline]
    pub fn geometric_normal(&self) -> Vec3 {
        self.normal
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.area
    }

    /// Unit tangent aligned with increasing `u` texture coordinate.
    #[inline]
    pub fn tangent(&self) -> Vec3 {
        self.tangent
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_iter(self.positions)
    }

    /// Centroid of the three vertices.
    pub fn centroid(&self) -> Vec3 {
        (self.positions[0] + self.positions[1] + self.positions[2]) / 3.0
    }

    /// Point at barycentric coordinates `(u, v)`.
    #[inline]
    pub fn position_at(&self, u: f32, v: f32) -> Vec3 {
        (1.0 - u - v) * self.positions[0] + u * self.positions[1] + v * self.positions[2]
    }

    /// Interpolated vertex normal at `(u, v)`, falling back to the geometric
    /// normal when the interpolation vanishes.
    pub fn shading_normal_at(&self, u: f32, v: f32) -> Vec3 {
        let n = (1.0 - u - v) * self.normals[0] + u * self.normals[1] + v * self.normals[2];
        let n = n.normalize_or_zero();
        if n == Vec3::ZERO {
            self.normal
        } else {
            n
        }
    }

    /// Interpolated texture coordinate at `(u, v)`.
    pub fn uv_at(&self, u: f32, v: f32) -> Vec2 {
        (1.0 - u - v) * self.uvs[0] + u * self.uvs[1] + v * self.uvs[2]
    }

    /// Uniformly distributed point on the triangle for two uniform numbers
    /// in `[0, 1)`.
    pub fn sample_point(&self, r1: f32, r2: f32) -> Vec3 {
        let s = r1.sqrt();
        let u = r2 * s;
        let v = 1.0 - s;
        self.position_at(u, v)
    }

    /// Ray intersection with both windings accepted.
    ///
    /// The sign of the determinant tells front from back face; each sign
    /// keeps the barycentric numerators scaled by the determinant so that the
    /// bounds checks do not need a division. Degenerate triangles (and rays
    /// parallel to the plane) produce a vanishing determinant and miss.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        let pvec = ray.direction.cross(self.edge2);
        let det = self.edge1.dot(pvec);

        let tvec = ray.origin - self.positions[0];
        let qvec = tvec.cross(self.edge1);

        let (u, v) = if det > DET_EPSILON {
            let u = tvec.dot(pvec);
            if u < 0.0 || u > det {
                return None;
            }
            let v = ray.direction.dot(qvec);
            if v < 0.0 || u + v > det {
                return None;
            }
            (u, v)
        } else if det < -DET_EPSILON {
            let u = tvec.dot(pvec);
            if u > 0.0 || u < det {
                return None;
            }
            let v = ray.direction.dot(qvec);
            if v > 0.0 || u + v < det {
                return None;
            }
            (u, v)
        } else {
            return None;
        };

        let inv_det = 1.0 / det;
        let t = self.edge2.dot(qvec) * inv_det;
        if !ray_t.contains(t) {
            return None;
        }

        Some(TriangleHit {
            t,
            u: u * inv_det,
            v: v * inv_det,
            front_face: det > 0.0,
        })
    }
}

fn compute_tangent(edge1: Vec3, edge2: Vec3, uvs: [Vec2; 3], normal: Vec3) -> Vec3 {
    let duv1 = uvs[1] - uvs[0];
    let duv2 = uvs[2] - uvs[0];
    let r = duv1.x * duv2.y - duv1.y * duv2.x;

    if r.abs() > 1e-12 {
        let t = (edge1 * duv2.y - edge2 * duv1.y) / r;
        // Gram-Schmidt against the normal
        let t = (t - normal * normal.dot(t)).normalize_or_zero();
        if t != Vec3::ZERO {
            return t;
        }
    }
    edge1.normalize_or_zero()
}
