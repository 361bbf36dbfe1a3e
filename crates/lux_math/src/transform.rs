// Object-to-world transform pair.
//
// Keeps a matrix and its inverse together so that the world-to-object side
// can never drift from the object-to-world side.

use glam::{Mat3, Mat4, Vec3};

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f32 = 1e-12;

/// An affine object-to-world transform together with its exact inverse and
/// the matching normal matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTransform {
    o2w: Mat4,
    w2o: Mat4,
    normal: Mat3,
}

impl ObjectTransform {
    pub const IDENTITY: ObjectTransform = ObjectTransform {
        o2w: Mat4::IDENTITY,
        w2o: Mat4::IDENTITY,
        normal: Mat3::IDENTITY,
    };

    /// Build the pair from an object-to-world matrix.
    ///
    /// Returns `None` if the matrix is not finite or not invertible.
    pub fn new(o2w: Mat4) -> Option<Self> {
        if !o2w.is_finite() {
            return None;
        }
        let det = o2w.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let w2o = o2w.inverse();
        if !w2o.is_finite() {
            return None;
        }
        Some(Self {
            o2w,
            w2o,
            normal: Mat3::from_mat4(w2o).transpose(),
        })
    }

    /// Object-to-world matrix.
    #[inline]
    pub fn o2w(&self) -> Mat4 {
        self.o2w
    }

    /// World-to-object matrix (always the inverse of `o2w`).
    #[inline]
    pub fn w2o(&self) -> Mat4 {
        self.w2o
    }

    #[inline]
    pub fn point_to_world(&self, p: Vec3) -> Vec3 {
        self.o2w.transform_point3(p)
    }

    /// Transform a direction (w = 0); translation does not apply.
    #[inline]
    pub fn vector_to_world(&self, v: Vec3) -> Vec3 {
        self.o2w.transform_vector3(v)
    }

    /// Transform a surface normal with the inverse transpose and renormalize.
    #[inline]
    pub fn normal_to_world(&self, n: Vec3) -> Vec3 {
        (self.normal * n).normalize_or_zero()
    }
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
