use crate::Vec3;

/// A ray in 3D space with an origin and a direction.
///
/// Rays are the query type for every intersection routine. The direction is
/// not required to be normalized, but the integrator always passes unit
/// directions so that hit distances are world-space lengths.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Create a ray whose origin is pushed off a surface along `normal`,
    /// on the side `direction` leaves towards.
    ///
    /// Used for secondary and shadow rays so they do not re-hit the surface
    /// they start on.
    #[inline]
    pub fn offset_from(point: Vec3, normal: Vec3, direction: Vec3, epsilon: f32) -> Self {
        let side = if direction.dot(normal) >= 0.0 { 1.0 } else { -1.0 };
        Self::new(point + normal * (side * epsilon), direction)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z)
    }
}
