// Re-export glam for convenience
pub use glam::*;

// lux math types
mod bounds;
mod interval;
mod ray;
mod transform;

pub use bounds::BoundingBox;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::ObjectTransform;

/// Luminance of a linear RGB color (Rec. 709 weights).
#[inline]
pub fn luminance(c: Vec3) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_of_white_is_one() {
        assert!((luminance(Vec3::ONE) - 1.0).abs() < 1e-6);
        assert_eq!(luminance(Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_luminance_weights_green_most() {
        assert!(luminance(Vec3::Y) > luminance(Vec3::X));
        assert!(luminance(Vec3::X) > luminance(Vec3::Z));
    }
}
