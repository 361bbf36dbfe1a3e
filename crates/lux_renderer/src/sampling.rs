//! Sampling helpers shared by the BSDF and the integrator.

use lux_math::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

/// Per-pixel random stream.
pub type PixelRng = SmallRng;

/// 64-bit finalizer used to spread nearby seeds over the state space.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent generator for one pixel, reproducible from the render seed.
pub fn pixel_rng(seed: u64, pixel_index: u64) -> PixelRng {
    SmallRng::seed_from_u64(splitmix64(seed ^ pixel_index))
}

/// Uniform float in `[0, 1)`.
#[inline]
pub fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>()
}

/// Cosine-weighted direction in the local hemisphere around `+Z`.
/// The pdf is `z / π`.
pub fn cosine_sample_hemisphere(r1: f32, r2: f32) -> Vec3 {
    let r = r1.sqrt();
    let phi = 2.0 * PI * r2;
    let z = (1.0 - r1).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// MIS power heuristic (β = 2) weight for a sample drawn with pdf `a`
/// against a competing strategy with pdf `b`.
#[inline]
pub fn power_heuristic(a: f32, b: f32) -> f32 {
    let a2 = a * a;
    let denom = a2 + b * b;
    if denom > 0.0 && denom.is_finite() {
        a2 / denom
    } else if a.is_infinite() {
        1.0
    } else {
        0.0
    }
}

/// Orthonormal shading frame with the normal on local `+Z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Frame around `n` with an arbitrary tangent.
    ///
    /// The helper axis is `Z`, switching to `X` when `n` is nearly parallel
    /// to it.
    pub fn from_normal(n: Vec3) -> Self {
        let up = if n.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
        let tangent = up.cross(n).normalize();
        let bitangent = n.cross(tangent);
        Self {
            tangent,
            bitangent,
            normal: n,
        }
    }

    /// Frame around `n` whose tangent follows `t` as closely as possible,
    /// so anisotropic highlights align with the surface parameterization.
    pub fn from_normal_tangent(n: Vec3, t: Vec3) -> Self {
        let t = (t - n * n.dot(t)).normalize_or_zero();
        if t == Vec3::ZERO {
            return Self::from_normal(n);
        }
        Self {
            tangent: t,
            bitangent: n.cross(t),
            normal: n,
        }
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn test_frame_orthonormal() {
        for n in [
            Vec3::Y,
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::new(0.3, -0.4, 0.866).normalize(),
        ] {
            let f = Frame::from_normal(n);
            assert!(f.tangent.dot(n).abs() < 1e-5);
            assert!(f.bitangent.dot(n).abs() < 1e-5);
            assert!(f.tangent.dot(f.bitangent).abs() < 1e-5);
            assert!((f.tangent.length() - 1.0).abs() < 1e-5);
            assert!((f.bitangent.length() - 1.0).abs() < 1e-5);

            let v = Vec3::new(0.2, 0.7, -0.1);
            assert!((f.to_world(f.to_local(v)) - v).length() < 1e-5);
            assert!((f.to_local(n) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_frame_follows_tangent() {
        let f = Frame::from_normal_tangent(Vec3::Y, Vec3::new(1.0, 0.5, 0.0));
        assert!((f.tangent - Vec3::X).length() < 1e-6);
        // Tangent parallel to the normal falls back to an arbitrary frame
        let f = Frame::from_normal_tangent(Vec3::Y, Vec3::Y);
        assert!(f.tangent.dot(Vec3::Y).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_hemisphere_mean() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let mut sum_z = 0.0;
        for _ in 0..n {
            let d = cosine_sample_hemisphere(rng.gen(), rng.gen());
            assert!(d.z >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
            sum_z += d.z;
        }
        // E[cos] under a cosine distribution is 2/3
        assert!((sum_z / n as f32 - 2.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_power_heuristic() {
        assert!((power_heuristic(1.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((power_heuristic(3.0, 1.0) + power_heuristic(1.0, 3.0) - 1.0).abs() < 1e-6);
        assert_eq!(power_heuristic(0.0, 0.0), 0.0);
        assert_eq!(power_heuristic(1.0, 0.0), 1.0);
    }

    #[test]
    fn test_pixel_rng_is_reproducible() {
        fn draw(mut rng: PixelRng) -> Vec<u32> {
            (0..4).map(|_| rng.gen()).collect()
        }
        let a = draw(pixel_rng(7, 42));
        let b = draw(pixel_rng(7, 42));
        let c = draw(pixel_rng(7, 43));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(splitmix64(0), splitmix64(1));
    }
}
