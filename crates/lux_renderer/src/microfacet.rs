//! Microfacet distributions, masking terms and Fresnel.
//!
//! All functions work in the local shading frame (normal on `+Z`).

use lux_math::Vec3;
use std::f32::consts::PI;

/// Schlick weight `(1 - cos)^5`.
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let m = (1.0 - cos_theta).clamp(0.0, 1.0);
    let m2 = m * m;
    m2 * m2 * m
}

/// Unpolarized Fresnel reflectance of a dielectric interface.
///
/// `eta` is the index of refraction on the incident side over the index on
/// the transmitted side. Total internal reflection returns 1.
pub fn dielectric_fresnel(cos_theta_i: f32, eta: f32) -> f32 {
    let cos_i = cos_theta_i.abs().min(1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t > 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin2_t).max(0.0).sqrt();

    let rs = (eta * cos_t - cos_i) / (eta * cos_t + cos_i);
    let rp = (eta * cos_i - cos_t) / (eta * cos_i + cos_t);
    0.5 * (rs * rs + rp * rp)
}

/// Berry (GTR1) distribution used by the clearcoat lobe.
pub fn gtr1(n_dot_h: f32, a: f32) -> f32 {
    if a >= 1.0 {
        return 1.0 / PI;
    }
    let a2 = a * a;
    let t = 1.0 + (a2 - 1.0) * n_dot_h * n_dot_h;
    (a2 - 1.0) / (PI * a2.ln() * t)
}

/// Half vector distributed proportionally to `gtr1 * cos`.
pub fn sample_gtr1(a: f32, r1: f32, r2: f32) -> Vec3 {
    let a = a.max(0.001);
    let a2 = a * a;
    let phi = 2.0 * PI * r1;
    let cos_theta = ((1.0 - a2.powf(1.0 - r2)) / (1.0 - a2)).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).clamp(0.0, 1.0).sqrt();
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Anisotropic GGX (GTR2) distribution.
#[inline]
pub fn gtr2_aniso(n_dot_h: f32, h_dot_x: f32, h_dot_y: f32, ax: f32, ay: f32) -> f32 {
    let a = h_dot_x / ax;
    let b = h_dot_y / ay;
    let c = a * a + b * b + n_dot_h * n_dot_h;
    1.0 / (PI * ax * ay * c * c)
}

/// Isotropic Smith masking for GGX.
#[inline]
pub fn smith_g(n_dot_v: f32, alpha: f32) -> f32 {
    let a = alpha * alpha;
    let b = n_dot_v * n_dot_v;
    (2.0 * n_dot_v) / (n_dot_v + (a + b - a * b).sqrt())
}

/// Anisotropic Smith masking for GGX.
#[inline]
pub fn smith_g_aniso(n_dot_v: f32, v_dot_x: f32, v_dot_y: f32, ax: f32, ay: f32) -> f32 {
    let a = v_dot_x * ax;
    let b = v_dot_y * ay;
    let c = n_dot_v;
    (2.0 * c) / (c + (a * a + b * b + c * c).sqrt())
}

/// Sample a microfacet normal from the distribution of normals visible
/// from `v` (Heitz 2018). `v` must lie in the upper hemisphere.
pub fn sample_ggx_vndf(v: Vec3, ax: f32, ay: f32, r1: f32, r2: f32) -> Vec3 {
    // Stretch to the hemisphere configuration
    let vh = Vec3::new(ax * v.x, ay * v.y, v.z).normalize();

    let lensq = vh.x * vh.x + vh.y * vh.y;
    let t1 = if lensq > 0.0 {
        Vec3::new(-vh.y, vh.x, 0.0) / lensq.sqrt()
    } else {
        Vec3::X
    };
    let t2 = vh.cross(t1);

    // Point on the projected disk
    let r = r1.sqrt();
    let phi = 2.0 * PI * r2;
    let p1 = r * phi.cos();
    let s = 0.5 * (1.0 + vh.z);
    let p2 = (1.0 - s) * (1.0 - p1 * p1).max(0.0).sqrt() + s * r * phi.sin();

    let nh = p1 * t1 + p2 * t2 + (1.0 - p1 * p1 - p2 * p2).max(0.0).sqrt() * vh;

    // Unstretch
    Vec3::new(ax * nh.x, ay * nh.y, nh.z.max(0.0)).normalize()
}

/// Mirror `i` about `n`.
#[inline]
pub fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * i.dot(n) * n
}

/// Refract `i` through `n` with relative index `eta`, or `None` on total
/// internal reflection.
#[inline]
pub fn refract(i: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = n.dot(i);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        None
    } else {
        Some(eta * i - (eta * cos_i + k.sqrt()) * n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_schlick_weight() {
        assert!((schlick_weight(1.0) - 0.0).abs() < 0.001);
        assert!((schlick_weight(0.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_dielectric_fresnel() {
        // Glass at normal incidence reflects 4%
        assert!((dielectric_fresnel(1.0, 1.0 / 1.5) - 0.04).abs() < 1e-4);
        // Index matched interface does not reflect
        assert!(dielectric_fresnel(0.3, 1.0).abs() < 1e-6);
        // Grazing incidence reflects everything
        assert!(dielectric_fresnel(0.0, 1.0 / 1.5) > 0.99);
        // Total internal reflection from inside glass
        assert_eq!(dielectric_fresnel(0.2, 1.5), 1.0);
    }

    #[test]
    fn test_gtr2_normalized() {
        // ∫ D(h) cos(h) dω = 1 over the hemisphere
        let mut rng = StdRng::seed_from_u64(5);
        let (ax, ay) = (0.3, 0.6);
        let n = 200_000;
        let mut sum = 0.0_f64;
        for _ in 0..n {
            // Uniform hemisphere, pdf 1 / 2π
            let z: f32 = rng.gen();
            let phi = 2.0 * PI * rng.gen::<f32>();
            let r = (1.0 - z * z).max(0.0).sqrt();
            let h = Vec3::new(r * phi.cos(), r * phi.sin(), z);
            sum += (gtr2_aniso(h.z, h.x, h.y, ax, ay) * h.z * 2.0 * PI) as f64;
        }
        let estimate = sum / n as f64;
        assert!((estimate - 1.0).abs() < 0.03, "{estimate}");
    }

    #[test]
    fn test_vndf_stays_in_upper_hemisphere() {
        let mut rng = StdRng::seed_from_u64(9);
        let v = Vec3::new(0.6, -0.2, 0.5).normalize();
        for _ in 0..1000 {
            let h = sample_ggx_vndf(v, 0.2, 0.4, rng.gen(), rng.gen());
            assert!(h.z >= 0.0);
            assert!((h.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_smith_g_limits() {
        assert!((smith_g(1.0, 0.5) - 1.0).abs() < 1e-6);
        assert!((smith_g_aniso(1.0, 0.0, 0.0, 0.3, 0.7) - 1.0).abs() < 1e-6);
        assert!(smith_g(0.1, 0.5) < 1.0);
    }

    #[test]
    fn test_refract_snell() {
        let i = Vec3::new(0.5, 0.0, -(0.75_f32).sqrt());
        let t = refract(i, Vec3::Z, 1.0 / 1.5).unwrap();
        assert!((t.length() - 1.0).abs() < 1e-5);
        assert!((t.x - 0.5 / 1.5).abs() < 1e-5);
        assert!(t.z < 0.0);
        // Grazing exit from glass is totally reflected
        let i = Vec3::new(0.9, 0.0, -(0.19_f32).sqrt());
        assert!(refract(i, Vec3::Z, 1.5).is_none());
        assert_eq!(reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y), Vec3::new(1.0, 1.0, 0.0));
    }
}
