//! Principled BSDF.
//!
//! Based on the 2012 Disney paper "Physically Based Shading at Disney"
//! and the 2015 extension with specular transmission. Four lobes are
//! combined: Burley diffuse (with retro-reflection, fake subsurface and
//! sheen), anisotropic GGX reflection, rough dielectric refraction after
//! Walter et al. 2007, and a GTR1 clearcoat.
//!
//! Directions follow the usual convention: `v` points away from the
//! surface towards the viewer, `l` points away from the surface towards the
//! light. Evaluation returns `f * |cos θl|`.

use lux_core::{Color, Material};
use lux_math::{luminance, Vec3};
use rand::Rng;
use std::f32::consts::FRAC_1_PI;

use crate::microfacet::{
    dielectric_fresnel, gtr1, gtr2_aniso, reflect, refract, sample_ggx_vndf, sample_gtr1,
    schlick_weight, smith_g, smith_g_aniso,
};
use crate::sampling::{cosine_sample_hemisphere, uniform, Frame};

/// Smallest roughness and GGX alpha.
pub const MIN_ROUGHNESS: f32 = 0.001;

/// Transport state at one hit, rebuilt at every bounce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayState {
    /// Index of refraction on the incoming side over the index on the other side
    pub eta: f32,
    /// Shading normal flipped to face the incoming ray
    pub ffnormal: Vec3,
    /// Surface tangent orienting anisotropic highlights
    pub tangent: Vec3,
}

impl RayState {
    /// State for a hit on a surface with interior index `ior`.
    ///
    /// `entering` tells whether the ray arrived from outside, against the
    /// geometric normal. `shading_normal` may face either way; it is flipped
    /// towards `view`.
    pub fn new(ior: f32, entering: bool, shading_normal: Vec3, tangent: Vec3, view: Vec3) -> Self {
        let eta = if entering { 1.0 / ior } else { ior };
        let ffnormal = if shading_normal.dot(view) >= 0.0 {
            shading_normal
        } else {
            -shading_normal
        };
        Self {
            eta,
            ffnormal,
            tangent,
        }
    }
}

/// Which lobe produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lobe {
    Diffuse,
    SpecularReflection,
    SpecularRefraction,
    Clearcoat,
}

/// Selection probabilities of the four lobes. They sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobeProbabilities {
    pub diffuse: f32,
    pub spec_reflect: f32,
    pub spec_refract: f32,
    pub clearcoat: f32,
}

impl LobeProbabilities {
    pub fn sum(&self) -> f32 {
        self.diffuse + self.spec_reflect + self.spec_refract + self.clearcoat
    }
}

/// Sampled direction with its BSDF value and pdf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    /// World-space direction towards the next vertex
    pub direction: Vec3,
    /// `f * |cos θ|` in that direction
    pub color: Color,
    /// Solid-angle pdf of the direction
    pub pdf: f32,
    /// Lobe that generated the direction
    pub lobe: Lobe,
}

/// Principled BSDF built from a `Material`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipledBsdf {
    pub base_color: Color,
    pub emission: Color,
    pub roughness: f32,
    pub metallic: f32,
    pub anisotropic: f32,
    pub subsurface: f32,
    pub specular_tint: f32,
    pub sheen: f32,
    pub sheen_tint: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub extinction: Color,

    /// GGX alpha along the tangent
    ax: f32,
    /// GGX alpha along the bitangent
    ay: f32,
}

impl From<&Material> for PrincipledBsdf {
    fn from(mat: &Material) -> Self {
        let roughness = mat.roughness.clamp(MIN_ROUGHNESS, 1.0);
        let anisotropic = mat.anisotropic.clamp(0.0, 1.0);
        let aspect = (1.0 - 0.9 * anisotropic).sqrt();
        let r2 = roughness * roughness;

        Self {
            base_color: mat.base_color.max(Color::ZERO),
            emission: mat.emission.max(Color::ZERO),
            roughness,
            metallic: mat.metallic.clamp(0.0, 1.0),
            anisotropic,
            subsurface: mat.subsurface.clamp(0.0, 1.0),
            specular_tint: mat.specular_tint.clamp(0.0, 1.0),
            sheen: mat.sheen.max(0.0),
            sheen_tint: mat.sheen_tint.clamp(0.0, 1.0),
            clearcoat: mat.clearcoat.max(0.0),
            clearcoat_roughness: mat.clearcoat_roughness.clamp(MIN_ROUGHNESS, 1.0),
            transmission: mat.transmission.clamp(0.0, 1.0),
            ior: if mat.ior > 0.0 { mat.ior } else { 1.0 },
            extinction: mat.extinction.clamp(Color::ZERO, Color::ONE),
            ax: (r2 / aspect).max(MIN_ROUGHNESS),
            ay: (r2 * aspect).max(MIN_ROUGHNESS),
        }
    }
}

impl Default for PrincipledBsdf {
    fn default() -> Self {
        Self::from(&Material::default())
    }
}

impl PrincipledBsdf {
    /// GGX alphas `(ax, ay)`.
    pub fn alphas(&self) -> (f32, f32) {
        (self.ax, self.ay)
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.max_element() > 0.0
    }

    /// True if the surface only scatters into a perfectly specular
    /// direction: no diffuse or clearcoat weight and GGX alphas at the
    /// floor. Light sampling is useless at such vertices.
    pub fn is_delta(&self) -> bool {
        let diffuse = luminance(self.base_color) * (1.0 - self.metallic) * (1.0 - self.transmission);
        let clearcoat = self.clearcoat * (1.0 - self.metallic);
        diffuse <= 0.0 && clearcoat <= 0.0 && self.ax <= MIN_ROUGHNESS && self.ay <= MIN_ROUGHNESS
    }

    /// Tint used for specular and sheen, neutral for a black base.
    fn tint(&self) -> Color {
        let lum = luminance(self.base_color);
        if lum > 0.0 {
            self.base_color / lum
        } else {
            Color::ONE
        }
    }

    /// Specular tint, specular color at normal incidence and sheen color.
    fn tint_colors(&self, eta: f32) -> (Color, Color, Color) {
        let tint = self.tint();
        let f0 = (1.0 - eta) / (1.0 + eta);
        let f0 = f0 * f0;
        let spec_tint = Color::ONE.lerp(tint, self.specular_tint);
        let spec_color = (f0 * spec_tint).lerp(self.base_color, self.metallic);
        let sheen_color = Color::ONE.lerp(tint, self.sheen_tint);
        (spec_tint, spec_color, sheen_color)
    }

    /// Lobe selection probabilities for the local view direction.
    ///
    /// Fresnel is approximated around the normal because the half vector is
    /// not known before sampling.
    pub fn lobe_probabilities(&self, state: &RayState, v: Vec3) -> LobeProbabilities {
        let (_, spec_color, _) = self.tint_colors(state.eta);
        let lum = luminance(self.base_color);
        let f_approx = lerp(
            dielectric_fresnel(v.z, state.eta),
            schlick_weight(v.z),
            self.metallic,
        );

        let diffuse = lum * (1.0 - self.metallic) * (1.0 - self.transmission);
        let spec_reflect = luminance(spec_color.lerp(Color::ONE, f_approx));
        let spec_refract = (1.0 - f_approx) * (1.0 - self.metallic) * self.transmission * lum;
        let clearcoat = 0.25 * self.clearcoat * (1.0 - self.metallic);

        let total = diffuse + spec_reflect + spec_refract + clearcoat;
        if !(total > 0.0) || !total.is_finite() {
            return LobeProbabilities {
                diffuse: 1.0,
                spec_reflect: 0.0,
                spec_refract: 0.0,
                clearcoat: 0.0,
            };
        }

        LobeProbabilities {
            diffuse: diffuse / total,
            spec_reflect: spec_reflect / total,
            spec_refract: spec_refract / total,
            clearcoat: clearcoat / total,
        }
    }

    /// Evaluate towards world-space `l`, seen from world-space `v`, around
    /// normal `n`. Returns `f * |cos θl|` and the solid-angle pdf that
    /// `sample` would assign to `l`.
    pub fn eval(&self, state: &RayState, v: Vec3, n: Vec3, l: Vec3) -> (Color, f32) {
        let frame = Frame::from_normal_tangent(n, state.tangent);
        self.eval_local(state, frame.to_local(v), frame.to_local(l))
    }

    fn eval_local(&self, state: &RayState, v: Vec3, l: Vec3) -> (Color, f32) {
        let h = if l.z > 0.0 { v + l } else { l + v * state.eta };
        let mut h = h.normalize_or_zero();
        if h == Vec3::ZERO {
            return (Color::ZERO, 0.0);
        }
        if h.z < 0.0 {
            h = -h;
        }

        let (spec_tint, _, sheen_color) = self.tint_colors(state.eta);
        let probs = self.lobe_probabilities(state, v);

        let mut f = Color::ZERO;
        let mut pdf = 0.0;

        if probs.diffuse > 0.0 && l.z > 0.0 {
            let (c, p) = self.eval_diffuse(sheen_color, v, l, h);
            f += c;
            pdf += p * probs.diffuse;
        }
        if probs.spec_reflect > 0.0 && l.z > 0.0 && v.z > 0.0 {
            let (c, p) = self.eval_spec_reflection(state.eta, spec_tint, v, l, h);
            f += c;
            pdf += p * probs.spec_reflect;
        }
        if probs.spec_refract > 0.0 && l.z < 0.0 {
            let (c, p) = self.eval_spec_refraction(state.eta, v, l, h);
            f += c;
            pdf += p * probs.spec_refract;
        }
        if probs.clearcoat > 0.0 && l.z > 0.0 && v.z > 0.0 {
            let (c, p) = self.eval_clearcoat(v, l, h);
            f += c;
            pdf += p * probs.clearcoat;
        }

        if !pdf.is_finite() || !f.is_finite() {
            return (Color::ZERO, 0.0);
        }
        (f * l.z.abs(), pdf)
    }

    /// Importance sample a direction around normal `n` for world-space view
    /// direction `v`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        state: &RayState,
        v: Vec3,
        n: Vec3,
        rng: &mut R,
    ) -> Option<BsdfSample> {
        let r1 = uniform(rng);
        let r2 = uniform(rng);
        self.sample_with(state, v, n, r1, r2)
    }

    /// Deterministic core of `sample` for two uniform numbers in `[0, 1)`.
    ///
    /// The first number picks a lobe and is then rescaled into that lobe's
    /// sub-interval. Color and pdf come from `eval` in the sampled
    /// direction, so both agree exactly.
    pub fn sample_with(
        &self,
        state: &RayState,
        v: Vec3,
        n: Vec3,
        r1: f32,
        r2: f32,
    ) -> Option<BsdfSample> {
        let frame = Frame::from_normal_tangent(n, state.tangent);
        let v_local = frame.to_local(v);
        if v_local.z <= 0.0 {
            return None;
        }

        let probs = self.lobe_probabilities(state, v_local);
        let cdf0 = probs.diffuse;
        let cdf1 = cdf0 + probs.spec_reflect;
        let cdf2 = cdf1 + probs.spec_refract;

        let (lobe, l) = if r1 < cdf0 {
            let r1 = r1 / cdf0;
            (Lobe::Diffuse, cosine_sample_hemisphere(r1, r2))
        } else if r1 < cdf1 {
            let r1 = (r1 - cdf0) / (cdf1 - cdf0);
            let h = sample_ggx_vndf(v_local, self.ax, self.ay, r1, r2);
            (Lobe::SpecularReflection, reflect(-v_local, h))
        } else if r1 < cdf2 {
            let r1 = (r1 - cdf1) / (cdf2 - cdf1);
            let h = sample_ggx_vndf(v_local, self.ax, self.ay, r1, r2);
            (Lobe::SpecularRefraction, refract(-v_local, h, state.eta)?)
        } else {
            let r1 = ((r1 - cdf2) / (1.0 - cdf2).max(f32::EPSILON)).min(1.0);
            let h = sample_gtr1(self.clearcoat_roughness, r1, r2);
            (Lobe::Clearcoat, reflect(-v_local, h))
        };

        let l = l.normalize_or_zero();
        let valid_side = match lobe {
            Lobe::SpecularRefraction => l.z < 0.0,
            _ => l.z > 0.0,
        };
        if !valid_side {
            return None;
        }

        let (color, pdf) = self.eval_local(state, v_local, l);
        if !(pdf > 0.0) {
            return None;
        }

        Some(BsdfSample {
            direction: frame.to_world(l),
            color,
            pdf,
            lobe,
        })
    }

    fn eval_diffuse(&self, sheen_color: Color, v: Vec3, l: Vec3, h: Vec3) -> (Color, f32) {
        let l_dot_h = l.dot(h);
        let rr = 2.0 * self.roughness * l_dot_h * l_dot_h;

        // Burley diffuse with retro-reflection
        let fl = schlick_weight(l.z);
        let fv = schlick_weight(v.z);
        let f_retro = rr * (fl + fv + fl * fv * (rr - 1.0));
        let fd = (1.0 - 0.5 * fl) * (1.0 - 0.5 * fv);

        // Fake subsurface
        let fss90 = 0.5 * rr;
        let fss = lerp(1.0, fss90, fl) * lerp(1.0, fss90, fv);
        let ss = 1.25 * (fss * (1.0 / (l.z + v.z.max(0.0)).max(1e-4) - 0.5) + 0.5);

        let sheen = schlick_weight(l_dot_h) * self.sheen * sheen_color;

        let weight = (1.0 - self.metallic) * (1.0 - self.transmission);
        let f = (FRAC_1_PI * self.base_color * lerp(fd + f_retro, ss, self.subsurface) + sheen) * weight;
        (f, l.z * FRAC_1_PI)
    }

    fn eval_spec_reflection(&self, eta: f32, spec_tint: Color, v: Vec3, l: Vec3, h: Vec3) -> (Color, f32) {
        let v_dot_h = v.dot(h);
        let l_dot_h = l.dot(h);

        let f_dielectric = spec_tint * dielectric_fresnel(v_dot_h.abs(), eta);
        let f_metal = self.base_color + (Color::ONE - self.base_color) * schlick_weight(l_dot_h);
        let fresnel = f_dielectric.lerp(f_metal, self.metallic);

        let d = gtr2_aniso(h.z, h.x, h.y, self.ax, self.ay);
        let g1 = smith_g_aniso(v.z.abs(), v.x, v.y, self.ax, self.ay);
        let g2 = g1 * smith_g_aniso(l.z.abs(), l.x, l.y, self.ax, self.ay);

        let pdf = g1 * d / (4.0 * v.z);
        (fresnel * d * g2 / (4.0 * l.z * v.z), pdf)
    }

    fn eval_spec_refraction(&self, eta: f32, v: Vec3, l: Vec3, h: Vec3) -> (Color, f32) {
        let v_dot_h = v.dot(h);
        let l_dot_h = l.dot(h);

        let fresnel = dielectric_fresnel(v_dot_h.abs(), eta);
        let d = gtr2_aniso(h.z, h.x, h.y, self.ax, self.ay);
        let g1 = smith_g_aniso(v.z.abs(), v.x, v.y, self.ax, self.ay);
        let g2 = g1 * smith_g_aniso(l.z.abs(), l.x, l.y, self.ax, self.ay);

        let denom = l_dot_h + v_dot_h * eta;
        let denom = denom * denom;
        if denom <= 0.0 {
            return (Color::ZERO, 0.0);
        }
        let jacobian = l_dot_h.abs() / denom;
        let pdf = g1 * v_dot_h.max(0.0) * d * jacobian / v.z;

        let weight = (1.0 - self.metallic) * self.transmission;
        let tint = self.base_color.powf(0.5);
        let f = tint * weight * (1.0 - fresnel) * d * g2 * v_dot_h.abs() * jacobian * eta * eta
            / (l.z * v.z).abs();
        (f, pdf)
    }

    fn eval_clearcoat(&self, v: Vec3, l: Vec3, h: Vec3) -> (Color, f32) {
        let v_dot_h = v.dot(h);
        if v_dot_h <= 0.0 {
            return (Color::ZERO, 0.0);
        }
        let fresnel = lerp(0.04, 1.0, schlick_weight(v_dot_h));
        let d = gtr1(h.z, self.clearcoat_roughness);
        let g = smith_g(l.z, 0.25) * smith_g(v.z, 0.25);

        let pdf = d * h.z / (4.0 * v_dot_h);
        let f = 0.25 * self.clearcoat * fresnel * d * g / (4.0 * l.z * v.z);
        (Color::splat(f), pdf)
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}
