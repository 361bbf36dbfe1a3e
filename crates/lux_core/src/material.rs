//! Principled material parameters.
//!
//! Materials are constructed outside the renderer and shared between meshes
//! through `Arc<Material>`. The renderer only reads them; the shading model
//! that interprets these parameters lives in `lux_renderer::PrincipledBsdf`.

use lux_math::Vec3;
use serde::{Deserialize, Serialize};

/// Color type alias (linear RGB).
pub type Color = Vec3;

/// Parameter set of the principled (Disney-style) shading model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name, for diagnostics
    pub name: String,

    /// Base color (albedo for dielectrics, reflectance for metals)
    pub base_color: Color,

    /// Emitted radiance; non-zero makes every triangle of the mesh a light
    pub emission: Color,

    /// Roughness: 0 = smooth/glossy, 1 = rough
    pub roughness: f32,

    /// Metallic: 0 = dielectric, 1 = metal
    pub metallic: f32,

    /// Anisotropic: stretches the specular highlight along the tangent
    pub anisotropic: f32,

    /// Subsurface: blend of the diffuse lobe towards a fake subsurface look
    pub subsurface: f32,

    /// Specular tint: tints dielectric specular towards base_color
    pub specular_tint: f32,

    /// Sheen: grazing retro-reflection for cloth-like materials
    pub sheen: f32,

    /// Sheen tint: tints the sheen towards base_color
    pub sheen_tint: f32,

    /// Clearcoat: strength of the secondary coat lobe
    pub clearcoat: f32,

    /// Clearcoat roughness (GTR1 alpha)
    pub clearcoat_roughness: f32,

    /// Transmission weight: 0 = opaque, 1 = fully transmissive dielectric
    pub transmission: f32,

    /// Index of refraction of the interior
    pub ior: f32,

    /// Per-channel transmittance per unit distance inside the medium
    /// (1 = clear)
    pub extinction: Color,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: Color::new(0.8, 0.8, 0.8),
            emission: Color::ZERO,
            roughness: 0.5,
            metallic: 0.0,
            anisotropic: 0.0,
            subsurface: 0.0,
            specular_tint: 0.0,
            sheen: 0.0,
            sheen_tint: 0.5,
            clearcoat: 0.0,
            clearcoat_roughness: 0.03,
            transmission: 0.0,
            ior: 1.5,
            extinction: Color::ONE,
        }
    }
}

impl Material {
    /// Create a new material with just a name and base color.
    pub fn new(name: impl Into<String>, base_color: Color) -> Self {
        Self {
            name: name.into(),
            base_color,
            ..Default::default()
        }
    }

    /// Purely diffuse material. The index of refraction is 1 so that no
    /// specular reflection is added on top of the diffuse lobe.
    pub fn diffuse(color: Color) -> Self {
        Self {
            base_color: color,
            roughness: 1.0,
            ior: 1.0,
            ..Default::default()
        }
    }

    /// Metallic material.
    pub fn metal(color: Color, roughness: f32) -> Self {
        Self {
            base_color: color,
            metallic: 1.0,
            roughness,
            ..Default::default()
        }
    }

    /// Rough or smooth glass.
    pub fn glass(ior: f32, roughness: f32) -> Self {
        Self {
            base_color: Color::ONE,
            transmission: 1.0,
            roughness,
            ior,
            ..Default::default()
        }
    }

    /// A black-body emitter with the given radiance.
    pub fn emitter(radiance: Color) -> Self {
        Self {
            base_color: Color::ZERO,
            emission: radiance,
            ior: 1.0,
            ..Default::default()
        }
    }

    /// Builder method to set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder method to set roughness.
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set metallic.
    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set the clearcoat strength and roughness.
    pub fn with_clearcoat(mut self, clearcoat: f32, roughness: f32) -> Self {
        self.clearcoat = clearcoat.clamp(0.0, 1.0);
        self.clearcoat_roughness = roughness.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set emission.
    pub fn with_emission(mut self, emission: Color) -> Self {
        self.emission = emission;
        self
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emission.max_element() > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_default() {
        let mat = Material::default();
        assert_eq!(mat.metallic, 0.0);
        assert!((mat.roughness - 0.5).abs() < 0.001);
        assert!(!mat.is_emissive());
    }

    #[test]
    fn test_emitter_is_emissive() {
        let light = Material::emitter(Color::splat(4.0));
        assert!(light.is_emissive());
        assert_eq!(light.base_color, Color::ZERO);
        assert!(!Material::diffuse(Color::ONE).is_emissive());
    }

    #[test]
    fn test_builders_clamp() {
        let mat = Material::new("m", Color::ONE)
            .with_roughness(2.0)
            .with_metallic(-1.0)
            .with_clearcoat(0.5, 3.0);
        assert_eq!(mat.roughness, 1.0);
        assert_eq!(mat.metallic, 0.0);
        assert_eq!(mat.clearcoat_roughness, 1.0);
        assert_eq!(mat.name, "m");
    }
}
