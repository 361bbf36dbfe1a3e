//! Path tracing integrator.
//!
//! Radiance is estimated recursively. Every vertex combines a light sample
//! and a BSDF sample with the power heuristic; emitters found by BSDF
//! sampling are weighted against the light pdf they would have had.

use lux_core::{Color, TriangleId, World};
use lux_math::{luminance, Interval, Ray, Vec2, Vec3};

use crate::bvh::{Bvh, Hit};
use crate::config::{Environment, RenderConfig, RenderMode};
use crate::principled::{PrincipledBsdf, RayState};
use crate::sampling::{power_heuristic, uniform, PixelRng};

/// Distance new rays are pushed off the surface they start on.
pub const RAY_EPSILON: f32 = 1e-4;

/// Shading data at a ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub triangle: TriangleId,
    pub t: f32,
    pub position: Vec3,
    pub geometric_normal: Vec3,
    /// Interpolated for smooth meshes, geometric otherwise; not flipped
    pub shading_normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    pub front_face: bool,
}

impl SurfacePoint {
    pub fn new(world: &World, hit: &Hit) -> Self {
        let mesh = world.owner(hit.triangle);
        let tri = world.triangle(hit.triangle);
        let shading_normal = if mesh.smooth {
            tri.shading_normal_at(hit.u, hit.v)
        } else {
            tri.geometric_normal()
        };

        Self {
            triangle: hit.triangle,
            t: hit.t,
            position: tri.position_at(hit.u, hit.v),
            geometric_normal: tri.geometric_normal(),
            shading_normal,
            tangent: tri.tangent(),
            uv: tri.uv_at(hit.u, hit.v),
            front_face: hit.front_face,
        }
    }

    /// Ray leaving this point in `direction`.
    #[inline]
    pub fn spawn(&self, direction: Vec3) -> Ray {
        Ray::offset_from(self.position, self.geometric_normal, direction, RAY_EPSILON)
    }
}

/// State carried from one path vertex to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathVertex {
    /// Triangle the ray starts on
    pub exclude: Option<TriangleId>,
    /// Number of segments before this one
    pub depth: u32,
    /// Solid-angle pdf of the BSDF sample that produced the ray
    pub bsdf_pdf: f32,
    /// The previous vertex scattered specularly
    pub specular: bool,
    /// Path weight so far, used for Russian roulette
    pub throughput: Color,
}

impl PathVertex {
    /// Vertex for a ray leaving the camera.
    pub fn camera() -> Self {
        Self {
            exclude: None,
            depth: 0,
            bsdf_pdf: 0.0,
            specular: false,
            throughput: Color::ONE,
        }
    }
}

/// One BSDF per mesh, `None` where no material is bound.
pub fn bind_materials(world: &World) -> Vec<Option<PrincipledBsdf>> {
    world
        .meshes()
        .map(|(_, mesh)| mesh.material.as_deref().map(PrincipledBsdf::from))
        .collect()
}

/// Radiance estimator over an immutable scene.
pub struct Integrator<'a, 'w> {
    bvh: &'a Bvh<'w>,
    bsdfs: &'a [Option<PrincipledBsdf>],
    environment: Environment,
    max_depth: u32,
    russian_roulette_depth: u32,
}

impl<'a, 'w> Integrator<'a, 'w> {
    /// `bsdfs` is indexed by mesh, as returned by `bind_materials`.
    pub fn new(bvh: &'a Bvh<'w>, bsdfs: &'a [Option<PrincipledBsdf>], config: &RenderConfig) -> Self {
        Self {
            bvh,
            bsdfs,
            environment: config.environment,
            max_depth: config.max_depth,
            russian_roulette_depth: config.russian_roulette_depth,
        }
    }

    fn world(&self) -> &'w World {
        self.bvh.world()
    }

    fn bsdf(&self, triangle: TriangleId) -> Option<&'a PrincipledBsdf> {
        self.bsdfs.get(triangle.mesh.index()).and_then(Option::as_ref)
    }

    /// Value recorded for a camera ray under `mode`.
    pub fn trace(&self, mode: RenderMode, ray: &Ray, interval: Interval, rng: &mut PixelRng) -> Color {
        match mode {
            RenderMode::PathTracing => self.radiance(ray, interval, PathVertex::camera(), rng),
            RenderMode::Depth => match self.bvh.intersect(ray, interval, None) {
                Some(hit) => Color::splat(hit.t),
                None => Color::splat(interval.max),
            },
            RenderMode::Normal => match self.bvh.intersect(ray, interval, None) {
                Some(hit) => {
                    let surface = SurfacePoint::new(self.world(), &hit);
                    surface.shading_normal * 0.5 + Color::splat(0.5)
                }
                None => Color::ZERO,
            },
            RenderMode::Albedo => match self.bvh.intersect(ray, interval, None) {
                Some(hit) => self.bsdf(hit.triangle).map_or(Color::ZERO, |b| b.base_color),
                None => self.environment.radiance(ray.direction),
            },
        }
    }

    /// Radiance arriving along `ray`.
    pub fn radiance(&self, ray: &Ray, interval: Interval, vertex: PathVertex, rng: &mut PixelRng) -> Color {
        let Some(hit) = self.bvh.intersect(ray, interval, vertex.exclude) else {
            return self.environment.radiance(ray.direction);
        };
        let Some(bsdf) = self.bsdf(hit.triangle) else {
            return Color::ZERO;
        };

        let surface = SurfacePoint::new(self.world(), &hit);
        let wo = -ray.direction;
        let mut result = Color::ZERO;

        if bsdf.is_emissive() {
            let weight = if vertex.depth == 0 || vertex.specular {
                1.0
            } else {
                let light_pdf = self.light_pdf(hit.triangle, hit.t, ray.direction);
                power_heuristic(vertex.bsdf_pdf, light_pdf)
            };
            result += bsdf.emission * weight;
        }

        // Opaque surfaces are two-sided; only transmissive ones have an inside
        let entering = surface.front_face || bsdf.transmission <= 0.0;
        let state = RayState::new(bsdf.ior, entering, surface.shading_normal, surface.tangent, wo);
        let delta = bsdf.is_delta();

        if !delta {
            result += self.sample_light(bsdf, &state, &surface, wo, vertex.depth, rng);
        }

        if vertex.depth + 1 < self.max_depth {
            result += self.continue_path(bsdf, &state, &surface, wo, &vertex, delta, rng);
        }

        if !surface.front_face && bsdf.transmission > 0.0 {
            result *= transmittance(bsdf.extinction, hit.t);
        }
        result
    }

    /// Sample the BSDF and follow the path one more segment.
    #[allow(clippy::too_many_arguments)]
    fn continue_path(
        &self,
        bsdf: &PrincipledBsdf,
        state: &RayState,
        surface: &SurfacePoint,
        wo: Vec3,
        vertex: &PathVertex,
        delta: bool,
        rng: &mut PixelRng,
    ) -> Color {
        let Some(sample) = bsdf.sample(state, wo, state.ffnormal, rng) else {
            return Color::ZERO;
        };
        let weight = sample.color / sample.pdf;
        if !weight.is_finite() || weight.max_element() <= 0.0 {
            return Color::ZERO;
        }

        let throughput = vertex.throughput * weight;
        let depth = vertex.depth + 1;
        let mut survival = 1.0;
        if depth >= self.russian_roulette_depth {
            survival = luminance(throughput).clamp(0.05, 0.95);
            if uniform(rng) >= survival {
                return Color::ZERO;
            }
        }

        let next = PathVertex {
            exclude: Some(surface.triangle),
            depth,
            bsdf_pdf: sample.pdf,
            specular: delta,
            throughput: throughput / survival,
        };
        let ray = surface.spawn(sample.direction);
        weight * self.radiance(&ray, Interval::FORWARD, next, rng) / survival
    }

    /// Next-event estimate from one uniformly chosen emissive triangle.
    fn sample_light(
        &self,
        bsdf: &PrincipledBsdf,
        state: &RayState,
        surface: &SurfacePoint,
        wo: Vec3,
        depth: u32,
        rng: &mut PixelRng,
    ) -> Color {
        let world = self.world();
        let lights = world.emissive_triangles();
        if lights.is_empty() {
            return Color::ZERO;
        }

        let pick = ((uniform(rng) * lights.len() as f32) as usize).min(lights.len() - 1);
        let light = lights[pick];
        let Some(emitter) = self.bsdf(light) else {
            return Color::ZERO;
        };
        let tri = world.triangle(light);
        let point = tri.sample_point(uniform(rng), uniform(rng));

        let to_light = point - surface.position;
        let dist2 = to_light.length_squared();
        if dist2 <= 0.0 {
            return Color::ZERO;
        }
        let dist = dist2.sqrt();
        let wi = to_light / dist;

        let cos_light = tri.geometric_normal().dot(wi).abs();
        if cos_light <= 0.0 {
            return Color::ZERO;
        }
        let light_pdf = dist2 / (cos_light * tri.area() * lights.len() as f32);

        let (f, bsdf_pdf) = bsdf.eval(state, wo, state.ffnormal, wi);
        if f.max_element() <= 0.0 {
            return Color::ZERO;
        }

        let shadow = surface.spawn(wi);
        let reach = Interval::new(0.0, dist * (1.0 - 1e-3));
        if self.bvh.occluded(&shadow, reach, Some(surface.triangle)) {
            return Color::ZERO;
        }

        // No BSDF sample follows at the last vertex, so the light sample
        // carries the full estimate
        let weight = if depth + 1 >= self.max_depth {
            1.0
        } else {
            power_heuristic(light_pdf, bsdf_pdf)
        };
        emitter.emission * f * (weight / light_pdf)
    }

    /// Solid-angle pdf with which `sample_light` picks the point at
    /// distance `t` along `direction` on `triangle`.
    fn light_pdf(&self, triangle: TriangleId, t: f32, direction: Vec3) -> f32 {
        let world = self.world();
        let count = world.emissive_triangles().len();
        if count == 0 {
            return 0.0;
        }
        let tri = world.triangle(triangle);
        let cos_light = tri.geometric_normal().dot(direction).abs();
        if cos_light <= 0.0 || tri.area() <= 0.0 {
            return 0.0;
        }
        t * t / (cos_light * tri.area() * count as f32)
    }
}

/// Per-channel Beer–Lambert attenuation over `distance`.
#[inline]
fn transmittance(extinction: Color, distance: f32) -> Color {
    Color::new(
        extinction.x.powf(distance),
        extinction.y.powf(distance),
        extinction.z.powf(distance),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::pixel_rng;
    use lux_core::{Material, Mesh};
    use std::f32::consts::PI;
    use std::sync::Arc;

    const LIGHT: [Vec3; 3] = [
        Vec3::new(-0.3, 1.0, -0.3),
        Vec3::new(0.3, 1.0, -0.3),
        Vec3::new(0.0, 1.0, 0.3),
    ];

    /// Floor quad with a triangle light hovering above the origin.
    fn light_over_floor(albedo: f32, radiance: f32) -> World {
        let mut world = World::new();
        world.add_mesh(
            Mesh::quad("floor", Vec3::new(-5.3, 0.0, 5.1), Vec3::X * 10.0, Vec3::NEG_Z * 10.0)
                .with_material(Arc::new(Material::diffuse(Color::splat(albedo)))),
        );
        world.add_mesh(
            Mesh::from_triangles("light", &[LIGHT])
                .with_material(Arc::new(Material::emitter(Color::splat(radiance)))),
        );
        world.prepare_direct_light_sampling();
        world
    }

    /// Irradiance at `x` with normal `n` from a unit-radiance polygon.
    fn polygon_irradiance(x: Vec3, n: Vec3, polygon: &[Vec3]) -> f32 {
        let mut sum = 0.0;
        for i in 0..polygon.len() {
            let a = (polygon[i] - x).normalize();
            let b = (polygon[(i + 1) % polygon.len()] - x).normalize();
            let theta = a.dot(b).clamp(-1.0, 1.0).acos();
            sum += theta * a.cross(b).normalize().dot(n);
        }
        0.5 * sum.abs()
    }

    fn estimate(world: &World, config: &RenderConfig, ray: &Ray, samples: u64) -> Color {
        let bvh = Bvh::new(world);
        let bsdfs = bind_materials(world);
        let integrator = Integrator::new(&bvh, &bsdfs, config);
        let mut sum = Color::ZERO;
        for i in 0..samples {
            let mut rng = pixel_rng(config.seed, i);
            sum += integrator.radiance(ray, Interval::FORWARD, PathVertex::camera(), &mut rng);
        }
        sum / samples as f32
    }

    fn config(max_depth: u32) -> RenderConfig {
        RenderConfig::default()
            .with_max_depth(max_depth)
            .with_environment(Environment::BLACK)
    }

    #[test]
    fn test_direct_light_matches_analytic_irradiance() {
        let (albedo, radiance) = (0.5, 4.0);
        let world = light_over_floor(albedo, radiance);
        let expected = albedo / PI * radiance * polygon_irradiance(Vec3::ZERO, Vec3::Y, &LIGHT);

        let ray = Ray::new(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Y);
        // Light sampling alone, then light and BSDF sampling combined
        for max_depth in [1, 2] {
            let l = estimate(&world, &config(max_depth), &ray, 20_000);
            for c in l.to_array() {
                assert!(
                    (c - expected).abs() < 0.05 * expected,
                    "depth {max_depth}: {c} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn test_emitter_seen_directly_is_two_sided() {
        let world = light_over_floor(0.5, 3.0);
        let config = config(1);
        let down = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y);
        let up = Ray::new(Vec3::new(0.0, 0.5, 0.0), Vec3::Y);
        assert!((estimate(&world, &config, &down, 4) - Color::splat(3.0)).length() < 1e-4);
        assert!((estimate(&world, &config, &up, 4) - Color::splat(3.0)).length() < 1e-4);
    }

    #[test]
    fn test_miss_returns_environment() {
        let world = World::new();
        let config = RenderConfig::default();
        let bvh = Bvh::new(&world);
        let bsdfs = bind_materials(&world);
        let integrator = Integrator::new(&bvh, &bsdfs, &config);
        let mut rng = pixel_rng(0, 0);

        let up = Ray::new(Vec3::ZERO, Vec3::Y);
        let down = Ray::new(Vec3::ZERO, Vec3::NEG_Y);
        let c = integrator.radiance(&up, Interval::FORWARD, PathVertex::camera(), &mut rng);
        assert_eq!(c, config.environment.sky);
        let c = integrator.radiance(&down, Interval::FORWARD, PathVertex::camera(), &mut rng);
        assert_eq!(c, config.environment.ground);
    }

    #[test]
    fn test_missing_material_is_black() {
        let mut world = World::new();
        world.add_mesh(Mesh::quad("bare", Vec3::new(-1.0, 0.0, 1.0), Vec3::X * 2.0, Vec3::NEG_Z * 2.0));
        world.prepare_direct_light_sampling();
        let config = RenderConfig::default().with_environment(Environment::uniform(Color::ONE));

        let ray = Ray::new(Vec3::new(0.1, 1.0, 0.2), Vec3::NEG_Y);
        assert_eq!(estimate(&world, &config, &ray, 8), Color::ZERO);
    }

    #[test]
    fn test_white_furnace_stays_bounded() {
        // A white floor under a uniform environment reflects at most the
        // incoming radiance
        let mut world = World::new();
        world.add_mesh(
            Mesh::quad("floor", Vec3::new(-50.0, 0.0, 50.0), Vec3::X * 100.0, Vec3::NEG_Z * 100.0)
                .with_material(Arc::new(Material::diffuse(Color::ONE))),
        );
        world.prepare_direct_light_sampling();
        let config = RenderConfig::default().with_environment(Environment::uniform(Color::ONE));

        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.3, -1.0, 0.1).normalize());
        let l = estimate(&world, &config, &ray, 4000);
        assert!(l.x > 0.9 && l.x < 1.1, "{l}");
    }

    /// Two facing white plates with a triangle light between them, so paths
    /// keep bouncing until the depth limit or roulette ends them.
    fn closed_plates() -> World {
        let white = Arc::new(Material::diffuse(Color::splat(0.8)));
        let mut world = World::new();
        world.add_mesh(
            Mesh::quad("floor", Vec3::new(-20.3, 0.0, 20.1), Vec3::X * 40.0, Vec3::NEG_Z * 40.0)
                .with_material(white.clone()),
        );
        world.add_mesh(
            Mesh::quad("ceiling", Vec3::new(-20.3, 1.0, 20.1), Vec3::NEG_Z * 40.0, Vec3::X * 40.0)
                .with_material(white),
        );
        world.add_mesh(
            Mesh::from_triangles(
                "light",
                &[[
                    Vec3::new(-1.0, 0.5, -1.0),
                    Vec3::new(1.0, 0.5, -1.0),
                    Vec3::new(0.0, 0.5, 1.0),
                ]],
            )
            .with_material(Arc::new(Material::emitter(Color::splat(2.0)))),
        );
        world.prepare_direct_light_sampling();
        world
    }

    #[test]
    fn test_russian_roulette_keeps_estimate_unbiased() {
        let world = closed_plates();
        let ray = Ray::new(Vec3::new(1.5, 0.25, 0.2), Vec3::NEG_Y);
        let samples = 40_000;

        let mut always = config(12);
        always.russian_roulette_depth = 1;
        let mut never = config(12);
        never.russian_roulette_depth = 1000;

        let with_roulette = estimate(&world, &always, &ray, samples).x;
        let without = estimate(&world, &never, &ray, samples).x;
        assert!(
            (with_roulette - without).abs() < 0.05 * without,
            "roulette {with_roulette} vs full {without}"
        );

        // Deep bounces carry a real share of the light, so terminating
        // them early without reweighting would show up above
        let shallow = estimate(&world, &config(2), &ray, samples).x;
        assert!(without > 1.2 * shallow, "full {without} vs two segments {shallow}");
    }

    #[test]
    fn test_absorption_inside_transmissive_mesh() {
        // Leaving a medium through a back face attenuates by extinction^t
        let mut world = World::new();
        let glass = Material {
            extinction: Color::new(0.5, 1.0, 1.0),
            ..Material::glass(1.5, 0.0)
        };
        world.add_mesh(
            Mesh::quad("exit", Vec3::new(-1.0, 0.0, 1.0), Vec3::X * 2.0, Vec3::NEG_Z * 2.0)
                .with_material(Arc::new(glass)),
        );
        world.prepare_direct_light_sampling();

        let bvh = Bvh::new(&world);
        let bsdfs = bind_materials(&world);
        let config = config(4).with_environment(Environment::uniform(Color::ONE));
        let integrator = Integrator::new(&bvh, &bsdfs, &config);

        // Upward ray meets the upward-facing quad from behind after 2 units
        let ray = Ray::new(Vec3::new(0.2, -2.0, 0.3), Vec3::Y);
        let hit = bvh.intersect(&ray, Interval::FORWARD, None).unwrap();
        assert!(!hit.front_face);

        let samples = 2000;
        let mut sum = Color::ZERO;
        for i in 0..samples {
            let mut rng = pixel_rng(1, i);
            sum += integrator.radiance(&ray, Interval::FORWARD, PathVertex::camera(), &mut rng);
        }
        let l = sum / samples as f32;
        assert!(l.y > 0.0);
        assert!((l.x / l.y - 0.25).abs() < 1e-3, "{l}");
    }

    #[test]
    fn test_render_modes() {
        let world = light_over_floor(0.5, 4.0);
        let bvh = Bvh::new(&world);
        let bsdfs = bind_materials(&world);
        let config = RenderConfig::default();
        let integrator = Integrator::new(&bvh, &bsdfs, &config);
        let mut rng = pixel_rng(0, 0);

        let down = Ray::new(Vec3::new(2.0, 3.0, 0.0), Vec3::NEG_Y);
        let sky = Ray::new(Vec3::new(2.0, 3.0, 0.0), Vec3::Y);
        let interval = Interval::new(0.1, 100.0);

        let depth = integrator.trace(RenderMode::Depth, &down, interval, &mut rng);
        assert!((depth.x - 3.0).abs() < 1e-5);
        assert_eq!(integrator.trace(RenderMode::Depth, &sky, interval, &mut rng), Color::splat(100.0));

        let normal = integrator.trace(RenderMode::Normal, &down, interval, &mut rng);
        assert!((normal - Color::new(0.5, 1.0, 0.5)).length() < 1e-5);
        assert_eq!(integrator.trace(RenderMode::Normal, &sky, interval, &mut rng), Color::ZERO);

        assert_eq!(integrator.trace(RenderMode::Albedo, &down, interval, &mut rng), Color::splat(0.5));
        assert_eq!(
            integrator.trace(RenderMode::Albedo, &sky, interval, &mut rng),
            config.environment.sky
        );
    }
}
