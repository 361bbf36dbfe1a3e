//! Render driver.
//!
//! Validates the inputs, builds the spatial index, then renders buckets in
//! parallel. Each pixel owns a random stream derived from the render seed
//! and its index, so the image does not depend on scheduling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use lux_core::{Camera, Color, Format, World};
use rayon::prelude::*;

use crate::bucket::{generate_buckets, Bucket, BucketResult};
use crate::bvh::Bvh;
use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::integrator::{bind_materials, Integrator};
use crate::principled::PrincipledBsdf;
use crate::sampling::{pixel_rng, uniform};

/// Linear RGB image, row-major from the top-left pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    format: Format,
    pixels: Vec<Color>,
}

impl Framebuffer {
    /// Black image of the given format.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            pixels: vec![Color::ZERO; format.pixel_count()],
        }
    }

    /// Resolution of the image.
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.format.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.format.height()
    }

    /// Color of the pixel at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.offset(x, y)]
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let i = self.offset(x, y);
        self.pixels[i] = color;
    }

    /// All pixels, row by row.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Interleaved RGB floats, three per pixel.
    pub fn as_rgb_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Copy a finished bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        for ((x, y), &color) in result.bucket.pixels().zip(&result.pixels) {
            self.set(x, y, color);
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width() as usize + x as usize
    }
}

/// Shared flag that stops a render in progress.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every render sharing this flag to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Renders one world with one configuration.
///
/// The renderer borrows the world for its whole lifetime; edit the world
/// only after dropping it.
pub struct Renderer<'w> {
    bvh: Bvh<'w>,
    bsdfs: Vec<Option<PrincipledBsdf>>,
    config: RenderConfig,
    pool: Option<rayon::ThreadPool>,
}

impl<'w> Renderer<'w> {
    /// Validate `config` and index `world` for rendering.
    pub fn new(world: &'w World, config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        if !world.lights_prepared() {
            return Err(RenderError::StaleLightList);
        }
        if world.is_empty() {
            log::warn!("World has no triangles; only the environment will be visible");
        }

        let pool = match config.threads {
            Some(threads) => Some(rayon::ThreadPoolBuilder::new().num_threads(threads).build()?),
            None => None,
        };

        let bsdfs = bind_materials(world);
        let unbound = bsdfs.iter().filter(|b| b.is_none()).count();
        if unbound > 0 {
            log::warn!("{unbound} mesh(es) have no material and will render black");
        }

        Ok(Self {
            bvh: Bvh::new(world),
            bsdfs,
            config,
            pool,
        })
    }

    /// Settings this renderer was created with.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Spatial index over the world.
    pub fn bvh(&self) -> &Bvh<'w> {
        &self.bvh
    }

    /// Render the full image.
    pub fn render(&self, camera: &Camera, format: &Format) -> RenderResult<Framebuffer> {
        self.render_cancellable(camera, format, &CancelFlag::new())
    }

    /// Render the full image, giving up with `RenderError::Cancelled` once
    /// `cancel` is set.
    pub fn render_cancellable(
        &self,
        camera: &Camera,
        format: &Format,
        cancel: &CancelFlag,
    ) -> RenderResult<Framebuffer> {
        format.validate()?;
        let start = Instant::now();

        let buckets = generate_buckets(format.width(), format.height(), self.config.bucket_size);
        log::info!(
            "Rendering {}x{} ({:?}, {} spp) in {} buckets",
            format.width(),
            format.height(),
            self.config.mode,
            self.config.samples_per_pixel,
            buckets.len()
        );

        let integrator = Integrator::new(&self.bvh, &self.bsdfs, &self.config);
        let work = || {
            buckets
                .par_iter()
                .map(|bucket| self.render_bucket(&integrator, camera, format, bucket, cancel))
                .collect::<Option<Vec<_>>>()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        };
        let results = results.ok_or(RenderError::Cancelled)?;

        let mut image = Framebuffer::new(*format);
        for result in &results {
            image.write_bucket(result);
        }

        log::info!("Render finished in {:.2?}", start.elapsed());
        Ok(image)
    }

    /// Average of all samples for the pixel at `(x, y)`.
    pub fn render_pixel(&self, camera: &Camera, format: &Format, x: u32, y: u32) -> Color {
        let integrator = Integrator::new(&self.bvh, &self.bsdfs, &self.config);
        self.shade_pixel(&integrator, camera, format, x, y)
    }

    fn render_bucket(
        &self,
        integrator: &Integrator<'_, 'w>,
        camera: &Camera,
        format: &Format,
        bucket: &Bucket,
        cancel: &CancelFlag,
    ) -> Option<BucketResult> {
        let mut pixels = Vec::with_capacity(bucket.pixel_count() as usize);
        for (x, y) in bucket.pixels() {
            if cancel.is_cancelled() {
                return None;
            }
            pixels.push(self.shade_pixel(integrator, camera, format, x, y));
        }
        log::debug!("Bucket {} at ({}, {}) done", bucket.index, bucket.x, bucket.y);
        Some(BucketResult::new(*bucket, pixels))
    }

    fn shade_pixel(
        &self,
        integrator: &Integrator<'_, 'w>,
        camera: &Camera,
        format: &Format,
        x: u32,
        y: u32,
    ) -> Color {
        let pixel_index = y as u64 * format.width() as u64 + x as u64;
        let mut rng = pixel_rng(self.config.seed, pixel_index);

        let samples = self.config.samples_per_pixel;
        let mut sum = Color::ZERO;
        for _ in 0..samples {
            let (dx, dy) = if self.config.jitter {
                (uniform(&mut rng), uniform(&mut rng))
            } else {
                (0.5, 0.5)
            };
            let (ray, interval) = camera.primary_ray(format, x as f32 + dx, y as f32 + dy);
            sum += integrator.trace(self.config.mode, &ray, interval, &mut rng);
        }
        sum / samples as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, RenderMode};
    use lux_core::{Material, Mesh};
    use lux_math::Vec3;
    use std::f32::consts::PI;

    const LIGHT: [Vec3; 3] = [
        Vec3::new(-0.3, 1.0, -0.3),
        Vec3::new(0.3, 1.0, -0.3),
        Vec3::new(0.0, 1.0, 0.3),
    ];

    fn quad_light_world() -> World {
        let mut world = World::new();
        world.add_mesh(
            Mesh::quad("floor", Vec3::new(-5.3, 0.0, 5.1), Vec3::X * 10.0, Vec3::NEG_Z * 10.0)
                .with_material(Arc::new(Material::diffuse(Color::splat(0.5)))),
        );
        world.add_mesh(
            Mesh::from_triangles("light", &[LIGHT])
                .with_material(Arc::new(Material::emitter(Color::splat(4.0)))),
        );
        world.prepare_direct_light_sampling();
        world
    }

    /// Camera between floor and light, looking straight down with a
    /// narrow field of view.
    fn downward_camera() -> Camera {
        Camera::persp()
            .with_focal_length(200.0)
            .looking_at(Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO, Vec3::Z)
            .unwrap()
    }

    fn polygon_irradiance(x: Vec3, n: Vec3, polygon: &[Vec3]) -> f32 {
        let mut sum = 0.0;
        for i in 0..polygon.len() {
            let a = (polygon[i] - x).normalize();
            let b = (polygon[(i + 1) % polygon.len()] - x).normalize();
            sum += a.dot(b).clamp(-1.0, 1.0).acos() * a.cross(b).normalize().dot(n);
        }
        0.5 * sum.abs()
    }

    #[test]
    fn test_quad_lit_by_triangle_matches_analytic() {
        let world = quad_light_world();
        let config = RenderConfig::default()
            .with_samples(8192)
            .with_environment(Environment::BLACK);
        let renderer = Renderer::new(&world, config).unwrap();

        let format = Format::new(3, 3);
        let pixel = renderer.render_pixel(&downward_camera(), &format, 1, 1);

        let expected = 0.5 / PI * 4.0 * polygon_irradiance(Vec3::ZERO, Vec3::Y, &LIGHT);
        for c in pixel.to_array() {
            assert!((c - expected).abs() < 0.05 * expected, "{c} vs {expected}");
        }
    }

    #[test]
    fn test_empty_world_renders_environment() {
        let world = World::new();
        let env = Environment {
            sky: Color::new(0.1, 0.2, 0.3),
            ground: Color::new(0.4, 0.5, 0.6),
        };
        let mut config = RenderConfig::default().with_samples(2).with_environment(env);
        config.jitter = false;
        let renderer = Renderer::new(&world, config).unwrap();

        let format = Format::new(8, 6);
        let image = renderer.render(&Camera::persp(), &format).unwrap();
        for y in 0..6 {
            for x in 0..8 {
                let expected = if y < 3 { env.sky } else { env.ground };
                assert!((image.get(x, y) - expected).length() < 1e-6, "pixel ({x}, {y})");
            }
        }
        assert_eq!(image.as_rgb_floats().len(), 8 * 6 * 3);
        assert_eq!(image.as_rgb_floats()[0], env.sky.x);
    }

    #[test]
    fn test_stale_lights_are_rejected() {
        let mut world = quad_light_world();
        world.add_mesh(Mesh::from_triangles("late", &[[Vec3::ZERO, Vec3::X, Vec3::Y]]));
        assert!(matches!(
            Renderer::new(&world, RenderConfig::default()),
            Err(RenderError::StaleLightList)
        ));
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let world = quad_light_world();
        assert!(matches!(
            Renderer::new(&world, RenderConfig::default().with_samples(0)),
            Err(RenderError::InvalidConfig(_))
        ));

        let renderer = Renderer::new(&world, RenderConfig::default()).unwrap();
        assert!(matches!(
            renderer.render(&Camera::persp(), &Format::new(0, 4)),
            Err(RenderError::Format(_))
        ));
        assert!(matches!(
            renderer.render(&Camera::persp(), &Format::new(4, 4).with_pixel_aspect(0.0, 1.0)),
            Err(RenderError::Format(_))
        ));
    }

    #[test]
    fn test_cancelled_render_returns_error() {
        let world = quad_light_world();
        let renderer = Renderer::new(&world, RenderConfig::default()).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(matches!(
            renderer.render_cancellable(&downward_camera(), &Format::new(16, 16), &cancel),
            Err(RenderError::Cancelled)
        ));
    }

    #[test]
    fn test_image_does_not_depend_on_thread_count() {
        let world = quad_light_world();
        let camera = Camera::persp()
            .looking_at(Vec3::new(0.0, 3.0, 4.0), Vec3::ZERO, Vec3::Y)
            .unwrap();
        let format = Format::new(24, 16);

        let mut config = RenderConfig::default().with_samples(4);
        config.bucket_size = 8;
        let shared = Renderer::new(&world, config.clone()).unwrap();
        config.threads = Some(2);
        let dedicated = Renderer::new(&world, config).unwrap();

        let a = shared.render(&camera, &format).unwrap();
        let b = dedicated.render(&camera, &format).unwrap();
        assert_eq!(a, b);
        assert!(a.pixels().iter().any(|c| c.max_element() > 0.0));
    }

    #[test]
    fn test_depth_mode() {
        let world = quad_light_world();
        let mut config = RenderConfig::default().with_samples(1).with_mode(RenderMode::Depth);
        config.jitter = false;
        let renderer = Renderer::new(&world, config).unwrap();

        let camera = Camera::persp()
            .with_clipping(0.1, 50.0)
            .looking_at(Vec3::new(3.0, 2.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::Z)
            .unwrap();
        let format = Format::new(1, 1);
        let image = renderer.render(&camera, &format).unwrap();
        assert!((image.get(0, 0).x - 2.0).abs() < 1e-4);
    }
}
