//! Lux Renderer - CPU path tracing
//!
//! A Monte Carlo path tracer over a `lux_core::World`:
//!
//! - `Bvh`: octree-backed index answering nearest-hit and shadow queries
//! - `PrincipledBsdf`: four-lobe principled shading model with importance
//!   sampling
//! - `Integrator`: recursive radiance estimate with MIS direct lighting and
//!   Russian roulette
//! - `Renderer`: bucketed parallel rendering into a `Framebuffer`
//!
//! # Example
//!
//! ```ignore
//! world.prepare_direct_light_sampling();
//! let renderer = Renderer::new(&world, RenderConfig::default())?;
//! let image = renderer.render(&camera, &Format::hd_720())?;
//! ```

mod bucket;
mod bvh;
mod config;
mod error;
mod integrator;
mod microfacet;
mod octree;
mod principled;
mod renderer;
mod sampling;

pub use bucket::{generate_buckets, Bucket, BucketResult};
pub use bvh::{Bvh, Hit};
pub use config::{Environment, RenderConfig, RenderMode};
pub use error::{RenderError, RenderResult};
pub use integrator::{bind_materials, Integrator, PathVertex, SurfacePoint, RAY_EPSILON};
pub use octree::{NodeContents, Octree, OctreeNode, OctreeStats, TaggedBox, MAX_DEPTH};
pub use principled::{BsdfSample, Lobe, LobeProbabilities, PrincipledBsdf, RayState, MIN_ROUGHNESS};
pub use renderer::{CancelFlag, Framebuffer, Renderer};
pub use sampling::{pixel_rng, power_heuristic, splitmix64, Frame, PixelRng};

pub use lux_core::Color;
