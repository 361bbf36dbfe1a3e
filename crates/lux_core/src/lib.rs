//! Lux Core - scene types for the lux path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Triangle`, `Mesh` and the `World` arena that owns them
//! - **Shading inputs**: `Material`, the principled parameter set bound to meshes
//! - **Viewing**: `Camera` and `Format`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lux_core::{Material, Mesh, World};
//!
//! let mut world = World::new();
//! let floor = Mesh::quad("floor", corner, edge_u, edge_v)
//!     .with_material(Arc::new(Material::diffuse(Vec3::splat(0.8))));
//! world.add_mesh(floor);
//! world.prepare_direct_light_sampling();
//! ```

pub mod camera;
pub mod error;
pub mod format;
pub mod material;
pub mod mesh;
pub mod triangle;
pub mod world;

// Re-export commonly used types
pub use camera::Camera;
pub use error::{FormatError, SceneError};
pub use format::Format;
pub use material::{Color, Material};
pub use mesh::{Mesh, Vertex};
pub use triangle::{Triangle, TriangleHit};
pub use world::{MeshId, TriangleId, World};
