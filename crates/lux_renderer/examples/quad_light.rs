//! Small scene lit by a quad light.
//!
//! Run with `RUST_LOG=info cargo run --release --example quad_light`.
//! An optional argument names a JSON render config.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use lux_core::{Camera, Color, Format, Material, Mesh, World};
use lux_math::{luminance, Mat4, Vec3};
use lux_renderer::{RenderConfig, Renderer};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            RenderConfig::from_json(&json)?
        }
        None => RenderConfig::default().with_samples(32),
    };

    let start = Instant::now();
    let world = build_scene()?;
    log::info!(
        "Scene: {} meshes, {} triangles, built in {:.2?}",
        world.mesh_count(),
        world.triangle_count(),
        start.elapsed()
    );

    let camera = Camera::full_frame()
        .with_focal_length(35.0)
        .looking_at(Vec3::new(0.0, 1.5, 5.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y)?;
    let format = Format::new(320, 200);

    let renderer = Renderer::new(&world, config)?;
    let stats = renderer.bvh().stats();
    log::info!("BVH: {} nodes, {} leaves, depth {}", stats.nodes, stats.leaves, stats.max_depth);

    let image = renderer.render(&camera, &format)?;
    let mean = image.pixels().iter().map(|&c| luminance(c)).sum::<f32>() / image.pixels().len() as f32;
    let brightest = image.pixels().iter().map(|&c| luminance(c)).fold(0.0, f32::max);
    log::info!("Mean luminance {mean:.4}, brightest pixel {brightest:.4}");
    Ok(())
}

fn build_scene() -> anyhow::Result<World> {
    let mut world = World::new();

    let white = Arc::new(Material::diffuse(Color::splat(0.75)).with_name("white"));
    let red = Arc::new(Material::diffuse(Color::new(0.7, 0.1, 0.1)).with_name("red"));
    let gold = Arc::new(Material::metal(Color::new(1.0, 0.78, 0.34), 0.25).with_name("gold"));
    let glass = Arc::new(Material::glass(1.5, 0.02).with_name("glass"));
    let coated = Arc::new(
        Material::diffuse(Color::new(0.1, 0.2, 0.6))
            .with_clearcoat(1.0, 0.05)
            .with_name("coated"),
    );
    let lamp = Arc::new(Material::emitter(Color::splat(12.0)).with_name("lamp"));

    world.add_mesh(
        Mesh::quad("floor", Vec3::new(-3.0, 0.0, 3.0), Vec3::X * 6.0, Vec3::NEG_Z * 6.0).with_material(white.clone()),
    );
    world.add_mesh(
        Mesh::quad("back", Vec3::new(-3.0, 0.0, -3.0), Vec3::X * 6.0, Vec3::Y * 4.0).with_material(white),
    );
    world.add_mesh(
        Mesh::quad("left", Vec3::new(-3.0, 0.0, 3.0), Vec3::NEG_Z * 6.0, Vec3::Y * 4.0).with_material(red),
    );
    world.add_mesh(
        Mesh::quad("lamp", Vec3::new(-0.75, 3.0, -0.75), Vec3::X * 1.5, Vec3::Z * 1.5).with_material(lamp),
    );

    world.add_mesh(cube("gold cube")?.with_material(gold).with_o2w(Mat4::from_scale_rotation_translation(
        Vec3::splat(0.5),
        lux_math::Quat::from_rotation_y(0.4),
        Vec3::new(-1.2, 0.5, -0.5),
    ))?);
    world.add_mesh(
        cube("glass cube")?
            .with_material(glass)
            .with_o2w(Mat4::from_scale_rotation_translation(
                Vec3::splat(0.4),
                lux_math::Quat::from_rotation_y(-0.3),
                Vec3::new(0.9, 0.4, 0.6),
            ))?,
    );
    world.add_mesh(
        cube("coated cube")?
            .with_material(coated)
            .with_o2w(Mat4::from_translation(Vec3::new(0.2, 0.3, -1.5)) * Mat4::from_scale(Vec3::splat(0.3)))?,
    );

    world.prepare_direct_light_sampling();
    Ok(world)
}

/// Cube spanning `[-1, 1]` on every axis, with flat faces.
fn cube(name: &str) -> anyhow::Result<Mesh> {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut normals = Vec::new();

    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        for sign in [1.0, -1.0] {
            let n = axis * sign;
            let u = n.any_orthonormal_vector();
            let v = n.cross(u);
            let base = positions.len() as u32;
            for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push(n + u * a + v * b);
                normals.push(n);
            }
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    let mesh = Mesh::from_indexed(name, &positions, &indices, Some(normals.as_slice()), None)?;
    Ok(mesh.with_smooth(false))
}
