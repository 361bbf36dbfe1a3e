//! Bounding volume hierarchy over the world's triangles.
//!
//! The hierarchy is an octree of triangle bounding boxes. Nearest-hit
//! queries visit nodes in order of box entry distance and stop as soon as
//! the next box starts beyond the closest hit found so far.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use lux_core::{TriangleId, World};
use lux_math::{BoundingBox, Interval, Ray};

use crate::octree::{NodeContents, Octree, OctreeStats, TaggedBox};

/// Closest intersection found by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub triangle: TriangleId,
    pub t: f32,
    pub u: f32,
    pub v: f32,
    /// The ray arrived against the triangle's geometric normal
    pub front_face: bool,
}

/// Pending node in the nearest-first traversal.
#[derive(Debug, Clone, Copy)]
struct Pending {
    t: f32,
    node: u32,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so that `BinaryHeap` pops the smallest distance first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Spatial index borrowing a `World`.
///
/// The borrow keeps the geometry frozen for as long as the index exists;
/// editing the world requires dropping the index and building a new one.
pub struct Bvh<'w> {
    world: &'w World,
    octree: Octree,
}

impl<'w> Bvh<'w> {
    /// Build the index over every triangle in `world`.
    pub fn new(world: &'w World) -> Self {
        let start = Instant::now();

        let boxes: Vec<TaggedBox> = world
            .triangles()
            .iter()
            .map(|&id| TaggedBox {
                bbox: world.triangle(id).bounding_box(),
                triangle: id,
            })
            .collect();
        let scene_box = boxes
            .iter()
            .fold(BoundingBox::EMPTY, |acc, b| acc.union(&b.bbox));

        let mut octree = Octree::new(scene_box);
        for entry in boxes {
            octree.insert(entry);
        }
        octree.build();

        let stats = octree.stats();
        log::debug!(
            "Octree: {} nodes, {} leaves, depth {}, {} entries",
            stats.nodes,
            stats.leaves,
            stats.max_depth,
            stats.entries
        );
        log::info!(
            "Built BVH over {} triangles in {:.2?}",
            world.triangle_count(),
            start.elapsed()
        );

        Self { world, octree }
    }

    /// The world this index was built from.
    pub fn world(&self) -> &'w World {
        self.world
    }

    /// Bounds of everything in the index.
    pub fn bounding_box(&self) -> BoundingBox {
        *self.octree.root().bounds()
    }

    /// Shape of the underlying octree.
    pub fn stats(&self) -> OctreeStats {
        self.octree.stats()
    }

    /// Closest hit within `interval`, ignoring the triangle `exclude`.
    pub fn intersect(&self, ray: &Ray, interval: Interval, exclude: Option<TriangleId>) -> Option<Hit> {
        let root = self.octree.root();
        let t_root = root.bounds().intersect(ray, interval)?;

        let mut heap = BinaryHeap::new();
        heap.push(Pending { t: t_root, node: 0 });

        let mut best: Option<Hit> = None;
        let mut best_t = interval.max;

        while let Some(Pending { t, node }) = heap.pop() {
            if t > best_t {
                break;
            }
            let search = interval.clip_max(best_t);

            match self.octree.node(node).contents() {
                NodeContents::Leaf(entries) => {
                    for entry in entries {
                        if Some(entry.triangle) == exclude {
                            continue;
                        }
                        let tri = self.world.triangle(entry.triangle);
                        if let Some(h) = tri.intersect(ray, search) {
                            if best.is_none() || h.t < best_t {
                                best_t = h.t;
                                best = Some(Hit {
                                    triangle: entry.triangle,
                                    t: h.t,
                                    u: h.u,
                                    v: h.v,
                                    front_face: h.front_face,
                                });
                            }
                        }
                    }
                }
                NodeContents::Branch(children) => {
                    for &child in children.iter().flatten() {
                        if let Some(t_child) = self.octree.node(child).bounds().intersect(ray, search) {
                            heap.push(Pending {
                                t: t_child,
                                node: child,
                            });
                        }
                    }
                }
            }
        }

        best
    }

    /// True if anything other than `exclude` blocks the ray within `interval`.
    pub fn occluded(&self, ray: &Ray, interval: Interval, exclude: Option<TriangleId>) -> bool {
        if self.octree.root().bounds().intersect(ray, interval).is_none() {
            return false;
        }

        let mut stack = vec![0u32];
        while let Some(node) = stack.pop() {
            match self.octree.node(node).contents() {
                NodeContents::Leaf(entries) => {
                    let blocked = entries.iter().any(|entry| {
                        Some(entry.triangle) != exclude
                            && self
                                .world
                                .triangle(entry.triangle)
                                .intersect(ray, interval)
                                .is_some()
                    });
                    if blocked {
                        return true;
                    }
                }
                NodeContents::Branch(children) => {
                    stack.extend(children.iter().flatten().copied().filter(|&child| {
                        self.octree
                            .node(child)
                            .bounds()
                            .intersect(ray, interval)
                            .is_some()
                    }));
                }
            }
        }
        false
    }
}
