//! Octree over tagged bounding boxes.
//!
//! Nodes live in a flat arena; children are allocated lazily and always get
//! a larger index than their parent, so a reverse walk over the arena
//! visits children before parents.

use lux_core::TriangleId;
use lux_math::BoundingBox;

/// Leaves at this depth accept any number of entries.
pub const MAX_DEPTH: u32 = 16;

/// A triangle's world-space box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedBox {
    pub bbox: BoundingBox,
    pub triangle: TriangleId,
}

/// Contents of an octree node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContents {
    /// Entries stored directly in this node
    Leaf(Vec<TaggedBox>),
    /// Arena indices of the allocated children, by octant
    Branch([Option<u32>; 8]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OctreeNode {
    /// Spatial cell used to route insertions
    cell: BoundingBox,
    /// Union of everything below this node (valid after `build`)
    bounds: BoundingBox,
    depth: u32,
    contents: NodeContents,
}

impl OctreeNode {
    fn leaf(cell: BoundingBox, depth: u32) -> Self {
        Self {
            cell,
            bounds: BoundingBox::EMPTY,
            depth,
            contents: NodeContents::Leaf(Vec::new()),
        }
    }

    /// Union of the boxes stored below this node.
    #[inline]
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Distance from the root, which has depth 0.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Entries of a leaf, or child indices of a branch.
    #[inline]
    pub fn contents(&self) -> &NodeContents {
        &self.contents
    }
}

/// Summary of an octree's shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: u32,
    pub entries: usize,
}

/// 8-ary spatial subdivision of tagged boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
}

impl Octree {
    /// Create an octree whose root cell is `cell`.
    pub fn new(cell: BoundingBox) -> Self {
        Self {
            nodes: vec![OctreeNode::leaf(cell, 0)],
        }
    }

    /// Insert a box. A leaf that already holds an entry is split, unless it
    /// sits at `MAX_DEPTH`.
    pub fn insert(&mut self, entry: TaggedBox) {
        self.insert_at(0, entry);
    }

    fn insert_at(&mut self, mut node: usize, entry: TaggedBox) {
        loop {
            let depth = self.nodes[node].depth;
            if let NodeContents::Leaf(entries) = &mut self.nodes[node].contents {
                if entries.is_empty() || depth >= MAX_DEPTH {
                    entries.push(entry);
                    return;
                }
                // Split and push the previous entries one level down
                let previous = std::mem::take(entries);
                self.nodes[node].contents = NodeContents::Branch([None; 8]);
                for e in previous {
                    self.insert_at(node, e);
                }
            }
            node = self.child_for(node, &entry.bbox);
        }
    }

    /// Child of a branch node that receives `bbox`, allocating it if needed.
    fn child_for(&mut self, node: usize, bbox: &BoundingBox) -> usize {
        let parent = &self.nodes[node];
        let center = parent.cell.center();
        let p = bbox.center();
        let octant = (if p.x >= center.x { 4 } else { 0 })
            | (if p.y >= center.y { 2 } else { 0 })
            | (if p.z >= center.z { 1 } else { 0 });

        let existing = match &parent.contents {
            NodeContents::Branch(children) => children[octant],
            NodeContents::Leaf(_) => None,
        };
        if let Some(child) = existing {
            return child as usize;
        }

        let child = OctreeNode::leaf(parent.cell.octant(octant), parent.depth + 1);
        let index = self.nodes.len();
        self.nodes.push(child);
        if let NodeContents::Branch(children) = &mut self.nodes[node].contents {
            children[octant] = Some(index as u32);
        }
        index
    }

    /// Recompute every node's bounds bottom-up.
    pub fn build(&mut self) {
        for i in (0..self.nodes.len()).rev() {
            let bounds = match &self.nodes[i].contents {
                NodeContents::Leaf(entries) => entries
                    .iter()
                    .fold(BoundingBox::EMPTY, |acc, e| acc.union(&e.bbox)),
                NodeContents::Branch(children) => children
                    .iter()
                    .flatten()
                    .map(|&c| &self.nodes[c as usize].bounds)
                    .filter(|b| !b.is_empty())
                    .fold(BoundingBox::EMPTY, |acc, b| acc.union(b)),
            };
            self.nodes[i].bounds = bounds;
        }
    }

    /// The node covering the whole tree.
    #[inline]
    pub fn root(&self) -> &OctreeNode {
        &self.nodes[0]
    }

    /// Node at arena position `index`.
    #[inline]
    pub fn node(&self, index: u32) -> &OctreeNode {
        &self.nodes[index as usize]
    }

    /// Every node, parents before their children.
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Count nodes, leaves and entries in one pass.
    pub fn stats(&self) -> OctreeStats {
        self.nodes.iter().fold(OctreeStats::default(), |mut s, n| {
            s.nodes += 1;
            s.max_depth = s.max_depth.max(n.depth);
            if let NodeContents::Leaf(entries) = &n.contents {
                s.leaves += 1;
                s.entries += entries.len();
            }
            s
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_core::{Mesh, World};
    use lux_math::Vec3;

    fn tagged(world: &World, i: usize) -> TaggedBox {
        let id = world.triangles()[i];
        TaggedBox {
            bbox: world.triangle(id).bounding_box(),
            triangle: id,
        }
    }

    fn grid_world(n: usize) -> World {
        let mut world = World::new();
        let tris: Vec<[Vec3; 3]> = (0..n)
            .map(|i| {
                let o = Vec3::new((i % 10) as f32, (i / 10) as f32, (i % 7) as f32);
                [o, o + Vec3::X * 0.5, o + Vec3::Y * 0.5]
            })
            .collect();
        world.add_mesh(Mesh::from_triangles("grid", &tris));
        world
    }

    fn build(world: &World) -> Octree {
        let boxes: Vec<TaggedBox> = (0..world.triangle_count()).map(|i| tagged(world, i)).collect();
        let cell = boxes.iter().fold(BoundingBox::EMPTY, |acc, b| acc.union(&b.bbox));
        let mut octree = Octree::new(cell);
        for b in boxes {
            octree.insert(b);
        }
        octree.build();
        octree
    }

    #[test]
    fn test_empty_octree() {
        let mut octree = Octree::new(BoundingBox::EMPTY);
        octree.build();
        assert!(octree.root().bounds().is_empty());
        assert_eq!(octree.stats().entries, 0);
    }

    #[test]
    fn test_every_entry_is_stored_once() {
        let world = grid_world(60);
        let octree = build(&world);
        let stats = octree.stats();
        assert_eq!(stats.entries, 60);
        assert!(stats.leaves > 1);
        assert!(stats.max_depth <= MAX_DEPTH);
        assert_eq!(*octree.root().bounds(), world.bounding_box());
    }

    #[test]
    fn test_branch_bounds_contain_children() {
        let octree = build(&grid_world(40));
        for node in octree.nodes() {
            match node.contents() {
                NodeContents::Leaf(entries) => {
                    for e in entries {
                        assert_eq!(node.bounds().union(&e.bbox), *node.bounds());
                    }
                }
                NodeContents::Branch(children) => {
                    assert!(children.iter().any(Option::is_some));
                    for &c in children.iter().flatten() {
                        let child = octree.node(c);
                        assert_eq!(child.depth(), node.depth() + 1);
                        assert_eq!(node.bounds().union(child.bounds()), *node.bounds());
                    }
                }
            }
        }
    }

    #[test]
    fn test_coincident_boxes_stop_at_depth_cap() {
        // Identical triangles can never be separated
        let t = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut world = World::new();
        world.add_mesh(Mesh::from_triangles("stack", &[t, t, t]));
        let octree = build(&world);
        let stats = octree.stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.max_depth, MAX_DEPTH);
    }
}
