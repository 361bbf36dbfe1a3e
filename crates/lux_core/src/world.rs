//! The renderable world: a mesh arena plus cameras.
//!
//! Triangles are addressed by `TriangleId` handles into the arena. The
//! flat handle list is the shared view the spatial index is built from; the
//! emissive list is derived from it and must be refreshed with
//! `prepare_direct_light_sampling` after any mesh edit.

use lux_math::BoundingBox;

use crate::camera::Camera;
use crate::error::SceneError;
use crate::mesh::Mesh;
use crate::triangle::Triangle;

/// Handle of a mesh in a `World`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u32);

impl MeshId {
    /// Position of the mesh in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of one triangle: its mesh and its position within that mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId {
    pub mesh: MeshId,
    pub index: u32,
}

/// A scene ready for rendering.
#[derive(Debug, Default)]
pub struct World {
    meshes: Vec<Mesh>,
    triangles: Vec<TriangleId>,
    cameras: Vec<Camera>,
    emissive: Vec<TriangleId>,
    lights_dirty: bool,
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh and return its handle. Invalidates the emissive list.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.triangles
            .extend((0..mesh.triangle_count() as u32).map(|index| TriangleId { mesh: id, index }));
        self.meshes.push(mesh);
        self.lights_dirty = true;
        id
    }

    /// Get a mesh by handle.
    pub fn mesh(&self, id: MeshId) -> Result<&Mesh, SceneError> {
        self.meshes.get(id.index()).ok_or(SceneError::UnknownMesh(id))
    }

    /// Get a mesh for editing. Any edit may change which triangles emit, so
    /// the emissive list is marked stale.
    pub fn mesh_mut(&mut self, id: MeshId) -> Result<&mut Mesh, SceneError> {
        let mesh = self
            .meshes
            .get_mut(id.index())
            .ok_or(SceneError::UnknownMesh(id))?;
        self.lights_dirty = true;
        Ok(mesh)
    }

    /// Iterate meshes with their handles.
    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &Mesh)> + '_ {
        self.meshes
            .iter()
            .enumerate()
            .map(|(i, m)| (MeshId(i as u32), m))
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Resolve a triangle handle.
    ///
    /// Handles are only ever produced by this world, so a foreign handle is
    /// a programming error and panics.
    #[inline]
    pub fn triangle(&self, id: TriangleId) -> &Triangle {
        &self.meshes[id.mesh.index()].triangles()[id.index as usize]
    }

    /// The mesh that owns a triangle.
    #[inline]
    pub fn owner(&self, id: TriangleId) -> &Mesh {
        &self.meshes[id.mesh.index()]
    }

    /// Every triangle in the world.
    pub fn triangles(&self) -> &[TriangleId] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True if the world holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Add a camera and return its index.
    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    /// Rebuild the list of emissive triangles used for light sampling.
    ///
    /// A triangle emits when its mesh material is emissive and it has
    /// non-zero area. Returns the number of emitters.
    pub fn prepare_direct_light_sampling(&mut self) -> usize {
        let meshes = &self.meshes;
        self.emissive = self
            .triangles
            .iter()
            .copied()
            .filter(|&id| {
                let mesh = &meshes[id.mesh.index()];
                mesh.is_emissive() && mesh.triangles()[id.index as usize].area() > 0.0
            })
            .collect();
        self.lights_dirty = false;

        log::info!(
            "Prepared {} emissive triangles out of {}",
            self.emissive.len(),
            self.triangles.len()
        );
        self.emissive.len()
    }

    /// Emissive triangles as of the last `prepare_direct_light_sampling`.
    pub fn emissive_triangles(&self) -> &[TriangleId] {
        &self.emissive
    }

    /// False if meshes were added or edited since the emissive list was built.
    pub fn lights_prepared(&self) -> bool {
        !self.lights_dirty
    }

    /// World-space bounds of all meshes.
    pub fn bounding_box(&self) -> BoundingBox {
        self.meshes
            .iter()
            .fold(BoundingBox::EMPTY, |acc, m| acc.union(&m.bounding_box()))
    }
}
