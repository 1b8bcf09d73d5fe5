use tracing::trace;

use crate::block::{BlockRegistry, BlockType};
use crate::coords::{local_to_index, ChunkPos, LocalPos, CHUNK_SIZE, CHUNK_VOLUME};
use crate::mesh::{mesh_into, ChunkMesh};

/// Local y of the grass layer produced by [`Chunk::generate`].
pub const SURFACE_Y: usize = 7;
const DIRT_FLOOR_Y: usize = 5;

/// A 16³ block of voxels plus the mesh derived from it.
///
/// Every write that changes a cell marks the chunk dirty, and a dirty chunk
/// does not expose its mesh until it is rebuilt.
#[derive(Clone, Debug)]
pub struct Chunk {
    position: ChunkPos,
    blocks: Box<[BlockType; CHUNK_VOLUME]>,
    mesh: ChunkMesh,
    dirty: bool,
    mesh_revision: u64,
}

impl Chunk {
    pub fn empty(position: ChunkPos) -> Self {
        Self::filled(position, BlockType::Air)
    }

    pub fn filled(position: ChunkPos, block: BlockType) -> Self {
        Self {
            position,
            blocks: Box::new([block; CHUNK_VOLUME]),
            mesh: ChunkMesh::default(),
            dirty: true,
            mesh_revision: 0,
        }
    }

    /// Flat layered terrain: stone below y=5, dirt for y 5..7, grass at y=7.
    pub fn generate(position: ChunkPos) -> Self {
        let mut chunk = Self::empty(position);
        for (index, cell) in chunk.blocks.iter_mut().enumerate() {
            let y = (index / CHUNK_SIZE) % CHUNK_SIZE;
            *cell = terrain_block(y);
        }
        chunk
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    pub fn get_local(&self, local: LocalPos) -> BlockType {
        self.blocks[local_to_index(local)]
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BlockType> {
        LocalPos::new_checked(x, y, z).map(|local| self.get_local(local))
    }

    /// Writes a cell and returns its previous value, or `None` when the
    /// coordinate is outside the chunk (nothing is written).
    pub fn set(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> Option<BlockType> {
        let local = LocalPos::new_checked(x, y, z)?;
        Some(self.set_local(local, block))
    }

    pub fn set_local(&mut self, local: LocalPos, block: BlockType) -> BlockType {
        let cell = &mut self.blocks[local_to_index(local)];
        let previous = std::mem::replace(cell, block);
        if previous != block {
            self.dirty = true;
        }
        previous
    }

    /// Out-of-range coordinates count as unoccupied.
    pub fn is_occupied(&self, x: i32, y: i32, z: i32) -> bool {
        self.get(x, y, z).is_some_and(|block| !block.is_air())
    }

    /// Whether a face looking into `(x, y, z)` should be drawn. Neighbouring
    /// chunks are not consulted, so faces on the chunk border always are.
    pub fn is_face_visible(&self, x: i32, y: i32, z: i32) -> bool {
        !self.is_occupied(x, y, z)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The current mesh, or `None` while cell edits are pending a rebuild.
    pub fn mesh(&self) -> Option<&ChunkMesh> {
        (!self.dirty).then_some(&self.mesh)
    }

    /// Bumped on every rebuild; lets GPU caches detect stale uploads.
    pub fn mesh_revision(&self) -> u64 {
        self.mesh_revision
    }

    pub fn rebuild_mesh(&mut self, registry: &BlockRegistry) {
        let mut vertices = std::mem::take(&mut self.mesh.vertices);
        mesh_into(self, registry, &mut vertices);
        self.mesh.vertices = vertices;
        self.dirty = false;
        self.mesh_revision += 1;
        trace!(
            "Rebuilt chunk ({}, {}, {}) mesh: {} vertices",
            self.position.x,
            self.position.y,
            self.position.z,
            self.mesh.vertex_count()
        );
    }

    pub fn rebuild_mesh_if_dirty(&mut self, registry: &BlockRegistry) -> bool {
        if !self.dirty {
            return false;
        }
        self.rebuild_mesh(registry);
        true
    }

    pub fn blocks(&self) -> &[BlockType; CHUNK_VOLUME] {
        &self.blocks
    }
}

fn terrain_block(y: usize) -> BlockType {
    if y == SURFACE_Y {
        BlockType::Grass
    } else if (DIRT_FLOOR_Y..SURFACE_Y).contains(&y) {
        BlockType::Dirt
    } else if y < DIRT_FLOOR_Y {
        BlockType::Stone
    } else {
        BlockType::Air
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::register_default_blocks;

    #[test]
    fn generated_terrain_is_layered_by_height() {
        let chunk = Chunk::generate(ChunkPos::new(-3, 0, 9));
        for x in 0..16 {
            for z in 0..16 {
                for y in 0..16 {
                    let expected = match y {
                        7 => BlockType::Grass,
                        5 | 6 => BlockType::Dirt,
                        0..=4 => BlockType::Stone,
                        _ => BlockType::Air,
                    };
                    assert_eq!(chunk.get(x, y, z), Some(expected), "at {x},{y},{z}");
                }
            }
        }
    }

    #[test]
    fn checked_access_rejects_out_of_range() {
        let mut chunk = Chunk::filled(ChunkPos::default(), BlockType::Stone);
        for (x, y, z) in [(-1, 0, 0), (0, -1, 0), (0, 0, -1), (16, 0, 0), (0, 16, 0), (0, 0, 16)] {
            assert_eq!(chunk.get(x, y, z), None);
            assert!(!chunk.is_occupied(x, y, z));
            assert!(chunk.is_face_visible(x, y, z));
            assert_eq!(chunk.set(x, y, z, BlockType::Wood), None);
        }
        assert!(chunk.is_occupied(15, 15, 15));
        assert!(!chunk.is_face_visible(0, 0, 0));
    }

    #[test]
    fn mesh_is_hidden_until_rebuilt() {
        let registry = register_default_blocks();
        let mut chunk = Chunk::generate(ChunkPos::default());
        assert!(chunk.is_dirty());
        assert!(chunk.mesh().is_none());

        assert!(chunk.rebuild_mesh_if_dirty(&registry));
        assert!(!chunk.rebuild_mesh_if_dirty(&registry));
        assert_eq!(chunk.mesh_revision(), 1);
        let before = chunk.mesh().map(ChunkMesh::vertex_count);
        assert!(before.is_some());

        assert_eq!(chunk.set(3, 7, 3, BlockType::Air), Some(BlockType::Grass));
        assert!(chunk.is_dirty());
        assert!(chunk.mesh().is_none());

        chunk.rebuild_mesh(&registry);
        assert_eq!(chunk.mesh_revision(), 2);
        assert_ne!(chunk.mesh().map(ChunkMesh::vertex_count), before);
    }

    #[test]
    fn writing_the_same_block_keeps_the_chunk_clean() {
        let registry = register_default_blocks();
        let mut chunk = Chunk::generate(ChunkPos::default());
        chunk.rebuild_mesh(&registry);

        assert_eq!(chunk.set(1, 2, 3, BlockType::Stone), Some(BlockType::Stone));
        assert!(!chunk.is_dirty());

        chunk.mark_dirty();
        assert!(chunk.mesh().is_none());
    }
}
