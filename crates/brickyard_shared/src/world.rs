use glam::IVec3;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::block::{BlockRegistry, BlockType};
use crate::chunk::Chunk;
use crate::config::WorldConfig;
use crate::coords::{voxel_to_chunk, ChunkKey, ChunkPos};
use crate::mesh::ChunkMesh;

/// Square, single-layer grid of chunks generated up front.
#[derive(Debug, Default)]
pub struct World {
    chunks: FxHashMap<ChunkKey, Chunk>,
    world_size: i32,
    chunk_load_radius: i32,
}

impl World {
    pub fn new(world_size: i32, chunk_load_radius: i32) -> Self {
        Self {
            chunks: FxHashMap::default(),
            world_size: world_size.max(0),
            chunk_load_radius,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.world_size, config.chunk_load_radius)
    }

    pub fn chunk_key(x: i32, z: i32) -> ChunkKey {
        ChunkKey::new(x, z)
    }

    pub fn world_size(&self) -> i32 {
        self.world_size
    }

    pub fn chunk_load_radius(&self) -> i32 {
        self.chunk_load_radius
    }

    /// Fills every missing chunk in `0..world_size` on x and z, then meshes
    /// whatever is dirty. Existing chunks and their edits are left alone.
    /// Returns how many chunks were created.
    pub fn generate(&mut self, registry: &BlockRegistry) -> usize {
        debug!(
            "chunk_load_radius={} ignored; the world is generated eagerly",
            self.chunk_load_radius
        );

        let mut created = 0;
        for x in 0..self.world_size {
            for z in 0..self.world_size {
                self.chunks.entry(Self::chunk_key(x, z)).or_insert_with(|| {
                    created += 1;
                    Chunk::generate(ChunkPos::new(x, 0, z))
                });
            }
        }
        let meshed = self.rebuild_dirty(registry);

        info!(
            "Generated {created} chunks ({} total, {meshed} meshed) for a {}x{} world",
            self.chunks.len(),
            self.world_size,
            self.world_size
        );
        created
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    pub fn chunk_mut(&mut self, key: ChunkKey) -> Option<&mut Chunk> {
        self.chunks.get_mut(&key)
    }

    /// Looks up a chunk by full position; any layer other than the stored
    /// chunk's own is empty space.
    pub fn chunk_at(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunk(pos.key())
            .filter(|chunk| chunk.position() == pos)
    }

    pub fn chunk_at_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunk_mut(pos.key())
            .filter(|chunk| chunk.position() == pos)
    }

    pub fn block_at(&self, voxel: IVec3) -> Option<BlockType> {
        let (chunk_pos, local) = voxel_to_chunk(voxel);
        self.chunk_at(chunk_pos).map(|chunk| chunk.get_local(local))
    }

    /// Sets a block by world voxel coordinate. Returns the chunk that holds
    /// the voxel, or `None` if that chunk is not loaded.
    pub fn set_block(&mut self, voxel: IVec3, block: BlockType) -> Option<ChunkPos> {
        let (chunk_pos, local) = voxel_to_chunk(voxel);
        let chunk = self.chunk_at_mut(chunk_pos)?;
        chunk.set_local(local, block);
        Some(chunk_pos)
    }

    pub fn rebuild_dirty(&mut self, registry: &BlockRegistry) -> usize {
        let mut rebuilt = 0;
        for chunk in self.chunks.values_mut() {
            if chunk.rebuild_mesh_if_dirty(registry) {
                rebuilt += 1;
            }
        }
        rebuilt
    }

    /// Hands every up-to-date chunk mesh to `draw`, one call per chunk.
    pub fn render<F>(&self, mut draw: F) -> usize
    where
        F: FnMut(&Chunk, &ChunkMesh),
    {
        let mut drawn = 0;
        for chunk in self.chunks.values() {
            if let Some(mesh) = chunk.mesh() {
                draw(chunk, mesh);
                drawn += 1;
            }
        }
        drawn
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drops every chunk. GPU copies are released separately by the renderer.
    pub fn clear(&mut self) {
        let released = self.chunks.len();
        self.chunks.clear();
        debug!("Released {released} chunks");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::register_default_blocks;

    #[test]
    fn generate_creates_one_chunk_per_column() {
        let registry = register_default_blocks();
        let mut world = World::new(3, 3);
        assert_eq!(world.generate(&registry), 9);
        assert_eq!(world.len(), 9);

        for x in 0..3 {
            for z in 0..3 {
                let chunk = world.chunk(World::chunk_key(x, z)).expect("generated chunk");
                assert_eq!(chunk.position(), ChunkPos::new(x, 0, z));
                assert!(chunk.mesh().is_some());
            }
        }
        assert!(world.chunk(World::chunk_key(3, 0)).is_none());
        assert!(world.chunk(World::chunk_key(-1, 0)).is_none());
    }

    #[test]
    fn generate_is_idempotent_and_keeps_edits() {
        let registry = register_default_blocks();
        let mut world = World::new(2, 0);
        world.generate(&registry);

        let voxel = IVec3::new(20, 7, 3);
        assert_eq!(world.set_block(voxel, BlockType::Air), Some(ChunkPos::new(1, 0, 0)));
        world.rebuild_dirty(&registry);

        assert_eq!(world.generate(&registry), 0);
        assert_eq!(world.len(), 4);
        assert_eq!(world.block_at(voxel), Some(BlockType::Air));
    }

    #[test]
    fn voxel_lookups_respect_the_single_layer() {
        let registry = register_default_blocks();
        let mut world = World::new(1, 0);
        world.generate(&registry);

        assert_eq!(world.block_at(IVec3::new(4, 7, 4)), Some(BlockType::Grass));
        assert_eq!(world.block_at(IVec3::new(4, 0, 4)), Some(BlockType::Stone));
        // y=23 would alias local y=7 if the layer were ignored.
        assert_eq!(world.block_at(IVec3::new(4, 23, 4)), None);
        assert_eq!(world.block_at(IVec3::new(-1, 7, 4)), None);
        assert_eq!(world.set_block(IVec3::new(16, 7, 0), BlockType::Sand), None);
    }

    #[test]
    fn render_visits_only_fresh_meshes() {
        let registry = register_default_blocks();
        let mut world = World::new(2, 0);
        world.generate(&registry);
        world.set_block(IVec3::new(0, 7, 0), BlockType::Air);

        let mut seen = Vec::new();
        let drawn = world.render(|chunk, mesh| {
            assert!(!mesh.is_empty());
            seen.push(chunk.position());
        });
        assert_eq!(drawn, 3);
        assert!(!seen.contains(&ChunkPos::new(0, 0, 0)));

        assert_eq!(world.rebuild_dirty(&registry), 1);
        assert_eq!(world.render(|_, _| {}), 4);
    }

    #[test]
    fn rebuild_dirty_counts_only_touched_chunks() {
        let registry = register_default_blocks();
        let mut world = World::new(3, 0);
        world.generate(&registry);
        assert_eq!(world.rebuild_dirty(&registry), 0);

        world.set_block(IVec3::new(1, 7, 1), BlockType::Air);
        world.set_block(IVec3::new(40, 7, 40), BlockType::Air);
        // Writing the same value again leaves the chunk clean.
        world.set_block(IVec3::new(20, 0, 20), BlockType::Stone);

        assert_eq!(world.rebuild_dirty(&registry), 2);
        assert!(world.chunks().all(|chunk| !chunk.is_dirty()));
        assert_eq!(world.rebuild_dirty(&registry), 0);
    }

    #[test]
    fn clear_releases_everything() {
        let registry = register_default_blocks();
        let mut world = World::from_config(&WorldConfig::default());
        world.generate(&registry);
        assert_eq!(world.len(), 9);
        world.clear();
        assert!(world.is_empty());
    }
}
