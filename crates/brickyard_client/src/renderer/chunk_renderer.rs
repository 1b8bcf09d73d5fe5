use std::mem;

use brickyard_shared::coords::ChunkKey;
use brickyard_shared::mesh::{ChunkMesh, ChunkVertex};
use brickyard_shared::world::World;
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshUploadStats {
    pub uploaded_chunks: u32,
    pub uploaded_bytes: u64,
    pub buffer_reallocations: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkPassStats {
    pub draw_calls: u32,
    pub rendered_vertices: u64,
}

/// GPU copy of one chunk's mesh.
pub struct ChunkRenderData {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub vertex_capacity_bytes: u64,
    /// Chunk mesh revision this buffer was filled from.
    pub revision: u64,
}

/// Per-chunk vertex buffers, kept in step with the world's chunk meshes.
#[derive(Default)]
pub struct ChunkRenderer {
    chunks: FxHashMap<ChunkKey, ChunkRenderData>,
}

impl ChunkRenderer {
    /// Uploads every chunk whose mesh revision moved since the last sync.
    /// Existing buffers are rewritten in place and only reallocated to grow.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        world: &World,
    ) -> MeshUploadStats {
        let mut stats = MeshUploadStats::default();

        world.render(|chunk, mesh| {
            let key = chunk.position().key();
            let revision = chunk.mesh_revision();
            match self.chunks.get_mut(&key) {
                Some(data) if data.revision == revision => {}
                Some(data) => {
                    update_mesh_buffer(device, queue, data, mesh, &mut stats);
                    data.revision = revision;
                }
                None => {
                    let data = upload_mesh(device, queue, mesh, revision, &mut stats);
                    self.chunks.insert(key, data);
                }
            }
        });

        let before = self.chunks.len();
        self.chunks.retain(|key, data| {
            let alive = world.chunk(*key).is_some();
            if !alive {
                data.vertex_buffer.destroy();
            }
            alive
        });
        if self.chunks.len() != before {
            debug!("Dropped {} stale chunk buffers", before - self.chunks.len());
        }

        stats
    }

    pub fn render(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
        atlas_bind_group: &wgpu::BindGroup,
    ) -> ChunkPassStats {
        let mut stats = ChunkPassStats::default();
        pass.set_bind_group(0, camera_bind_group, &[]);
        pass.set_bind_group(1, atlas_bind_group, &[]);
        for chunk in self.chunks.values() {
            if chunk.vertex_count == 0 {
                continue;
            }
            draw_chunk(pass, chunk, &mut stats);
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Frees every chunk buffer now instead of waiting for drop.
    pub fn release_all(&mut self) {
        for (_, data) in self.chunks.drain() {
            data.vertex_buffer.destroy();
        }
    }
}

fn upload_mesh(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    mesh: &ChunkMesh,
    revision: u64,
    stats: &mut MeshUploadStats,
) -> ChunkRenderData {
    let vertex_bytes = mesh_vertex_bytes(mesh);
    let vertex_capacity_bytes = grow_capacity(vertex_bytes);
    let vertex_buffer = create_vertex_buffer(device, vertex_capacity_bytes);

    if vertex_bytes > 0 {
        queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
    }
    stats.uploaded_chunks += 1;
    stats.uploaded_bytes += vertex_bytes;
    stats.buffer_reallocations += 1;

    ChunkRenderData {
        vertex_buffer,
        vertex_count: mesh.vertices.len() as u32,
        vertex_capacity_bytes,
        revision,
    }
}

fn update_mesh_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    chunk: &mut ChunkRenderData,
    mesh: &ChunkMesh,
    stats: &mut MeshUploadStats,
) {
    let vertex_bytes = mesh_vertex_bytes(mesh);

    if vertex_bytes > chunk.vertex_capacity_bytes {
        chunk.vertex_capacity_bytes = grow_capacity(vertex_bytes);
        let old = mem::replace(
            &mut chunk.vertex_buffer,
            create_vertex_buffer(device, chunk.vertex_capacity_bytes),
        );
        old.destroy();
        stats.buffer_reallocations += 1;
    }

    if vertex_bytes > 0 {
        queue.write_buffer(&chunk.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
    }
    chunk.vertex_count = mesh.vertices.len() as u32;
    stats.uploaded_chunks += 1;
    stats.uploaded_bytes += vertex_bytes;
}

fn mesh_vertex_bytes(mesh: &ChunkMesh) -> u64 {
    (mesh.vertices.len() * mem::size_of::<ChunkVertex>()) as u64
}

fn grow_capacity(required: u64) -> u64 {
    required.max(4).next_power_of_two()
}

fn create_vertex_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Chunk Vertex Buffer"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn draw_chunk(pass: &mut wgpu::RenderPass<'_>, chunk: &ChunkRenderData, stats: &mut ChunkPassStats) {
    let used_bytes = u64::from(chunk.vertex_count) * mem::size_of::<ChunkVertex>() as u64;
    pass.set_vertex_buffer(0, chunk.vertex_buffer.slice(..used_bytes));
    pass.draw(0..chunk.vertex_count, 0..1);

    stats.draw_calls += 1;
    stats.rendered_vertices += u64::from(chunk.vertex_count);
}

#[cfg(test)]
mod tests {
    use super::grow_capacity;

    #[test]
    fn capacity_grows_to_powers_of_two() {
        assert_eq!(grow_capacity(0), 4);
        assert_eq!(grow_capacity(36), 64);
        assert_eq!(grow_capacity(64), 64);
        assert_eq!(grow_capacity(36 * 6 * 1000), 262_144);
    }
}
