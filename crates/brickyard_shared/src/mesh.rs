use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::block::BlockRegistry;
use crate::chunk::Chunk;
use crate::coords::{Face, LocalPos, BLOCK_SCALE, CHUNK_SIZE};

pub const VERTICES_PER_FACE: usize = 6;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ChunkVertex {
    pub position: [f32; 3],
    /// Atlas u, v; the third component is reserved for ambient occlusion and is
    /// always zero for now.
    pub uv: [f32; 3],
    pub tint: [f32; 3],
}
const _: [(); 36] = [(); std::mem::size_of::<ChunkVertex>()];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<ChunkVertex>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_FACE
    }
}

/// Unit-cube corners for the two triangles of each face, in [`Face`] order.
const FACE_CORNERS: [[[f32; 3]; VERTICES_PER_FACE]; 6] = [
    // back
    [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
    ],
    // front
    [
        [0.0, 0.0, 1.0],
        [0.0, 1.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [0.0, 1.0, 1.0],
        [1.0, 1.0, 1.0],
    ],
    // bottom
    [
        [0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
    ],
    // top
    [
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
        [1.0, 1.0, 0.0],
        [1.0, 1.0, 1.0],
    ],
    // left
    [
        [0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0],
        [0.0, 1.0, 1.0],
    ],
    // right
    [
        [1.0, 0.0, 0.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
    ],
];

/// Normalised texture corners matching `FACE_CORNERS`. Front, left and bottom
/// are deliberately mirrored/rotated so side textures read upright.
const FACE_UVS: [[[f32; 2]; VERTICES_PER_FACE]; 6] = [
    [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
    [[1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
    [[0.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
    [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
    [[1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
    [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
];

/// Flat per-face shading, stands in for lighting.
const FACE_BRIGHTNESS: [f32; 6] = [0.3, 1.0, 0.2, 1.2, 0.4, 0.85];

pub fn face_brightness(face: Face) -> f32 {
    FACE_BRIGHTNESS[face.index()]
}

pub fn build_chunk_mesh(chunk: &Chunk, registry: &BlockRegistry) -> ChunkMesh {
    let mut vertices = Vec::new();
    mesh_into(chunk, registry, &mut vertices);
    ChunkMesh { vertices }
}

/// Regenerates the full vertex list for `chunk` into `out`, reusing its
/// allocation. Output depends only on the chunk's cells and position.
pub fn mesh_into(chunk: &Chunk, registry: &BlockRegistry, out: &mut Vec<ChunkVertex>) {
    out.clear();

    let (atlas_w, atlas_h) = registry.atlas_size();
    let atlas_w = atlas_w as f32;
    let atlas_h = atlas_h as f32;
    let chunk_origin = chunk.position().origin_voxel().as_vec3();

    for x in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let local = LocalPos {
                    x: x as u8,
                    y: y as u8,
                    z: z as u8,
                };
                let block = chunk.get_local(local);
                if block.is_air() {
                    continue;
                }

                let texture = registry.texture(block);
                let cell = local.as_ivec3();
                let base = chunk_origin + cell.as_vec3();

                for face in Face::ALL {
                    let neighbor = cell + face.normal_ivec3();
                    if !chunk.is_face_visible(neighbor.x, neighbor.y, neighbor.z) {
                        continue;
                    }

                    let rect = texture.face(face);
                    let shade = face_brightness(face);
                    let corners = &FACE_CORNERS[face.index()];
                    let uvs = &FACE_UVS[face.index()];

                    for (corner, uv) in corners.iter().zip(uvs) {
                        let position = (base + Vec3::from_array(*corner)) * BLOCK_SCALE;
                        let u = (rect.x as f32 + uv[0] * rect.width as f32) / atlas_w;
                        let v = (rect.y as f32 + uv[1] * rect.height as f32) / atlas_h;
                        out.push(ChunkVertex {
                            position: position.to_array(),
                            uv: [u, v, 0.0],
                            tint: [shade; 3],
                        });
                    }
                }
            }
        }
    }
}
