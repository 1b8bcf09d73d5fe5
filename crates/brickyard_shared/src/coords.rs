use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// World-space edge length of one voxel.
pub const BLOCK_SCALE: f32 = 10.0;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn key(self) -> ChunkKey {
        ChunkKey::new(self.x, self.z)
    }

    /// Voxel coordinate of this chunk's (0, 0, 0) cell.
    pub fn origin_voxel(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z) * CHUNK_SIZE_I32
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    /// Returns `None` unless every component lies in `0..CHUNK_SIZE`.
    pub fn new_checked(x: i32, y: i32, z: i32) -> Option<Self> {
        let range = 0..CHUNK_SIZE_I32;
        if range.contains(&x) && range.contains(&y) && range.contains(&z) {
            Some(Self {
                x: x as u8,
                y: y as u8,
                z: z as u8,
            })
        } else {
            None
        }
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(i32::from(self.x), i32::from(self.y), i32::from(self.z))
    }
}

/// Map key for a chunk column. The world is a single layer of chunks, so a
/// column is identified by its x and z chunk coordinates alone.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Lossless 64-bit encoding: x in the high half, z in the low half.
    pub const fn packed(self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.z as u32 as u64)
    }

    pub const fn from_packed(packed: u64) -> Self {
        Self {
            x: (packed >> 32) as u32 as i32,
            z: packed as u32 as i32,
        }
    }
}

/// The six faces of a voxel, in mesh emission order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Face {
    /// -Z
    Back = 0,
    /// +Z
    Front = 1,
    /// -Y
    Bottom = 2,
    /// +Y
    Top = 3,
    /// -X
    Left = 4,
    /// +X
    Right = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Back,
        Face::Front,
        Face::Bottom,
        Face::Top,
        Face::Left,
        Face::Right,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn normal_ivec3(self) -> IVec3 {
        match self {
            Face::Back => IVec3::new(0, 0, -1),
            Face::Front => IVec3::new(0, 0, 1),
            Face::Bottom => IVec3::new(0, -1, 0),
            Face::Top => IVec3::new(0, 1, 0),
            Face::Left => IVec3::new(-1, 0, 0),
            Face::Right => IVec3::new(1, 0, 0),
        }
    }

    pub fn from_normal(normal: IVec3) -> Option<Face> {
        Face::ALL
            .into_iter()
            .find(|face| face.normal_ivec3() == normal)
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    (value.div_euclid(divisor), value.rem_euclid(divisor))
}

/// Voxel containing a world-space point.
pub fn world_to_voxel(world: Vec3) -> IVec3 {
    (world / BLOCK_SCALE).floor().as_ivec3()
}

/// World-space centre of a voxel.
pub fn voxel_center(voxel: IVec3) -> Vec3 {
    (voxel.as_vec3() + Vec3::splat(0.5)) * BLOCK_SCALE
}

pub fn voxel_to_chunk(voxel: IVec3) -> (ChunkPos, LocalPos) {
    let (chunk_x, local_x) = div_rem_floor(voxel.x, CHUNK_SIZE_I32);
    let (chunk_y, local_y) = div_rem_floor(voxel.y, CHUNK_SIZE_I32);
    let (chunk_z, local_z) = div_rem_floor(voxel.z, CHUNK_SIZE_I32);

    (
        ChunkPos::new(chunk_x, chunk_y, chunk_z),
        LocalPos {
            x: local_x as u8,
            y: local_y as u8,
            z: local_z as u8,
        },
    )
}

pub fn chunk_to_voxel(chunk_pos: ChunkPos, local: LocalPos) -> IVec3 {
    chunk_pos.origin_voxel() + local.as_ivec3()
}

/// Cell index inside a chunk's block array: x fastest, then y, then z.
pub fn local_to_index(local: LocalPos) -> usize {
    usize::from(local.x)
        + usize::from(local.y) * CHUNK_SIZE
        + usize::from(local.z) * CHUNK_SIZE * CHUNK_SIZE
}

pub fn index_to_local(index: usize) -> LocalPos {
    assert!(index < CHUNK_VOLUME, "chunk index out of bounds: {index}");

    let z = index / (CHUNK_SIZE * CHUNK_SIZE);
    let rem = index % (CHUNK_SIZE * CHUNK_SIZE);
    let y = rem / CHUNK_SIZE;
    let x = rem % CHUNK_SIZE;

    LocalPos {
        x: x as u8,
        y: y as u8,
        z: z as u8,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use glam::{IVec3, Vec3};

    use super::*;

    #[test]
    fn local_index_round_trips_and_matches_layout() {
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let local = LocalPos {
                        x: x as u8,
                        y: y as u8,
                        z: z as u8,
                    };
                    let index = local_to_index(local);
                    assert_eq!(index, x + y * 16 + z * 256);
                    assert_eq!(index_to_local(index), local);
                }
            }
        }
    }

    #[test]
    fn voxel_to_chunk_floors_negative_coordinates() {
        let (chunk, local) = voxel_to_chunk(IVec3::new(-1, -1, -1));
        assert_eq!(chunk, ChunkPos::new(-1, -1, -1));
        assert_eq!(local, LocalPos { x: 15, y: 15, z: 15 });

        let (chunk, local) = voxel_to_chunk(IVec3::new(16, 32, 0));
        assert_eq!(chunk, ChunkPos::new(1, 2, 0));
        assert_eq!(local, LocalPos::default());

        let (chunk, local) = voxel_to_chunk(IVec3::new(-17, 7, 40));
        assert_eq!(chunk, ChunkPos::new(-2, 0, 2));
        assert_eq!(local, LocalPos { x: 15, y: 7, z: 8 });
    }

    #[test]
    fn world_position_round_trips_through_chunk_and_local() {
        let samples = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(85.0, 75.5, 12.25),
            Vec3::new(-0.01, 159.9, -160.0),
            Vec3::new(-333.3, -47.0, 999.0),
        ];

        for world in samples {
            let voxel = world_to_voxel(world);
            let (chunk, local) = voxel_to_chunk(voxel);
            assert_eq!(chunk_to_voxel(chunk, local), voxel);

            let min = voxel.as_vec3() * BLOCK_SCALE;
            assert!(world.cmpge(min).all(), "{world} below voxel min {min}");
            assert!(world.cmplt(min + Vec3::splat(BLOCK_SCALE)).all());
        }
    }

    #[test]
    fn new_checked_rejects_every_axis_out_of_range() {
        assert!(LocalPos::new_checked(0, 0, 0).is_some());
        assert!(LocalPos::new_checked(15, 15, 15).is_some());
        assert!(LocalPos::new_checked(-1, 0, 0).is_none());
        assert!(LocalPos::new_checked(0, 16, 0).is_none());
        assert!(LocalPos::new_checked(0, 0, 16).is_none());
    }

    #[test]
    fn chunk_keys_are_injective() {
        let mut seen = HashSet::new();
        for x in -40..40 {
            for z in -40..40 {
                assert!(seen.insert(ChunkKey::new(x, z)));
            }
        }

        // "1_23" vs "12_3" style collisions cannot happen with a structured key.
        assert_ne!(ChunkKey::new(1, 23), ChunkKey::new(12, 3));
        assert_ne!(ChunkKey::new(1, 23).packed(), ChunkKey::new(12, 3).packed());
    }

    #[test]
    fn packed_key_is_lossless_at_the_extremes() {
        for key in [
            ChunkKey::new(i32::MIN, i32::MAX),
            ChunkKey::new(-1, 0),
            ChunkKey::new(0, -1),
            ChunkKey::new(7, -7),
        ] {
            assert_eq!(ChunkKey::from_packed(key.packed()), key);
        }
        assert_ne!(ChunkKey::new(-1, 0).packed(), ChunkKey::new(0, -1).packed());
    }

    #[test]
    fn face_normals_map_back_to_faces() {
        for face in Face::ALL {
            assert_eq!(Face::from_normal(face.normal_ivec3()), Some(face));
        }
        assert_eq!(Face::from_normal(IVec3::ZERO), None);
        assert_eq!(Face::from_normal(IVec3::new(1, 1, 0)), None);
    }
}
