use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::Face;

pub const NUM_BLOCKS: usize = 6;

/// Contents of a single voxel cell. `Air` is empty space and never meshed.
#[repr(u8)]
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    #[default]
    Air = 0,
    Grass = 1,
    Stone = 2,
    Dirt = 3,
    Sand = 4,
    Wood = 5,
}

impl BlockType {
    pub const ALL: [BlockType; NUM_BLOCKS] = [
        BlockType::Air,
        BlockType::Grass,
        BlockType::Stone,
        BlockType::Dirt,
        BlockType::Sand,
        BlockType::Wood,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    pub const fn is_air(self) -> bool {
        matches!(self, BlockType::Air)
    }

    pub const fn name(self) -> &'static str {
        match self {
            BlockType::Air => "air",
            BlockType::Grass => "grass",
            BlockType::Stone => "stone",
            BlockType::Dirt => "dirt",
            BlockType::Sand => "sand",
            BlockType::Wood => "wood",
        }
    }

    /// Next type in id order, wrapping at `NUM_BLOCKS` and never landing on air.
    pub fn next_placeable(self) -> Self {
        let next = (usize::from(self.id()) + 1) % NUM_BLOCKS;
        match Self::ALL[next] {
            BlockType::Air => BlockType::Grass,
            other => other,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pixel rectangle inside the texture atlas.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Atlas rectangle per face, indexed by [`Face::index`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTexture {
    pub faces: [AtlasRect; 6],
}

impl BlockTexture {
    pub const fn uniform(rect: AtlasRect) -> Self {
        Self { faces: [rect; 6] }
    }

    /// One rectangle for the four sides, another for top and bottom.
    pub const fn sides_and_caps(sides: AtlasRect, caps: AtlasRect) -> Self {
        Self {
            faces: [sides, sides, caps, caps, sides, sides],
        }
    }

    pub fn face(&self, face: Face) -> AtlasRect {
        self.faces[face.index()]
    }
}

pub const DEFAULT_ATLAS_SIZE: u32 = 128;
const TILE: u32 = 32;

/// Texture lookup for every placeable block type.
///
/// Built once at start-up and handed by reference to the mesher and renderer;
/// there is no global instance.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    atlas_width: u32,
    atlas_height: u32,
    textures: [Option<BlockTexture>; NUM_BLOCKS],
}

impl BlockRegistry {
    pub fn new(atlas_width: u32, atlas_height: u32) -> Self {
        assert!(
            atlas_width > 0 && atlas_height > 0,
            "atlas dimensions must be non-zero"
        );
        Self {
            atlas_width,
            atlas_height,
            textures: [None; NUM_BLOCKS],
        }
    }

    pub fn register(&mut self, block: BlockType, texture: BlockTexture) {
        assert!(!block.is_air(), "air has no texture and cannot be registered");
        self.textures[usize::from(block.id())] = Some(texture);
    }

    pub fn try_texture(&self, block: BlockType) -> Option<&BlockTexture> {
        self.textures[usize::from(block.id())].as_ref()
    }

    /// Panics if `block` was never registered; an unmapped solid block is a
    /// configuration bug, not a runtime condition.
    pub fn texture(&self, block: BlockType) -> &BlockTexture {
        match self.try_texture(block) {
            Some(texture) => texture,
            None => panic!("block type `{block}` has no registered texture"),
        }
    }

    pub fn atlas_size(&self) -> (u32, u32) {
        (self.atlas_width, self.atlas_height)
    }

    pub fn registered(&self) -> impl Iterator<Item = (BlockType, &BlockTexture)> + '_ {
        BlockType::ALL
            .into_iter()
            .filter_map(|block| self.try_texture(block).map(|texture| (block, texture)))
    }
}

pub fn register_default_blocks() -> BlockRegistry {
    let tile = |x: u32, y: u32| AtlasRect::new(x, y, TILE, TILE);

    let mut registry = BlockRegistry::new(DEFAULT_ATLAS_SIZE, DEFAULT_ATLAS_SIZE);
    registry.register(
        BlockType::Grass,
        BlockTexture::sides_and_caps(tile(0, 96), tile(32, 96)),
    );
    registry.register(BlockType::Dirt, BlockTexture::uniform(tile(0, 64)));
    registry.register(BlockType::Stone, BlockTexture::uniform(tile(0, 32)));
    registry.register(BlockType::Sand, BlockTexture::uniform(tile(0, 0)));
    registry.register(BlockType::Wood, BlockTexture::uniform(tile(32, 0)));
    registry
}
