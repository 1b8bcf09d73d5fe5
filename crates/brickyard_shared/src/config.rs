use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::BlockType;
use crate::coords::BLOCK_SCALE;

const MIN_WORLD_SIZE: i32 = 1;
const MAX_WORLD_SIZE: i32 = 32;
const MAX_LOAD_RADIUS: i32 = 64;
const MAX_COOLDOWN_MS: u64 = 5_000;
const MIN_RAY_STEP: f32 = 0.01;
const MAX_RAY_STEP: f32 = 1.0;
const MIN_RAY_DISTANCE: f32 = 1.0;
const MAX_RAY_DISTANCE: f32 = 1_000.0;
const MAX_AIM_SENSITIVITY: f32 = 2.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file exists but is not valid TOML for this schema.
    #[error("failed to deserialize config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Shape of the generated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Chunks per side of the square world.
    #[serde(default = "default_world_size")]
    pub world_size: i32,
    /// Accepted for compatibility; chunks are never streamed, so it has no
    /// effect on generation.
    #[serde(default = "default_chunk_load_radius")]
    pub chunk_load_radius: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_size: default_world_size(),
            chunk_load_radius: default_chunk_load_radius(),
        }
    }
}

impl WorldConfig {
    pub fn sanitize(mut self) -> Self {
        self.world_size = self.world_size.clamp(MIN_WORLD_SIZE, MAX_WORLD_SIZE);
        self.chunk_load_radius = self.chunk_load_radius.clamp(0, MAX_LOAD_RADIUS);
        self
    }
}

/// Block break/place tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditConfig {
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Distance between ray samples, in world units.
    #[serde(default = "default_ray_step")]
    pub ray_step: f32,
    #[serde(default = "default_max_ray_distance")]
    pub max_ray_distance: f32,
    /// How far the cursor offset bends the aim ray away from the view axis.
    #[serde(default = "default_aim_sensitivity")]
    pub aim_sensitivity: f32,
    #[serde(default = "default_placing_block")]
    pub placing_block: BlockType,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            ray_step: default_ray_step(),
            max_ray_distance: default_max_ray_distance(),
            aim_sensitivity: default_aim_sensitivity(),
            placing_block: default_placing_block(),
        }
    }
}

impl EditConfig {
    pub fn sanitize(mut self) -> Self {
        self.cooldown_ms = self.cooldown_ms.min(MAX_COOLDOWN_MS);
        self.ray_step = sanitize_f32(self.ray_step, default_ray_step())
            .clamp(MIN_RAY_STEP, MAX_RAY_STEP);
        self.max_ray_distance = sanitize_f32(self.max_ray_distance, default_max_ray_distance())
            .clamp(MIN_RAY_DISTANCE, MAX_RAY_DISTANCE);
        self.aim_sensitivity = sanitize_f32(self.aim_sensitivity, default_aim_sensitivity())
            .clamp(0.0, MAX_AIM_SENSITIVITY);
        if self.placing_block.is_air() {
            self.placing_block = default_placing_block();
        }
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

fn sanitize_f32(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn default_world_size() -> i32 {
    3
}

fn default_chunk_load_radius() -> i32 {
    3
}

fn default_cooldown_ms() -> u64 {
    200
}

fn default_ray_step() -> f32 {
    0.05
}

fn default_max_ray_distance() -> f32 {
    10.0 * BLOCK_SCALE
}

fn default_aim_sensitivity() -> f32 {
    0.5
}

fn default_placing_block() -> BlockType {
    BlockType::Stone
}

pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_toml<T: Serialize>(value: &T, path: &Path) -> Result<(), ConfigError> {
    let serialized = toml::to_string_pretty(value)?;
    fs::write(path, serialized).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
