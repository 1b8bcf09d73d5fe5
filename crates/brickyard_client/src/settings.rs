use std::path::{Path, PathBuf};

use brickyard_shared::config::{load_toml, save_toml, ConfigError, EditConfig, WorldConfig};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "brickyard.toml";

const MIN_FOV: f32 = 30.0;
const MAX_FOV: f32 = 110.0;
const MAX_MOVE_SPEED: f32 = 1_000.0;
const MAX_LOOK_SENSITIVITY: f32 = 5.0;

/// Everything read from `brickyard.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub edit: EditConfig,
    #[serde(default)]
    pub client: ClientSettings,
}

impl AppConfig {
    pub fn sanitize(self) -> Self {
        Self {
            world: self.world.sanitize(),
            edit: self.edit.sanitize(),
            client: self.client.sanitize(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_toml::<Self>(path).map(Self::sanitize)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        save_toml(&self.clone().sanitize(), path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov: f32,
    /// World units per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Degrees of rotation per pixel of middle-drag.
    #[serde(default = "default_look_sensitivity")]
    pub look_sensitivity: f32,
    #[serde(default = "default_spawn_position")]
    pub spawn_position: [f32; 3],
    #[serde(default = "default_spawn_pitch")]
    pub spawn_pitch: f32,
    #[serde(default)]
    pub spawn_yaw: f32,
    /// PNG laid out to match the block registry; a generated atlas is used
    /// when unset or unreadable.
    #[serde(default)]
    pub atlas_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            fov: default_fov(),
            move_speed: default_move_speed(),
            look_sensitivity: default_look_sensitivity(),
            spawn_position: default_spawn_position(),
            spawn_pitch: default_spawn_pitch(),
            spawn_yaw: 0.0,
            atlas_path: None,
        }
    }
}

impl ClientSettings {
    fn sanitize(mut self) -> Self {
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self.fov = self.fov.clamp(MIN_FOV, MAX_FOV);
        self.move_speed = self.move_speed.clamp(0.0, MAX_MOVE_SPEED);
        self.look_sensitivity = self.look_sensitivity.clamp(0.0, MAX_LOOK_SENSITIVITY);
        if !self.spawn_position.iter().all(|c| c.is_finite()) {
            self.spawn_position = default_spawn_position();
        }
        self
    }

    pub fn spawn_position(&self) -> Vec3 {
        Vec3::from_array(self.spawn_position)
    }
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

fn default_fov() -> f32 {
    70.0
}

fn default_move_speed() -> f32 {
    60.0
}

fn default_look_sensitivity() -> f32 {
    0.25
}

fn default_spawn_position() -> [f32; 3] {
    [240.0, 120.0, 40.0]
}

fn default_spawn_pitch() -> f32 {
    -30.0
}

/// Reads the config, writing defaults back when the file is missing or broken.
pub fn load_or_create_config(path: &Path) -> AppConfig {
    match AppConfig::load(path) {
        Ok(config) => config,
        Err(err) => {
            if !err.is_not_found() {
                warn!("Failed to load config: {err}");
            }
            let config = AppConfig::default();
            if let Err(save_err) = config.save(path) {
                warn!("Failed to write default config to {}: {save_err}", path.display());
            }
            config
        }
    }
}
