use std::time::{Duration, Instant};

use bitflags::bitflags;
use glam::{IVec3, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{BlockRegistry, BlockType};
use crate::config::EditConfig;
use crate::coords::voxel_center;
use crate::raycast::{aim_direction, cast_ray, CameraBasis, Ray};
use crate::world::World;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MouseButtons: u8 {
        const LEFT   = 0b0000_0001;
        const MIDDLE = 0b0000_0010;
        const RIGHT  = 0b0000_0100;
    }
}

/// Receives debris bursts when a block is broken.
pub trait ParticleEmitter {
    fn emit_burst(&mut self, origin: Vec3);
}

/// Input snapshot consumed by [`EditController::update`] once per frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EditInput {
    /// Cursor position in window pixels.
    pub cursor: Vec2,
    pub viewport: Vec2,
    pub buttons: MouseButtons,
    /// Set on the frame the block-cycle key goes down.
    pub cycle_block: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub broken: Option<IVec3>,
    pub placed: Option<IVec3>,
}

/// Turns clicks into block edits: breaks with the left button, places the
/// selected block with the right, and rate-limits both with one cooldown.
#[derive(Debug, Clone)]
pub struct EditController {
    config: EditConfig,
    placing_block: BlockType,
    last_action: Option<Instant>,
}

impl EditController {
    pub fn new(config: EditConfig) -> Self {
        let config = config.sanitize();
        Self {
            placing_block: config.placing_block,
            config,
            last_action: None,
        }
    }

    pub fn placing_block(&self) -> BlockType {
        self.placing_block
    }

    pub fn cooldown(&self) -> Duration {
        self.config.cooldown()
    }

    pub fn cycle_block(&mut self) -> BlockType {
        self.placing_block = self.placing_block.next_placeable();
        debug!("Selected block: {}", self.placing_block);
        self.placing_block
    }

    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.last_action
            .is_some_and(|last| now.saturating_duration_since(last) <= self.config.cooldown())
    }

    /// Runs one frame of edit handling. Returns what changed, or `None` when
    /// no edit was applied (no click, cooldown, nothing hit, chunk gone).
    pub fn update(
        &mut self,
        now: Instant,
        world: &mut World,
        registry: &BlockRegistry,
        camera: &CameraBasis,
        input: &EditInput,
        particles: &mut dyn ParticleEmitter,
    ) -> Option<EditOutcome> {
        if input.cycle_block {
            self.cycle_block();
        }

        let breaking = input.buttons.contains(MouseButtons::LEFT);
        let placing = input.buttons.contains(MouseButtons::RIGHT);
        if !(breaking || placing) || self.is_cooling_down(now) {
            return None;
        }

        let ray = Ray {
            origin: camera.position,
            direction: aim_direction(
                camera,
                input.cursor,
                input.viewport,
                self.config.aim_sensitivity,
            ),
        };
        let hit = cast_ray(world, &ray, self.config.max_ray_distance, self.config.ray_step)?;

        // The hit is resolved by position; re-check the chunk is still there.
        let chunk = world.chunk_at_mut(hit.chunk)?;

        let mut outcome = EditOutcome::default();
        if breaking {
            let previous = chunk.set_local(hit.local, BlockType::Air);
            particles.emit_burst(voxel_center(hit.voxel));
            debug!(
                "Broke {previous} at ({}, {}, {})",
                hit.voxel.x, hit.voxel.y, hit.voxel.z
            );
            outcome.broken = Some(hit.voxel);
        }

        if placing {
            let target = hit.adjacent_voxel();
            if world.set_block(target, self.placing_block).is_some() {
                debug!(
                    "Placed {} at ({}, {}, {})",
                    self.placing_block, target.x, target.y, target.z
                );
                outcome.placed = Some(target);
            }
        }

        if outcome == EditOutcome::default() {
            return None;
        }

        world.rebuild_dirty(registry);
        self.last_action = Some(now);
        Some(outcome)
    }
}

impl Default for EditController {
    fn default() -> Self {
        Self::new(EditConfig::default())
    }
}
