use glam::{IVec3, Vec2, Vec3};

use crate::coords::{voxel_to_chunk, world_to_voxel, ChunkPos, Face, LocalPos};
use crate::world::World;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Camera position and orthonormal axes, as seen by the edit logic.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraBasis {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RayHit {
    pub chunk: ChunkPos,
    pub local: LocalPos,
    pub voxel: IVec3,
    /// Points from the hit voxel back towards the sample before it, i.e. out
    /// of the face the ray entered through. Zero if the ray started inside
    /// the voxel.
    pub normal: IVec3,
}

impl RayHit {
    pub fn face(&self) -> Option<Face> {
        Face::from_normal(self.normal)
    }

    /// The empty cell in front of the hit face.
    pub fn adjacent_voxel(&self) -> IVec3 {
        self.voxel + self.normal
    }
}

/// Bends the view axis towards the cursor. The centre of the viewport aims
/// straight ahead; the corners deflect by `sensitivity` along right and down.
pub fn aim_direction(basis: &CameraBasis, cursor: Vec2, viewport: Vec2, sensitivity: f32) -> Vec3 {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return basis.forward.normalize_or_zero();
    }

    let ndc = cursor / viewport * 2.0 - Vec2::ONE;
    let down = -basis.up;
    (basis.forward + basis.right * ndc.x * sensitivity + down * ndc.y * sensitivity)
        .normalize_or_zero()
}

/// Fixed-step samples along a ray, yielding the voxel under each sample.
#[derive(Debug, Clone)]
pub struct RayMarch {
    origin: Vec3,
    direction: Vec3,
    step: f32,
    index: u32,
    last_index: u32,
    finished: bool,
}

impl RayMarch {
    pub fn new(ray: &Ray, max_distance: f32, step: f32) -> Option<Self> {
        let direction = ray.direction.normalize_or_zero();
        if direction == Vec3::ZERO
            || !(step > 0.0 && step.is_finite())
            || !(max_distance >= 0.0 && max_distance.is_finite())
        {
            return None;
        }

        let last_index = (max_distance / step).floor().min(u32::MAX as f32) as u32;
        Some(Self {
            origin: ray.origin,
            direction,
            step,
            index: 0,
            last_index,
            finished: false,
        })
    }
}

impl Iterator for RayMarch {
    type Item = IVec3;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        // Multiplying instead of accumulating keeps long rays from drifting.
        let t = self.index as f32 * self.step;
        if self.index == self.last_index {
            self.finished = true;
        } else {
            self.index += 1;
        }
        Some(world_to_voxel(self.origin + self.direction * t))
    }
}

/// Marches `ray` until it enters a solid voxel. Samples in unloaded chunks
/// are passed through rather than ending the cast.
pub fn cast_ray(world: &World, ray: &Ray, max_distance: f32, step: f32) -> Option<RayHit> {
    let mut samples = RayMarch::new(ray, max_distance, step)?;
    let mut previous = world_to_voxel(ray.origin);

    for voxel in samples.by_ref() {
        let (chunk_pos, local) = voxel_to_chunk(voxel);
        let solid = world
            .chunk_at(chunk_pos)
            .is_some_and(|chunk| !chunk.get_local(local).is_air());

        if solid {
            return Some(RayHit {
                chunk: chunk_pos,
                local,
                voxel,
                normal: previous - voxel,
            });
        }
        previous = voxel;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{register_default_blocks, BlockType};
    use crate::coords::BLOCK_SCALE;

    fn flat_world(size: i32) -> World {
        let registry = register_default_blocks();
        let mut world = World::new(size, 0);
        world.generate(&registry);
        world
    }

    #[test]
    fn straight_down_ray_hits_grass_top() {
        let world = flat_world(1);
        let ray = Ray {
            origin: Vec3::new(8.0, 20.0, 8.0) * BLOCK_SCALE,
            direction: Vec3::NEG_Y,
        };

        let hit = cast_ray(&world, &ray, 200.0, 0.05).expect("terrain below");
        assert_eq!(hit.chunk, ChunkPos::new(0, 0, 0));
        assert_eq!(hit.local, LocalPos { x: 8, y: 7, z: 8 });
        assert_eq!(hit.voxel, IVec3::new(8, 7, 8));
        assert_eq!(hit.normal, IVec3::Y);
        assert_eq!(hit.face(), Some(Face::Top));
        assert_eq!(hit.adjacent_voxel(), IVec3::new(8, 8, 8));
        assert_eq!(world.block_at(hit.voxel), Some(BlockType::Grass));
    }

    #[test]
    fn ray_stops_at_max_distance() {
        let world = flat_world(1);
        let ray = Ray {
            origin: Vec3::new(80.0, 200.0, 80.0),
            direction: Vec3::NEG_Y,
        };
        // Terrain top sits 120 units below the origin.
        assert!(cast_ray(&world, &ray, 100.0, 0.05).is_none());
    }

    #[test]
    fn unloaded_chunks_are_skipped_not_misses() {
        let world = flat_world(2);
        // Start west of the world (chunk x = -1 is absent) aiming east.
        let ray = Ray {
            origin: Vec3::new(-50.0, 65.0, 85.0),
            direction: Vec3::X,
        };
        let hit = cast_ray(&world, &ray, 100.0, 0.05).expect("enters loaded chunk");
        assert_eq!(hit.voxel, IVec3::new(0, 6, 8));
        assert_eq!(hit.normal, IVec3::NEG_X);
        assert_eq!(hit.face(), Some(Face::Left));
    }

    #[test]
    fn ray_through_air_only_misses() {
        let world = flat_world(1);
        let ray = Ray {
            origin: Vec3::new(80.0, 120.0, 80.0),
            direction: Vec3::Y,
        };
        assert!(cast_ray(&world, &ray, 100.0, 0.05).is_none());
    }

    #[test]
    fn origin_inside_solid_reports_zero_normal() {
        let world = flat_world(1);
        let ray = Ray {
            origin: Vec3::new(55.0, 25.0, 55.0),
            direction: Vec3::X,
        };
        let hit = cast_ray(&world, &ray, 10.0, 0.05).expect("inside stone");
        assert_eq!(hit.voxel, IVec3::new(5, 2, 5));
        assert_eq!(hit.normal, IVec3::ZERO);
        assert_eq!(hit.face(), None);
    }

    #[test]
    fn degenerate_rays_are_rejected() {
        let world = flat_world(1);
        let zero = Ray {
            origin: Vec3::new(80.0, 90.0, 80.0),
            direction: Vec3::ZERO,
        };
        assert!(cast_ray(&world, &zero, 100.0, 0.05).is_none());

        let down = Ray {
            direction: Vec3::NEG_Y,
            ..zero
        };
        assert!(cast_ray(&world, &down, 100.0, 0.0).is_none());
        assert!(cast_ray(&world, &down, -1.0, 0.05).is_none());
        assert!(cast_ray(&world, &down, f32::INFINITY, 0.05).is_none());
        assert!(cast_ray(&world, &down, f32::NAN, 0.05).is_none());
        assert!(cast_ray(&world, &down, 100.0, f32::INFINITY).is_none());
    }

    #[test]
    fn march_ends_cleanly_at_the_index_cap() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        };
        let mut march = RayMarch::new(&ray, f32::MAX, 0.05).expect("finite distance");
        assert_eq!(march.last_index, u32::MAX);

        march.index = u32::MAX - 1;
        assert!(march.next().is_some());
        assert!(march.next().is_some());
        assert!(march.next().is_none());
        assert!(march.next().is_none());
    }

    #[test]
    fn march_samples_are_evenly_spaced() {
        let ray = Ray {
            origin: Vec3::new(0.5, 0.5, 0.5),
            direction: Vec3::X * 4.0,
        };
        let samples: Vec<IVec3> = RayMarch::new(&ray, 30.0, 5.0).expect("valid").collect();
        // t = 0, 5, ..., 30 -> x = 0.5 .. 30.5
        assert_eq!(samples.len(), 7);
        assert_eq!(samples[0], IVec3::ZERO);
        assert_eq!(samples[2], IVec3::new(1, 0, 0));
        assert_eq!(samples[6], IVec3::new(3, 0, 0));
    }

    #[test]
    fn cursor_at_centre_aims_forward() {
        let basis = CameraBasis {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
        };
        let viewport = Vec2::new(800.0, 600.0);

        let centre = aim_direction(&basis, viewport * 0.5, viewport, 0.5);
        assert!((centre - Vec3::NEG_Z).length() < 1e-6);

        // Top-left corner bends left and up.
        let corner = aim_direction(&basis, Vec2::ZERO, viewport, 0.5);
        let expected = Vec3::new(-0.5, 0.5, -1.0).normalize();
        assert!((corner - expected).length() < 1e-6);

        let fallback = aim_direction(&basis, Vec2::ZERO, Vec2::ZERO, 0.5);
        assert_eq!(fallback, Vec3::NEG_Z);
    }
}
