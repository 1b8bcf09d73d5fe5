//! Voxel storage, meshing and edit logic for the brickyard world.
//!
//! Nothing in this crate touches the GPU or the window; the client crate feeds
//! camera and input state in and reads chunk meshes out.

pub mod block;
pub mod chunk;
pub mod config;
pub mod coords;
pub mod edit;
pub mod mesh;
pub mod raycast;
pub mod world;
