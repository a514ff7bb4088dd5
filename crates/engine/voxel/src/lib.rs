//! Mesh-to-occupancy-grid voxelization for the Lingo inference queue
//!
//! Turns a scene file into the fixed-size boolean grid the motion-planning
//! scheduler consumes:
//!
//! ```text
//! scene.obj
//!     ↓ TriMesh::load_obj
//! TriMesh (scene units)
//!     ↓ MeshNormalizer: isotropic scale, floor lift, center in target volume
//! TriMesh (grid units)
//!     ↓ sample_surface: triangle/cell overlap at pitch 1, cropped
//! VoxelGrid (surface shell, ≤ target shape)
//!     ↓ VoxelPostProcessor: fill_interior, pad_to_shape
//! VoxelGrid (exactly the target shape)
//!     ↓ npy::write_npy
//! scene_voxelized.npy
//! ```
//!
//! # Example
//!
//! ```no_run
//! use lingo_voxel::{GridShape, MeshNormalizer, NormalizeConfig, VoxelPostProcessor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let shape = GridShape::CANONICAL;
//!     let normalizer = MeshNormalizer::new(NormalizeConfig::new(shape));
//!
//!     let surface = normalizer.voxelize("livingroom.obj")?;
//!     let grid = VoxelPostProcessor::new(shape).apply(&surface)?;
//!     lingo_voxel::npy::write_npy("livingroom_voxelized.npy", &grid)?;
//!
//!     Ok(())
//! }
//! ```

pub mod grid;
pub mod mesh;
pub mod normalize;
pub mod npy;
pub mod postprocess;
pub mod sample;
pub mod types;

pub use grid::{GridShape, VoxelGrid};
pub use mesh::TriMesh;
pub use normalize::{MeshNormalizer, NormalizeConfig, Placement};
pub use postprocess::{fill_interior, pad_to_shape, padding_offset, VoxelPostProcessor};
pub use types::{Result, VoxelError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::grid::{GridShape, VoxelGrid};
    pub use crate::mesh::TriMesh;
    pub use crate::normalize::{MeshNormalizer, NormalizeConfig};
    pub use crate::postprocess::VoxelPostProcessor;
    pub use crate::types::{Result, VoxelError};
}
