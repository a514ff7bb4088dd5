//! Stages motion-planning inference jobs for the scheduler
//!
//! A job is a directory under the queue root holding a manifest, a copy of the
//! scene file and the scene's canonical voxel grid:
//!
//! ```text
//! queue/
//!     livingroom-2025-01-22-14-24-05/
//!         job_description.json
//!         livingroom.obj
//!         livingroom_voxelized.npy
//! ```
//!
//! [`JobStagingManager`] validates an [`InferenceRequest`], voxelizes the scene
//! with [`lingo_voxel`] and publishes the directory in one rename.
//!
//! # Example
//!
//! ```no_run
//! use lingo_queue::{InferenceRequest, JobStagingManager, StagingConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = StagingConfig::load(None)?;
//!     let manager = JobStagingManager::from_config(&config);
//!
//!     let mut request = InferenceRequest::for_scene("scenes/livingroom.obj");
//!     request.push_segment(vec![0.0, 0.0, 0.0], vec![2.0, 0.0, 3.5], "walk to the sofa");
//!
//!     let job = manager.stage(&mut request, &config.queue_dir, false)?;
//!     println!("staged {}", job.layout.dir().display());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod layout;
pub mod manifest;
pub mod request;
pub mod stage;
pub mod types;
pub mod validate;

pub use config::StagingConfig;
pub use layout::JobLayout;
pub use manifest::JobDescriptor;
pub use request::{InferenceRequest, Location, Submission};
pub use stage::{JobStagingManager, SceneVoxelizer, StagedJob, VoxelPipeline};
pub use types::{RequestError, Result, StageError, ValidationError, Violation};
pub use validate::RequestValidator;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::StagingConfig;
    pub use crate::request::InferenceRequest;
    pub use crate::stage::{JobStagingManager, SceneVoxelizer};
    pub use crate::types::{Result, StageError};
}
