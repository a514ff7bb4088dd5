//! Error types for voxelization

use std::path::PathBuf;
use thiserror::Error;

/// Voxelization error types
#[derive(Debug, Error)]
pub enum VoxelError {
    #[error("failed to load mesh from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("mesh extent on axis {axis} is {extent}; scale factor is undefined")]
    DegenerateExtent { axis: usize, extent: f64 },

    #[error("grid shape {shape} exceeds target shape {target}")]
    ShapeExceedsTarget { shape: String, target: String },

    #[error("invalid grid shape: {0}")]
    InvalidShape(String),

    #[error("invalid normalization config: {0}")]
    InvalidConfig(String),

    #[error("malformed npy array: {0}")]
    Npy(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for voxelization operations that may fail
pub type Result<T> = std::result::Result<T, VoxelError>;
