//! Error types for request handling and job staging

use lingo_voxel::VoxelError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single problem found in an inference request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The three per-segment sequences differ in length
    LengthMismatch {
        start_locations: usize,
        end_locations: usize,
        actions: usize,
    },
    /// Names of the sequences that are empty
    Missing(Vec<&'static str>),
    SceneNotFound(PathBuf),
    SceneNotAFile(PathBuf),
    SceneNameMismatch { expected: String, found: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LengthMismatch {
                start_locations,
                end_locations,
                actions,
            } => write!(
                f,
                "start_locations, end_locations and actions must have equal length \
                 (got {start_locations}, {end_locations}, {actions})"
            ),
            Violation::Missing(names) => write!(f, "missing {}", names.join(", ")),
            Violation::SceneNotFound(path) => {
                write!(f, "scene file {} does not exist", path.display())
            }
            Violation::SceneNotAFile(path) => {
                write!(f, "scene path {} is not a regular file", path.display())
            }
            Violation::SceneNameMismatch { expected, found } => write!(
                f,
                "scene name '{found}' does not match scene file name '{expected}'"
            ),
        }
    }
}

/// Every violation found in a request, in the order they were checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid inference request: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Errors reading or writing a request document
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is marked submitted but has no submitted_time")]
    SubmittedWithoutTime,

    #[error("request has a submitted_time but is not marked submitted")]
    TimeWithoutSubmitted,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors emitted while staging a job
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("job already staged, refusing to overwrite: {}", join_paths(.existing))]
    Conflict { existing: Vec<PathBuf> },

    #[error("voxelization failed: {0}")]
    Voxel(#[from] VoxelError),

    #[error("job directory is incomplete, missing: {}", join_paths(.missing))]
    Integrity { missing: Vec<PathBuf> },

    #[error(
        "publishing failed ({source}) and the previous job could not be restored, it is kept at {}",
        .kept.display()
    )]
    Stranded {
        kept: PathBuf,
        source: std::io::Error,
    },

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for staging operations that may fail
pub type Result<T> = std::result::Result<T, StageError>;
