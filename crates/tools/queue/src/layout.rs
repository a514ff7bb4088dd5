//! Job directory naming and artifact paths
//!
//! ```text
//! {output_root}/{scene_name}-{%Y-%m-%d-%H-%M-%S}/
//!     job_description.json
//!     {scene_name}.obj
//!     {scene_name}_voxelized.npy
//! ```

use crate::manifest::JobDescriptor;
use crate::request::InferenceRequest;
use crate::types::{Result, StageError};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest file name inside every job directory
pub const MANIFEST_FILE: &str = "job_description.json";

/// Appended to the scene name to form the voxel grid file name
pub const VOXEL_SUFFIX: &str = "_voxelized.npy";

/// Timestamp format used in job directory names
pub const DIR_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Directory name of the job for `scene_name` submitted at `time`
pub fn job_dir_name(scene_name: &str, time: &DateTime<Local>) -> String {
    format!("{}-{}", scene_name, time.format(DIR_TIME_FORMAT))
}

/// Paths of one job directory and its three artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    dir: PathBuf,
    scene_name: String,
    scene_file: String,
}

impl JobLayout {
    /// `scene_extension` is the extension of the original scene file, if any
    pub fn new(
        output_root: impl AsRef<Path>,
        scene_name: &str,
        scene_extension: Option<&str>,
        time: &DateTime<Local>,
    ) -> Self {
        let dir = output_root.as_ref().join(job_dir_name(scene_name, time));
        Self::in_dir(dir, scene_name, scene_extension)
    }

    pub fn for_request(
        request: &InferenceRequest,
        output_root: impl AsRef<Path>,
        time: &DateTime<Local>,
    ) -> Self {
        let extension = request
            .scene_path()
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());
        Self::new(output_root, request.scene_name(), extension.as_deref(), time)
    }

    /// Layout for an arbitrary directory, such as a staging area
    pub fn in_dir(dir: impl Into<PathBuf>, scene_name: &str, scene_extension: Option<&str>) -> Self {
        let scene_file = match scene_extension {
            Some(ext) if !ext.is_empty() => format!("{scene_name}.{ext}"),
            _ => scene_name.to_string(),
        };
        Self {
            dir: dir.into(),
            scene_name: scene_name.to_string(),
            scene_file,
        }
    }

    /// Layout of an already staged job, recovered from its manifest
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let manifest = dir.join(MANIFEST_FILE);
        if !manifest.is_file() {
            return Err(StageError::Integrity {
                missing: vec![manifest],
            });
        }
        let descriptor = JobDescriptor::read(&manifest)?;
        let grid_file = format!("{}{}", descriptor.scene_name, VOXEL_SUFFIX);

        // The scene copy keeps the original extension; find it by stem
        let mut extension = None;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            if matches!(name.as_deref(), Some(n) if n == MANIFEST_FILE || n == grid_file) {
                continue;
            }
            if path.file_stem().is_some_and(|s| *s == *descriptor.scene_name) {
                extension = path.extension().map(|e| e.to_string_lossy().into_owned());
                break;
            }
        }

        Ok(Self::in_dir(
            dir,
            &descriptor.scene_name,
            Some(extension.as_deref().unwrap_or("obj")),
        ))
    }

    /// Same artifact names under a different directory
    pub fn relocated(&self, dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..self.clone()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn scene_path(&self) -> PathBuf {
        self.dir.join(&self.scene_file)
    }

    pub fn grid_path(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.scene_name, VOXEL_SUFFIX))
    }

    /// Manifest, scene copy and voxel grid, in write order
    pub fn artifacts(&self) -> [PathBuf; 3] {
        [self.manifest_path(), self.scene_path(), self.grid_path()]
    }

    /// The directory and every artifact that already exists on disk
    pub fn existing(&self) -> Vec<PathBuf> {
        std::iter::once(self.dir.clone())
            .chain(self.artifacts())
            .filter(|path| path.exists())
            .collect()
    }

    /// The directory and every artifact that is absent
    pub fn missing(&self) -> Vec<PathBuf> {
        if !self.dir.is_dir() {
            return std::iter::once(self.dir.clone())
                .chain(self.artifacts())
                .collect();
        }
        self.artifacts()
            .into_iter()
            .filter(|path| !path.is_file())
            .collect()
    }

    /// Entries in the directory that are not one of the three artifacts
    pub fn unexpected(&self) -> Result<Vec<PathBuf>> {
        let artifacts = self.artifacts();
        let mut extra = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !artifacts.contains(&path) {
                extra.push(path);
            }
        }
        extra.sort();
        Ok(extra)
    }

    /// Fail with [`StageError::Integrity`] unless the directory and all artifacts exist
    pub fn verify(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StageError::Integrity { missing })
        }
    }
}
