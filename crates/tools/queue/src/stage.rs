//! Job staging: validate, voxelize and publish a job directory
//!
//! Artifacts are written into a hidden directory inside the output root and
//! published with a single rename, so a job directory is either absent or
//! complete when the scheduler looks at it. When overwriting, the previous
//! directory is moved aside before the rename and removed afterwards.
//!
//! Hidden entries in the queue root belong to the stager and are never jobs:
//! `.staging.*` directories are in-flight writes (swept once stale, after an
//! interrupted run) and `.retired.*` directories hold a replaced job that could
//! not be restored. Retired directories are never removed automatically.

use crate::config::StagingConfig;
use crate::layout::JobLayout;
use crate::manifest::JobDescriptor;
use crate::request::{scene_name_for, InferenceRequest};
use crate::types::{Result, StageError};
use crate::validate::RequestValidator;
use lingo_voxel::npy;
use lingo_voxel::{GridShape, MeshNormalizer, NormalizeConfig, VoxelGrid, VoxelPostProcessor};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Prefix of the hidden directories a job is written into before publishing
pub const STAGING_PREFIX: &str = ".staging.";

/// Prefix of the directories holding a job while it is being replaced
pub const RETIRED_PREFIX: &str = ".retired.";

/// Age after which a staging directory is treated as left over by a dead run
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Produces the canonical voxel grid of a scene file
pub trait SceneVoxelizer {
    fn voxelize(&self, scene: &Path) -> lingo_voxel::Result<VoxelGrid>;
}

impl<F> SceneVoxelizer for F
where
    F: Fn(&Path) -> lingo_voxel::Result<VoxelGrid>,
{
    fn voxelize(&self, scene: &Path) -> lingo_voxel::Result<VoxelGrid> {
        self(scene)
    }
}

/// Normalize, sample, fill and pad
#[derive(Debug, Clone)]
pub struct VoxelPipeline {
    normalizer: MeshNormalizer,
    post: VoxelPostProcessor,
    cache_dir: Option<PathBuf>,
}

impl Default for VoxelPipeline {
    fn default() -> Self {
        Self::new(NormalizeConfig::default())
    }
}

impl VoxelPipeline {
    pub fn new(config: NormalizeConfig) -> Self {
        Self {
            normalizer: MeshNormalizer::new(config),
            post: VoxelPostProcessor::new(config.shape),
            cache_dir: None,
        }
    }

    pub fn with_fill_interior(mut self, fill: bool) -> Self {
        self.post = self.post.with_fill_interior(fill);
        self
    }

    /// Also persist each surface grid to `{dir}/{scene_name}.npy`
    pub fn with_cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cache_dir = dir;
        self
    }

    pub fn shape(&self) -> GridShape {
        self.post.target()
    }
}

impl SceneVoxelizer for VoxelPipeline {
    fn voxelize(&self, scene: &Path) -> lingo_voxel::Result<VoxelGrid> {
        let surface = match &self.cache_dir {
            Some(dir) => {
                let cached = dir.join(format!("{}.npy", scene_name_for(scene)));
                self.normalizer.voxelize_to(scene, cached)?
            }
            None => self.normalizer.voxelize(scene)?,
        };
        self.post.apply(&surface)
    }
}

/// Outcome of a successful [`JobStagingManager::stage`] call
#[derive(Debug, Clone)]
pub struct StagedJob {
    pub layout: JobLayout,
    pub descriptor: JobDescriptor,
    pub grid_shape: GridShape,
    pub occupied: usize,
}

/// Sole writer of the job queue directory
#[derive(Debug, Clone)]
pub struct JobStagingManager<V = VoxelPipeline> {
    validator: RequestValidator,
    voxelizer: V,
    stale_after: Duration,
}

impl<V: SceneVoxelizer + Default> Default for JobStagingManager<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl JobStagingManager<VoxelPipeline> {
    pub fn from_config(config: &StagingConfig) -> Self {
        let pipeline = VoxelPipeline::new(config.grid)
            .with_fill_interior(config.fill_interior)
            .with_cache_dir(config.cache_dir.clone());
        Self::new(pipeline)
    }
}

impl<V: SceneVoxelizer> JobStagingManager<V> {
    pub fn new(voxelizer: V) -> Self {
        Self {
            validator: RequestValidator::new(),
            voxelizer,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Age at which leftover staging directories are removed
    pub fn with_stale_after(mut self, age: Duration) -> Self {
        self.stale_after = age;
        self
    }

    pub fn voxelizer(&self) -> &V {
        &self.voxelizer
    }

    /// Stage `request` as a job directory under `output_root`
    ///
    /// An invalid request fails before anything is written. The request is
    /// marked submitted unless it already carries a submission time, which is
    /// then reused for the directory name.
    pub fn stage(
        &self,
        request: &mut InferenceRequest,
        output_root: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<StagedJob> {
        let output_root = output_root.as_ref();

        if let Err(err) = self.validator.validate(request) {
            tracing::warn!("{err}");
            return Err(err.into());
        }

        let submitted_time = match request.submitted_time() {
            Some(time) => time,
            None => request.mark_submitted(),
        };
        let layout = JobLayout::for_request(request, output_root, &submitted_time);

        if !overwrite {
            let existing = layout.existing();
            if !existing.is_empty() {
                tracing::warn!(
                    "Job {} already exists ({} paths present), not overwriting",
                    layout.dir().display(),
                    existing.len()
                );
                return Err(StageError::Conflict { existing });
            }
        }

        fs::create_dir_all(output_root)?;
        self.sweep_stale(output_root)?;

        let dir_name = layout
            .dir()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = tempfile::Builder::new()
            .prefix(&format!("{STAGING_PREFIX}{dir_name}."))
            .tempdir_in(output_root)?;
        let staged = layout.relocated(staging.path());
        tracing::debug!("Staging into {}", staging.path().display());

        let descriptor = JobDescriptor::new(request, submitted_time);
        descriptor.write(staged.manifest_path())?;
        fs::copy(request.scene_path(), staged.scene_path())?;

        let grid = self.voxelizer.voxelize(&staged.scene_path())?;
        npy::write_npy(staged.grid_path(), &grid)?;
        staged.verify()?;

        publish(staging, layout.dir())?;

        if let Err(err) = layout.verify() {
            tracing::error!("Published job {} is incomplete: {err}", layout.dir().display());
            return Err(err);
        }

        tracing::info!(
            "Staged job {} ({} segments, {} grid, {} occupied)",
            layout.dir().display(),
            descriptor.segment_count(),
            grid.shape(),
            grid.occupied_count()
        );

        Ok(StagedJob {
            layout,
            descriptor,
            grid_shape: grid.shape(),
            occupied: grid.occupied_count(),
        })
    }

    /// Remove staging directories left behind by an interrupted run
    fn sweep_stale(&self, output_root: &Path) -> Result<()> {
        for entry in fs::read_dir(output_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();

            if name.starts_with(RETIRED_PREFIX) {
                tracing::warn!(
                    "Retired job {} was never restored, leaving it for manual recovery",
                    entry.path().display()
                );
                continue;
            }
            if !name.starts_with(STAGING_PREFIX) {
                continue;
            }

            let age = entry.metadata()?.modified()?.elapsed().unwrap_or_default();
            if age < self.stale_after {
                continue;
            }
            tracing::info!("Removing stale staging directory {}", entry.path().display());
            if let Err(err) = fs::remove_dir_all(entry.path()) {
                tracing::warn!("Could not remove {}: {err}", entry.path().display());
            }
        }
        Ok(())
    }
}

/// Rename the staging directory onto the job directory
fn publish(staging: TempDir, target: &Path) -> Result<()> {
    publish_with(staging, target, |from: &Path, to: &Path| fs::rename(from, to))
}

fn publish_with(
    staging: TempDir,
    target: &Path,
    rename: impl Fn(&Path, &Path) -> io::Result<()>,
) -> Result<()> {
    let root = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let retired = if target.exists() {
        let holder = tempfile::Builder::new()
            .prefix(RETIRED_PREFIX)
            .tempdir_in(root)?;
        let old = holder.path().join("job");
        rename(target, &old)?;
        tracing::info!("Replacing existing job {}", target.display());
        Some((holder, old))
    } else {
        None
    };

    if let Err(err) = rename(staging.path(), target) {
        if let Some((holder, old)) = retired {
            if let Err(restore) = rename(&old, target) {
                // The retired copy is now the only complete job; never drop it
                let kept = holder.keep().join("job");
                tracing::error!(
                    "Could not restore previous job {} ({restore}), kept at {}",
                    target.display(),
                    kept.display()
                );
                return Err(StageError::Stranded { kept, source: err });
            }
            tracing::warn!("Publishing {} failed, previous job restored", target.display());
        }
        return Err(err.into());
    }

    // The staging path is gone after the rename; dropping the handles removes
    // the retired job and ignores the vanished staging path.
    drop(staging);
    drop(retired);
    Ok(())
}
