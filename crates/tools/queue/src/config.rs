//! Staging configuration
//!
//! Defaults, then an optional `lingo.toml`, then `LINGO_*` environment
//! variables.

use anyhow::Context;
use lingo_voxel::{GridShape, NormalizeConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "lingo.toml";

/// Configuration for the staging tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Root of the job queue polled by the scheduler
    pub queue_dir: PathBuf,
    /// Scratch directory for intermediate surface grids
    pub cache_dir: Option<PathBuf>,
    /// Fill enclosed interiors before padding
    pub fill_interior: bool,
    /// Canonical grid and normalization parameters
    pub grid: NormalizeConfig,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            queue_dir: PathBuf::from("queue"),
            cache_dir: None,
            fill_interior: true,
            grid: NormalizeConfig::default(),
        }
    }
}

impl StagingConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("invalid staging config")?;
        config.check()?;
        Ok(config)
    }

    /// Load `path`, or `lingo.toml` if present, then apply environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::read(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Apply `LINGO_QUEUE_DIR`, `LINGO_CACHE_DIR` and `LINGO_GRID_SHAPE`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(dir) = lookup("LINGO_QUEUE_DIR") {
            self.queue_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LINGO_CACHE_DIR") {
            self.cache_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(shape) = lookup("LINGO_GRID_SHAPE") {
            self.grid.shape = shape
                .parse::<GridShape>()
                .with_context(|| format!("LINGO_GRID_SHAPE={shape}"))?;
        }
        self.check()
    }

    fn check(&self) -> anyhow::Result<()> {
        self.grid.validate().context("invalid [grid] section")?;
        Ok(())
    }
}
