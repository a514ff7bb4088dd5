//! lingo-queue - stage inference jobs and voxelize scenes from the command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use lingo_queue::{InferenceRequest, JobLayout, JobStagingManager, StagingConfig};
use lingo_voxel::{npy, MeshNormalizer, VoxelPostProcessor};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Inference job staging tool
#[derive(Parser)]
#[command(name = "lingo-queue")]
#[command(about = "Stage motion-planning jobs into the scheduler queue", long_about = None)]
struct Cli {
    /// Config file (defaults to ./lingo.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a request and stage it as a job directory
    Stage {
        /// Request document (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Queue root (overrides queue_dir from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing job directory
        #[arg(long)]
        overwrite: bool,
    },

    /// Voxelize a scene into an .npy file without staging a job
    Voxelize {
        /// Scene file (OBJ)
        scene: PathBuf,

        /// Output .npy path
        #[arg(short, long, default_value = "cache/default.npy")]
        output: PathBuf,

        /// Fill and pad to the canonical shape instead of writing the surface grid
        #[arg(long)]
        canonical: bool,
    },

    /// Print shape and occupancy of an .npy voxel grid
    Inspect {
        /// Grid file
        file: PathBuf,
    },

    /// Check that a staged job directory is complete
    Verify {
        /// Job directory
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = StagingConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Stage {
            request,
            output,
            overwrite,
        } => stage(&config, request, output, overwrite),
        Commands::Voxelize {
            scene,
            output,
            canonical,
        } => voxelize(&config, scene, output, canonical),
        Commands::Inspect { file } => {
            let grid = npy::read_npy(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            println!("{}", file.display());
            println!("  shape:    {}", grid.shape());
            println!(
                "  occupied: {} / {} ({:.3}%)",
                grid.occupied_count(),
                grid.shape().volume(),
                100.0 * grid.occupied_count() as f64 / grid.shape().volume() as f64
            );
            if let Some((min, max)) = grid.occupied_bounds() {
                println!("  bounds:   {min:?} .. {max:?}");
            }
            Ok(())
        }
        Commands::Verify { dir } => {
            let layout = JobLayout::open(&dir)?;
            layout.verify()?;
            for path in layout.artifacts() {
                println!("ok  {}", path.display());
            }
            for path in layout.unexpected()? {
                tracing::warn!("Unexpected entry {}", path.display());
            }
            Ok(())
        }
    }
}

fn stage(
    config: &StagingConfig,
    request_path: PathBuf,
    output: Option<PathBuf>,
    overwrite: bool,
) -> anyhow::Result<()> {
    let mut request = InferenceRequest::load(&request_path)
        .with_context(|| format!("failed to load request {}", request_path.display()))?;
    let was_submitted = request.is_submitted();
    let output_root = output.unwrap_or_else(|| config.queue_dir.clone());

    let manager = JobStagingManager::from_config(config);
    let result = manager.stage(&mut request, &output_root, overwrite);

    // Keep the assigned submission time so a retry targets the same job directory
    if !was_submitted && request.is_submitted() {
        request
            .save(&request_path)
            .with_context(|| format!("failed to update request {}", request_path.display()))?;
    }

    let job = result?;
    println!("{}", job.layout.dir().display());
    Ok(())
}

fn voxelize(
    config: &StagingConfig,
    scene: PathBuf,
    output: PathBuf,
    canonical: bool,
) -> anyhow::Result<()> {
    let normalizer = MeshNormalizer::new(config.grid);

    let grid = if canonical {
        let surface = normalizer.voxelize(&scene)?;
        let grid = VoxelPostProcessor::new(config.grid.shape)
            .with_fill_interior(config.fill_interior)
            .apply(&surface)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        npy::write_npy(&output, &grid)?;
        grid
    } else {
        normalizer.voxelize_to(&scene, &output)?
    };

    println!(
        "{} -> {} ({}, {} occupied)",
        scene.display(),
        output.display(),
        grid.shape(),
        grid.occupied_count()
    );
    Ok(())
}
