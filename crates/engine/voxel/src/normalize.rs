//! Fit an arbitrarily scaled and positioned mesh into the canonical voxel volume
//!
//! ## Placement
//!
//! 1. Extent `e = max - min` of the mesh bounds
//! 2. Isotropic scale `s = min(target / e) * margin`, so every axis fits at once
//!    and the aspect ratio is preserved
//! 3. Translate so the scaled minimum bound sits at the origin
//! 4. Lift by a small vertical offset so a floor plane does not alias onto the
//!    ground layer
//! 5. Center inside the target volume: `target / 2 - s * e / 2`
//!
//! The positioned mesh is then sampled at pitch 1 and the result cropped to the
//! occupied cells, so the surface grid is never larger than the target shape.

use crate::grid::{GridShape, VoxelGrid};
use crate::mesh::TriMesh;
use crate::npy;
use crate::sample::sample_surface;
use crate::types::{Result, VoxelError};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shrink factor applied on top of the fitting scale
pub const DEFAULT_SCALE_MARGIN: f64 = 0.995;

/// Vertical lift applied after moving the mesh to the origin
pub const DEFAULT_FLOOR_OFFSET: f64 = 0.2;

/// Configuration for mesh normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Canonical target grid shape
    pub shape: GridShape,
    /// Multiplier on the fitting scale keeping surface voxels off the grid edge
    pub scale_margin: f64,
    /// Lift along axis 1 (up) in grid units
    pub floor_offset: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            shape: GridShape::CANONICAL,
            scale_margin: DEFAULT_SCALE_MARGIN,
            floor_offset: DEFAULT_FLOOR_OFFSET,
        }
    }
}

impl NormalizeConfig {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn with_scale_margin(mut self, margin: f64) -> Self {
        self.scale_margin = margin;
        self
    }

    pub fn with_floor_offset(mut self, offset: f64) -> Self {
        self.floor_offset = offset;
        self
    }

    /// Check the placed mesh always stays inside the target frame
    ///
    /// Along axis 1 the scaled mesh spans at most `scale_margin * height`
    /// centered in the frame, so the lift must fit in the slack left by the
    /// margin: `|floor_offset| <= (1 - scale_margin) * height / 2`.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale_margin > 0.0 && self.scale_margin <= 1.0) {
            return Err(VoxelError::InvalidConfig(format!(
                "scale_margin must be in (0, 1], got {}",
                self.scale_margin
            )));
        }
        if !self.floor_offset.is_finite() {
            return Err(VoxelError::InvalidConfig(
                "floor_offset must be finite".to_string(),
            ));
        }

        let slack = (1.0 - self.scale_margin) * self.shape.height() as f64 / 2.0;
        if self.floor_offset.abs() > slack {
            return Err(VoxelError::InvalidConfig(format!(
                "floor_offset {} can push a {} grid out of frame with scale_margin {} \
                 (at most {slack:.4} allowed)",
                self.floor_offset, self.shape, self.scale_margin
            )));
        }
        Ok(())
    }
}

/// Similarity transform mapping scene units onto grid units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Isotropic scale factor, margin included
    pub scale: f64,
    /// Translation applied after scaling
    pub translation: DVec3,
    /// Unscaled mesh extent
    pub extent: DVec3,
}

impl Placement {
    /// Compute the placement of a mesh with the given bounds
    pub fn fit(min: DVec3, max: DVec3, config: &NormalizeConfig) -> Result<Self> {
        let extent = max - min;
        let target = target_vec(config.shape);

        for axis in 0..3 {
            if extent[axis] <= 0.0 || !extent[axis].is_finite() {
                return Err(VoxelError::DegenerateExtent {
                    axis,
                    extent: extent[axis],
                });
            }
        }

        let scale = (target / extent).min_element() * config.scale_margin;
        let scaled_extent = extent * scale;
        let translation = -min * scale
            + DVec3::new(0.0, config.floor_offset, 0.0)
            + (target / 2.0 - scaled_extent / 2.0);

        Ok(Self {
            scale,
            translation,
            extent,
        })
    }

    /// Extent of the mesh after scaling
    pub fn scaled_extent(&self) -> DVec3 {
        self.extent * self.scale
    }

    pub fn apply(&self, point: DVec3) -> DVec3 {
        point * self.scale + self.translation
    }
}

fn target_vec(shape: GridShape) -> DVec3 {
    let [w, h, d] = shape.dims();
    DVec3::new(w as f64, h as f64, d as f64)
}

/// Maps scenes onto the canonical voxel volume and samples their surface
#[derive(Debug, Clone, Default)]
pub struct MeshNormalizer {
    config: NormalizeConfig,
}

impl MeshNormalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Compute the placement of a mesh without modifying it
    pub fn placement(&self, mesh: &TriMesh) -> Result<Placement> {
        let (min, max) = mesh.bounds().ok_or(VoxelError::DegenerateExtent {
            axis: 0,
            extent: 0.0,
        })?;
        Placement::fit(min, max, &self.config)
    }

    /// Scale and translate a mesh into grid units
    pub fn normalize(&self, mut mesh: TriMesh) -> Result<(TriMesh, Placement)> {
        let placement = self.placement(&mesh)?;
        let (min, _) = mesh.bounds().unwrap_or_default();

        mesh.apply_scale(placement.scale);
        mesh.apply_translation(-min * placement.scale);
        mesh.apply_translation(DVec3::new(0.0, self.config.floor_offset, 0.0));
        mesh.apply_translation(
            target_vec(self.config.shape) / 2.0 - placement.scaled_extent() / 2.0,
        );

        Ok((mesh, placement))
    }

    /// Surface occupancy grid of an in-memory mesh, cropped to occupied cells
    pub fn voxelize_mesh(&self, mesh: TriMesh) -> Result<VoxelGrid> {
        let (mesh, placement) = self.normalize(mesh)?;
        tracing::debug!(
            "Placement: scale {:.6}, translation {:?}, scaled extent {:?}",
            placement.scale,
            placement.translation,
            placement.scaled_extent()
        );

        let frame = sample_surface(&mesh, self.config.shape);
        frame.crop_to_occupied().ok_or_else(|| VoxelError::Load {
            path: Default::default(),
            reason: "mesh produced no surface voxels".to_string(),
        })
    }

    /// Load a scene file and sample its surface
    pub fn voxelize(&self, scene: impl AsRef<Path>) -> Result<VoxelGrid> {
        let scene = scene.as_ref();
        let mesh = TriMesh::load_obj(scene)?;
        let grid = self.voxelize_mesh(mesh).map_err(|err| match err {
            VoxelError::Load { reason, .. } => VoxelError::Load {
                path: scene.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        tracing::info!(
            "Voxelized {}: {} grid, {} occupied",
            scene.display(),
            grid.shape(),
            grid.occupied_count()
        );
        Ok(grid)
    }

    /// Load, sample and persist the surface grid to `output`, replacing any file there
    pub fn voxelize_to(&self, scene: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<VoxelGrid> {
        let grid = self.voxelize(scene)?;
        let output = output.as_ref();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        npy::write_npy(output, &grid)?;
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(w: usize, h: usize, d: usize) -> NormalizeConfig {
        NormalizeConfig::new(GridShape::new(w, h, d).unwrap())
    }

    #[test]
    fn test_config_default() {
        let config = NormalizeConfig::default();
        assert_eq!(config.shape, GridShape::CANONICAL);
        assert_eq!(config.scale_margin, 0.995);
        assert_eq!(config.floor_offset, 0.2);
    }

    #[test]
    fn test_validate_accepts_canonical_defaults() {
        assert!(NormalizeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_lift_beyond_margin() {
        let tight = NormalizeConfig::default().with_scale_margin(1.0);
        let err = tight.validate().unwrap_err();
        assert!(matches!(err, VoxelError::InvalidConfig(_)));

        // Short frames leave less slack: 0.005 * 10 / 2 < 0.2
        assert!(config(40, 10, 60).validate().is_err());
        assert!(config(40, 10, 60).with_floor_offset(0.02).validate().is_ok());
        assert!(config(40, 10, 60).with_floor_offset(-0.3).validate().is_err());
    }

    #[test]
    fn test_validated_config_keeps_mesh_in_frame() {
        let config = config(40, 100, 60).with_scale_margin(0.99).with_floor_offset(0.5);
        config.validate().unwrap();
        let normalizer = MeshNormalizer::new(config);

        // Height is the tight axis
        let mesh = TriMesh::cuboid(DVec3::ZERO, DVec3::new(1.0, 10.0, 1.0));
        let (mesh, _) = normalizer.normalize(mesh).unwrap();
        let (min, max) = mesh.bounds().unwrap();
        assert!(min.y >= 0.0);
        assert!(max.y <= 100.0 + 1e-9);
    }

    #[test]
    fn test_scale_uses_tightest_axis() {
        let config = config(400, 100, 600);
        let placement =
            Placement::fit(DVec3::ZERO, DVec3::new(10.0, 10.0, 10.0), &config).unwrap();
        // Height is the limiting axis: 100 / 10
        assert!((placement.scale - 10.0 * 0.995).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_extent_fits_target() {
        let config = config(400, 100, 600);
        let extents = [
            DVec3::new(1.0, 1.0, 1.0),
            DVec3::new(0.01, 5.0, 3.0),
            DVec3::new(1000.0, 0.5, 7.0),
            DVec3::new(4.0, 1.0, 6.0),
            DVec3::new(123.4, 56.7, 890.1),
        ];
        let target = DVec3::new(400.0, 100.0, 600.0);

        for extent in extents {
            let min = DVec3::new(-3.0, 7.0, 11.0);
            let placement = Placement::fit(min, min + extent, &config).unwrap();
            let scaled = placement.scaled_extent();
            assert!(scaled.cmple(target).all(), "{scaled:?} overflows {target:?}");
        }
    }

    #[test]
    fn test_zero_extent_is_degenerate() {
        let config = config(40, 10, 60);
        let err = Placement::fit(DVec3::ZERO, DVec3::new(1.0, 0.0, 1.0), &config).unwrap_err();
        assert!(matches!(err, VoxelError::DegenerateExtent { axis: 1, .. }));
    }

    #[test]
    fn test_normalize_centers_mesh() {
        let normalizer = MeshNormalizer::new(config(40, 10, 60).with_floor_offset(0.0));
        let mesh = TriMesh::cuboid(DVec3::new(-5.0, 2.0, 100.0), DVec3::new(5.0, 4.0, 110.0));
        let (mesh, placement) = normalizer.normalize(mesh).unwrap();

        // Width limits: scale = 40 / 10 * 0.995
        assert!((placement.scale - 3.98).abs() < 1e-12);
        let (min, max) = mesh.bounds().unwrap();
        let center = (min + max) / 2.0;
        assert!((center - DVec3::new(20.0, 5.0, 30.0)).length() < 1e-9);
    }

    #[test]
    fn test_normalize_applies_floor_offset() {
        let normalizer = MeshNormalizer::new(config(40, 10, 60));
        let mesh = TriMesh::cuboid(DVec3::ZERO, DVec3::ONE);
        let (mesh, placement) = normalizer.normalize(mesh).unwrap();

        let (min, _) = mesh.bounds().unwrap();
        let expected_y = 5.0 - placement.scaled_extent().y / 2.0 + 0.2;
        assert!((min.y - expected_y).abs() < 1e-9);
        assert!((placement.apply(DVec3::ZERO) - min).length() < 1e-9);
    }

    #[test]
    fn test_voxelize_mesh_fits_target() {
        let normalizer = MeshNormalizer::new(config(20, 8, 30));
        let mesh = TriMesh::cuboid(DVec3::ZERO, DVec3::new(3.0, 1.0, 2.0));
        let grid = normalizer.voxelize_mesh(mesh).unwrap();

        assert!(grid.shape().fits_within(&GridShape::new(20, 8, 30).unwrap()));
        assert!(!grid.is_empty());
        // Cropped: every boundary face of the grid has an occupied cell
        let (min, max) = grid.occupied_bounds().unwrap();
        assert_eq!(min, [0, 0, 0]);
        let [w, h, d] = grid.shape().dims();
        assert_eq!(max, [w - 1, h - 1, d - 1]);
    }
}
