//! Post-processing of sampled occupancy grids
//!
//! - [`fill_interior`]: mark every cell enclosed by the shell as occupied
//! - [`pad_to_shape`]: embed a grid into the canonical shape
//!
//! Both return new grids; inputs are never modified.

use crate::grid::{GridShape, VoxelGrid};
use crate::types::{Result, VoxelError};
use std::collections::VecDeque;

/// Fill cells that cannot be reached from outside the grid through empty cells
///
/// Uses a 6-connected flood fill seeded from every empty cell on the grid
/// boundary. Whatever the flood does not reach is either shell or enclosed
/// interior. Open cavities stay empty; a shell with gaps is only filled where it
/// actually encloses space.
pub fn fill_interior(grid: &VoxelGrid) -> VoxelGrid {
    let shape = grid.shape();
    let [w, h, d] = shape.dims();
    let cells = grid.cells();

    let mut exterior = vec![false; cells.len()];
    let mut queue = VecDeque::new();

    let mut seed = |x: usize, y: usize, z: usize, exterior: &mut [bool]| {
        let i = shape.index(x, y, z);
        if !cells[i] && !exterior[i] {
            exterior[i] = true;
            queue.push_back([x, y, z]);
        }
    };

    for x in 0..w {
        for y in 0..h {
            seed(x, y, 0, &mut exterior);
            seed(x, y, d - 1, &mut exterior);
        }
    }
    for x in 0..w {
        for z in 0..d {
            seed(x, 0, z, &mut exterior);
            seed(x, h - 1, z, &mut exterior);
        }
    }
    for y in 0..h {
        for z in 0..d {
            seed(0, y, z, &mut exterior);
            seed(w - 1, y, z, &mut exterior);
        }
    }

    while let Some([x, y, z]) = queue.pop_front() {
        let neighbors = [
            (x.wrapping_sub(1), y, z),
            (x + 1, y, z),
            (x, y.wrapping_sub(1), z),
            (x, y + 1, z),
            (x, y, z.wrapping_sub(1)),
            (x, y, z + 1),
        ];
        for (nx, ny, nz) in neighbors {
            if !shape.contains(nx, ny, nz) {
                continue;
            }
            let i = shape.index(nx, ny, nz);
            if !cells[i] && !exterior[i] {
                exterior[i] = true;
                queue.push_back([nx, ny, nz]);
            }
        }
    }

    let mut filled = VoxelGrid::empty(shape);
    for (cell, outside) in filled.cells_mut().iter_mut().zip(&exterior) {
        *cell = !outside;
    }
    filled
}

/// Offset at which a grid of `shape` is embedded into `target`
///
/// Axes 0 and 2 are centered, with an odd unit of padding going to the trailing
/// side. Axis 1 keeps the data at the bottom: all of its padding goes after.
pub fn padding_offset(shape: GridShape, target: GridShape) -> Result<[usize; 3]> {
    if !shape.fits_within(&target) {
        return Err(VoxelError::ShapeExceedsTarget {
            shape: shape.to_string(),
            target: target.to_string(),
        });
    }
    let [w, _, d] = shape.dims();
    let [tw, _, td] = target.dims();
    Ok([(tw - w) / 2, 0, (td - d) / 2])
}

/// Embed `grid` into an empty grid of exactly `target`
///
/// Fails when any axis of the input already exceeds the target; grids are never
/// clipped.
pub fn pad_to_shape(grid: &VoxelGrid, target: GridShape) -> Result<VoxelGrid> {
    let shape = grid.shape();
    let offset = padding_offset(shape, target)?;
    let [w, h, d] = shape.dims();

    let mut padded = VoxelGrid::empty(target);
    let out = padded.cells_mut();
    for x in 0..w {
        for y in 0..h {
            let src = shape.index(x, y, 0);
            let dst = target.index(x + offset[0], y + offset[1], offset[2]);
            out[dst..dst + d].copy_from_slice(&grid.cells()[src..src + d]);
        }
    }
    Ok(padded)
}

/// Composition of the post-processing steps applied to every staged grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelPostProcessor {
    target: GridShape,
    fill_interior: bool,
}

impl VoxelPostProcessor {
    pub fn new(target: GridShape) -> Self {
        Self {
            target,
            fill_interior: true,
        }
    }

    /// Enable or disable interior filling
    pub fn with_fill_interior(mut self, fill: bool) -> Self {
        self.fill_interior = fill;
        self
    }

    pub fn target(&self) -> GridShape {
        self.target
    }

    /// Fill (when enabled) then pad to the target shape
    pub fn apply(&self, grid: &VoxelGrid) -> Result<VoxelGrid> {
        if self.fill_interior {
            let filled = fill_interior(grid);
            tracing::debug!(
                "Interior fill: {} -> {} occupied",
                grid.occupied_count(),
                filled.occupied_count()
            );
            pad_to_shape(&filled, self.target)
        } else {
            pad_to_shape(grid, self.target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(w: usize, h: usize, d: usize) -> GridShape {
        GridShape::new(w, h, d).unwrap()
    }

    /// Hollow box shell of `size` cells per axis
    fn shell(size: usize) -> VoxelGrid {
        VoxelGrid::from_fn(shape(size, size, size), |x, y, z| {
            [x, y, z].iter().any(|&c| c == 0 || c == size - 1)
        })
    }

    #[test]
    fn test_fill_closed_shell() {
        let filled = fill_interior(&shell(5));
        assert_eq!(filled.occupied_count(), 125);
    }

    #[test]
    fn test_fill_is_idempotent() {
        let once = fill_interior(&shell(6));
        let twice = fill_interior(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fill_is_monotonic() {
        // Shell with a hole punched in one face plus a loose voxel
        let mut cells = shell(6).cells().to_vec();
        let s = shape(6, 6, 6);
        cells[s.index(0, 2, 2)] = false;
        cells[s.index(2, 3, 3)] = true;
        let grid = VoxelGrid::from_cells(s, cells).unwrap();

        let filled = fill_interior(&grid);
        for (before, after) in grid.cells().iter().zip(filled.cells()) {
            assert!(!before || *after);
        }
    }

    #[test]
    fn test_fill_leaves_open_cavity() {
        // Open hole in a face lets the exterior flood into the cavity
        let s = shape(5, 5, 5);
        let grid = VoxelGrid::from_fn(s, |x, y, z| {
            let on_shell = [x, y, z].iter().any(|&c| c == 0 || c == 4);
            on_shell && !(x == 0 && y == 2 && z == 2)
        });
        let filled = fill_interior(&grid);
        assert_eq!(filled, grid);
    }

    #[test]
    fn test_fill_concave_shell() {
        // U-shaped solid: the notch is open to the top and must stay empty,
        // the walls enclose two separate chambers that must fill.
        let s = shape(9, 6, 5);
        let notch = |x: usize, y: usize| (3..=5).contains(&x) && y >= 2;
        let grid = VoxelGrid::from_fn(s, |x, y, z| {
            if notch(x, y) {
                return false;
            }
            let boundary = x == 0 || x == 8 || y == 0 || y == 5 || z == 0 || z == 4;
            let notch_wall = ((x == 2 || x == 6) && y >= 1) || (y == 1 && (2..=6).contains(&x));
            boundary || notch_wall
        });
        let filled = fill_interior(&grid);

        assert!(filled.get(1, 3, 2));
        assert!(filled.get(7, 3, 2));
        assert!(!filled.get(4, 3, 2));
    }

    #[test]
    fn test_pad_offset_policy() {
        // Axis 0: 10 - 3 = 7 -> 3 before, 4 after
        // Axis 1: everything after
        // Axis 2: 8 - 4 = 4 -> 2 before, 2 after
        let offset = padding_offset(shape(3, 2, 4), shape(10, 5, 8)).unwrap();
        assert_eq!(offset, [3, 0, 2]);
    }

    #[test]
    fn test_pad_embeds_grid() {
        let source = VoxelGrid::from_fn(shape(3, 2, 4), |x, y, z| (x + y + z) % 2 == 0);
        let target = shape(10, 5, 8);
        let padded = pad_to_shape(&source, target).unwrap();

        assert_eq!(padded.shape(), target);
        let offset = padding_offset(source.shape(), target).unwrap();
        assert_eq!(padded.crop(offset, source.shape()).unwrap(), source);
        assert_eq!(padded.occupied_count(), source.occupied_count());
    }

    #[test]
    fn test_pad_rejects_oversized_axis() {
        let source = VoxelGrid::empty(shape(3, 6, 4));
        let err = pad_to_shape(&source, shape(10, 5, 8)).unwrap_err();
        assert!(matches!(err, VoxelError::ShapeExceedsTarget { .. }));
    }

    #[test]
    fn test_pad_exact_shape_is_identity() {
        let source = shell(4);
        let padded = pad_to_shape(&source, source.shape()).unwrap();
        assert_eq!(padded, source);
    }

    #[test]
    fn test_post_processor_fills_then_pads() {
        let processor = VoxelPostProcessor::new(shape(8, 8, 8));
        let out = processor.apply(&shell(4)).unwrap();
        assert_eq!(out.shape(), shape(8, 8, 8));
        assert_eq!(out.occupied_count(), 64);

        let surface_only = processor.with_fill_interior(false).apply(&shell(4)).unwrap();
        assert_eq!(surface_only.occupied_count(), 64 - 8);
    }
}
