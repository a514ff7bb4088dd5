//! Dense boolean occupancy grids
//!
//! Cells are stored in row-major order (axis 0 slowest, axis 2 fastest), which is
//! the same layout the `.npy` codec writes, so a grid can be dumped without
//! reordering.

use crate::types::{Result, VoxelError};
use glam::UVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grid dimensions as `[width, height, depth]`
///
/// Every axis is strictly positive. The canonical shape of a staged job is
/// [`GridShape::CANONICAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[usize; 3]", into = "[usize; 3]")]
pub struct GridShape([usize; 3]);

impl GridShape {
    /// 400 × 100 × 600, the shape consumed by the downstream scheduler
    pub const CANONICAL: GridShape = GridShape([400, 100, 600]);

    /// Create a shape, rejecting zero-sized axes
    pub fn new(width: usize, height: usize, depth: usize) -> Result<Self> {
        Self::try_from([width, height, depth])
    }

    pub fn dims(&self) -> [usize; 3] {
        self.0
    }

    pub fn width(&self) -> usize {
        self.0[0]
    }

    pub fn height(&self) -> usize {
        self.0[1]
    }

    pub fn depth(&self) -> usize {
        self.0[2]
    }

    /// Total number of cells; cannot overflow for a constructed shape
    pub fn volume(&self) -> usize {
        self.0.iter().product()
    }

    /// True when every axis of `self` is at most the matching axis of `other`
    pub fn fits_within(&self, other: &GridShape) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a <= b)
    }

    /// Flat index of a cell; the caller guarantees the coordinates are in range
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.0[1] + y) * self.0[2] + z
    }

    /// Inverse of [`GridShape::index`]
    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let z = index % self.0[2];
        let rest = index / self.0[2];
        [rest / self.0[1], rest % self.0[1], z]
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.0[0] && y < self.0[1] && z < self.0[2]
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::CANONICAL
    }
}

impl TryFrom<[usize; 3]> for GridShape {
    type Error = VoxelError;

    fn try_from(dims: [usize; 3]) -> Result<Self> {
        if dims.contains(&0) {
            return Err(VoxelError::InvalidShape(format!(
                "every axis must be positive, got {}x{}x{}",
                dims[0], dims[1], dims[2]
            )));
        }
        let volume = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if volume.is_none() {
            return Err(VoxelError::InvalidShape(format!(
                "{}x{}x{} has more cells than fit in memory",
                dims[0], dims[1], dims[2]
            )));
        }
        Ok(Self(dims))
    }
}

impl From<GridShape> for [usize; 3] {
    fn from(shape: GridShape) -> Self {
        shape.0
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for GridShape {
    type Err = VoxelError;

    /// Parse `WxHxD`, e.g. `400x100x600`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(['x', 'X']).collect();
        if parts.len() != 3 {
            return Err(VoxelError::InvalidShape(format!(
                "expected WxHxD, got '{s}'"
            )));
        }

        let mut dims = [0usize; 3];
        for (dim, part) in dims.iter_mut().zip(parts) {
            *dim = part.trim().parse().map_err(|_| {
                VoxelError::InvalidShape(format!("'{part}' is not a positive integer"))
            })?;
        }
        Self::try_from(dims)
    }
}

/// Immutable dense 3D boolean occupancy grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    shape: GridShape,
    cells: Vec<bool>,
}

impl VoxelGrid {
    /// All-empty grid
    pub fn empty(shape: GridShape) -> Self {
        Self {
            shape,
            cells: vec![false; shape.volume()],
        }
    }

    /// Build a grid from row-major cell values
    pub fn from_cells(shape: GridShape, cells: Vec<bool>) -> Result<Self> {
        if cells.len() != shape.volume() {
            return Err(VoxelError::InvalidShape(format!(
                "{} cells do not fill a {} grid",
                cells.len(),
                shape
            )));
        }
        Ok(Self { shape, cells })
    }

    /// Build a grid by evaluating `f` at every cell
    pub fn from_fn(shape: GridShape, mut f: impl FnMut(usize, usize, usize) -> bool) -> Self {
        let cells = (0..shape.volume())
            .map(|i| {
                let [x, y, z] = shape.coords(i);
                f(x, y, z)
            })
            .collect();
        Self { shape, cells }
    }

    /// Build a grid with the listed cells occupied; out-of-range cells are ignored
    pub fn from_occupied(shape: GridShape, occupied: impl IntoIterator<Item = [usize; 3]>) -> Self {
        let mut grid = Self::empty(shape);
        for [x, y, z] in occupied {
            if shape.contains(x, y, z) {
                grid.set(x, y, z);
            }
        }
        grid
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Row-major cell values
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Occupancy of a cell; out-of-range coordinates read as empty
    pub fn get(&self, x: usize, y: usize, z: usize) -> bool {
        self.shape.contains(x, y, z) && self.cells[self.shape.index(x, y, z)]
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.contains(&true)
    }

    /// Coordinates of every occupied cell, in storage order
    pub fn occupied(&self) -> impl Iterator<Item = UVec3> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c)
            .map(|(i, _)| {
                let [x, y, z] = self.shape.coords(i);
                UVec3::new(x as u32, y as u32, z as u32)
            })
    }

    /// Inclusive bounds `(min, max)` of the occupied cells, or `None` if empty
    pub fn occupied_bounds(&self) -> Option<([usize; 3], [usize; 3])> {
        let mut bounds: Option<([usize; 3], [usize; 3])> = None;
        for (i, _) in self.cells.iter().enumerate().filter(|(_, &c)| c) {
            let p = self.shape.coords(i);
            bounds = Some(match bounds {
                None => (p, p),
                Some((min, max)) => (
                    [min[0].min(p[0]), min[1].min(p[1]), min[2].min(p[2])],
                    [max[0].max(p[0]), max[1].max(p[1]), max[2].max(p[2])],
                ),
            });
        }
        bounds
    }

    /// Copy out the sub-grid of `shape` starting at `origin`
    pub fn crop(&self, origin: [usize; 3], shape: GridShape) -> Result<VoxelGrid> {
        let fits = (0..3).all(|a| origin[a] + shape.dims()[a] <= self.shape.dims()[a]);
        if !fits {
            return Err(VoxelError::ShapeExceedsTarget {
                shape: format!("{shape} at {origin:?}"),
                target: self.shape.to_string(),
            });
        }
        Ok(Self::from_fn(shape, |x, y, z| {
            self.cells[self
                .shape
                .index(origin[0] + x, origin[1] + y, origin[2] + z)]
        }))
    }

    /// Crop to the bounding box of the occupied cells
    ///
    /// Returns `None` for a grid with no occupied cells.
    pub fn crop_to_occupied(&self) -> Option<VoxelGrid> {
        let (min, max) = self.occupied_bounds()?;
        let shape = GridShape([
            max[0] - min[0] + 1,
            max[1] - min[1] + 1,
            max[2] - min[2] + 1,
        ]);
        self.crop(min, shape).ok()
    }

    #[inline]
    pub(crate) fn set(&mut self, x: usize, y: usize, z: usize) {
        let i = self.shape.index(x, y, z);
        self.cells[i] = true;
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [bool] {
        &mut self.cells
    }
}
