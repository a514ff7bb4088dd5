//! Surface sampling of positioned meshes at unit pitch
//!
//! Voxel `(i, j, k)` is the closed unit box `[i, i + 1] × [j, j + 1] × [k, k + 1]`.
//! A voxel is occupied when any triangle of the mesh touches its box, decided by
//! the separating axis test (three box normals, the triangle normal and the nine
//! edge cross products).

use crate::grid::{GridShape, VoxelGrid};
use crate::mesh::TriMesh;
use glam::DVec3;

const HALF_CELL: f64 = 0.5;

/// Rasterize the surface of `mesh` into a grid of `shape`
///
/// The mesh must already be expressed in grid units. Geometry that pokes out of
/// the frame is clamped onto the nearest boundary cell.
pub fn sample_surface(mesh: &TriMesh, shape: GridShape) -> VoxelGrid {
    let dims = shape.dims();
    let mut grid = VoxelGrid::empty(shape);
    let mut clamped = 0usize;

    for tri in mesh.triangles() {
        let lo = tri[0].min(tri[1]).min(tri[2]);
        let hi = tri[0].max(tri[1]).max(tri[2]);

        // Closed boxes: a vertex on an integer plane touches the cell below it too
        let first = lo.floor() - DVec3::ONE;
        let last = hi.floor();

        for i in first.x as i64..=last.x as i64 {
            for j in first.y as i64..=last.y as i64 {
                for k in first.z as i64..=last.z as i64 {
                    let center = DVec3::new(i as f64, j as f64, k as f64) + HALF_CELL;
                    if !triangle_overlaps_cell(&tri, center) {
                        continue;
                    }
                    let x = clamp_axis(i, dims[0]);
                    let y = clamp_axis(j, dims[1]);
                    let z = clamp_axis(k, dims[2]);
                    if [x as i64, y as i64, z as i64] != [i, j, k] {
                        clamped += 1;
                    }
                    grid.set(x, y, z);
                }
            }
        }
    }

    if clamped > 0 {
        tracing::warn!(
            "{clamped} surface cells fell outside the {shape} frame and were clamped to its boundary"
        );
    }
    grid
}

#[inline]
fn clamp_axis(coord: i64, dim: usize) -> usize {
    coord.clamp(0, dim as i64 - 1) as usize
}

/// Separating axis test between a triangle and the unit cell centered at `center`
pub fn triangle_overlaps_cell(tri: &[DVec3; 3], center: DVec3) -> bool {
    let v = [tri[0] - center, tri[1] - center, tri[2] - center];

    // Box face normals
    for axis in 0..3 {
        let min = v[0][axis].min(v[1][axis]).min(v[2][axis]);
        let max = v[0][axis].max(v[1][axis]).max(v[2][axis]);
        if min > HALF_CELL || max < -HALF_CELL {
            return false;
        }
    }

    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

    // Triangle plane
    let normal = edges[0].cross(edges[1]);
    if separated_along(normal, &v) {
        return false;
    }

    // Edge cross products
    for edge in &edges {
        for axis in [DVec3::X, DVec3::Y, DVec3::Z] {
            if separated_along(axis.cross(*edge), &v) {
                return false;
            }
        }
    }

    true
}

fn separated_along(axis: DVec3, v: &[DVec3; 3]) -> bool {
    if axis.length_squared() < 1e-18 {
        return false;
    }
    let p0 = v[0].dot(axis);
    let p1 = v[1].dot(axis);
    let p2 = v[2].dot(axis);
    let radius = HALF_CELL * axis.abs().element_sum();
    p0.min(p1).min(p2) > radius || p0.max(p1).max(p2) < -radius
}
