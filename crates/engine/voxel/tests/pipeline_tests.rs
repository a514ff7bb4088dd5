//! Integration tests for the scene -> surface grid -> canonical grid pipeline
//!
//! Scenes are written as OBJ files into temporary directories.

use lingo_voxel::npy::{read_npy, write_npy};
use lingo_voxel::{
    fill_interior, pad_to_shape, padding_offset, GridShape, MeshNormalizer, NormalizeConfig,
    VoxelError, VoxelPostProcessor,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Closed box with corners at `min` and `max`
fn box_obj(min: [f64; 3], max: [f64; 3]) -> String {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    format!(
        "o box
v {x0} {y0} {z0}
v {x1} {y0} {z0}
v {x1} {y1} {z0}
v {x0} {y1} {z0}
v {x0} {y0} {z1}
v {x1} {y0} {z1}
v {x1} {y1} {z1}
v {x0} {y1} {z1}
f 1 4 3 2
f 5 6 7 8
f 1 5 8 4
f 2 3 7 6
f 1 2 6 5
f 4 8 7 3
"
    )
}

/// Room-like scene: a floor slab with a closed box standing on it
fn room_obj() -> String {
    let floor = "o floor
v -10 0 -6
v 10 0 -6
v 10 0 6
v -10 0 6
f 1 2 3 4
";
    let furniture = box_obj([-2.0, 0.0, -1.0], [2.0, 3.0, 1.0]).replace("o box", "o sofa");
    // OBJ indices are global across objects: shift the box indices past the floor
    let shifted: String = furniture
        .lines()
        .map(|line| {
            if let Some(rest) = line.strip_prefix("f ") {
                let ids: Vec<String> = rest
                    .split_whitespace()
                    .map(|i| (i.parse::<u32>().unwrap() + 4).to_string())
                    .collect();
                format!("f {}\n", ids.join(" "))
            } else {
                format!("{line}\n")
            }
        })
        .collect();
    format!("{floor}{shifted}")
}

fn write_scene(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn small_shape() -> GridShape {
    GridShape::new(40, 10, 60).unwrap()
}

#[test]
fn test_box_scene_fills_and_pads_to_target() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path(), "crate.obj", &box_obj([0.0; 3], [4.0, 1.0, 6.0]));

    let shape = small_shape();
    let normalizer = MeshNormalizer::new(NormalizeConfig::new(shape));
    let surface = normalizer.voxelize(&scene).unwrap();
    assert!(surface.shape().fits_within(&shape));

    let filled = fill_interior(&surface);
    assert!(filled.occupied_count() > surface.occupied_count());

    let grid = VoxelPostProcessor::new(shape).apply(&surface).unwrap();
    assert_eq!(grid.shape(), shape);
    assert_eq!(grid.occupied_count(), filled.occupied_count());

    // Data sits on the floor of axis 1 and is centered on axes 0 and 2
    let offset = padding_offset(filled.shape(), shape).unwrap();
    assert_eq!(offset[1], 0);
    assert_eq!(grid.crop(offset, filled.shape()).unwrap(), filled);
}

#[test]
fn test_scale_and_position_do_not_change_grid() {
    let dir = tempfile::tempdir().unwrap();
    let small = write_scene(dir.path(), "a.obj", &box_obj([0.0; 3], [2.0, 1.0, 3.0]));
    let large = write_scene(
        dir.path(),
        "b.obj",
        &box_obj([100.0, -50.0, 7.0], [140.0, -30.0, 67.0]),
    );

    let normalizer = MeshNormalizer::new(NormalizeConfig::new(small_shape()));
    let a = normalizer.voxelize(&small).unwrap();
    let b = normalizer.voxelize(&large).unwrap();
    assert_eq!(a.shape(), b.shape());
}

#[test]
fn test_room_scene_keeps_open_space_empty() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path(), "livingroom.obj", &room_obj());

    let shape = small_shape();
    let normalizer = MeshNormalizer::new(NormalizeConfig::new(shape));
    let surface = normalizer.voxelize(&scene).unwrap();
    let grid = VoxelPostProcessor::new(shape).apply(&surface).unwrap();

    assert_eq!(grid.shape(), shape);
    // The floor spans the whole width, so the padded grid keeps empty air above it
    assert!(grid.occupied_count() < shape.volume() / 2);
    assert!(grid.occupied().all(|p| (p.y as usize) < shape.height()));
}

#[test]
fn test_voxelize_to_persists_surface_grid() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path(), "crate.obj", &box_obj([0.0; 3], [1.0, 1.0, 1.0]));
    let output = dir.path().join("cache").join("default.npy");
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&output, b"old contents").unwrap();

    let normalizer = MeshNormalizer::new(NormalizeConfig::new(small_shape()));
    let grid = normalizer.voxelize_to(&scene, &output).unwrap();
    assert_eq!(read_npy(&output).unwrap(), grid);
}

#[test]
fn test_flat_scene_is_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(
        dir.path(),
        "plane.obj",
        "v 0 0 0\nv 1 0 0\nv 1 0 1\nv 0 0 1\nf 1 2 3 4\n",
    );

    let normalizer = MeshNormalizer::new(NormalizeConfig::new(small_shape()));
    let err = normalizer.voxelize(&scene).unwrap_err();
    assert!(matches!(err, VoxelError::DegenerateExtent { axis: 1, .. }));
}

#[test]
fn test_unparsable_scene_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path(), "broken.obj", "this is not a mesh\n");

    let normalizer = MeshNormalizer::new(NormalizeConfig::new(small_shape()));
    let err = normalizer.voxelize(&scene).unwrap_err();
    assert!(matches!(err, VoxelError::Load { .. }));
}

#[test]
fn test_padded_grid_survives_npy() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path(), "crate.obj", &box_obj([0.0; 3], [3.0, 2.0, 1.0]));
    let shape = small_shape();

    let normalizer = MeshNormalizer::new(NormalizeConfig::new(shape));
    let surface = normalizer.voxelize(&scene).unwrap();
    let grid = pad_to_shape(&surface, shape).unwrap();

    let path = dir.path().join("crate_voxelized.npy");
    write_npy(&path, &grid).unwrap();
    let loaded = read_npy(&path).unwrap();
    assert_eq!(loaded.shape(), shape);
    assert_eq!(loaded, grid);
}
