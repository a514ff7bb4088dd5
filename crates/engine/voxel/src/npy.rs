//! NumPy `.npy` codec for boolean occupancy grids
//!
//! Format (version 1.0):
//!
//! ```text
//! \x93NUMPY | major=1 | minor=0 | header_len: u16 LE | header | data
//! ```
//!
//! The header is an ASCII Python dict literal padded with spaces and a trailing
//! newline so the data starts on a 64-byte boundary:
//!
//! ```text
//! {'descr': '|b1', 'fortran_order': False, 'shape': (400, 100, 600), }
//! ```
//!
//! Data is one byte per cell (0 or 1) in C order, matching [`VoxelGrid`] storage.
//! The reader also accepts version 2.0 headers (u32 length).

use crate::grid::{GridShape, VoxelGrid};
use crate::types::{Result, VoxelError};
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// Encode a grid as `.npy` bytes
pub fn to_npy_bytes(grid: &VoxelGrid) -> Vec<u8> {
    let [w, h, d] = grid.shape().dims();
    let mut header = format!(
        "{{'descr': '|b1', 'fortran_order': False, 'shape': ({w}, {h}, {d}), }}"
    );

    // magic + version + u16 length + header + '\n'
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut bytes = Vec::with_capacity(MAGIC.len() + 4 + header.len() + grid.cells().len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend(grid.cells().iter().map(|&c| c as u8));
    bytes
}

/// Decode `.npy` bytes holding a 3D boolean array
pub fn from_npy_bytes(bytes: &[u8]) -> Result<VoxelGrid> {
    if bytes.len() < MAGIC.len() + 4 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(VoxelError::Npy("missing NUMPY magic".to_string()));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(VoxelError::Npy("truncated header length".to_string()));
            }
            (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                12,
            )
        }
        other => return Err(VoxelError::Npy(format!("unsupported version {other}"))),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(VoxelError::Npy("truncated header".to_string()));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| VoxelError::Npy("header is not valid text".to_string()))?;

    let descr = header_value(header, "descr")?;
    if !matches!(descr.trim_matches(|c| c == '\'' || c == '"'), "|b1" | "?" | "b1") {
        return Err(VoxelError::Npy(format!("expected boolean dtype, got {descr}")));
    }
    if header_value(header, "fortran_order")? != "False" {
        return Err(VoxelError::Npy("fortran-ordered arrays are not supported".to_string()));
    }
    let shape = parse_shape(header_value(header, "shape")?)?;

    let data = &bytes[data_start..];
    if data.len() != shape.volume() {
        return Err(VoxelError::Npy(format!(
            "expected {} data bytes for shape {}, found {}",
            shape.volume(),
            shape,
            data.len()
        )));
    }

    VoxelGrid::from_cells(shape, data.iter().map(|&b| b != 0).collect())
}

/// Write a grid to `path`, replacing any existing file
pub fn write_npy(path: impl AsRef<Path>, grid: &VoxelGrid) -> Result<()> {
    fs::write(path, to_npy_bytes(grid))?;
    Ok(())
}

/// Read a grid previously written by [`write_npy`] (or NumPy)
pub fn read_npy(path: impl AsRef<Path>) -> Result<VoxelGrid> {
    from_npy_bytes(&fs::read(path)?)
}

/// Raw text of the value stored under `key` in the header dict
fn header_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let missing = || VoxelError::Npy(format!("header has no '{key}' entry"));

    let needle = format!("'{key}':");
    let start = header.find(&needle).ok_or_else(missing)? + needle.len();
    let rest = header[start..].trim_start();

    // Tuples contain commas, so they end at the closing parenthesis
    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find([',', '}'])
    }
    .ok_or_else(missing)?;

    Ok(rest[..end].trim())
}

fn parse_shape(value: &str) -> Result<GridShape> {
    let dims: Vec<usize> = value
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| VoxelError::Npy(format!("invalid shape entry '{part}'")))
        })
        .collect::<Result<_>>()?;

    match dims.as_slice() {
        [w, h, d] => GridShape::new(*w, *h, *d),
        _ => Err(VoxelError::Npy(format!("expected a 3D shape, got {value}"))),
    }
}
