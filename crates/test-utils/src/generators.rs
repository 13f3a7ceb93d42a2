//! Raster fixture generators with predictable, verifiable cell patterns.

use grid_common::{GridHeader, RecordType};
use raster_engine::RasterBlock;

/// A unit-cell header anchored at the origin.
pub fn unit_header(nx: usize, ny: usize, record_type: RecordType) -> GridHeader {
    GridHeader::new(nx, ny, 0.0, 0.0, 1.0, 1.0, record_type).expect("unit header is always valid")
}

/// A block whose cells ramp 1, 2, 3, … in column-major order.
///
/// Cell `(i, j)` holds `1 + i + j·nx`, so on a 4×4 grid this is the
/// canonical 1..16 fixture used throughout the workspace tests.
pub fn ramp_block(nx: usize, ny: usize) -> RasterBlock {
    let values: Vec<f64> = (1..=nx * ny).map(|v| v as f64).collect();
    RasterBlock::from_values(unit_header(nx, ny, RecordType::Float64), values)
        .expect("ramp buffer matches header extents")
}

/// A block filled with one constant value.
pub fn constant_block(nx: usize, ny: usize, value: f64) -> RasterBlock {
    RasterBlock::from_values(
        unit_header(nx, ny, RecordType::Float64),
        vec![value; nx * ny],
    )
    .expect("constant buffer matches header extents")
}
