//! Grid georeferencing header.
//!
//! A [`GridHeader`] anchors a regular grid to model coordinates. The origin
//! and the translation are kept as two separate offsets: blocks are laid
//! out with small origin values near zero, and the (typically large)
//! projected offset lives in the translation, which keeps per-cell
//! coordinate arithmetic in a numerically comfortable range.

use crate::bbox::BoundingBox;
use crate::encoding::RecordType;
use crate::error::{GridError, GridResult};
use serde::{Deserialize, Serialize};

/// Which coordinate frame a query works in.
///
/// `Relative` coordinates are translation-free; `Absolute` coordinates
/// include the translation offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordMode {
    #[default]
    Relative,
    Absolute,
}

/// A rectangular index-space window into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    /// First column of the window.
    pub i0: usize,
    /// First row of the window.
    pub j0: usize,
    /// Window width in cells.
    pub nx: usize,
    /// Window height in cells.
    pub ny: usize,
}

/// Georeferencing metadata for one regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    /// Number of cells in X.
    pub nx: usize,
    /// Number of cells in Y.
    pub ny: usize,
    /// Number of layers in Z (1 for plain 2D grids).
    pub nz: usize,
    /// Grid origin, relative frame.
    pub ox: f64,
    pub oy: f64,
    pub oz: f64,
    /// Cell size per axis.
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    /// Secondary offset added to the origin in the absolute frame.
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    /// Persisted cell encoding.
    pub record_type: RecordType,
    /// Nested per-block headers; non-empty only for multi-block headers.
    pub blocks: Vec<GridHeader>,
}

impl GridHeader {
    /// Create a validated 2D header.
    ///
    /// Cell sizes must be strictly positive; a malformed header is fatal
    /// here rather than surfacing later as bad indexing.
    pub fn new(
        nx: usize,
        ny: usize,
        ox: f64,
        oy: f64,
        dx: f64,
        dy: f64,
        record_type: RecordType,
    ) -> GridResult<Self> {
        if !(dx > 0.0) || !(dy > 0.0) {
            return Err(GridError::format(format!(
                "cell size must be strictly positive, got dx={dx}, dy={dy}"
            )));
        }
        Ok(Self {
            nx,
            ny,
            nz: 1,
            ox,
            oy,
            oz: 0.0,
            dx,
            dy,
            dz: 1.0,
            tx: 0.0,
            ty: 0.0,
            tz: 0.0,
            record_type,
            blocks: Vec::new(),
        })
    }

    /// Set the translation offset.
    pub fn with_translation(mut self, tx: f64, ty: f64) -> Self {
        self.tx = tx;
        self.ty = ty;
        self
    }

    /// Extend the header with a Z dimension.
    pub fn with_z(mut self, nz: usize, oz: f64, dz: f64, tz: f64) -> GridResult<Self> {
        if !(dz > 0.0) {
            return Err(GridError::format(format!(
                "cell size must be strictly positive, got dz={dz}"
            )));
        }
        self.nz = nz;
        self.oz = oz;
        self.dz = dz;
        self.tz = tz;
        Ok(self)
    }

    /// Attach nested per-block headers (multi-block variants only).
    pub fn with_blocks(mut self, blocks: Vec<GridHeader>) -> GridResult<Self> {
        if !self.record_type.is_multiblock() {
            return Err(GridError::format(format!(
                "record type id {} cannot carry nested blocks",
                self.record_type.code()
            )));
        }
        let scalar = self.record_type.scalar_type();
        // Invariant: nested headers share the parent's translation
        // convention. Block translation = parent translation + parent
        // origin, so block origins stay small numbers.
        let (btx, bty) = (self.tx + self.ox, self.ty + self.oy);
        self.blocks = blocks;
        for block in &mut self.blocks {
            block.record_type = scalar;
            block.tx = btx;
            block.ty = bty;
        }
        Ok(self)
    }

    /// Whether this header describes a multi-block composite.
    pub fn is_multiblock(&self) -> bool {
        self.record_type.is_multiblock()
    }

    /// Whether this header carries a real Z dimension.
    pub fn is_3d(&self) -> bool {
        self.record_type.is_3d()
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Byte length of the binary payload this header describes.
    ///
    /// For multi-block headers this is the concatenation of every nested
    /// block's payload, no separators.
    pub fn payload_byte_len(&self) -> usize {
        if self.is_multiblock() {
            self.blocks.iter().map(|b| b.payload_byte_len()).sum()
        } else {
            self.cell_count() * self.record_type.byte_width()
        }
    }

    /// Origin in the requested frame.
    fn anchor(&self, mode: CoordMode) -> (f64, f64) {
        match mode {
            CoordMode::Relative => (self.ox, self.oy),
            CoordMode::Absolute => (self.ox + self.tx, self.oy + self.ty),
        }
    }

    /// The grid footprint in the requested frame.
    pub fn bounds(&self, mode: CoordMode) -> BoundingBox {
        let (ax, ay) = self.anchor(mode);
        BoundingBox::new(
            ax,
            ay,
            ax + self.nx as f64 * self.dx,
            ay + self.ny as f64 * self.dy,
        )
    }

    /// Whether a point falls inside the grid footprint.
    pub fn contains(&self, x: f64, y: f64, mode: CoordMode) -> bool {
        self.bounds(mode).contains_point(x, y)
    }

    /// Convert a coordinate to cell indices by floor division.
    ///
    /// Out-of-range inputs yield out-of-range (possibly negative) indices;
    /// callers bound-check. A coordinate exactly on a cell boundary floors
    /// to the lower index, never rounds.
    pub fn ij_from_xy(&self, x: f64, y: f64, mode: CoordMode) -> (i64, i64) {
        let (ax, ay) = self.anchor(mode);
        let i = ((x - ax) / self.dx).floor() as i64;
        let j = ((y - ay) / self.dy).floor() as i64;
        (i, j)
    }

    /// Cell-center coordinate of cell `(i, j)` in the requested frame.
    pub fn xy_from_ij(&self, i: i64, j: i64, mode: CoordMode) -> (f64, f64) {
        let (ax, ay) = self.anchor(mode);
        (
            (i as f64 + 0.5) * self.dx + ax,
            (j as f64 + 0.5) * self.dy + ay,
        )
    }

    /// Checked index lookup: `Some((i, j))` only when the point falls
    /// inside the footprint.
    pub fn checked_ij(&self, x: f64, y: f64, mode: CoordMode) -> Option<(usize, usize)> {
        let (i, j) = self.ij_from_xy(x, y, mode);
        if i < 0 || j < 0 || i >= self.nx as i64 || j >= self.ny as i64 {
            return None;
        }
        Some((i as usize, j as usize))
    }

    /// Flat buffer index for cell `(i, j)`.
    ///
    /// Column-major persisted layout: `i` varies fastest.
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        i + j * self.nx
    }

    /// Flat buffer index for cell `(i, j, k)`.
    pub fn flat_index_3d(&self, i: usize, j: usize, k: usize) -> usize {
        i + j * self.nx + k * self.nx * self.ny
    }

    /// Footprint intersection with another header, in the requested frame.
    pub fn intersect(&self, other: &GridHeader, mode: CoordMode) -> Option<BoundingBox> {
        self.bounds(mode).intersection(&other.bounds(mode))
    }

    /// Footprint union envelope with another header.
    pub fn union(&self, other: &GridHeader, mode: CoordMode) -> BoundingBox {
        self.bounds(mode).union(&other.bounds(mode))
    }

    /// Index-space intersection: the local cell windows of both headers
    /// covering the shared footprint, or None when the footprints are
    /// disjoint. Works in the relative frame.
    pub fn intersect_indices(&self, other: &GridHeader) -> Option<(IndexWindow, IndexWindow)> {
        let overlap = self.intersect(other, CoordMode::Relative)?;
        let a = self.window_for(&overlap)?;
        let b = other.window_for(&overlap)?;
        Some((a, b))
    }

    /// The local cell window covering a bbox (relative frame), clamped to
    /// the grid. Cells partially covered are included.
    pub fn window_for(&self, bbox: &BoundingBox) -> Option<IndexWindow> {
        if self.nx == 0 || self.ny == 0 {
            return None;
        }
        let i0 = (((bbox.min_x - self.ox) / self.dx).floor() as i64).max(0);
        let j0 = (((bbox.min_y - self.oy) / self.dy).floor() as i64).max(0);
        let i1 = ((((bbox.max_x - self.ox) / self.dx).ceil() as i64) - 1).min(self.nx as i64 - 1);
        let j1 = ((((bbox.max_y - self.oy) / self.dy).ceil() as i64) - 1).min(self.ny as i64 - 1);
        if i0 > i1 || j0 > j1 {
            return None;
        }
        Some(IndexWindow {
            i0: i0 as usize,
            j0: j0 as usize,
            nx: (i1 - i0 + 1) as usize,
            ny: (j1 - j0 + 1) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_4x4() -> GridHeader {
        GridHeader::new(4, 4, 0.0, 0.0, 1.0, 1.0, RecordType::Float32).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_cell_size() {
        assert!(GridHeader::new(4, 4, 0.0, 0.0, 0.0, 1.0, RecordType::Float32).is_err());
        assert!(GridHeader::new(4, 4, 0.0, 0.0, 1.0, -2.0, RecordType::Float32).is_err());
    }

    #[test]
    fn test_coordinate_inverse() {
        let h = GridHeader::new(10, 8, 3.5, -2.0, 0.25, 0.5, RecordType::Float64)
            .unwrap()
            .with_translation(1000.0, 2000.0);

        for mode in [CoordMode::Relative, CoordMode::Absolute] {
            for i in 0..10i64 {
                for j in 0..8i64 {
                    let (x, y) = h.xy_from_ij(i, j, mode);
                    assert_eq!(h.ij_from_xy(x, y, mode), (i, j));
                }
            }
        }
    }

    #[test]
    fn test_boundary_floors_to_lower_index() {
        let h = header_4x4();
        // x = 2.0 sits exactly on the boundary between cells 1 and 2
        assert_eq!(h.ij_from_xy(2.0, 0.5, CoordMode::Relative), (2, 0));
        // out-of-range inputs yield out-of-range indices, no error
        assert_eq!(h.ij_from_xy(-0.5, 9.0, CoordMode::Relative), (-1, 9));
    }

    #[test]
    fn test_bounds_absolute_adds_translation() {
        let h = header_4x4().with_translation(100.0, 200.0);
        let rel = h.bounds(CoordMode::Relative);
        let abs = h.bounds(CoordMode::Absolute);
        assert_eq!(rel.min_x, 0.0);
        assert_eq!(abs.min_x, 100.0);
        assert_eq!(abs.max_y, 204.0);
    }

    #[test]
    fn test_intersect_indices() {
        let a = header_4x4();
        let b = GridHeader::new(4, 4, 2.0, 2.0, 1.0, 1.0, RecordType::Float32).unwrap();
        let (wa, wb) = a.intersect_indices(&b).unwrap();
        assert_eq!(
            wa,
            IndexWindow {
                i0: 2,
                j0: 2,
                nx: 2,
                ny: 2
            }
        );
        assert_eq!(
            wb,
            IndexWindow {
                i0: 0,
                j0: 0,
                nx: 2,
                ny: 2
            }
        );

        let far = GridHeader::new(4, 4, 100.0, 100.0, 1.0, 1.0, RecordType::Float32).unwrap();
        assert!(a.intersect_indices(&far).is_none());
    }

    #[test]
    fn test_header_serde_round_trip() {
        let h = header_4x4().with_translation(845000.0, 6523000.0);
        let json = serde_json::to_string(&h).unwrap();
        let back: GridHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_flat_index_is_column_major() {
        let h = header_4x4();
        assert_eq!(h.flat_index(0, 0), 0);
        assert_eq!(h.flat_index(3, 0), 3);
        assert_eq!(h.flat_index(0, 1), 4);
        assert_eq!(h.flat_index_3d(1, 1, 1), 1 + 4 + 16);
    }
}
