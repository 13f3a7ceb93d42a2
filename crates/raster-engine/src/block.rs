//! One contiguous masked raster block.

use crate::config::RasterConfig;
use crate::invalidate::InvalidationHooks;
use grid_common::{CoordMode, GridError, GridHeader, GridResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A georeferenced grid of scalar cells, each either a value or masked.
///
/// Cells live in one dense buffer in the persisted column-major order
/// (`idx = i + j·nx + k·nx·ny`); a parallel validity vector carries the
/// mask. The buffer is exclusively owned and never aliased across blocks.
#[derive(Debug)]
pub struct RasterBlock {
    pub(crate) header: GridHeader,
    pub(crate) values: Vec<f64>,
    /// true = cell holds data, false = masked.
    pub(crate) valid: Vec<bool>,
    pub(crate) not_null: usize,
    pub(crate) loaded: bool,
    pub(crate) config: RasterConfig,
    pub(crate) source: Option<PathBuf>,
    pub(crate) hooks: InvalidationHooks,
}

/// Value statistics over the unmasked cells of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid_count: usize,
}

impl RasterBlock {
    /// Create a block from explicit geometry, every cell unmasked and set
    /// to the configured fill value.
    pub fn new(header: GridHeader) -> GridResult<Self> {
        Self::with_config(header, RasterConfig::default())
    }

    /// Like [`RasterBlock::new`] with explicit configuration.
    pub fn with_config(header: GridHeader, config: RasterConfig) -> GridResult<Self> {
        if header.is_multiblock() {
            return Err(GridError::format(
                "multi-block headers describe a MultiBlockRaster, not a single block",
            ));
        }
        let len = header.cell_count();
        Ok(Self {
            header,
            values: vec![config.fill_value; len],
            valid: vec![true; len],
            not_null: len,
            loaded: true,
            config,
            source: None,
            hooks: InvalidationHooks::new(),
        })
    }

    /// Create a block with every cell masked.
    pub fn masked(header: GridHeader, config: RasterConfig) -> GridResult<Self> {
        let mut block = Self::with_config(header, config)?;
        block.valid.fill(false);
        block.not_null = 0;
        Ok(block)
    }

    /// Create a fresh block with the same geometry and configuration as
    /// another ("mold" construction). Cell contents are not copied.
    pub fn mold(other: &RasterBlock) -> Self {
        // other's header already passed validation
        Self::with_config(other.header.clone(), other.config)
            .expect("mold of a valid block cannot fail")
    }

    /// Create a block over an existing value buffer, all cells unmasked.
    ///
    /// The buffer length must match the header extents exactly.
    pub fn from_values(header: GridHeader, values: Vec<f64>) -> GridResult<Self> {
        let mut block = Self::new(header)?;
        if values.len() != block.values.len() {
            return Err(GridError::format(format!(
                "value buffer holds {} cells, header declares {}",
                values.len(),
                block.values.len()
            )));
        }
        block.values = values;
        Ok(block)
    }

    // === Geometry and bookkeeping ===

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Grid extents as `(nx, ny, nz)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.header.nx, self.header.ny, self.header.nz)
    }

    /// Total cell count.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of unmasked cells (cached, maintained by every mutation).
    pub fn not_null_count(&self) -> usize {
        self.not_null
    }

    /// Whether a backing payload has been populated. Accessors return
    /// their fallback while this is false.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Backing file path, if one is configured.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, path: impl Into<PathBuf>) {
        self.source = Some(path.into());
    }

    // === Invalidation ===

    /// Register a hook fired after mutations, so externally held render
    /// caches can drop state.
    pub fn on_invalidate(&mut self, hook: impl Fn() + 'static) {
        self.hooks.register(hook);
    }

    /// Ping the invalidation hooks.
    ///
    /// Bulk mutators call this themselves. Single-cell writers
    /// ([`set`](Self::set), [`set_masked`](Self::set_masked)) do not;
    /// callers batching cell edits invoke this once when done.
    pub fn invalidate(&self) {
        self.hooks.notify();
    }

    // === Cell access ===

    /// Raw cell state `(value, valid)`, or None out of bounds.
    pub fn cell(&self, i: usize, j: usize) -> Option<(f64, bool)> {
        if i >= self.header.nx || j >= self.header.ny {
            return None;
        }
        let idx = self.header.flat_index(i, j);
        Some((self.values[idx], self.valid[idx]))
    }

    /// Value of an unmasked in-bounds cell.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        match self.cell(i, j) {
            Some((v, true)) => Some(v),
            _ => None,
        }
    }

    /// Whether the cell is masked; out-of-bounds counts as masked.
    pub fn is_masked_at(&self, i: usize, j: usize) -> bool {
        !matches!(self.cell(i, j), Some((_, true)))
    }

    /// Write one cell, unmasking it. Out-of-bounds writes are dropped.
    /// Does not ping invalidation hooks; see [`invalidate`](Self::invalidate).
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        if i >= self.header.nx || j >= self.header.ny {
            debug!(i, j, "dropped out-of-bounds cell write");
            return;
        }
        let idx = self.header.flat_index(i, j);
        if !self.valid[idx] {
            self.valid[idx] = true;
            self.not_null += 1;
        }
        self.values[idx] = value;
    }

    /// Mask or unmask one cell in place. Out-of-bounds is a no-op.
    /// Does not ping invalidation hooks.
    pub fn set_masked(&mut self, i: usize, j: usize, masked: bool) {
        if i >= self.header.nx || j >= self.header.ny {
            return;
        }
        let idx = self.header.flat_index(i, j);
        match (self.valid[idx], masked) {
            (true, true) => {
                self.valid[idx] = false;
                self.not_null -= 1;
            }
            (false, false) => {
                self.valid[idx] = true;
                self.not_null += 1;
            }
            _ => {}
        }
    }

    /// Value at a coordinate, or `fallback` when the point is outside the
    /// footprint, the cell is masked, or no payload is loaded.
    pub fn value_at(&self, x: f64, y: f64, fallback: f64) -> f64 {
        self.value_at_layer(x, y, 0, fallback)
    }

    /// 3D variant of [`value_at`](Self::value_at) addressing layer `k`.
    pub fn value_at_layer(&self, x: f64, y: f64, k: usize, fallback: f64) -> f64 {
        if !self.loaded || k >= self.header.nz {
            return fallback;
        }
        let Some((i, j)) = self.header.checked_ij(x, y, CoordMode::Relative) else {
            return fallback;
        };
        let idx = self.header.flat_index_3d(i, j, k);
        if self.valid[idx] {
            self.values[idx]
        } else {
            fallback
        }
    }

    /// Gather values for a coordinate list. Out-of-footprint entries are
    /// silently dropped; masked cells yield the null-value sentinel.
    pub fn values_at(&self, points: &[(f64, f64)]) -> Vec<f64> {
        if !self.loaded {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(points.len());
        for &(x, y) in points {
            let Some((i, j)) = self.header.checked_ij(x, y, CoordMode::Relative) else {
                continue;
            };
            let idx = self.header.flat_index(i, j);
            out.push(if self.valid[idx] {
                self.values[idx]
            } else {
                self.config.null_value
            });
        }
        out
    }

    /// Scatter values onto a coordinate list. Out-of-footprint entries are
    /// silently dropped; excess values (or excess points) are ignored.
    pub fn set_values(&mut self, points: &[(f64, f64)], values: &[f64]) {
        let mut written = 0usize;
        for (&(x, y), &v) in points.iter().zip(values) {
            if let Some((i, j)) = self.header.checked_ij(x, y, CoordMode::Relative) {
                self.set(i, j, v);
                written += 1;
            }
        }
        if written > 0 {
            self.invalidate();
        }
        debug!(
            requested = points.len().min(values.len()),
            written, "scatter write"
        );
    }

    // === Masking ===

    /// Mask every cell whose value equals `v`; all other cells unmask.
    pub fn mask_equal(&mut self, v: f64) {
        self.recompute_mask(|value| value != v);
    }

    /// Mask every cell whose value is below `v`; all other cells unmask.
    pub fn mask_less(&mut self, v: f64) {
        self.recompute_mask(|value| !(value < v));
    }

    /// Flip the mask of every cell.
    pub fn mask_invert(&mut self) {
        for flag in &mut self.valid {
            *flag = !*flag;
        }
        self.not_null = self.len() - self.not_null;
        self.invalidate();
    }

    /// Unmask every cell.
    pub fn mask_reset(&mut self) {
        self.valid.fill(true);
        self.not_null = self.len();
        self.invalidate();
    }

    fn recompute_mask(&mut self, keep: impl Fn(f64) -> bool) {
        let mut count = 0usize;
        for (flag, &value) in self.valid.iter_mut().zip(&self.values) {
            *flag = keep(value);
            if *flag {
                count += 1;
            }
        }
        self.not_null = count;
        self.invalidate();
    }

    /// Overwrite every cell with `v` and unmask it.
    pub fn fill(&mut self, v: f64) {
        self.values.fill(v);
        self.valid.fill(true);
        self.not_null = self.len();
        self.invalidate();
    }

    // === Cropping ===

    /// Deep sub-copy covering `nx × ny` cells from `(i0, j0)`, all layers,
    /// with a re-originated header.
    pub fn crop(&self, i0: usize, j0: usize, nx: usize, ny: usize) -> GridResult<RasterBlock> {
        self.crop_layers(i0, j0, nx, ny, 0, self.header.nz)
    }

    /// 3D crop, additionally bounded in Z.
    pub fn crop_layers(
        &self,
        i0: usize,
        j0: usize,
        nx: usize,
        ny: usize,
        k0: usize,
        nz: usize,
    ) -> GridResult<RasterBlock> {
        let h = &self.header;
        if i0 + nx > h.nx || j0 + ny > h.ny || k0 + nz > h.nz {
            return Err(GridError::format(format!(
                "crop window ({i0},{j0},{k0})+({nx},{ny},{nz}) exceeds extents ({}, {}, {})",
                h.nx, h.ny, h.nz
            )));
        }

        let mut header = GridHeader::new(
            nx,
            ny,
            h.ox + i0 as f64 * h.dx,
            h.oy + j0 as f64 * h.dy,
            h.dx,
            h.dy,
            h.record_type,
        )?
        .with_translation(h.tx, h.ty);
        if h.nz > 1 || h.record_type.is_3d() {
            header = header.with_z(nz, h.oz + k0 as f64 * h.dz, h.dz, h.tz)?;
        }

        let mut out = RasterBlock::with_config(header, self.config)?;
        let mut count = 0usize;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let src = h.flat_index_3d(i0 + i, j0 + j, k0 + k);
                    let dst = out.header.flat_index_3d(i, j, k);
                    out.values[dst] = self.values[src];
                    out.valid[dst] = self.valid[src];
                    if out.valid[dst] {
                        count += 1;
                    }
                }
            }
        }
        out.not_null = count;
        Ok(out)
    }

    // === Statistics ===

    /// Min / max / mean over unmasked cells; None when everything is
    /// masked. Used by display stretch and sanity reporting.
    pub fn statistics(&self) -> Option<Statistics> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for (&value, &ok) in self.values.iter().zip(&self.valid) {
            if !ok || value.is_nan() {
                continue;
            }
            min = min.min(value);
            max = max.max(value);
            sum += value;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Statistics {
            min,
            max,
            mean: sum / count as f64,
            valid_count: count,
        })
    }
}

impl Clone for RasterBlock {
    /// Clones carry data and configuration but start with an empty hook
    /// registry: invalidation listeners watch one specific block.
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            values: self.values.clone(),
            valid: self.valid.clone(),
            not_null: self.not_null,
            loaded: self.loaded,
            config: self.config,
            source: self.source.clone(),
            hooks: InvalidationHooks::new(),
        }
    }
}
