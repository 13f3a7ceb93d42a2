//! The selection engine: predicate-driven addressing and scoped edits.

use crate::predicate::Condition;
use crate::selection::{Cell, CellSet, Selection};
use grid_common::{CoordMode, GridError, GridHeader, GridResult};
use raster_engine::RasterBlock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Bulk arithmetic applied to cells passing a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyOp {
    Add,
    Sub,
    Mul,
    Div,
    Replace,
}

/// A named, tagged selection put aside for later recall.
#[derive(Debug, Clone)]
pub struct Stash {
    /// Display tag shown next to the name.
    pub tag: String,
    pub selection: Selection,
}

/// Builds cell selections and scopes bulk edits to them.
///
/// The engine never owns a raster: every operation borrows the block for
/// exactly one call, so a resized or replaced raster cannot be addressed
/// through a stale handle.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    selection: Selection,
    stashes: HashMap<String, Stash>,
    /// Advisory limit above which callers should skip echoing the
    /// selection back through a renderer.
    echo_threshold: Option<usize>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Drop the active selection.
    pub fn clear(&mut self) {
        self.selection = Selection::Empty;
    }

    /// Address every cell of the grid.
    pub fn select_all(&mut self) {
        self.selection = Selection::All;
    }

    /// Number of addressed cells on the given raster.
    pub fn count_on(&self, raster: &RasterBlock) -> usize {
        self.selection.count(raster.len())
    }

    // === Point toggling ===

    /// Add or remove the cell under a coordinate.
    ///
    /// With `verify`, the point toggles: added if absent, removed if
    /// present (click-to-select semantics). Without `verify` it is always
    /// appended, the bulk fast path for callers that guarantee uniqueness
    /// themselves. Points outside the footprint are dropped.
    pub fn toggle_point(&mut self, raster: &RasterBlock, x: f64, y: f64, verify: bool) {
        let Some(cell) = raster.header().checked_ij(x, y, CoordMode::Relative) else {
            debug!(x, y, "toggle outside the grid footprint dropped");
            return;
        };
        let set = self.ensure_explicit(raster);
        if verify {
            set.toggle(cell);
        } else {
            set.push_unchecked(cell);
        }
    }

    /// Batch variant of [`toggle_point`](Self::toggle_point).
    ///
    /// With `verify`, repeated points cancel pairwise (unique-with-parity):
    /// a point listed an even number of times leaves the selection as it
    /// was. Without `verify`, the list is simply de-duplicated and
    /// appended.
    pub fn toggle_points(&mut self, raster: &RasterBlock, points: &[(f64, f64)], verify: bool) {
        let header = raster.header();
        let cells: Vec<Cell> = points
            .iter()
            .filter_map(|&(x, y)| header.checked_ij(x, y, CoordMode::Relative))
            .collect();

        if verify {
            let mut parity: HashMap<Cell, usize> = HashMap::new();
            let mut unique: Vec<Cell> = Vec::new();
            for cell in cells {
                let count = parity.entry(cell).or_insert(0);
                if *count == 0 {
                    unique.push(cell);
                }
                *count += 1;
            }
            let set = self.ensure_explicit(raster);
            for cell in unique {
                if parity[&cell] % 2 == 1 {
                    set.toggle(cell);
                }
            }
        } else {
            let set = self.ensure_explicit(raster);
            for cell in cells {
                set.insert(cell);
            }
        }
    }

    // === Spatial selection ===

    /// Add every cell whose center falls inside the polygon.
    pub fn select_inside_polygon(
        &mut self,
        raster: &RasterBlock,
        polygon: &[(f64, f64)],
        mask_filter: bool,
    ) {
        let centers = raster.cells_inside_polygon(polygon, mask_filter);
        let header = raster.header();
        let cells: Vec<Cell> = centers
            .iter()
            .filter_map(|&(x, y)| header.checked_ij(x, y, CoordMode::Relative))
            .collect();
        let set = self.ensure_explicit(raster);
        for cell in cells {
            set.insert(cell);
        }
    }

    /// Add every cell traversed by the polyline.
    pub fn select_under_polyline(
        &mut self,
        raster: &RasterBlock,
        polyline: &[(f64, f64)],
        mask_filter: bool,
    ) {
        let cells = raster.cells_under_polyline(polyline, mask_filter);
        let set = self.ensure_explicit(raster);
        for cell in cells {
            set.insert(cell);
        }
    }

    // === Conditional selection ===

    /// Select cells passing a value or mask predicate.
    ///
    /// On an empty (or all-cells) selection the whole grid is scanned.
    /// On an explicit selection the predicate intersects with it: cells
    /// already selected stay only if they also pass.
    pub fn condition_select(&mut self, raster: &RasterBlock, cond: Condition) {
        match &mut self.selection {
            Selection::Explicit(set) if !set.is_empty() => {
                set.retain(|(i, j)| match raster.cell(i, j) {
                    Some((value, valid)) => cond.matches(value, valid),
                    None => false,
                });
                debug!(kept = set.len(), "condition intersected explicit selection");
            }
            _ => {
                let (nx, ny, _) = raster.shape();
                let mut set = CellSet::new();
                for j in 0..ny {
                    for i in 0..nx {
                        if let Some((value, valid)) = raster.cell(i, j) {
                            if cond.matches(value, valid) {
                                set.push_unchecked((i, j));
                            }
                        }
                    }
                }
                debug!(selected = set.len(), "condition scanned the whole grid");
                self.selection = Selection::Explicit(set);
            }
        }
    }

    // === Scoped edits ===

    /// Conditionally edit values inside the selection scope.
    ///
    /// Cells passing `cond` receive `value op current`. An empty selection
    /// edits the whole grid, like `All`. The `IsNan` condition always uses
    /// replace semantics: NaN fails every arithmetic identity anyway.
    pub fn apply(&self, raster: &mut RasterBlock, op: ApplyOp, value: f64, cond: Condition) {
        if op == ApplyOp::Div && value == 0.0 {
            warn!("conditional division by zero skipped");
            return;
        }

        let mut touched = 0usize;
        for (i, j) in self.scope_cells(raster) {
            let Some((current, valid)) = raster.cell(i, j) else {
                continue;
            };
            if !cond.matches(current, valid) {
                continue;
            }
            let next = if cond == Condition::IsNan {
                value
            } else {
                match op {
                    ApplyOp::Add => current + value,
                    ApplyOp::Sub => current - value,
                    ApplyOp::Mul => current * value,
                    ApplyOp::Div => current / value,
                    ApplyOp::Replace => value,
                }
            };
            raster.set(i, j, next);
            touched += 1;
        }
        debug!(?op, touched, "conditional edit");
        if touched > 0 {
            raster.invalidate();
        }
    }

    /// Conditionally mask cells inside the selection scope.
    ///
    /// Same predicate surface as [`apply`](Self::apply), mutating the mask
    /// instead of values: every cell passing `cond` becomes masked.
    pub fn apply_mask(&self, raster: &mut RasterBlock, cond: Condition) {
        let mut touched = 0usize;
        for (i, j) in self.scope_cells(raster) {
            let Some((value, valid)) = raster.cell(i, j) else {
                continue;
            };
            if cond.matches(value, valid) && valid {
                raster.set_masked(i, j, true);
                touched += 1;
            }
        }
        debug!(touched, "conditional mask edit");
        if touched > 0 {
            raster.invalidate();
        }
    }

    // === Stashes ===

    /// Detach the active selection into a named, tagged bucket. The active
    /// selection becomes empty.
    pub fn stash(&mut self, name: impl Into<String>, tag: impl Into<String>) {
        let name = name.into();
        let selection = std::mem::take(&mut self.selection);
        if self
            .stashes
            .insert(
                name.clone(),
                Stash {
                    tag: tag.into(),
                    selection,
                },
            )
            .is_some()
        {
            debug!(%name, "replaced existing stash");
        }
    }

    /// Reinstate a stashed selection as the active one, removing it from
    /// the bucket. Returns false when no stash carries the name.
    pub fn recall(&mut self, name: &str) -> bool {
        match self.stashes.remove(name) {
            Some(stash) => {
                self.selection = stash.selection;
                true
            }
            None => false,
        }
    }

    /// Drop a stash without recalling it.
    pub fn drop_stash(&mut self, name: &str) -> bool {
        self.stashes.remove(name).is_some()
    }

    /// Stash names with their display tags.
    pub fn stashes(&self) -> impl Iterator<Item = (&str, &Stash)> {
        self.stashes.iter().map(|(name, stash)| (name.as_str(), stash))
    }

    // === Materialization ===

    /// Promote the selection into a standalone block: the minimal bounding
    /// header covering the selected cells, selected values gathered, every
    /// other cell masked.
    pub fn materialize(&self, raster: &RasterBlock) -> GridResult<RasterBlock> {
        let set = match &self.selection {
            Selection::Empty => {
                return Err(GridError::format("cannot materialize an empty selection"))
            }
            Selection::All => return Ok(raster.clone()),
            Selection::Explicit(set) if set.is_empty() => {
                return Err(GridError::format("cannot materialize an empty selection"))
            }
            Selection::Explicit(set) => set,
        };

        let mut i0 = usize::MAX;
        let mut j0 = usize::MAX;
        let mut i1 = 0usize;
        let mut j1 = 0usize;
        for &(i, j) in set.cells() {
            i0 = i0.min(i);
            j0 = j0.min(j);
            i1 = i1.max(i);
            j1 = j1.max(j);
        }

        let h = raster.header();
        let header = GridHeader::new(
            i1 - i0 + 1,
            j1 - j0 + 1,
            h.ox + i0 as f64 * h.dx,
            h.oy + j0 as f64 * h.dy,
            h.dx,
            h.dy,
            h.record_type,
        )?
        .with_translation(h.tx, h.ty);

        let mut out = RasterBlock::masked(header, *raster.config())?;
        for &(i, j) in set.cells() {
            if let Some(value) = raster.get(i, j) {
                out.set(i - i0, j - j0, value);
            }
        }
        debug!(
            cells = set.len(),
            nx = out.header().nx,
            ny = out.header().ny,
            "materialized selection"
        );
        Ok(out)
    }

    // === Echo policy ===

    /// Set the advisory threshold above which the selection should not be
    /// echoed through a renderer. None disables the policy.
    pub fn set_echo_threshold(&mut self, threshold: Option<usize>) {
        self.echo_threshold = threshold;
    }

    /// Advisory check: true when the selection exceeds the configured echo
    /// threshold. Purely a rendering hint, no effect on correctness.
    pub fn echo_suppressed(&self, raster: &RasterBlock) -> bool {
        match self.echo_threshold {
            Some(limit) if self.count_on(raster) > limit => {
                warn!(limit, "selection exceeds echo threshold");
                true
            }
            _ => false,
        }
    }

    // === Internals ===

    /// Cells the current scope addresses, in a stable order.
    fn scope_cells(&self, raster: &RasterBlock) -> Vec<Cell> {
        match &self.selection {
            Selection::Explicit(set) if !set.is_empty() => set.cells().to_vec(),
            // no selection means everything, as does All
            _ => {
                let (nx, ny, _) = raster.shape();
                let mut cells = Vec::with_capacity(nx * ny);
                for j in 0..ny {
                    for i in 0..nx {
                        cells.push((i, j));
                    }
                }
                cells
            }
        }
    }

    /// Mutable access to the explicit cell set, converting `Empty` or
    /// `All` first.
    fn ensure_explicit(&mut self, raster: &RasterBlock) -> &mut CellSet {
        if !matches!(self.selection, Selection::Explicit(_)) {
            let mut set = CellSet::new();
            if matches!(self.selection, Selection::All) {
                let (nx, ny, _) = raster.shape();
                for j in 0..ny {
                    for i in 0..nx {
                        set.push_unchecked((i, j));
                    }
                }
            }
            self.selection = Selection::Explicit(set);
        }
        match &mut self.selection {
            Selection::Explicit(set) => set,
            _ => unreachable!(),
        }
    }
}
