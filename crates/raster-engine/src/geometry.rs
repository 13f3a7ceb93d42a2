//! Spatial cell queries against polygons and polylines.

use crate::block::RasterBlock;
use grid_common::{BoundingBox, CoordMode};
use std::collections::HashSet;

impl RasterBlock {
    /// Cell centers falling inside a polygon, in column-major scan order.
    ///
    /// The point-in-polygon test only runs over the polygon's index-space
    /// footprint. With `mask_filter`, masked cells are skipped.
    pub fn cells_inside_polygon(
        &self,
        polygon: &[(f64, f64)],
        mask_filter: bool,
    ) -> Vec<(f64, f64)> {
        if polygon.len() < 3 {
            return Vec::new();
        }
        let Some(bbox) = BoundingBox::of_points(polygon) else {
            return Vec::new();
        };
        let Some(window) = self.header.window_for(&bbox) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for j in window.j0..window.j0 + window.ny {
            for i in window.i0..window.i0 + window.nx {
                if mask_filter && self.is_masked_at(i, j) {
                    continue;
                }
                let (x, y) = self.header.xy_from_ij(i as i64, j as i64, CoordMode::Relative);
                if point_in_polygon(x, y, polygon) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Cells traversed by a polyline, as an ordered unique index list.
    ///
    /// The polyline is densified at a step of `min(dx, dy) / 2` so no
    /// cell on the path is skipped; samples falling outside the grid are
    /// dropped. With `mask_filter`, masked cells are skipped.
    pub fn cells_under_polyline(
        &self,
        polyline: &[(f64, f64)],
        mask_filter: bool,
    ) -> Vec<(usize, usize)> {
        if polyline.is_empty() {
            return Vec::new();
        }
        let step = self.header.dx.min(self.header.dy) / 2.0;

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut visit = |x: f64, y: f64, block: &RasterBlock| {
            let Some((i, j)) = block.header.checked_ij(x, y, CoordMode::Relative) else {
                return;
            };
            if mask_filter && block.is_masked_at(i, j) {
                return;
            }
            if seen.insert((i, j)) {
                out.push((i, j));
            }
        };

        visit(polyline[0].0, polyline[0].1, self);
        for segment in polyline.windows(2) {
            let (x0, y0) = segment[0];
            let (x1, y1) = segment[1];
            let length = (x1 - x0).hypot(y1 - y0);
            let steps = (length / step).ceil().max(1.0) as usize;
            for s in 1..=steps {
                let t = s as f64 / steps as f64;
                visit(x0 + t * (x1 - x0), y0 + t * (y1 - y0), self);
            }
        }
        out
    }
}

/// Ray-casting point-in-polygon test.
fn point_in_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}
