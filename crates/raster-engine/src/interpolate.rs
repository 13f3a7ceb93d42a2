//! Scattered-data interpolation onto grid cells.

use crate::block::RasterBlock;
use grid_common::{BoundingBox, CoordMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Interpolation method for scattered samples.
///
/// `Nearest` preserves exact sample values; the weighted kernels smooth
/// between neighbors inside a fixed search radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScatterMethod {
    /// Value of the closest sample.
    Nearest,
    /// Inverse-distance-squared weighting over the search neighborhood.
    #[default]
    Linear,
    /// Cubic falloff weighting over the search neighborhood.
    Cubic,
}

impl ScatterMethod {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "nearest" => Self::Nearest,
            "cubic" => Self::Cubic,
            _ => Self::Linear,
        }
    }
}

impl std::fmt::Display for ScatterMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Linear => write!(f, "linear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

impl RasterBlock {
    /// Fill cells from scattered `(x, y) -> value` samples.
    ///
    /// Targets are either the explicit `restrict` cell list or every cell
    /// within the samples' footprint. Cells for which the interpolation is
    /// undefined (no sample within the search radius) keep their previous
    /// value and masking.
    pub fn interpolate_scatter(
        &mut self,
        points: &[(f64, f64)],
        values: &[f64],
        method: ScatterMethod,
        restrict: Option<&[(usize, usize)]>,
    ) {
        if points.is_empty() {
            warn!("scatter interpolation skipped: no samples");
            return;
        }
        if points.len() != values.len() {
            warn!(
                points = points.len(),
                values = values.len(),
                "scatter interpolation: sample count mismatch, extra entries ignored"
            );
        }
        let n = points.len().min(values.len());
        let samples = &points[..n];
        let sample_values = &values[..n];

        let targets: Vec<(usize, usize)> = match restrict {
            Some(cells) => cells.to_vec(),
            None => {
                let Some(bbox) = BoundingBox::of_points(samples) else {
                    return;
                };
                match self.header.window_for(&bbox) {
                    Some(w) => {
                        let mut cells = Vec::with_capacity(w.nx * w.ny);
                        for j in w.j0..w.j0 + w.ny {
                            for i in w.i0..w.i0 + w.nx {
                                cells.push((i, j));
                            }
                        }
                        cells
                    }
                    None => return,
                }
            }
        };

        let radius = 4.0 * self.header.dx.hypot(self.header.dy);
        let mut filled = 0usize;
        for (i, j) in targets {
            let (x, y) = self.header.xy_from_ij(i as i64, j as i64, CoordMode::Relative);
            if let Some(v) = estimate(x, y, samples, sample_values, method, radius) {
                self.set(i, j, v);
                filled += 1;
            }
        }

        debug!(%method, filled, "scatter interpolation");
        if filled > 0 {
            self.invalidate();
        }
    }
}

/// Estimate one location from the samples, or None when undefined.
fn estimate(
    x: f64,
    y: f64,
    points: &[(f64, f64)],
    values: &[f64],
    method: ScatterMethod,
    radius: f64,
) -> Option<f64> {
    const EXACT: f64 = 1e-12;

    match method {
        ScatterMethod::Nearest => {
            let mut best = None;
            let mut best_d2 = f64::INFINITY;
            for (&(px, py), &v) in points.iter().zip(values) {
                let d2 = (px - x).powi(2) + (py - y).powi(2);
                if d2 < best_d2 {
                    best_d2 = d2;
                    best = Some(v);
                }
            }
            best
        }
        ScatterMethod::Linear | ScatterMethod::Cubic => {
            let mut weight_sum = 0.0;
            let mut value_sum = 0.0;
            let mut hit = false;
            for (&(px, py), &v) in points.iter().zip(values) {
                let d = (px - x).hypot(py - y);
                if d < EXACT {
                    return Some(v);
                }
                if d > radius {
                    continue;
                }
                hit = true;
                let w = match method {
                    ScatterMethod::Linear => 1.0 / (d * d),
                    ScatterMethod::Cubic => (1.0 - d / radius).powi(3),
                    ScatterMethod::Nearest => unreachable!(),
                };
                weight_sum += w;
                value_sum += w * v;
            }
            if !hit || weight_sum == 0.0 {
                None
            } else {
                Some(value_sum / weight_sum)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_common::{GridHeader, RecordType};

    fn block_4x4() -> RasterBlock {
        let header = GridHeader::new(4, 4, 0.0, 0.0, 1.0, 1.0, RecordType::Float64).unwrap();
        RasterBlock::from_values(header, vec![-1.0; 16]).unwrap()
    }

    #[test]
    fn test_from_str() {
        assert_eq!(ScatterMethod::from_str("NEAREST"), ScatterMethod::Nearest);
        assert_eq!(ScatterMethod::from_str("cubic"), ScatterMethod::Cubic);
        assert_eq!(ScatterMethod::from_str("whatever"), ScatterMethod::Linear);
    }

    #[test]
    fn test_nearest_assigns_closest_sample() {
        let mut b = block_4x4();
        let pts = [(0.5, 0.5), (3.5, 3.5)];
        let vals = [10.0, 20.0];
        b.interpolate_scatter(&pts, &vals, ScatterMethod::Nearest, None);
        assert_eq!(b.get(0, 0), Some(10.0));
        assert_eq!(b.get(3, 3), Some(20.0));
        assert_eq!(b.get(1, 1), Some(10.0));
        assert_eq!(b.get(2, 2), Some(20.0));
    }

    #[test]
    fn test_exact_hit_returns_sample_value() {
        let mut b = block_4x4();
        b.interpolate_scatter(&[(1.5, 1.5)], &[42.0], ScatterMethod::Linear, None);
        assert_eq!(b.get(1, 1), Some(42.0));
    }

    #[test]
    fn test_linear_weights_between_samples() {
        let mut b = block_4x4();
        // symmetric samples around cell (1,0) center at (1.5, 0.5)
        let pts = [(0.5, 0.5), (2.5, 0.5)];
        let vals = [0.0, 10.0];
        b.interpolate_scatter(&pts, &vals, ScatterMethod::Linear, None);
        let v = b.get(1, 0).unwrap();
        assert!((v - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_cells_outside_footprint_keep_value() {
        let mut b = block_4x4();
        // samples only cover the lower-left cell
        b.interpolate_scatter(&[(0.5, 0.5)], &[9.0], ScatterMethod::Linear, None);
        // footprint window is the single cell (0,0)
        assert_eq!(b.get(0, 0), Some(9.0));
        assert_eq!(b.get(3, 3), Some(-1.0));
    }

    #[test]
    fn test_restricted_to_cells() {
        let mut b = block_4x4();
        let restrict = [(2, 2)];
        b.interpolate_scatter(
            &[(0.5, 0.5), (3.5, 3.5)],
            &[10.0, 20.0],
            ScatterMethod::Cubic,
            Some(&restrict),
        );
        assert!(b.get(2, 2).unwrap() > 10.0);
        // untouched outside the restriction
        assert_eq!(b.get(1, 1), Some(-1.0));
    }

    #[test]
    fn test_empty_samples_is_noop() {
        let mut b = block_4x4();
        b.interpolate_scatter(&[], &[], ScatterMethod::Nearest, None);
        assert_eq!(b.get(0, 0), Some(-1.0));
    }
}
