//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in model coordinates.
///
/// Coordinates are in whatever projected unit the grid is anchored to,
/// typically meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Compute the intersection of two bounding boxes.
    ///
    /// The four disjoint arrangements are rejected explicitly; a shared
    /// edge counts as disjoint (zero-area overlap).
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if self.max_x <= other.min_x {
            // entirely left of other
            return None;
        }
        if self.min_x >= other.max_x {
            // entirely right of other
            return None;
        }
        if self.max_y <= other.min_y {
            // entirely below other
            return None;
        }
        if self.min_y >= other.max_y {
            // entirely above other
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Check if this bbox overlaps another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.intersection(other).is_some()
    }

    /// Compute the union envelope of two bounding boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Expand the bounding box by a buffer amount on every side.
    pub fn expand(&self, buffer: f64) -> Self {
        Self {
            min_x: self.min_x - buffer,
            min_y: self.min_y - buffer,
            max_x: self.max_x + buffer,
            max_y: self.max_y + buffer,
        }
    }

    /// Smallest bbox covering a point cloud. None for an empty slice.
    pub fn of_points(points: &[(f64, f64)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bbox = BoundingBox::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }
}
