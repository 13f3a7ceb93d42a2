//! Raster behavior configuration.

use serde::{Deserialize, Serialize};

/// Behavioral knobs for raster cell storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// On-disk scalar standing for "no data". Cells equal to it become
    /// masked on load, and masked cells are written back as it.
    pub null_value: f64,
    /// When false, sentinel cells decode as ordinary values and nothing
    /// is masked on load.
    pub masking_enabled: bool,
    /// Value freshly constructed cells start from.
    pub fill_value: f64,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            null_value: 0.0,
            masking_enabled: true,
            fill_value: 0.0,
        }
    }
}

impl RasterConfig {
    /// Override the null-value sentinel.
    pub fn with_null_value(mut self, null_value: f64) -> Self {
        self.null_value = null_value;
        self
    }

    /// Disable sentinel masking on load.
    pub fn without_masking(mut self) -> Self {
        self.masking_enabled = false;
        self
    }
}
