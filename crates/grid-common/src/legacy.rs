//! Legacy float-grid header import.
//!
//! Read-only support for the `.flt`/`.hdr` pair produced by common GIS
//! tools. Two header dialects are accepted: lower-left anchored
//! (`XLLCORNER`/`YLLCORNER` + `CELLSIZE`) and upper-left anchored
//! (`ULXMAP`/`ULYMAP` + `XDIM`/`YDIM`). The upper-left dialect stores rows
//! top-down, so its payload needs a vertical flip into the native
//! bottom-anchored layout.

use crate::encoding::RecordType;
use crate::error::{GridError, GridResult};
use crate::header::GridHeader;
use std::collections::HashMap;
use tracing::debug;

/// Parsed legacy header plus the layout facts the payload reader needs.
#[derive(Debug, Clone)]
pub struct LegacyHeader {
    /// Equivalent native header (always `RecordType::Float32`).
    pub header: GridHeader,
    /// True for upper-left anchored dialects: file rows run top-down and
    /// must be flipped into the bottom-anchored native order.
    pub row_flip: bool,
    /// Declared no-data scalar, if any.
    pub nodata: Option<f64>,
}

impl LegacyHeader {
    /// Parse a legacy `.hdr` text.
    ///
    /// Keys are case-insensitive, one `KEY value` pair per line, order
    /// free. `NCOLS` and `NROWS` are mandatory; anchoring keys decide the
    /// dialect.
    pub fn parse(text: &str) -> GridResult<Self> {
        let mut pairs: HashMap<String, String> = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut split = line.split_whitespace();
            let key = match split.next() {
                Some(k) => k.to_ascii_uppercase(),
                None => continue,
            };
            let value: String = split.collect::<Vec<_>>().join(" ");
            pairs.insert(key, value);
        }

        let ncols = get_int(&pairs, "NCOLS")?;
        let nrows = get_int(&pairs, "NROWS")?;

        let dx;
        let dy;
        if let Some(cellsize) = get_float_opt(&pairs, "CELLSIZE")? {
            dx = cellsize;
            dy = cellsize;
        } else {
            dx = get_float_opt(&pairs, "XDIM")?.ok_or_else(|| {
                GridError::format("legacy header carries neither CELLSIZE nor XDIM")
            })?;
            dy = get_float_opt(&pairs, "YDIM")?.unwrap_or(dx);
        }

        let nodata = match get_float_opt(&pairs, "NODATA_VALUE")? {
            Some(v) => Some(v),
            None => get_float_opt(&pairs, "NODATA")?,
        };

        let (ox, oy, row_flip) = if let Some(xll) = get_float_opt(&pairs, "XLLCORNER")? {
            let yll = get_float_opt(&pairs, "YLLCORNER")?
                .ok_or_else(|| GridError::format("XLLCORNER without YLLCORNER"))?;
            (xll, yll, false)
        } else if let Some(ulx) = get_float_opt(&pairs, "ULXMAP")? {
            let uly = get_float_opt(&pairs, "ULYMAP")?
                .ok_or_else(|| GridError::format("ULXMAP without ULYMAP"))?;
            // Upper-left anchored: re-anchor at the lower-left corner and
            // remember that file rows arrive top-down.
            (ulx, uly - nrows as f64 * dy, true)
        } else {
            return Err(GridError::format(
                "legacy header carries neither XLLCORNER nor ULXMAP",
            ));
        };

        debug!(
            ncols,
            nrows, row_flip, "parsed legacy float-grid header"
        );

        let header = GridHeader::new(ncols, nrows, ox, oy, dx, dy, RecordType::Float32)?;
        Ok(Self {
            header,
            row_flip,
            nodata,
        })
    }
}

fn get_int(pairs: &HashMap<String, String>, key: &str) -> GridResult<usize> {
    let raw = pairs
        .get(key)
        .ok_or_else(|| GridError::format(format!("legacy header is missing {key}")))?;
    raw.parse()
        .map_err(|_| GridError::format(format!("legacy header key {key} is not an integer: '{raw}'")))
}

fn get_float_opt(pairs: &HashMap<String, String>, key: &str) -> GridResult<Option<f64>> {
    match pairs.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| GridError::format(format!("legacy header key {key} is not a number: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_left_dialect() {
        let text = "NCOLS 4\nNROWS 3\nXLLCORNER 100.0\nYLLCORNER 200.0\nCELLSIZE 10.0\nNODATA_VALUE -9999\n";
        let legacy = LegacyHeader::parse(text).unwrap();
        assert!(!legacy.row_flip);
        assert_eq!(legacy.header.nx, 4);
        assert_eq!(legacy.header.ny, 3);
        assert_eq!(legacy.header.ox, 100.0);
        assert_eq!(legacy.header.oy, 200.0);
        assert_eq!(legacy.header.dx, 10.0);
        assert_eq!(legacy.nodata, Some(-9999.0));
    }

    #[test]
    fn test_upper_left_dialect_flips_and_reanchors() {
        let text = "ncols 4\nnrows 3\nulxmap 100.0\nulymap 230.0\nxdim 10.0\nydim 10.0\nnodata -99\n";
        let legacy = LegacyHeader::parse(text).unwrap();
        assert!(legacy.row_flip);
        // lower-left corner is ULYMAP - nrows*dy
        assert_eq!(legacy.header.oy, 200.0);
        assert_eq!(legacy.nodata, Some(-99.0));
    }

    #[test]
    fn test_missing_anchor_is_fatal() {
        let text = "NCOLS 4\nNROWS 3\nCELLSIZE 10.0\n";
        assert!(LegacyHeader::parse(text).is_err());
    }
}
