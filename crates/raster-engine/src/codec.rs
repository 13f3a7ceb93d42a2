//! Fixed-width binary payload codec.
//!
//! Payloads are a plain sequence of cells in column-major order, one
//! fixed-width little-endian scalar per cell, no framing and no padding.
//! The record type from the header fixes the scalar width; the null-value
//! sentinel from the configuration marks masked cells on disk.

use crate::block::RasterBlock;
use grid_common::{GridError, GridResult, RecordType};
use num_traits::NumCast;
use tracing::debug;

/// Decode a scalar payload into f64 cells.
///
/// `bytes` must hold at least `cells * record_type.byte_width()` bytes;
/// a short buffer is a truncation error, never a partial result.
pub fn decode_payload(bytes: &[u8], record_type: RecordType, cells: usize) -> GridResult<Vec<f64>> {
    let width = record_type.byte_width();
    let expected = cells * width;
    if bytes.len() < expected {
        return Err(GridError::TruncatedPayload {
            expected,
            got: bytes.len(),
        });
    }

    let mut out = Vec::with_capacity(cells);
    let data = &bytes[..expected];
    match record_type.scalar_type() {
        RecordType::Float32 | RecordType::Float32Volume => {
            for chunk in data.chunks_exact(4) {
                out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64);
            }
        }
        RecordType::Float64 => {
            for chunk in data.chunks_exact(8) {
                out.push(f64::from_le_bytes([
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ]));
            }
        }
        RecordType::Int32 => {
            for chunk in data.chunks_exact(4) {
                out.push(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64);
            }
        }
        RecordType::Int16 | RecordType::LogicalInt16 => {
            for chunk in data.chunks_exact(2) {
                out.push(i16::from_le_bytes([chunk[0], chunk[1]]) as f64);
            }
        }
        // scalar_type never returns a composite
        _ => unreachable!(),
    }
    Ok(out)
}

/// Encode f64 cells into a scalar payload. Masked cells are written as
/// the sentinel; integer encodings round to the nearest integer.
pub fn encode_payload(
    values: &[f64],
    valid: &[bool],
    record_type: RecordType,
    sentinel: f64,
) -> Vec<u8> {
    let width = record_type.byte_width();
    let mut out = Vec::with_capacity(values.len() * width);
    for (&value, &ok) in values.iter().zip(valid) {
        let v = if ok { value } else { sentinel };
        match record_type.scalar_type() {
            RecordType::Float32 | RecordType::Float32Volume => {
                out.extend_from_slice(&(v as f32).to_le_bytes());
            }
            RecordType::Float64 => {
                out.extend_from_slice(&v.to_le_bytes());
            }
            RecordType::Int32 => {
                let q: i32 = <i32 as NumCast>::from(v.round()).unwrap_or(0);
                out.extend_from_slice(&q.to_le_bytes());
            }
            RecordType::Int16 | RecordType::LogicalInt16 => {
                let q: i16 = <i16 as NumCast>::from(v.round()).unwrap_or(0);
                out.extend_from_slice(&q.to_le_bytes());
            }
            _ => unreachable!(),
        }
    }
    out
}

impl RasterBlock {
    /// Populate cells from a binary payload.
    ///
    /// Consumes exactly `cell_count · byte_width` bytes. Cells equal to
    /// the null-value sentinel become masked unless masking is disabled.
    pub fn read_payload(&mut self, bytes: &[u8]) -> GridResult<()> {
        let cells = self.header.cell_count();
        self.values = decode_payload(bytes, self.header.record_type, cells)?;

        if self.config.masking_enabled {
            let sentinel = self.config.null_value;
            let mut count = 0usize;
            self.valid = self
                .values
                .iter()
                .map(|&v| {
                    let ok = v != sentinel;
                    if ok {
                        count += 1;
                    }
                    ok
                })
                .collect();
            self.not_null = count;
        } else {
            self.valid = vec![true; cells];
            self.not_null = cells;
        }

        self.loaded = true;
        debug!(
            cells,
            not_null = self.not_null,
            record_type = self.header.record_type.code(),
            "decoded raster payload"
        );
        self.invalidate();
        Ok(())
    }

    /// Serialize cells into a binary payload.
    ///
    /// Inverse of [`read_payload`](Self::read_payload) for unmasked cells;
    /// masked cells leave as the null-value sentinel.
    pub fn write_payload(&self) -> Vec<u8> {
        encode_payload(
            &self.values,
            &self.valid,
            self.header.record_type,
            self.config.null_value,
        )
    }
}
