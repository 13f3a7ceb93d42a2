//! Composite rasters built from several independently sized blocks.

use crate::block::RasterBlock;
use crate::config::RasterConfig;
use bytes::Bytes;
use grid_common::{BoundingBox, CoordMode, GridError, GridHeader, GridResult, RecordType};
use std::collections::BTreeMap;
use tracing::debug;

/// An ordered collection of [`RasterBlock`]s sharing one logical identity.
///
/// Block keys are stable 1-based indices; the enclosing header is used
/// only for the union envelope and for serialization of the nested block
/// geometry.
#[derive(Debug, Clone)]
pub struct MultiBlockRaster {
    pub(crate) envelope: GridHeader,
    pub(crate) blocks: BTreeMap<u32, RasterBlock>,
    pub(crate) config: RasterConfig,
}

impl MultiBlockRaster {
    /// Create an empty composite of the given multi-block record type.
    pub fn new(record_type: RecordType) -> GridResult<Self> {
        Self::with_config(record_type, RasterConfig::default())
    }

    /// Like [`MultiBlockRaster::new`] with explicit configuration.
    pub fn with_config(record_type: RecordType, config: RasterConfig) -> GridResult<Self> {
        if !record_type.is_multiblock() {
            return Err(GridError::format(format!(
                "record type id {} is not a multi-block encoding",
                record_type.code()
            )));
        }
        Ok(Self {
            envelope: GridHeader::new(0, 0, 0.0, 0.0, 1.0, 1.0, record_type)?,
            blocks: BTreeMap::new(),
            config,
        })
    }

    /// Build the composite a multi-block header describes, every block
    /// filled with the configured fill value.
    pub fn from_header(header: GridHeader, config: RasterConfig) -> GridResult<Self> {
        if !header.is_multiblock() {
            return Err(GridError::format(
                "from_header requires a multi-block header",
            ));
        }
        let mut raster = Self::with_config(header.record_type, config)?;
        raster.envelope.tx = header.tx;
        raster.envelope.ty = header.ty;
        for block_header in &header.blocks {
            raster.insert_block(RasterBlock::with_config(block_header.clone(), config)?);
        }
        Ok(raster)
    }

    /// Append a block under the next 1-based key, growing the envelope.
    pub fn insert_block(&mut self, block: RasterBlock) -> u32 {
        let key = self.blocks.len() as u32 + 1;
        self.blocks.insert(key, block);
        self.recompute_envelope();
        key
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, key: u32) -> Option<&RasterBlock> {
        self.blocks.get(&key)
    }

    pub fn block_mut(&mut self, key: u32) -> Option<&mut RasterBlock> {
        self.blocks.get_mut(&key)
    }

    /// Blocks in key order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &RasterBlock)> {
        self.blocks.iter().map(|(&k, b)| (k, b))
    }

    /// Whether every block carries a populated payload.
    ///
    /// False for an empty composite and after a load whose backing source
    /// was missing.
    pub fn is_loaded(&self) -> bool {
        !self.blocks.is_empty() && self.blocks.values().all(|b| b.is_loaded())
    }

    /// The enclosing envelope header.
    pub fn envelope(&self) -> &GridHeader {
        &self.envelope
    }

    /// Configuration shared with every block created through
    /// [`from_header`](Self::from_header).
    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Serializable header: envelope plus the nested block geometry.
    pub fn header(&self) -> GridResult<GridHeader> {
        let nested: Vec<GridHeader> = self.blocks.values().map(|b| b.header().clone()).collect();
        self.envelope.clone().with_blocks(nested)
    }

    fn recompute_envelope(&mut self) {
        let mut bounds: Option<BoundingBox> = None;
        for block in self.blocks.values() {
            let b = block.header().bounds(CoordMode::Relative);
            bounds = Some(match bounds {
                None => b,
                Some(acc) => acc.union(&b),
            });
        }
        if let Some(b) = bounds {
            self.envelope.ox = b.min_x;
            self.envelope.oy = b.min_y;
            // envelope extents are advisory; cell size stays unit
            self.envelope.nx = b.width().ceil() as usize;
            self.envelope.ny = b.height().ceil() as usize;
        }
    }

    /// Total unmasked cells across every block.
    pub fn not_null_count(&self) -> usize {
        self.blocks.values().map(|b| b.not_null_count()).sum()
    }

    /// Delegate sentinel masking to every block.
    ///
    /// Returns the aggregated not-null count.
    pub fn mask_equal(&mut self, v: f64) -> usize {
        for block in self.blocks.values_mut() {
            block.mask_equal(v);
        }
        self.not_null_count()
    }

    /// Read the concatenated payload: each block sequentially in key
    /// order, each sized by its own header, no separators.
    ///
    /// A truncated stream is a fatal error, never a partial result.
    pub fn read_payload(&mut self, bytes: &Bytes) -> GridResult<()> {
        let expected: usize = self
            .blocks
            .values()
            .map(|b| b.header().payload_byte_len())
            .sum();
        if bytes.len() < expected {
            return Err(GridError::TruncatedPayload {
                expected,
                got: bytes.len(),
            });
        }

        let mut offset = 0usize;
        for (key, block) in self.blocks.iter_mut() {
            let len = block.header().payload_byte_len();
            let slice = bytes.slice(offset..offset + len);
            block.read_payload(&slice)?;
            debug!(key, bytes = len, "decoded block payload");
            offset += len;
        }
        Ok(())
    }

    /// Concatenate every block's payload in key order.
    pub fn write_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for block in self.blocks.values() {
            out.extend_from_slice(&block.write_payload());
        }
        out
    }

    /// Find the block answering for a coordinate.
    ///
    /// Returns the first block, in key order, whose footprint contains the
    /// point and whose cell there is unmasked. When blocks legitimately
    /// overlap, the earliest-inserted unmasked hit wins: a deliberate
    /// tie-break kept from the historical composite layouts.
    pub fn resolve(&self, x: f64, y: f64) -> Option<(u32, usize, usize)> {
        for (&key, block) in &self.blocks {
            let Some((i, j)) = block.header().checked_ij(x, y, CoordMode::Relative) else {
                continue;
            };
            if !block.is_masked_at(i, j) {
                return Some((key, i, j));
            }
        }
        None
    }

    /// Value at a coordinate, across blocks, or None where every block is
    /// masked or out of footprint.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let (key, i, j) = self.resolve(x, y)?;
        self.blocks[&key].get(i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_overlapping_blocks() -> MultiBlockRaster {
        let mut raster = MultiBlockRaster::new(RecordType::MultiBlockFloat32).unwrap();

        let ha = GridHeader::new(2, 2, 0.0, 0.0, 1.0, 1.0, RecordType::Float32).unwrap();
        let a = RasterBlock::from_values(ha, vec![5.0; 4]).unwrap();
        raster.insert_block(a);

        // second block overlaps the first over x in [1, 2)
        let hb = GridHeader::new(2, 2, 1.0, 0.0, 1.0, 1.0, RecordType::Float32).unwrap();
        let b = RasterBlock::from_values(hb, vec![9.0; 4]).unwrap();
        raster.insert_block(b);

        raster
    }

    #[test]
    fn test_first_inserted_unmasked_wins() {
        let mut raster = two_overlapping_blocks();
        // overlap cell at (1.5, 0.5): both blocks cover it
        assert_eq!(raster.value_at(1.5, 0.5), Some(5.0));

        // masking the later block changes nothing: A still answers
        raster.block_mut(2).unwrap().set_masked(0, 0, true);
        assert_eq!(raster.resolve(1.5, 0.5).map(|(k, _, _)| k), Some(1));
        assert_eq!(raster.value_at(1.5, 0.5), Some(5.0));

        // mask block A there too: resolution falls through to block B
        raster.block_mut(2).unwrap().set_masked(0, 0, false);
        raster.block_mut(1).unwrap().set_masked(1, 0, true);
        assert_eq!(raster.resolve(1.5, 0.5).map(|(k, _, _)| k), Some(2));
        assert_eq!(raster.value_at(1.5, 0.5), Some(9.0));
    }

    #[test]
    fn test_resolve_misses_outside_every_block() {
        let raster = two_overlapping_blocks();
        assert!(raster.resolve(50.0, 50.0).is_none());
        assert!(raster.value_at(50.0, 50.0).is_none());
    }

    #[test]
    fn test_payload_round_trip() {
        let raster = two_overlapping_blocks();
        let payload = Bytes::from(raster.write_payload());
        assert_eq!(payload.len(), 2 * 4 * 4);

        let mut back =
            MultiBlockRaster::from_header(raster.header().unwrap(), RasterConfig::default())
                .unwrap();
        back.read_payload(&payload).unwrap();
        assert_eq!(back.value_at(0.5, 0.5), Some(5.0));
        assert_eq!(back.value_at(2.5, 0.5), Some(9.0));
        assert_eq!(back.not_null_count(), 8);
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        let mut raster = two_overlapping_blocks();
        let payload = Bytes::from(raster.write_payload()[..20].to_vec());
        assert!(matches!(
            raster.read_payload(&payload),
            Err(GridError::TruncatedPayload { expected: 32, got: 20 })
        ));
    }

    #[test]
    fn test_mask_equal_aggregates() {
        let mut raster = two_overlapping_blocks();
        let remaining = raster.mask_equal(5.0);
        assert_eq!(remaining, 4); // block A fully masked
        assert_eq!(raster.block(1).unwrap().not_null_count(), 0);
    }

    #[test]
    fn test_envelope_union() {
        let raster = two_overlapping_blocks();
        let env = raster.envelope().bounds(CoordMode::Relative);
        assert_eq!(env.min_x, 0.0);
        assert_eq!(env.max_x, 3.0);
        assert_eq!(env.max_y, 2.0);
    }

    #[test]
    fn test_scalar_record_type_rejected() {
        assert!(MultiBlockRaster::new(RecordType::Float32).is_err());
    }
}
