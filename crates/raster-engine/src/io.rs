//! On-disk file-pair I/O.
//!
//! A raster persists as `<name>` (raw binary payload) next to
//! `<name>.txt` (canonical text header). Reading is strictly sequential
//! and non-resumable. A missing source is reported and leaves the object
//! in an explicit not-loaded state; it is not an error, since the engine
//! is routinely driven interactively against half-configured projects.

use crate::block::RasterBlock;
use crate::config::RasterConfig;
use crate::multiblock::MultiBlockRaster;
use bytes::Bytes;
use grid_common::{GridError, GridHeader, GridResult, LegacyHeader, RecordType};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Path of the text header companion: `<name>.txt` next to `<name>`.
fn header_path(payload: &Path) -> PathBuf {
    let mut s: OsString = payload.as_os_str().to_owned();
    s.push(".txt");
    PathBuf::from(s)
}

fn read_header(payload_path: &Path) -> GridResult<Option<GridHeader>> {
    let path = header_path(payload_path);
    if !path.exists() {
        warn!(path = %path.display(), "header file missing, raster left unloaded");
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    GridHeader::from_text(&text).map(Some)
}

impl RasterBlock {
    /// Read a raster from its file pair.
    ///
    /// A malformed header is fatal. A missing header or payload file is
    /// reported and yields a block with `loaded == false`; every accessor
    /// then answers with its fallback.
    pub fn load(path: impl AsRef<Path>, config: RasterConfig) -> GridResult<RasterBlock> {
        let path = path.as_ref();

        let Some(header) = read_header(path)? else {
            let mut block = RasterBlock::masked(
                GridHeader::new(0, 0, 0.0, 0.0, 1.0, 1.0, RecordType::Float32)?,
                config,
            )?;
            block.loaded = false;
            block.source = Some(path.to_path_buf());
            return Ok(block);
        };
        if header.is_multiblock() {
            return Err(GridError::format(
                "header describes a multi-block raster; use MultiBlockRaster::load",
            ));
        }

        let mut block = RasterBlock::masked(header, config)?;
        block.source = Some(path.to_path_buf());
        if !path.exists() {
            warn!(path = %path.display(), "payload file missing, raster left unloaded");
            block.loaded = false;
            return Ok(block);
        }

        let bytes = std::fs::read(path)?;
        block.read_payload(&bytes)?;
        info!(
            path = %path.display(),
            cells = block.len(),
            not_null = block.not_null_count(),
            "loaded raster"
        );
        Ok(block)
    }

    /// Write the raster to its configured destination.
    ///
    /// With no destination configured this is a reported no-op, never a
    /// crash: interactive sessions save freely before a project has a
    /// backing file.
    pub fn save(&self) -> GridResult<()> {
        let Some(path) = self.source.clone() else {
            warn!("no destination configured, raster write skipped");
            return Ok(());
        };
        self.write_pair(&path)
    }

    /// Write the raster to an explicit path and remember it as the
    /// destination for later saves.
    pub fn save_to(&mut self, path: impl Into<PathBuf>) -> GridResult<()> {
        let path = path.into();
        self.write_pair(&path)?;
        self.source = Some(path);
        Ok(())
    }

    fn write_pair(&self, path: &Path) -> GridResult<()> {
        std::fs::write(header_path(path), self.header.to_text())?;
        std::fs::write(path, self.write_payload())?;
        debug!(path = %path.display(), "wrote raster pair");
        Ok(())
    }

    /// Legacy read-only import of a `.flt`/`.hdr` pair.
    ///
    /// The declared NODATA scalar becomes the block's null-value sentinel.
    /// Upper-left anchored headers (`ULXMAP` dialect) store rows top-down
    /// and are flipped into the native bottom-anchored order.
    pub fn import_flt(path: impl AsRef<Path>, config: RasterConfig) -> GridResult<RasterBlock> {
        let path = path.as_ref();
        let hdr_path = path.with_extension("hdr");
        if !hdr_path.exists() {
            return Err(GridError::not_found(hdr_path.display().to_string()));
        }
        if !path.exists() {
            return Err(GridError::not_found(path.display().to_string()));
        }

        let legacy = LegacyHeader::parse(&std::fs::read_to_string(&hdr_path)?)?;
        let mut config = config;
        if let Some(nodata) = legacy.nodata {
            config.null_value = nodata;
        }

        let header = legacy.header;
        let (nx, ny) = (header.nx, header.ny);
        let bytes = std::fs::read(path)?;
        let flat = crate::codec::decode_payload(&bytes, RecordType::Float32, nx * ny)?;

        let mut block = RasterBlock::masked(header, config)?;
        for j in 0..ny {
            // legacy rows arrive top-down in the ULXMAP dialect
            let src_row = if legacy.row_flip { ny - 1 - j } else { j };
            for i in 0..nx {
                let v = flat[i + src_row * nx];
                if config.masking_enabled && v == config.null_value {
                    continue;
                }
                block.set(i, j, v);
            }
        }
        block.source = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            nx, ny,
            flipped = legacy.row_flip,
            "imported legacy float grid"
        );
        Ok(block)
    }
}

impl MultiBlockRaster {
    /// Read a composite raster from its file pair.
    ///
    /// Same contract as [`RasterBlock::load`], except a truncated
    /// concatenated payload is a fatal format error, never a partial
    /// result.
    pub fn load(path: impl AsRef<Path>, config: RasterConfig) -> GridResult<MultiBlockRaster> {
        let path = path.as_ref();

        let Some(header) = read_header(path)? else {
            return MultiBlockRaster::with_config(RecordType::MultiBlockFloat32, config);
        };
        let mut raster = MultiBlockRaster::from_header(header, config)?;

        if !path.exists() {
            warn!(path = %path.display(), "payload file missing, raster left unloaded");
            for block in raster.blocks.values_mut() {
                block.loaded = false;
            }
            return Ok(raster);
        }
        let bytes = Bytes::from(std::fs::read(path)?);
        raster.read_payload(&bytes)?;
        info!(
            path = %path.display(),
            blocks = raster.len(),
            not_null = raster.not_null_count(),
            "loaded multi-block raster"
        );
        Ok(raster)
    }

    /// Write the composite raster and its header to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> GridResult<()> {
        let path = path.as_ref();
        std::fs::write(header_path(path), self.header()?.to_text())?;
        std::fs::write(path, self.write_payload())?;
        debug!(path = %path.display(), blocks = self.len(), "wrote multi-block pair");
        Ok(())
    }
}
