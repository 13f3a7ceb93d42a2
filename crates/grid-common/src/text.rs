//! Canonical text header codec.
//!
//! A grid is persisted as a pair of files: the raw binary payload under
//! `<name>`, and this line-oriented header under `<name>.txt`. Each line is
//! one `key :\t<value>` pair, in fixed order:
//!
//! ```text
//! NbX :\t<int>
//! NbY :\t<int>
//! OrigX :\t<float>
//! OrigY :\t<float>
//! DX :\t<float>
//! DY :\t<float>
//! TypeEnregistrement :\t<int>
//! TranslX :\t<float>
//! TranslY :\t<float>
//! NbZ / OrigZ / DZ / TranslZ          (3D record types only)
//! Nb Blocs :\t<int>                   (multi-block record types only)
//!   then per block: NbX NbY OrigX OrigY DX DY
//! ```

use crate::encoding::RecordType;
use crate::error::{GridError, GridResult};
use crate::header::GridHeader;
use std::fmt::Write as _;

impl GridHeader {
    /// Serialize to the canonical text header.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        write_pair(&mut out, "NbX", self.nx);
        write_pair(&mut out, "NbY", self.ny);
        write_pair(&mut out, "OrigX", self.ox);
        write_pair(&mut out, "OrigY", self.oy);
        write_pair(&mut out, "DX", self.dx);
        write_pair(&mut out, "DY", self.dy);
        write_pair(&mut out, "TypeEnregistrement", self.record_type.code());
        write_pair(&mut out, "TranslX", self.tx);
        write_pair(&mut out, "TranslY", self.ty);
        if self.record_type.is_3d() {
            write_pair(&mut out, "NbZ", self.nz);
            write_pair(&mut out, "OrigZ", self.oz);
            write_pair(&mut out, "DZ", self.dz);
            write_pair(&mut out, "TranslZ", self.tz);
        }
        if self.record_type.is_multiblock() {
            write_pair(&mut out, "Nb Blocs", self.blocks.len());
            for block in &self.blocks {
                write_pair(&mut out, "NbX", block.nx);
                write_pair(&mut out, "NbY", block.ny);
                write_pair(&mut out, "OrigX", block.ox);
                write_pair(&mut out, "OrigY", block.oy);
                write_pair(&mut out, "DX", block.dx);
                write_pair(&mut out, "DY", block.dy);
            }
        }
        out
    }

    /// Parse the canonical text header.
    ///
    /// Keys are expected in the fixed order above; a missing or misplaced
    /// key is a fatal format error.
    pub fn from_text(text: &str) -> GridResult<Self> {
        let mut cursor = Cursor::new(text);

        let nx = cursor.expect("NbX")?.parse_int()?;
        let ny = cursor.expect("NbY")?.parse_int()?;
        let ox = cursor.expect("OrigX")?.parse_float()?;
        let oy = cursor.expect("OrigY")?.parse_float()?;
        let dx = cursor.expect("DX")?.parse_float()?;
        let dy = cursor.expect("DY")?.parse_float()?;
        let code = cursor.expect("TypeEnregistrement")?.parse_i64()?;
        let record_type = RecordType::from_code(code)?;
        let tx = cursor.expect("TranslX")?.parse_float()?;
        let ty = cursor.expect("TranslY")?.parse_float()?;

        let mut header =
            GridHeader::new(nx, ny, ox, oy, dx, dy, record_type)?.with_translation(tx, ty);

        if record_type.is_3d() {
            let nz = cursor.expect("NbZ")?.parse_int()?;
            let oz = cursor.expect("OrigZ")?.parse_float()?;
            let dz = cursor.expect("DZ")?.parse_float()?;
            let tz = cursor.expect("TranslZ")?.parse_float()?;
            header = header.with_z(nz, oz, dz, tz)?;
        }

        if record_type.is_multiblock() {
            let count = cursor.expect("Nb Blocs")?.parse_int()?;
            let mut blocks = Vec::with_capacity(count);
            for _ in 0..count {
                let bnx = cursor.expect("NbX")?.parse_int()?;
                let bny = cursor.expect("NbY")?.parse_int()?;
                let box_ = cursor.expect("OrigX")?.parse_float()?;
                let boy = cursor.expect("OrigY")?.parse_float()?;
                let bdx = cursor.expect("DX")?.parse_float()?;
                let bdy = cursor.expect("DY")?.parse_float()?;
                // Per-block lines carry no translation of their own: each
                // block inherits the parent translation plus the parent
                // origin, so block origins stay small in the file.
                let block = GridHeader::new(bnx, bny, box_, boy, bdx, bdy, record_type.scalar_type())?
                    .with_translation(tx + ox, ty + oy);
                blocks.push(block);
            }
            header = header.with_blocks(blocks)?;
        }

        Ok(header)
    }
}

fn write_pair<V: std::fmt::Display>(out: &mut String, key: &str, value: V) {
    // Infallible for String targets.
    let _ = writeln!(out, "{key} :\t{value}");
}

/// One parsed `key :\t<value>` line.
struct Pair<'a> {
    key: &'a str,
    value: &'a str,
    line_no: usize,
}

impl Pair<'_> {
    fn parse_int(&self) -> GridResult<usize> {
        self.value.parse().map_err(|_| self.bad_value("integer"))
    }

    fn parse_i64(&self) -> GridResult<i64> {
        self.value.parse().map_err(|_| self.bad_value("integer"))
    }

    fn parse_float(&self) -> GridResult<f64> {
        self.value.parse().map_err(|_| self.bad_value("number"))
    }

    fn bad_value(&self, expected: &str) -> GridError {
        GridError::format(format!(
            "line {}: expected {expected} for key '{}', got '{}'",
            self.line_no, self.key, self.value
        ))
    }
}

/// Sequential line reader enforcing the fixed key order.
struct Cursor<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_no: 0,
        }
    }

    fn expect(&mut self, key: &str) -> GridResult<Pair<'a>> {
        loop {
            let line = self
                .lines
                .next()
                .ok_or_else(|| GridError::format(format!("missing header key '{key}'")))?;
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let (found, value) = line.split_once(':').ok_or_else(|| {
                GridError::format(format!(
                    "line {}: expected 'key :\tvalue', got '{line}'",
                    self.line_no
                ))
            })?;
            let found = found.trim();
            if found != key {
                return Err(GridError::format(format!(
                    "line {}: expected key '{key}', found '{found}'",
                    self.line_no
                )));
            }
            return Ok(Pair {
                key: found,
                value: value.trim(),
                line_no: self.line_no,
            });
        }
    }
}
