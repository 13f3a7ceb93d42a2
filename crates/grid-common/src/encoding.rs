//! On-disk cell encodings.
//!
//! The record type is persisted in the text header (`TypeEnregistrement`)
//! and fixes both the per-cell byte width of the binary payload and, for
//! composite types, the multi-block layout.

use crate::error::{GridError, GridResult};
use serde::{Deserialize, Serialize};

/// Persisted cell encoding, keyed by the historical integer ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordType {
    /// id 1: 32-bit float cells.
    Float32,
    /// id 2: 64-bit float cells.
    Float64,
    /// id 3: multi-block composite of float32 blocks.
    MultiBlockFloat32,
    /// id 4: 16-bit integer flags, mask-only payloads.
    LogicalInt16,
    /// id 6: 32-bit integer cells.
    Int32,
    /// id 7: 32-bit float cells with a Z dimension.
    Float32Volume,
    /// id 9: multi-block composite of int32 blocks.
    MultiBlockInt32,
    /// id 11: 16-bit integer cells.
    Int16,
    /// id 20: multi-block composite of int32 index blocks.
    MultiBlockInt32Indexed,
}

impl RecordType {
    /// The persisted integer id.
    pub fn code(&self) -> i64 {
        match self {
            RecordType::Float32 => 1,
            RecordType::Float64 => 2,
            RecordType::MultiBlockFloat32 => 3,
            RecordType::LogicalInt16 => 4,
            RecordType::Int32 => 6,
            RecordType::Float32Volume => 7,
            RecordType::MultiBlockInt32 => 9,
            RecordType::Int16 => 11,
            RecordType::MultiBlockInt32Indexed => 20,
        }
    }

    /// Decode a persisted id.
    pub fn from_code(code: i64) -> GridResult<Self> {
        match code {
            1 => Ok(RecordType::Float32),
            2 => Ok(RecordType::Float64),
            3 => Ok(RecordType::MultiBlockFloat32),
            4 => Ok(RecordType::LogicalInt16),
            6 => Ok(RecordType::Int32),
            7 => Ok(RecordType::Float32Volume),
            9 => Ok(RecordType::MultiBlockInt32),
            11 => Ok(RecordType::Int16),
            20 => Ok(RecordType::MultiBlockInt32Indexed),
            other => Err(GridError::UnknownRecordType(other)),
        }
    }

    /// On-disk width of one cell, in bytes.
    pub fn byte_width(&self) -> usize {
        match self.scalar_type() {
            RecordType::Float32 | RecordType::Float32Volume => 4,
            RecordType::Float64 => 8,
            RecordType::Int32 => 4,
            RecordType::Int16 | RecordType::LogicalInt16 => 2,
            // scalar_type never returns a composite
            _ => unreachable!(),
        }
    }

    /// Whether this encoding describes a multi-block composite.
    pub fn is_multiblock(&self) -> bool {
        matches!(
            self,
            RecordType::MultiBlockFloat32
                | RecordType::MultiBlockInt32
                | RecordType::MultiBlockInt32Indexed
        )
    }

    /// Whether this encoding carries a Z dimension.
    pub fn is_3d(&self) -> bool {
        matches!(self, RecordType::Float32Volume)
    }

    /// The per-block scalar encoding of a composite type, or self for
    /// plain scalar types.
    pub fn scalar_type(&self) -> RecordType {
        match self {
            RecordType::MultiBlockFloat32 => RecordType::Float32,
            RecordType::MultiBlockInt32 | RecordType::MultiBlockInt32Indexed => RecordType::Int32,
            other => *other,
        }
    }

    /// Whether the in-memory scalar is rounded to an integer on write.
    pub fn is_integer(&self) -> bool {
        matches!(
            self.scalar_type(),
            RecordType::Int16 | RecordType::Int32 | RecordType::LogicalInt16
        )
    }
}
