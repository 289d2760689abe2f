// In: src/error.rs

//! This module defines the single, unified error type for the entire rowset library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Unlike most error enums, `RowsetError` is `Clone`: a cursor that has failed keeps
//! the original error and hands out the same value on every later call. External
//! errors are therefore folded into the semantic variants as strings rather than
//! wrapped with `#[from]`.

use serde::Serialize;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RowsetError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowsetError {
    // =========================================================================
    // === Data Errors (fatal to the cursor)
    // =========================================================================
    #[error("Malformed batch data{}: {message}", location_suffix(.row_group, .byte_offset))]
    Format {
        /// Index of the row group being decoded when the failure surfaced.
        row_group: Option<usize>,
        /// Bytes of input consumed when the failure surfaced.
        byte_offset: Option<u64>,
        message: String,
    },

    #[error("Unsupported column type: {0}")]
    UnsupportedType(String),

    #[error("Failed to fetch chunk {chunk_index}: {message}")]
    ChunkFetch { chunk_index: usize, message: String },

    #[error("Batch of {requested} bytes exceeds the memory limit ({reserved} of {limit} bytes in use)")]
    MemoryLimitExceeded {
        requested: usize,
        reserved: usize,
        limit: usize,
    },

    // =========================================================================
    // === Usage Errors (fatal to the call only)
    // =========================================================================
    #[error("Column index {index} is out of range (result has {column_count} columns)")]
    InvalidColumnIndex { index: usize, column_count: usize },

    #[error("Cursor is not positioned on a row (position: {position})")]
    CursorNotPositioned { position: &'static str },

    #[error("Cannot convert value '{value}' to {target}")]
    Conversion { value: String, target: &'static str },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),
}

/// A `Copy` discriminant of [`RowsetError`], used for telemetry and assertions.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    UnsupportedType,
    ChunkFetch,
    MemoryLimitExceeded,
    InvalidColumnIndex,
    CursorNotPositioned,
    Conversion,
    Config,
    Internal,
}

impl RowsetError {
    /// Shorthand for a `Format` error with location details.
    pub fn format(
        row_group: Option<usize>,
        byte_offset: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        RowsetError::Format {
            row_group,
            byte_offset,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RowsetError::Format { .. } => ErrorKind::Format,
            RowsetError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            RowsetError::ChunkFetch { .. } => ErrorKind::ChunkFetch,
            RowsetError::MemoryLimitExceeded { .. } => ErrorKind::MemoryLimitExceeded,
            RowsetError::InvalidColumnIndex { .. } => ErrorKind::InvalidColumnIndex,
            RowsetError::CursorNotPositioned { .. } => ErrorKind::CursorNotPositioned,
            RowsetError::Conversion { .. } => ErrorKind::Conversion,
            RowsetError::Config(_) => ErrorKind::Config,
            RowsetError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// The input offset attached to a `Format` error, if any.
    pub fn byte_offset(&self) -> Option<u64> {
        match self {
            RowsetError::Format { byte_offset, .. } => *byte_offset,
            _ => None,
        }
    }
}

fn location_suffix(row_group: &Option<usize>, byte_offset: &Option<u64>) -> String {
    match (row_group, byte_offset) {
        (Some(group), Some(offset)) => format!(" in row group {} (offset {})", group, offset),
        (Some(group), None) => format!(" in row group {}", group),
        (None, Some(offset)) => format!(" at offset {}", offset),
        (None, None) => String::new(),
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<arrow::error::ArrowError> for RowsetError {
    fn from(err: arrow::error::ArrowError) -> Self {
        RowsetError::format(None, None, err.to_string())
    }
}

impl From<base64::DecodeError> for RowsetError {
    fn from(err: base64::DecodeError) -> Self {
        RowsetError::format(None, None, format!("invalid base64 payload: {}", err))
    }
}

impl From<serde_json::Error> for RowsetError {
    fn from(err: serde_json::Error) -> Self {
        RowsetError::Config(err.to_string())
    }
}
