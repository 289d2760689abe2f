// In: src/config.rs

//! The single source of truth for all rowset cursor configuration.
//!
//! `RowsetConfig` is created once at the application boundary (e.g. from the
//! driver's connection properties rendered as JSON) and then passed down through
//! the cursor and the chunk sources via a shared, read-only `Arc<RowsetConfig>`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RowsetError};

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// How chunk bytes are stored by a file-backed chunk source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkEncoding {
    /// **Default:** the file holds the IPC stream as-is.
    #[default]
    Plain,
    /// The file holds a single zstd frame wrapping the IPC stream.
    Zstd,
}

//==================================================================================
// II. The Unified RowsetConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RowsetConfig {
    /// If true, the cursor binds the schema of the first decoded batch and rejects
    /// any later batch whose columns do not match it.
    #[serde(default = "default_true")]
    pub validate_schema: bool,

    /// Number of background workers used by `PrefetchingChunkSource`.
    #[serde(default = "default_prefetch_threads")]
    pub prefetch_threads: usize,

    /// Maximum number of chunks fetched ahead of the consumer.
    #[serde(default = "default_prefetch_depth")]
    pub prefetch_depth: usize,

    /// Upper bound on the bytes held by live batches. `None` means unbounded.
    #[serde(default)]
    pub memory_limit_bytes: Option<usize>,

    /// Storage encoding of chunk files read by `FileChunkSource`.
    #[serde(default)]
    pub chunk_encoding: ChunkEncoding,
}

impl Default for RowsetConfig {
    fn default() -> Self {
        Self {
            validate_schema: true,
            prefetch_threads: default_prefetch_threads(),
            prefetch_depth: default_prefetch_depth(),
            memory_limit_bytes: None,
            chunk_encoding: ChunkEncoding::default(),
        }
    }
}

impl RowsetConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RowsetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would deadlock or starve the prefetcher.
    pub fn validate(&self) -> Result<()> {
        if self.prefetch_threads == 0 {
            return Err(RowsetError::Config(
                "prefetch_threads must be at least 1".into(),
            ));
        }
        if self.prefetch_depth == 0 {
            return Err(RowsetError::Config(
                "prefetch_depth must be at least 1".into(),
            ));
        }
        if self.memory_limit_bytes == Some(0) {
            return Err(RowsetError::Config(
                "memory_limit_bytes must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_prefetch_threads() -> usize {
    4
}

fn default_prefetch_depth() -> usize {
    2
}
