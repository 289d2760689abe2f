//! This file is the root of the `rowset` Rust crate.
//!
//! `rowset` turns a query result delivered as columnar batches (one optionally
//! embedded in the initial response, the rest fetched chunk by chunk) into a
//! single forward-only cursor over typed rows.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library so the Rust compiler
//!     knows they exist.
//! 2.  Re-exporting the types a driver needs to open and walk a result.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod batch;
pub mod chunk;
pub mod config;
pub mod cursor;
pub mod error;
pub mod inline;
pub mod memory;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod testing;

#[doc(hidden)]
pub use log as __log;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use batch::decoder::BatchDecoder;
pub use batch::Batch;
pub use chunk::{
    ChunkFetcher, ChunkSource, ChunkSourceMetrics, FileChunkSource, InMemoryChunkSource,
    PrefetchingChunkSource,
};
pub use config::{ChunkEncoding, RowsetConfig};
pub use cursor::{CursorOptions, CursorPosition, ResultCursor, ResultDescriptor};
pub use error::{ErrorKind, Result, RowsetError};
pub use inline::{InlineBatchProvider, InlinePayload};
pub use memory::{BufferAllocator, MemoryReservation};
pub use telemetry::{LogTelemetry, NoopTelemetry, TelemetryEvent, TelemetrySink};
pub use types::{ColumnDescriptor, LogicalType, RowsetSchema, Value};
