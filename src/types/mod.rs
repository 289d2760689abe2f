//! This module defines the core, strongly-typed data representations shared by
//! the decoder, the chunk sources and the cursor.
//!
//! - `LogicalType`: what a column means, read from field metadata.
//! - `ColumnDescriptor` / `RowsetSchema`: the immutable result schema.
//! - `Value`: a decoded, non-null cell.

pub mod logical_type;
pub mod schema;
pub mod value;

// Re-export the main types for easier access.
pub use logical_type::LogicalType;
pub use schema::{ColumnDescriptor, RowsetSchema};
pub use value::Value;
