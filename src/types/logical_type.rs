//! This module defines the canonical, type-safe representation of the logical
//! column types a server declares in batch metadata.
//!
//! The physical Arrow type of a column only says how values are laid out; the
//! `logicalType` field metadata says what they mean (a FIXED column stored as
//! Int32 with scale 2 is a decimal, an Int64 TIMESTAMP_NTZ column is a count of
//! ticks). Decoders are selected from the pair.

use std::collections::HashMap;
use std::fmt;

use arrow::datatypes::DataType as ArrowDataType;
use serde::{Deserialize, Serialize};

use crate::batch::format::{LOGICAL_TYPE_KEY, PRECISION_KEY, SCALE_KEY};
use crate::error::{Result, RowsetError};

/// Largest supported fractional-second scale (nanoseconds).
pub const MAX_TIME_SCALE: u32 = 9;

/// Largest supported fixed-point scale, the Decimal128 digit ceiling.
pub const MAX_FIXED_SCALE: u32 = 38;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicalType {
    /// Fixed-point number: integer when `scale == 0`, decimal otherwise.
    Fixed { precision: Option<u8>, scale: u32 },
    Real,
    Text,
    Binary,
    Boolean,
    /// Days since 1970-01-01.
    Date,
    /// Ticks of `10^-scale` seconds since midnight.
    Time { scale: u32 },
    /// Ticks of `10^-scale` seconds since the epoch, without a time zone.
    TimestampNtz { scale: u32 },
}

impl LogicalType {
    /// Reads the logical type from an Arrow field's metadata map.
    ///
    /// A missing or unknown `logicalType` is an `UnsupportedType` error; a present
    /// but unparsable `scale`/`precision` is a `Format` error.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self> {
        let kind = metadata.get(LOGICAL_TYPE_KEY).ok_or_else(|| {
            RowsetError::UnsupportedType(format!(
                "column metadata declares no '{}'",
                LOGICAL_TYPE_KEY
            ))
        })?;

        let logical = match kind.to_ascii_uppercase().as_str() {
            "FIXED" => LogicalType::Fixed {
                precision: parse_optional::<u8>(metadata, PRECISION_KEY)?,
                scale: parse_fixed_scale(metadata)?,
            },
            "REAL" => LogicalType::Real,
            "TEXT" => LogicalType::Text,
            "BINARY" => LogicalType::Binary,
            "BOOLEAN" => LogicalType::Boolean,
            "DATE" => LogicalType::Date,
            "TIME" => LogicalType::Time {
                scale: parse_time_scale(metadata)?,
            },
            "TIMESTAMP_NTZ" => LogicalType::TimestampNtz {
                scale: parse_time_scale(metadata)?,
            },
            other => {
                return Err(RowsetError::UnsupportedType(format!(
                    "logical type '{}' has no decoder",
                    other
                )))
            }
        };
        Ok(logical)
    }

    /// Renders the metadata map a writer attaches to a field of this type.
    pub fn to_metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert(LOGICAL_TYPE_KEY.to_string(), self.kind_name().to_string());
        match self {
            LogicalType::Fixed { precision, scale } => {
                metadata.insert(SCALE_KEY.to_string(), scale.to_string());
                if let Some(precision) = precision {
                    metadata.insert(PRECISION_KEY.to_string(), precision.to_string());
                }
            }
            LogicalType::Time { scale } | LogicalType::TimestampNtz { scale } => {
                metadata.insert(SCALE_KEY.to_string(), scale.to_string());
            }
            _ => {}
        }
        metadata
    }

    /// The metadata spelling of this kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LogicalType::Fixed { .. } => "FIXED",
            LogicalType::Real => "REAL",
            LogicalType::Text => "TEXT",
            LogicalType::Binary => "BINARY",
            LogicalType::Boolean => "BOOLEAN",
            LogicalType::Date => "DATE",
            LogicalType::Time { .. } => "TIME",
            LogicalType::TimestampNtz { .. } => "TIMESTAMP_NTZ",
        }
    }

    /// Returns `true` if `physical` is a layout this logical type can be decoded from.
    pub fn accepts_physical(&self, physical: &ArrowDataType) -> bool {
        use ArrowDataType as A;
        match self {
            LogicalType::Fixed { .. } => matches!(
                physical,
                A::Int8 | A::Int16 | A::Int32 | A::Int64 | A::Decimal128(_, _)
            ),
            LogicalType::Real => matches!(physical, A::Float64 | A::Float32),
            LogicalType::Text => matches!(physical, A::Utf8 | A::LargeUtf8),
            LogicalType::Binary => matches!(physical, A::Binary | A::LargeBinary),
            LogicalType::Boolean => matches!(physical, A::Boolean),
            LogicalType::Date => matches!(physical, A::Int32 | A::Date32),
            LogicalType::Time { .. } => matches!(physical, A::Int32 | A::Int64),
            LogicalType::TimestampNtz { .. } => matches!(physical, A::Int64),
        }
    }

    /// Two columns agree when kind and scale agree; precision is advisory.
    pub fn is_compatible_with(&self, other: &LogicalType) -> bool {
        match (self, other) {
            (LogicalType::Fixed { scale: a, .. }, LogicalType::Fixed { scale: b, .. }) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Fixed {
                precision: Some(precision),
                scale,
            } => write!(f, "FIXED({}, {})", precision, scale),
            LogicalType::Fixed {
                precision: None,
                scale,
            } => write!(f, "FIXED(scale {})", scale),
            LogicalType::Time { scale } => write!(f, "TIME({})", scale),
            LogicalType::TimestampNtz { scale } => write!(f, "TIMESTAMP_NTZ({})", scale),
            other => f.write_str(other.kind_name()),
        }
    }
}

fn parse_optional<T: std::str::FromStr>(
    metadata: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>> {
    match metadata.get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RowsetError::format(
                None,
                None,
                format!("field metadata '{}' has invalid value '{}'", key, raw),
            )
        }),
    }
}

fn parse_fixed_scale(metadata: &HashMap<String, String>) -> Result<u32> {
    let scale = parse_optional::<u32>(metadata, SCALE_KEY)?.unwrap_or(0);
    if scale > MAX_FIXED_SCALE {
        return Err(RowsetError::UnsupportedType(format!(
            "fixed-point scale {} exceeds {}",
            scale, MAX_FIXED_SCALE
        )));
    }
    Ok(scale)
}

fn parse_time_scale(metadata: &HashMap<String, String>) -> Result<u32> {
    let scale = parse_optional::<u32>(metadata, SCALE_KEY)?.unwrap_or(MAX_TIME_SCALE);
    if scale > MAX_TIME_SCALE {
        return Err(RowsetError::UnsupportedType(format!(
            "fractional-second scale {} exceeds {}",
            scale, MAX_TIME_SCALE
        )));
    }
    Ok(scale)
}
