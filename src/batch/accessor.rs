// In: src/batch/accessor.rs

//! Typed, random-access views over one row group's column arrays.
//!
//! Each accessor holds its Arrow array by reference count, so building one never
//! copies value buffers; only the single value asked for is materialized. The
//! concrete variant is chosen once per column from the (logical, physical) pair,
//! which keeps the per-row path free of downcasts.

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array, Decimal128Array,
    Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array, LargeBinaryArray,
    LargeStringArray, StringArray,
};
use arrow::datatypes::{
    DataType as ArrowDataType, Date32Type, Decimal128Type, Float32Type, Float64Type, Int16Type,
    Int32Type, Int64Type, Int8Type,
};
use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime};

use crate::error::{Result, RowsetError};
use crate::types::logical_type::{MAX_FIXED_SCALE, MAX_TIME_SCALE};
use crate::types::{ColumnDescriptor, LogicalType, Value};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Integer arrays a fixed-point or tick-based column may be stored in.
#[derive(Debug, Clone)]
pub enum IntegerArray {
    Int8(Int8Array),
    Int16(Int16Array),
    Int32(Int32Array),
    Int64(Int64Array),
}

impl IntegerArray {
    fn try_new(array: &ArrayRef) -> Option<Self> {
        match array.data_type() {
            ArrowDataType::Int8 => Some(Self::Int8(array.as_primitive::<Int8Type>().clone())),
            ArrowDataType::Int16 => Some(Self::Int16(array.as_primitive::<Int16Type>().clone())),
            ArrowDataType::Int32 => Some(Self::Int32(array.as_primitive::<Int32Type>().clone())),
            ArrowDataType::Int64 => Some(Self::Int64(array.as_primitive::<Int64Type>().clone())),
            _ => None,
        }
    }

    fn as_array(&self) -> &dyn Array {
        match self {
            Self::Int8(a) => a,
            Self::Int16(a) => a,
            Self::Int32(a) => a,
            Self::Int64(a) => a,
        }
    }

    fn value(&self, row: usize) -> i64 {
        match self {
            Self::Int8(a) => i64::from(a.value(row)),
            Self::Int16(a) => i64::from(a.value(row)),
            Self::Int32(a) => i64::from(a.value(row)),
            Self::Int64(a) => a.value(row),
        }
    }
}

/// A column accessor bound to one row group.
#[derive(Debug, Clone)]
pub enum ColumnAccessor {
    Fixed { array: IntegerArray, scale: u32 },
    Decimal { array: Decimal128Array, scale: u32 },
    Real(Float64Array),
    RealNarrow(Float32Array),
    Text(StringArray),
    LargeText(LargeStringArray),
    Binary(BinaryArray),
    LargeBinary(LargeBinaryArray),
    Boolean(BooleanArray),
    DateDays(Int32Array),
    Date32(Date32Array),
    Time { array: IntegerArray, scale: u32 },
    TimestampNtz { array: Int64Array, scale: u32 },
}

impl ColumnAccessor {
    /// Selects the accessor for `descriptor` over `array`.
    ///
    /// Fails with `UnsupportedType` when the array's layout is not one the
    /// descriptor's logical type can be decoded from.
    pub fn try_new(descriptor: &ColumnDescriptor, array: &ArrayRef) -> Result<Self> {
        let unsupported = || {
            RowsetError::UnsupportedType(format!(
                "column '{}': logical type {} cannot be read from {:?}",
                descriptor.name,
                descriptor.logical_type,
                array.data_type()
            ))
        };

        let scale_in_range = match descriptor.logical_type {
            LogicalType::Fixed { scale, .. } => scale <= MAX_FIXED_SCALE,
            LogicalType::Time { scale } | LogicalType::TimestampNtz { scale } => {
                scale <= MAX_TIME_SCALE
            }
            _ => true,
        };
        if !scale_in_range {
            return Err(unsupported());
        }

        let accessor = match (&descriptor.logical_type, array.data_type()) {
            (LogicalType::Fixed { .. }, ArrowDataType::Decimal128(_, array_scale)) => {
                if *array_scale < 0 || *array_scale as u32 > MAX_FIXED_SCALE {
                    return Err(unsupported());
                }
                ColumnAccessor::Decimal {
                    array: array.as_primitive::<Decimal128Type>().clone(),
                    scale: *array_scale as u32,
                }
            }
            (LogicalType::Fixed { scale, .. }, _) => ColumnAccessor::Fixed {
                array: IntegerArray::try_new(array).ok_or_else(unsupported)?,
                scale: *scale,
            },
            (LogicalType::Real, ArrowDataType::Float64) => {
                ColumnAccessor::Real(array.as_primitive::<Float64Type>().clone())
            }
            (LogicalType::Real, ArrowDataType::Float32) => {
                ColumnAccessor::RealNarrow(array.as_primitive::<Float32Type>().clone())
            }
            (LogicalType::Text, ArrowDataType::Utf8) => {
                ColumnAccessor::Text(array.as_string::<i32>().clone())
            }
            (LogicalType::Text, ArrowDataType::LargeUtf8) => {
                ColumnAccessor::LargeText(array.as_string::<i64>().clone())
            }
            (LogicalType::Binary, ArrowDataType::Binary) => {
                ColumnAccessor::Binary(array.as_binary::<i32>().clone())
            }
            (LogicalType::Binary, ArrowDataType::LargeBinary) => {
                ColumnAccessor::LargeBinary(array.as_binary::<i64>().clone())
            }
            (LogicalType::Boolean, ArrowDataType::Boolean) => {
                ColumnAccessor::Boolean(array.as_boolean().clone())
            }
            (LogicalType::Date, ArrowDataType::Int32) => {
                ColumnAccessor::DateDays(array.as_primitive::<Int32Type>().clone())
            }
            (LogicalType::Date, ArrowDataType::Date32) => {
                ColumnAccessor::Date32(array.as_primitive::<Date32Type>().clone())
            }
            (LogicalType::Time { scale }, _) => ColumnAccessor::Time {
                array: IntegerArray::try_new(array).ok_or_else(unsupported)?,
                scale: *scale,
            },
            (LogicalType::TimestampNtz { scale }, ArrowDataType::Int64) => {
                ColumnAccessor::TimestampNtz {
                    array: array.as_primitive::<Int64Type>().clone(),
                    scale: *scale,
                }
            }
            _ => return Err(unsupported()),
        };
        Ok(accessor)
    }

    fn as_array(&self) -> &dyn Array {
        match self {
            ColumnAccessor::Fixed { array, .. } | ColumnAccessor::Time { array, .. } => {
                array.as_array()
            }
            ColumnAccessor::Decimal { array, .. } => array,
            ColumnAccessor::Real(a) => a,
            ColumnAccessor::RealNarrow(a) => a,
            ColumnAccessor::Text(a) => a,
            ColumnAccessor::LargeText(a) => a,
            ColumnAccessor::Binary(a) => a,
            ColumnAccessor::LargeBinary(a) => a,
            ColumnAccessor::Boolean(a) => a,
            ColumnAccessor::DateDays(a) => a,
            ColumnAccessor::Date32(a) => a,
            ColumnAccessor::TimestampNtz { array, .. } => array,
        }
    }

    pub fn len(&self) -> usize {
        self.as_array().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.as_array().is_null(row)
    }

    /// Reads the value at `row`; `Ok(None)` is SQL NULL.
    ///
    /// Fails with `Format` if `row` is out of bounds or the stored ticks do not
    /// name a representable date or time.
    pub fn value_at(&self, row: usize) -> Result<Option<Value>> {
        if row >= self.len() {
            return Err(RowsetError::format(
                None,
                None,
                format!("row {} is outside a row group of {} rows", row, self.len()),
            ));
        }
        if self.is_null(row) {
            return Ok(None);
        }

        let value = match self {
            ColumnAccessor::Fixed { array, scale: 0 } => Value::Integer(array.value(row)),
            ColumnAccessor::Fixed { array, scale } => Value::Decimal(BigDecimal::new(
                BigInt::from(array.value(row)),
                i64::from(*scale),
            )),
            ColumnAccessor::Decimal { array, scale } => Value::Decimal(BigDecimal::new(
                BigInt::from(array.value(row)),
                i64::from(*scale),
            )),
            ColumnAccessor::Real(a) => Value::Real(a.value(row)),
            ColumnAccessor::RealNarrow(a) => Value::Real(f64::from(a.value(row))),
            ColumnAccessor::Text(a) => Value::Text(a.value(row).to_string()),
            ColumnAccessor::LargeText(a) => Value::Text(a.value(row).to_string()),
            ColumnAccessor::Binary(a) => Value::Binary(a.value(row).to_vec()),
            ColumnAccessor::LargeBinary(a) => Value::Binary(a.value(row).to_vec()),
            ColumnAccessor::Boolean(a) => Value::Boolean(a.value(row)),
            ColumnAccessor::DateDays(a) => Value::Date(date_from_epoch_days(a.value(row))?),
            ColumnAccessor::Date32(a) => Value::Date(date_from_epoch_days(a.value(row))?),
            ColumnAccessor::Time { array, scale } => {
                Value::Time(time_from_ticks(array.value(row), *scale)?)
            }
            ColumnAccessor::TimestampNtz { array, scale } => {
                let (secs, nanos) = split_ticks(array.value(row), *scale);
                let ts = DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
                    out_of_range("timestamp", array.value(row))
                })?;
                Value::Timestamp(ts.naive_utc())
            }
        };
        Ok(Some(value))
    }
}

//==================================================================================
// Private Helpers
//==================================================================================

/// Splits `ticks` of `10^-scale` seconds into whole seconds and nanoseconds.
fn split_ticks(ticks: i64, scale: u32) -> (i64, u32) {
    let per_second = 10_i64.pow(scale);
    let secs = ticks.div_euclid(per_second);
    let fraction = ticks.rem_euclid(per_second);
    let nanos = fraction * 10_i64.pow(9 - scale);
    (secs, nanos as u32)
}

fn date_from_epoch_days(days: i32) -> Result<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| out_of_range("date", i64::from(days)))
}

fn time_from_ticks(ticks: i64, scale: u32) -> Result<NaiveTime> {
    let (secs, nanos) = split_ticks(ticks, scale);
    u32::try_from(secs)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos))
        .ok_or_else(|| out_of_range("time", ticks))
}

fn out_of_range(kind: &str, raw: i64) -> RowsetError {
    RowsetError::format(
        None,
        None,
        format!("stored {} value {} is out of range", kind, raw),
    )
}
