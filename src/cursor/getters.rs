//! Typed convenience getters over `ResultCursor::get_column`.
//!
//! Every getter takes a one-based column index and returns `Ok(None)` for NULL.
//! A value that cannot be represented in the requested type fails with
//! `RowsetError::Conversion`; the cursor position is unaffected.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::ResultCursor;
use crate::error::Result;
use crate::types::Value;

impl ResultCursor {
    fn get_with<T>(
        &self,
        index: usize,
        convert: impl FnOnce(&Value) -> Result<T>,
    ) -> Result<Option<T>> {
        self.get_column(index)?.as_ref().map(convert).transpose()
    }

    pub fn get_i32(&self, index: usize) -> Result<Option<i32>> {
        self.get_with(index, Value::to_i32)
    }

    pub fn get_i64(&self, index: usize) -> Result<Option<i64>> {
        self.get_with(index, Value::to_i64)
    }

    pub fn get_f64(&self, index: usize) -> Result<Option<f64>> {
        self.get_with(index, Value::to_f64)
    }

    pub fn get_bool(&self, index: usize) -> Result<Option<bool>> {
        self.get_with(index, Value::to_bool)
    }

    /// Any value rendered as text.
    pub fn get_string(&self, index: usize) -> Result<Option<String>> {
        self.get_with(index, |value| Ok(value.to_string()))
    }

    pub fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>> {
        self.get_with(index, Value::to_bytes)
    }

    pub fn get_decimal(&self, index: usize) -> Result<Option<BigDecimal>> {
        self.get_with(index, Value::to_decimal)
    }

    pub fn get_date(&self, index: usize) -> Result<Option<NaiveDate>> {
        self.get_with(index, Value::to_date)
    }

    pub fn get_time(&self, index: usize) -> Result<Option<NaiveTime>> {
        self.get_with(index, Value::to_time)
    }

    pub fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>> {
        self.get_with(index, Value::to_timestamp)
    }
}
