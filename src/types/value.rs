//! The typed value returned by column accessors, and the conversions behind the
//! cursor's typed getters.

use std::fmt;

use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, RowsetError};

/// A non-null column value. SQL NULL is represented as `None` by every accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Decimal(BigDecimal),
    Real(f64),
    Text(String),
    Binary(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
        }
    }

    fn conversion_error(&self, target: &'static str) -> RowsetError {
        RowsetError::Conversion {
            value: self.to_string(),
            target,
        }
    }

    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Value::Integer(v) => Ok(*v),
            Value::Decimal(d) if d.with_scale(0) == *d => {
                d.to_i64().ok_or_else(|| self.conversion_error("i64"))
            }
            Value::Real(f) if f.fract() == 0.0 && f.is_finite() => {
                f.to_i64().ok_or_else(|| self.conversion_error("i64"))
            }
            Value::Text(s) => s.trim().parse().map_err(|_| self.conversion_error("i64")),
            Value::Boolean(b) => Ok(i64::from(*b)),
            _ => Err(self.conversion_error("i64")),
        }
    }

    pub fn to_i32(&self) -> Result<i32> {
        let wide = self.to_i64()?;
        i32::try_from(wide).map_err(|_| self.conversion_error("i32"))
    }

    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Integer(v) => Ok(*v as f64),
            Value::Decimal(d) => d.to_f64().ok_or_else(|| self.conversion_error("f64")),
            Value::Real(f) => Ok(*f),
            Value::Text(s) => s.trim().parse().map_err(|_| self.conversion_error("f64")),
            _ => Err(self.conversion_error("f64")),
        }
    }

    pub fn to_decimal(&self) -> Result<BigDecimal> {
        match self {
            Value::Integer(v) => Ok(BigDecimal::from(*v)),
            Value::Decimal(d) => Ok(d.clone()),
            Value::Real(f) => BigDecimal::from_f64(*f).ok_or_else(|| self.conversion_error("decimal")),
            Value::Text(s) => s.trim().parse().map_err(|_| self.conversion_error("decimal")),
            _ => Err(self.conversion_error("decimal")),
        }
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(v) => Ok(*v != 0),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(self.conversion_error("bool")),
            },
            _ => Err(self.conversion_error("bool")),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Value::Binary(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(self.conversion_error("bytes")),
        }
    }

    pub fn to_date(&self) -> Result<NaiveDate> {
        match self {
            Value::Date(d) => Ok(*d),
            Value::Timestamp(ts) => Ok(ts.date()),
            _ => Err(self.conversion_error("date")),
        }
    }

    pub fn to_time(&self) -> Result<NaiveTime> {
        match self {
            Value::Time(t) => Ok(*t),
            Value::Timestamp(ts) => Ok(ts.time()),
            _ => Err(self.conversion_error("time")),
        }
    }

    pub fn to_timestamp(&self) -> Result<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            _ => Err(self.conversion_error("timestamp")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Binary(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t),
            Value::Timestamp(ts) => write!(f, "{}", ts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_integer_conversions() {
        assert_eq!(Value::Integer(42).to_i32().unwrap(), 42);
        assert_eq!(Value::Text(" 17 ".into()).to_i64().unwrap(), 17);
        assert_eq!(
            Value::Decimal(BigDecimal::from_str("12.00").unwrap())
                .to_i64()
                .unwrap(),
            12
        );

        let overflow = Value::Integer(i64::from(i32::MAX) + 1).to_i32();
        assert!(matches!(
            overflow,
            Err(RowsetError::Conversion { target: "i32", .. })
        ));

        let fractional = Value::Decimal(BigDecimal::from_str("1.5").unwrap()).to_i64();
        assert!(matches!(fractional, Err(RowsetError::Conversion { .. })));
    }

    #[test]
    fn test_decimal_and_real_conversions() {
        let decimal = Value::Decimal(BigDecimal::from_str("3.25").unwrap());
        assert_eq!(decimal.to_f64().unwrap(), 3.25);
        assert_eq!(
            Value::Integer(7).to_decimal().unwrap(),
            BigDecimal::from(7)
        );
        assert!(Value::Boolean(true).to_f64().is_err());
    }

    #[test]
    fn test_bool_conversions() {
        assert!(Value::Text("TRUE".into()).to_bool().unwrap());
        assert!(!Value::Integer(0).to_bool().unwrap());
        assert!(Value::Text("maybe".into()).to_bool().is_err());
    }

    #[test]
    fn test_temporal_conversions() {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        let value = Value::Timestamp(ts);
        assert_eq!(value.to_date().unwrap(), ts.date());
        assert_eq!(value.to_time().unwrap(), ts.time());
        assert!(Value::Integer(1).to_date().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Binary(vec![0xde, 0xad]).to_string(), "dead");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()).to_string(),
            "1970-01-02"
        );
    }
}
