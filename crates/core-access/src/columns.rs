//! Typed column readers over `turso::Value`.
//!
//! Nullable and boolean columns are matched on the raw value so callers never
//! depend on the driver's `Option` conversions.

use crate::{CoreAccessError, parse_timestamp};
use chrono::{DateTime, Utc};
use turso::{Row, Value as TursoValue};

pub fn text(row: &Row, index: usize) -> Result<String, CoreAccessError> {
    optional_text(row, index)?
        .ok_or_else(|| CoreAccessError::DataIntegrity(format!("Column {index} is NULL")))
}

pub fn optional_text(row: &Row, index: usize) -> Result<Option<String>, CoreAccessError> {
    match row.get_value(index)? {
        TursoValue::Null => Ok(None),
        TursoValue::Text(s) => Ok(Some(s)),
        TursoValue::Integer(i) => Ok(Some(i.to_string())),
        TursoValue::Real(f) => Ok(Some(f.to_string())),
        TursoValue::Blob(_) => Err(CoreAccessError::DataIntegrity(format!(
            "Column {index} holds a BLOB, expected text"
        ))),
    }
}

pub fn integer(row: &Row, index: usize) -> Result<i64, CoreAccessError> {
    optional_integer(row, index)?
        .ok_or_else(|| CoreAccessError::DataIntegrity(format!("Column {index} is NULL")))
}

pub fn optional_integer(row: &Row, index: usize) -> Result<Option<i64>, CoreAccessError> {
    match row.get_value(index)? {
        TursoValue::Null => Ok(None),
        TursoValue::Integer(i) => Ok(Some(i)),
        TursoValue::Real(f) => Ok(Some(f as i64)),
        TursoValue::Text(s) => s.trim().parse().map(Some).map_err(|_| {
            CoreAccessError::DataIntegrity(format!("Column {index} is not an integer: '{s}'"))
        }),
        TursoValue::Blob(_) => Err(CoreAccessError::DataIntegrity(format!(
            "Column {index} holds a BLOB, expected an integer"
        ))),
    }
}

pub fn optional_real(row: &Row, index: usize) -> Result<Option<f64>, CoreAccessError> {
    match row.get_value(index)? {
        TursoValue::Null => Ok(None),
        TursoValue::Integer(i) => Ok(Some(i as f64)),
        TursoValue::Real(f) => Ok(Some(f)),
        TursoValue::Text(s) => s.trim().parse().map(Some).map_err(|_| {
            CoreAccessError::DataIntegrity(format!("Column {index} is not a number: '{s}'"))
        }),
        TursoValue::Blob(_) => Err(CoreAccessError::DataIntegrity(format!(
            "Column {index} holds a BLOB, expected a number"
        ))),
    }
}

/// Booleans are stored as 0/1. NULL reads as `false`.
pub fn flag(row: &Row, index: usize) -> Result<bool, CoreAccessError> {
    Ok(optional_integer(row, index)?.unwrap_or(0) != 0)
}

pub fn timestamp(row: &Row, index: usize) -> Result<DateTime<Utc>, CoreAccessError> {
    parse_timestamp(&text(row, index)?)
}

pub fn optional_timestamp(
    row: &Row,
    index: usize,
) -> Result<Option<DateTime<Utc>>, CoreAccessError> {
    optional_text(row, index)?
        .as_deref()
        .map(parse_timestamp)
        .transpose()
}
