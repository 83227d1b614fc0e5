//! Decoding of libpq text-format cells into [`RowValues`].
//!
//! This is the only place that interprets a column's native `Oid`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tokio_postgres::types::Type;

use crate::error::PqMiddlewareError;
use crate::guard::ResultClear;
use crate::native::{ClientLibrary, Oid};
use crate::output::OutputParameter;
use crate::params::{DATE_FORMAT, TIMESTAMP_FORMAT, TIME_FORMAT};
use crate::results::ResultSet;
use crate::types::{FieldType, RowValues};

/// Map a column's native type to the tag its values decode as.
///
/// Types without a dedicated tag decode as text.
#[must_use]
pub fn field_type_for_oid(oid: Oid) -> FieldType {
    let Some(ty) = Type::from_oid(oid) else {
        return FieldType::String;
    };
    match ty {
        Type::BOOL => FieldType::Boolean,
        Type::INT2 => FieldType::Int16,
        Type::INT4 => FieldType::Int32,
        Type::INT8 => FieldType::Int64,
        Type::OID => FieldType::UInt32,
        Type::FLOAT4 => FieldType::Float,
        Type::FLOAT8 => FieldType::Double,
        Type::CHAR => FieldType::Char,
        Type::BYTEA => FieldType::Blob,
        Type::TIMESTAMP | Type::TIMESTAMPTZ => FieldType::DateTime,
        Type::DATE => FieldType::Date,
        Type::TIME | Type::TIMETZ => FieldType::Time,
        _ => FieldType::String,
    }
}

/// Decode one cell.
///
/// # Errors
/// Returns `PqMiddlewareError::ExecutionError` when the bytes are not a
/// valid text rendering of the cell's type, or `JsonError` for malformed
/// `json`/`jsonb`.
pub fn extract_value(cell: &OutputParameter<'_>) -> Result<RowValues, PqMiddlewareError> {
    if cell.is_null() {
        return Ok(RowValues::Null);
    }
    let bytes = cell.data().unwrap_or_default();
    let oid = cell.internal_field_type();

    if oid == Type::JSON.oid() || oid == Type::JSONB.oid() {
        return Ok(RowValues::JSON(serde_json::from_slice(bytes)?));
    }

    let fail = |reason: String| {
        PqMiddlewareError::ExecutionError(format!(
            "row {}: cannot decode {:?} value (oid {oid}): {reason}",
            cell.row_number(),
            cell.field_type()
        ))
    };

    if cell.field_type() == FieldType::Blob {
        return decode_bytea(bytes).map(RowValues::Blob).map_err(fail);
    }

    let text = std::str::from_utf8(bytes).map_err(|e| fail(e.to_string()))?;
    let value = match cell.field_type() {
        FieldType::Int8
        | FieldType::UInt8
        | FieldType::Int16
        | FieldType::UInt16
        | FieldType::Int32
        | FieldType::UInt32
        | FieldType::Int64 => RowValues::Int(text.parse().map_err(|e| fail(format!("{e}")))?),
        FieldType::UInt64 => {
            let wide: u64 = text.parse().map_err(|e| fail(format!("{e}")))?;
            RowValues::Int(i64::try_from(wide).map_err(|e| fail(e.to_string()))?)
        }
        FieldType::Boolean => RowValues::Bool(parse_bool(text).ok_or_else(|| fail(text.to_string()))?),
        FieldType::Float | FieldType::Double => {
            RowValues::Float(text.parse().map_err(|e| fail(format!("{e}")))?)
        }
        FieldType::DateTime => RowValues::Timestamp(parse_timestamp(text).map_err(fail)?),
        FieldType::Date => RowValues::Date(
            NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| fail(e.to_string()))?,
        ),
        FieldType::Time => RowValues::Time(parse_time(text).map_err(fail)?),
        FieldType::Null => RowValues::Null,
        FieldType::None
        | FieldType::Char
        | FieldType::String
        | FieldType::Clob
        | FieldType::Blob => RowValues::Text(text.to_string()),
    };
    Ok(value)
}

/// Decode every cell of an owned result into a [`ResultSet`].
///
/// # Errors
/// Returns the first decoding error, see [`extract_value`].
pub fn build_result_set<L: ClientLibrary>(
    result: &ResultClear<L>,
) -> Result<ResultSet, PqMiddlewareError> {
    let column_names = Arc::new(result.column_names());
    let column_count = column_names.len();
    let row_count = result.row_count();

    let mut result_set = ResultSet::with_capacity(row_count);
    result_set.set_column_names(column_names);

    for row in 0..row_count {
        let mut row_values = Vec::with_capacity(column_count);
        for column in 0..column_count {
            let cell = result.output_parameter(row, column).ok_or_else(|| {
                PqMiddlewareError::ExecutionError(format!("cell ({row}, {column}) out of range"))
            })?;
            row_values.push(extract_value(&cell)?);
        }
        result_set.add_row_values(row_values);
    }

    tracing::debug!(rows = row_count, columns = column_count, "built result set");
    Ok(result_set)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "t" | "true" | "TRUE" | "1" => Some(true),
        "f" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

// `timestamptz` carries an offset; it is normalised to UTC.
fn parse_timestamp(text: &str) -> Result<NaiveDateTime, String> {
    let with_offset = format!("{TIMESTAMP_FORMAT}%#z");
    if let Ok(dt) = DateTime::parse_from_str(text, &with_offset) {
        return Ok(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|e| e.to_string())
}

// `timetz` offsets are dropped. PostgreSQL's `24:00:00` maps to chrono's
// leap-second slot after 23:59:59, the only `NaiveTime` one second past it.
fn parse_time(text: &str) -> Result<NaiveTime, String> {
    let local = text
        .rfind(['+', '-'])
        .map_or(text, |offset| &text[..offset]);
    if is_end_of_day(local) {
        return NaiveTime::from_hms_nano_opt(23, 59, 59, 1_000_000_000)
            .ok_or_else(|| "cannot represent 24:00:00".to_string());
    }
    NaiveTime::parse_from_str(local, TIME_FORMAT).map_err(|e| e.to_string())
}

fn is_end_of_day(text: &str) -> bool {
    let Some(rest) = text.strip_prefix("24:00:00") else {
        return text == "24:00";
    };
    rest.is_empty() || rest.strip_prefix('.').is_some_and(|frac| frac.bytes().all(|b| b == b'0'))
}

/// Decode `bytea` in either the hex (`\x0a0b`) or the legacy escape format.
fn decode_bytea(bytes: &[u8]) -> Result<Vec<u8>, String> {
    if let Some(hex) = bytes.strip_prefix(b"\\x") {
        if hex.len() % 2 != 0 {
            return Err("odd number of hex digits".to_string());
        }
        return hex
            .chunks_exact(2)
            .map(|pair| -> Result<u8, String> {
                Ok((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?)
            })
            .collect();
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
        } else if bytes.get(i + 1) == Some(&b'\\') {
            out.push(b'\\');
            i += 2;
        } else {
            let octal = bytes
                .get(i + 1..i + 4)
                .and_then(|d| std::str::from_utf8(d).ok())
                .and_then(|d| u8::from_str_radix(d, 8).ok())
                .ok_or_else(|| format!("bad escape at byte {i}"))?;
            out.push(octal);
            i += 4;
        }
    }
    Ok(out)
}

fn hex_digit(b: u8) -> Result<u8, String> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(format!("invalid hex digit {:?}", b as char)),
    }
}
