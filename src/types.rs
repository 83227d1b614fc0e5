use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::PqMiddlewareError;

/// Logical type of a bound parameter or result cell.
///
/// Drives how a value is serialized to and from libpq's text or binary
/// representation. `None` means no type has been set; `Null` means the
/// value is SQL `NULL`. The two are never interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    None,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Boolean,
    Float,
    Double,
    Char,
    String,
    Blob,
    Clob,
    DateTime,
    Date,
    Time,
    Null,
}

impl FieldType {
    /// Every tag, in declaration order.
    pub const ALL: [FieldType; 20] = [
        FieldType::None,
        FieldType::Int8,
        FieldType::UInt8,
        FieldType::Int16,
        FieldType::UInt16,
        FieldType::Int32,
        FieldType::UInt32,
        FieldType::Int64,
        FieldType::UInt64,
        FieldType::Boolean,
        FieldType::Float,
        FieldType::Double,
        FieldType::Char,
        FieldType::String,
        FieldType::Blob,
        FieldType::Clob,
        FieldType::DateTime,
        FieldType::Date,
        FieldType::Time,
        FieldType::Null,
    ];

    /// Large-object tags, bound in libpq's binary format.
    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(self, FieldType::Blob | FieldType::Clob)
    }

    /// Tags whose value travels as text.
    #[must_use]
    pub fn is_textual(self) -> bool {
        !matches!(
            self,
            FieldType::None | FieldType::Null | FieldType::Blob | FieldType::Clob
        )
    }

    /// The tag a framework value is bound as.
    #[must_use]
    pub fn for_value(value: &RowValues) -> FieldType {
        match value {
            RowValues::Int(_) => FieldType::Int64,
            RowValues::Float(_) => FieldType::Double,
            RowValues::Text(_) | RowValues::JSON(_) => FieldType::String,
            RowValues::Bool(_) => FieldType::Boolean,
            RowValues::Timestamp(_) => FieldType::DateTime,
            RowValues::Date(_) => FieldType::Date,
            RowValues::Time(_) => FieldType::Time,
            RowValues::Null => FieldType::Null,
            RowValues::Blob(_) => FieldType::Blob,
        }
    }
}

/// Values that can be stored in a database row or used as query parameters.
///
/// ```rust
/// use pq_middleware::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        if let RowValues::Date(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        if let RowValues::Time(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let RowValues::JSON(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// Convert a slice of `RowValues` into a backend's parameter type.
pub trait ParamConverter<'a> {
    type Converted;

    /// Convert a slice of `RowValues` into the backend's parameter type.
    ///
    /// # Errors
    ///
    /// Returns `PqMiddlewareError` if the conversion fails for any parameter.
    fn convert_sql_params(params: &'a [RowValues]) -> Result<Self::Converted, PqMiddlewareError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_tags_are_exactly_the_large_objects() {
        for tag in FieldType::ALL {
            let expected = tag == FieldType::Blob || tag == FieldType::Clob;
            assert_eq!(tag.is_binary(), expected, "{tag:?}");
        }
    }

    #[test]
    fn none_and_null_are_neither_textual_nor_binary() {
        for tag in [FieldType::None, FieldType::Null] {
            assert!(!tag.is_textual());
            assert!(!tag.is_binary());
        }
        assert_eq!(FieldType::default(), FieldType::None);
        assert_ne!(FieldType::None, FieldType::Null);
    }

    #[test]
    fn values_map_to_their_bind_tags() {
        assert_eq!(FieldType::for_value(&RowValues::Int(3)), FieldType::Int64);
        assert_eq!(FieldType::for_value(&RowValues::Null), FieldType::Null);
        assert_eq!(
            FieldType::for_value(&RowValues::Blob(vec![1, 2])),
            FieldType::Blob
        );
        assert_eq!(
            FieldType::for_value(&RowValues::JSON(serde_json::json!({"a": 1}))),
            FieldType::String
        );
    }
}
