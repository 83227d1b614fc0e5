use std::borrow::Cow;
use std::os::raw::{c_char, c_int};
use std::ptr;

use crate::error::PqMiddlewareError;
use crate::types::FieldType;

/// libpq parameter format codes.
pub const TEXT_FORMAT: c_int = 0;
pub const BINARY_FORMAT: c_int = 1;

/// A value to bind to one statement placeholder.
///
/// Text-format values are held as an owned string; binary values borrow the
/// caller's buffer for `'a` without copying. Whichever setter ran last is
/// the authoritative representation, the other is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputParameter<'a> {
    field_type: FieldType,
    data: Option<&'a [u8]>,
    size: usize,
    is_binary: bool,
    string_representation: String,
    non_string_representation: Option<&'a [u8]>,
}

impl<'a> InputParameter<'a> {
    /// A parameter over caller-owned, already serialized bytes.
    #[must_use]
    pub fn new(field_type: FieldType, data: Option<&'a [u8]>) -> Self {
        Self {
            field_type,
            data,
            size: data.map_or(0, <[u8]>::len),
            is_binary: field_type.is_binary(),
            string_representation: String::new(),
            non_string_representation: None,
        }
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[must_use]
    pub fn data(&self) -> Option<&'a [u8]> {
        self.data
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.is_binary
    }

    /// Store an owned copy of `text` as the value's text representation.
    pub fn set_string_representation(&mut self, text: impl Into<String>) {
        self.non_string_representation = None;
        self.string_representation = text.into();
        self.size = self.string_representation.len();
    }

    /// Borrow `bytes` as the value's binary representation.
    pub fn set_non_string_representation(&mut self, bytes: &'a [u8]) {
        self.string_representation = String::new();
        self.non_string_representation = Some(bytes);
        self.size = bytes.len();
    }

    /// The bytes libpq should bind for this parameter.
    ///
    /// `None` means there is no representation at all (SQL `NULL` or no
    /// type), which is different from an empty one. Nothing checks that
    /// the matching setter was called for the tag.
    #[must_use]
    pub fn internal_representation(&self) -> Option<&[u8]> {
        match self.field_type {
            FieldType::Int8
            | FieldType::UInt8
            | FieldType::Int16
            | FieldType::UInt16
            | FieldType::Int32
            | FieldType::UInt32
            | FieldType::Int64
            | FieldType::UInt64
            | FieldType::Boolean
            | FieldType::Float
            | FieldType::Double
            | FieldType::Char
            | FieldType::String
            | FieldType::DateTime
            | FieldType::Date
            | FieldType::Time => Some(self.string_representation.as_bytes()),
            FieldType::Blob | FieldType::Clob => self.non_string_representation,
            FieldType::None | FieldType::Null => None,
        }
    }
}

pub type InputParameterVector<'a> = Vec<InputParameter<'a>>;

/// The parallel arrays `PQexecParams` and `PQexecPrepared` take.
#[derive(Debug, Clone, Default)]
pub struct BindArrays<'p> {
    values: Vec<Option<Cow<'p, [u8]>>>,
    lengths: Vec<c_int>,
    formats: Vec<c_int>,
}

impl<'p> BindArrays<'p> {
    /// Lay out `params` for libpq.
    ///
    /// Text values are copied with a trailing NUL; binary values are
    /// borrowed.
    ///
    /// # Errors
    /// Returns `PqMiddlewareError::ParameterError` if a text value contains
    /// a NUL byte or a value is longer than `c_int::MAX`.
    pub fn from_parameters(params: &'p [InputParameter<'_>]) -> Result<Self, PqMiddlewareError> {
        let mut arrays = BindArrays {
            values: Vec::with_capacity(params.len()),
            lengths: Vec::with_capacity(params.len()),
            formats: Vec::with_capacity(params.len()),
        };

        for (idx, param) in params.iter().enumerate() {
            let Some(bytes) = param.internal_representation() else {
                arrays.values.push(None);
                arrays.lengths.push(0);
                arrays.formats.push(TEXT_FORMAT);
                continue;
            };

            let length = c_int::try_from(bytes.len()).map_err(|_| {
                PqMiddlewareError::ParameterError(format!(
                    "parameter ${} is too long to bind ({} bytes)",
                    idx + 1,
                    bytes.len()
                ))
            })?;

            if param.is_binary() {
                arrays.values.push(Some(Cow::Borrowed(bytes)));
                arrays.formats.push(BINARY_FORMAT);
            } else {
                if bytes.contains(&0) {
                    return Err(PqMiddlewareError::ParameterError(format!(
                        "parameter ${} contains a NUL byte",
                        idx + 1
                    )));
                }
                let mut terminated = Vec::with_capacity(bytes.len() + 1);
                terminated.extend_from_slice(bytes);
                terminated.push(0);
                arrays.values.push(Some(Cow::Owned(terminated)));
                arrays.formats.push(TEXT_FORMAT);
            }
            arrays.lengths.push(length);
        }

        Ok(arrays)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound bytes of each parameter; text values include the trailing NUL.
    #[must_use]
    pub fn values(&self) -> &[Option<Cow<'p, [u8]>>] {
        &self.values
    }

    /// `paramValues`; null entries bind SQL `NULL`. Valid while `self` is.
    #[must_use]
    pub fn value_pointers(&self) -> Vec<*const c_char> {
        self.values
            .iter()
            .map(|value| value.as_ref().map_or(ptr::null(), |b| b.as_ptr().cast()))
            .collect()
    }

    /// `paramLengths`
    #[must_use]
    pub fn lengths(&self) -> &[c_int] {
        &self.lengths
    }

    /// `paramFormats`
    #[must_use]
    pub fn formats(&self) -> &[c_int] {
        &self.formats
    }
}
