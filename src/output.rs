use crate::native::Oid;
use crate::types::FieldType;

/// `Oid` of an output parameter that has not been filled in (libpq's `-1`).
pub const UNSET_OID: Oid = Oid::MAX;

/// One result cell as copied out of a native query result.
///
/// `data` points into the result buffer owned by the native library; it is
/// valid only while the owning [`ResultClear`](crate::guard::ResultClear)
/// is alive, which the `'r` lifetime enforces. Decoding the bytes is left
/// to [`crate::extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputParameter<'r> {
    field_type: FieldType,
    internal_field_type: Oid,
    row_number: usize,
    data: Option<&'r [u8]>,
    is_null: bool,
}

impl Default for OutputParameter<'_> {
    fn default() -> Self {
        Self {
            field_type: FieldType::None,
            internal_field_type: UNSET_OID,
            row_number: 0,
            data: None,
            is_null: true,
        }
    }
}

impl<'r> OutputParameter<'r> {
    #[must_use]
    pub fn new(
        field_type: FieldType,
        internal_field_type: Oid,
        row_number: usize,
        data: Option<&'r [u8]>,
        is_null: bool,
    ) -> Self {
        Self {
            field_type,
            internal_field_type,
            row_number,
            data,
            is_null,
        }
    }

    /// Overwrite every field at once.
    pub fn set_values(
        &mut self,
        field_type: FieldType,
        internal_field_type: Oid,
        row_number: usize,
        data: Option<&'r [u8]>,
        is_null: bool,
    ) {
        *self = Self::new(field_type, internal_field_type, row_number, data, is_null);
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// The native type identifier of the column. Opaque at this level.
    #[must_use]
    pub fn internal_field_type(&self) -> Oid {
        self.internal_field_type
    }

    #[must_use]
    pub fn row_number(&self) -> usize {
        self.row_number
    }

    #[must_use]
    pub fn data(&self) -> Option<&'r [u8]> {
        self.data
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.map_or(0, <[u8]>::len)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.is_null
    }
}

pub type OutputParameterVector<'r> = Vec<OutputParameter<'r>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_an_empty_null_cell() {
        let out = OutputParameter::default();
        assert_eq!(out.field_type(), FieldType::None);
        assert_eq!(out.internal_field_type(), UNSET_OID);
        assert_eq!(out.row_number(), 0);
        assert!(out.is_null());
        assert!(out.data().is_none());
        assert_eq!(out.size(), 0);
    }

    #[test]
    fn set_values_replaces_every_field() {
        let buffer = b"hello";
        let mut out = OutputParameter::default();
        out.set_values(FieldType::String, 25, 3, Some(buffer.as_slice()), false);

        assert_eq!(out.field_type(), FieldType::String);
        assert_eq!(out.internal_field_type(), 25);
        assert_eq!(out.row_number(), 3);
        assert_eq!(out.size(), 5);
        assert!(!out.is_null());
        assert!(std::ptr::eq(out.data().unwrap(), buffer.as_slice()));
    }

    #[test]
    fn set_values_can_return_to_null() {
        let mut out = OutputParameter::new(FieldType::Int32, 23, 0, Some(b"42".as_slice()), false);
        out.set_values(FieldType::Int32, 23, 1, None, true);
        assert!(out.is_null());
        assert_eq!(out.size(), 0);
        assert_eq!(out.row_number(), 1);
    }
}
