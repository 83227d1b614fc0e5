//! Boundary to the native PostgreSQL client library.
//!
//! Everything in this crate that touches a libpq handle goes through
//! [`ClientLibrary`]. The `libpq` feature supplies [`Libpq`](crate::libpq::Libpq);
//! tests use the counting mock in `test_utils`.
#![allow(unsafe_code)]

use std::ptr::NonNull;

/// Native per-column type identifier (`Oid` in libpq).
pub type Oid = u32;

/// One keyword/value pair of a connection-info option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnInfoEntry {
    pub keyword: String,
    pub value: Option<String>,
}

/// The subset of a libpq-style C API this crate consumes.
///
/// The release functions must only ever be called once per handle; the
/// guards in [`crate::guard`] are the only callers inside this crate.
pub trait ClientLibrary {
    /// `PQconninfoOption`
    type ConnInfoOption;
    /// `PGresult`
    type Result;
    /// `PGcancel`
    type Cancel;

    /// `PQconninfoFree`
    ///
    /// # Safety
    /// `options` must come from this library and not have been freed.
    unsafe fn free_conninfo_options(options: NonNull<Self::ConnInfoOption>);

    /// `PQclear`
    ///
    /// # Safety
    /// `result` must come from this library and not have been cleared.
    unsafe fn clear_result(result: NonNull<Self::Result>);

    /// `PQfreeCancel`
    ///
    /// # Safety
    /// `cancel` must come from this library and not have been freed.
    unsafe fn free_cancel(cancel: NonNull<Self::Cancel>);

    /// `PQconninfoParse`. On failure returns the library's message.
    ///
    /// # Errors
    /// Returns the native error text when the string cannot be parsed.
    fn parse_conninfo(conninfo: &str) -> Result<NonNull<Self::ConnInfoOption>, String>;

    /// `PQconndefaults`
    fn conninfo_defaults() -> Option<NonNull<Self::ConnInfoOption>>;

    /// Keyword/value pairs of an option list, in library order.
    ///
    /// # Safety
    /// `options` must be a live option list from this library.
    unsafe fn conninfo_entries(options: NonNull<Self::ConnInfoOption>) -> Vec<ConnInfoEntry>;

    /// `PQntuples`
    ///
    /// # Safety
    /// `result` must be a live result from this library.
    unsafe fn row_count(result: NonNull<Self::Result>) -> usize;

    /// `PQnfields`
    ///
    /// # Safety
    /// `result` must be a live result from this library.
    unsafe fn column_count(result: NonNull<Self::Result>) -> usize;

    /// `PQfname`
    ///
    /// # Safety
    /// `result` must be a live result from this library.
    unsafe fn column_name(result: NonNull<Self::Result>, column: usize) -> Option<String>;

    /// `PQftype`
    ///
    /// # Safety
    /// `result` must be a live result from this library.
    unsafe fn column_type(result: NonNull<Self::Result>, column: usize) -> Oid;

    /// `PQgetvalue`/`PQgetlength`, or `None` when `PQgetisnull` reports NULL.
    ///
    /// # Safety
    /// `result` must be a live result from this library and must stay
    /// alive for `'r`.
    unsafe fn cell<'r>(result: NonNull<Self::Result>, row: usize, column: usize)
    -> Option<&'r [u8]>;
}
