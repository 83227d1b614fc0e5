//! [`ClientLibrary`] over the system libpq, through `pq-sys`.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

use pq_sys as ffi;

use crate::guard::{CancelFree, ConnInfoOptionsFree, ResultClear};
use crate::native::{ClientLibrary, ConnInfoEntry, Oid};

/// The linked libpq. Never instantiated; used as a type parameter.
#[derive(Debug)]
pub enum Libpq {}

pub type PqConnectionInfoOptionsFree = ConnInfoOptionsFree<Libpq>;
pub type PqResultClear = ResultClear<Libpq>;
pub type PgCancelFree = CancelFree<Libpq>;

/// Copy a C string libpq owns; `None` for a null pointer.
///
/// # Safety
/// `p` must be null or point to a NUL-terminated string.
unsafe fn owned_string(p: *const c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
}

impl ClientLibrary for Libpq {
    type ConnInfoOption = ffi::PQconninfoOption;
    type Result = ffi::PGresult;
    type Cancel = ffi::PGcancel;

    unsafe fn free_conninfo_options(options: NonNull<Self::ConnInfoOption>) {
        // SAFETY: forwarded trait contract.
        unsafe { ffi::PQconninfoFree(options.as_ptr()) }
    }

    unsafe fn clear_result(result: NonNull<Self::Result>) {
        // SAFETY: forwarded trait contract.
        unsafe { ffi::PQclear(result.as_ptr()) }
    }

    unsafe fn free_cancel(cancel: NonNull<Self::Cancel>) {
        // SAFETY: forwarded trait contract.
        unsafe { ffi::PQfreeCancel(cancel.as_ptr()) }
    }

    fn parse_conninfo(conninfo: &str) -> Result<NonNull<Self::ConnInfoOption>, String> {
        let conninfo = CString::new(conninfo).map_err(|e| e.to_string())?;
        let mut err: *mut c_char = ptr::null_mut();
        // SAFETY: `conninfo` is a valid C string and `err` a valid out-pointer.
        let options = unsafe { ffi::PQconninfoParse(conninfo.as_ptr(), &mut err) };
        if let Some(options) = NonNull::new(options) {
            return Ok(options);
        }
        // SAFETY: libpq sets `err` to null or a malloc'd message we must free.
        let message = unsafe { owned_string(err) };
        if !err.is_null() {
            // SAFETY: allocated by libpq, freed once here.
            unsafe { ffi::PQfreemem(err.cast()) };
        }
        Err(message.unwrap_or_else(|| "out of memory".to_string()))
    }

    fn conninfo_defaults() -> Option<NonNull<Self::ConnInfoOption>> {
        // SAFETY: no preconditions; the caller owns the returned list.
        NonNull::new(unsafe { ffi::PQconndefaults() })
    }

    unsafe fn conninfo_entries(options: NonNull<Self::ConnInfoOption>) -> Vec<ConnInfoEntry> {
        let mut entries = Vec::new();
        let mut option = options.as_ptr().cast_const();
        // SAFETY: the list is live and terminated by an entry with a null keyword.
        unsafe {
            while !(*option).keyword.is_null() {
                if let Some(keyword) = owned_string((*option).keyword) {
                    entries.push(ConnInfoEntry {
                        keyword,
                        value: owned_string((*option).val),
                    });
                }
                option = option.add(1);
            }
        }
        entries
    }

    unsafe fn row_count(result: NonNull<Self::Result>) -> usize {
        // SAFETY: forwarded trait contract.
        let rows = unsafe { ffi::PQntuples(result.as_ptr()) };
        usize::try_from(rows).unwrap_or(0)
    }

    unsafe fn column_count(result: NonNull<Self::Result>) -> usize {
        // SAFETY: forwarded trait contract.
        let columns = unsafe { ffi::PQnfields(result.as_ptr()) };
        usize::try_from(columns).unwrap_or(0)
    }

    unsafe fn column_name(result: NonNull<Self::Result>, column: usize) -> Option<String> {
        let column = c_int::try_from(column).ok()?;
        // SAFETY: forwarded trait contract; libpq returns null when out of range.
        unsafe { owned_string(ffi::PQfname(result.as_ptr(), column)) }
    }

    unsafe fn column_type(result: NonNull<Self::Result>, column: usize) -> Oid {
        let Ok(column) = c_int::try_from(column) else {
            return 0;
        };
        // SAFETY: forwarded trait contract.
        unsafe { ffi::PQftype(result.as_ptr(), column) }
    }

    unsafe fn cell<'r>(result: NonNull<Self::Result>, row: usize, column: usize) -> Option<&'r [u8]> {
        let row = c_int::try_from(row).ok()?;
        let column = c_int::try_from(column).ok()?;
        let result = result.as_ptr();
        // SAFETY: `result` outlives `'r` per the caller; libpq owns the value
        // buffer until the result is cleared.
        unsafe {
            if ffi::PQgetisnull(result, row, column) != 0 {
                return None;
            }
            let value = ffi::PQgetvalue(result, row, column);
            if value.is_null() {
                return None;
            }
            let length = usize::try_from(ffi::PQgetlength(result, row, column)).unwrap_or(0);
            Some(std::slice::from_raw_parts(value.cast::<u8>().cast_const(), length))
        }
    }
}
