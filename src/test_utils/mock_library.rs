//! A [`ClientLibrary`] backed by boxed Rust values.
//!
//! Handles are `Box::into_raw` pointers; the release functions turn them back
//! into boxes and bump a per-thread counter, so a test can assert that each
//! handle was released exactly once. Counters and defaults are
//! thread-local, which keeps parallel tests independent.
#![allow(unsafe_code)]

use std::cell::RefCell;
use std::ptr::NonNull;

use crate::native::{ClientLibrary, ConnInfoEntry, Oid};

/// Release calls observed on the current thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCounts {
    pub conninfo_freed: usize,
    pub results_cleared: usize,
    pub cancels_freed: usize,
}

#[derive(Default)]
struct MockState {
    counts: MockCounts,
    defaults: Vec<ConnInfoEntry>,
}

thread_local! {
    static STATE: RefCell<MockState> = RefCell::new(MockState::default());
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockConnInfo {
    entries: Vec<ConnInfoEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCancel {
    pub backend_pid: u32,
}

/// A canned query result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockResult {
    columns: Vec<(String, Oid)>,
    rows: Vec<Vec<Option<Vec<u8>>>>,
}

impl MockResult {
    #[must_use]
    pub fn column(mut self, name: &str, oid: Oid) -> Self {
        self.columns.push((name.to_string(), oid));
        self
    }

    /// Append a row of text cells; `None` is SQL `NULL`.
    #[must_use]
    pub fn row(mut self, cells: &[Option<&str>]) -> Self {
        self.rows.push(
            cells
                .iter()
                .map(|cell| cell.map(|text| text.as_bytes().to_vec()))
                .collect(),
        );
        self
    }
}

/// The mock library. Never instantiated; used as a type parameter.
#[derive(Debug)]
pub enum MockLibrary {}

impl MockLibrary {
    #[must_use]
    pub fn alloc_result(result: MockResult) -> *mut MockResult {
        Box::into_raw(Box::new(result))
    }

    #[must_use]
    pub fn alloc_cancel(backend_pid: u32) -> *mut MockCancel {
        Box::into_raw(Box::new(MockCancel { backend_pid }))
    }

    #[must_use]
    pub fn alloc_conninfo(pairs: &[(&str, &str)]) -> *mut MockConnInfo {
        Box::into_raw(Box::new(MockConnInfo {
            entries: to_entries(pairs),
        }))
    }

    /// Values `conninfo_defaults` reports on this thread.
    pub fn set_defaults(pairs: &[(&str, &str)]) {
        STATE.with(|state| state.borrow_mut().defaults = to_entries(pairs));
    }

    /// Release counts for this thread.
    #[must_use]
    pub fn counts() -> MockCounts {
        STATE.with(|state| state.borrow().counts)
    }

    /// Zero this thread's release counts.
    pub fn reset_counts() {
        STATE.with(|state| state.borrow_mut().counts = MockCounts::default());
    }

    fn bump(update: impl FnOnce(&mut MockCounts)) {
        STATE.with(|state| update(&mut state.borrow_mut().counts));
    }
}

fn to_entries(pairs: &[(&str, &str)]) -> Vec<ConnInfoEntry> {
    pairs
        .iter()
        .map(|(keyword, value)| ConnInfoEntry {
            keyword: (*keyword).to_string(),
            value: Some((*value).to_string()),
        })
        .collect()
}

impl ClientLibrary for MockLibrary {
    type ConnInfoOption = MockConnInfo;
    type Result = MockResult;
    type Cancel = MockCancel;

    unsafe fn free_conninfo_options(options: NonNull<MockConnInfo>) {
        // SAFETY: allocated by `Box::into_raw` and released once per the trait contract.
        drop(unsafe { Box::from_raw(options.as_ptr()) });
        Self::bump(|c| c.conninfo_freed += 1);
    }

    unsafe fn clear_result(result: NonNull<MockResult>) {
        // SAFETY: as above.
        drop(unsafe { Box::from_raw(result.as_ptr()) });
        Self::bump(|c| c.results_cleared += 1);
    }

    unsafe fn free_cancel(cancel: NonNull<MockCancel>) {
        // SAFETY: as above.
        drop(unsafe { Box::from_raw(cancel.as_ptr()) });
        Self::bump(|c| c.cancels_freed += 1);
    }

    // Whitespace-separated `keyword=value` pairs, no quoting.
    fn parse_conninfo(conninfo: &str) -> Result<NonNull<MockConnInfo>, String> {
        let mut entries = Vec::new();
        for token in conninfo.split_whitespace() {
            let Some((keyword, value)) = token.split_once('=') else {
                return Err(format!(
                    "missing \"=\" after \"{token}\" in connection info string\n"
                ));
            };
            entries.push(ConnInfoEntry {
                keyword: keyword.to_string(),
                value: Some(value.to_string()),
            });
        }
        let raw = Box::into_raw(Box::new(MockConnInfo { entries }));
        NonNull::new(raw).ok_or_else(|| "out of memory".to_string())
    }

    fn conninfo_defaults() -> Option<NonNull<MockConnInfo>> {
        let entries = STATE.with(|state| state.borrow().defaults.clone());
        NonNull::new(Box::into_raw(Box::new(MockConnInfo { entries })))
    }

    unsafe fn conninfo_entries(options: NonNull<MockConnInfo>) -> Vec<ConnInfoEntry> {
        // SAFETY: the caller guarantees `options` is live.
        unsafe { options.as_ref() }.entries.clone()
    }

    unsafe fn row_count(result: NonNull<MockResult>) -> usize {
        // SAFETY: the caller guarantees `result` is live.
        unsafe { result.as_ref() }.rows.len()
    }

    unsafe fn column_count(result: NonNull<MockResult>) -> usize {
        // SAFETY: as above.
        unsafe { result.as_ref() }.columns.len()
    }

    unsafe fn column_name(result: NonNull<MockResult>, column: usize) -> Option<String> {
        // SAFETY: as above.
        let result = unsafe { result.as_ref() };
        result.columns.get(column).map(|(name, _)| name.clone())
    }

    unsafe fn column_type(result: NonNull<MockResult>, column: usize) -> Oid {
        // SAFETY: as above.
        let result = unsafe { result.as_ref() };
        result.columns.get(column).map_or(0, |(_, oid)| *oid)
    }

    unsafe fn cell<'r>(result: NonNull<MockResult>, row: usize, column: usize) -> Option<&'r [u8]> {
        // SAFETY: the caller guarantees `result` outlives `'r`.
        let result: &'r MockResult = unsafe { &*result.as_ptr() };
        result.rows.get(row)?.get(column)?.as_deref()
    }
}
