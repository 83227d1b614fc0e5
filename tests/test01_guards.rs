#![cfg(feature = "test-utils")]
#![allow(unsafe_code)]

use pq_middleware::prelude::*;
use pq_middleware::test_utils::{MockCounts, MockLibrary, MockResult};

type ResultGuard = ResultClear<MockLibrary>;
type Cancel = CancelFree<MockLibrary>;
type Options = ConnInfoOptionsFree<MockLibrary>;

#[test]
fn each_guard_releases_its_handle_once_on_scope_exit() {
    MockLibrary::reset_counts();
    {
        let _result = unsafe { ResultGuard::from_raw(MockLibrary::alloc_result(MockResult::default())) };
        let _cancel = unsafe { Cancel::from_raw(MockLibrary::alloc_cancel(4242)) };
        let _options = unsafe { Options::from_raw(MockLibrary::alloc_conninfo(&[("host", "h")])) };
        assert_eq!(MockLibrary::counts(), MockCounts::default());
    }
    assert_eq!(
        MockLibrary::counts(),
        MockCounts {
            conninfo_freed: 1,
            results_cleared: 1,
            cancels_freed: 1,
        }
    );
}

#[test]
fn null_handles_release_nothing() {
    MockLibrary::reset_counts();
    {
        let result = unsafe { ResultGuard::from_raw(std::ptr::null_mut()) };
        let _cancel = unsafe { Cancel::from_raw(std::ptr::null_mut()) };
        let options = unsafe { Options::from_raw(std::ptr::null_mut()) };
        assert!(result.is_null());
        assert_eq!(result.row_count(), 0);
        assert!(options.entries().is_empty());
    }
    assert_eq!(MockLibrary::counts(), MockCounts::default());
}

#[test]
fn explicit_release_then_scope_exit_frees_once() {
    MockLibrary::reset_counts();
    {
        let mut cancel = unsafe { Cancel::from_raw(MockLibrary::alloc_cancel(1)) };
        cancel.release();
        assert!(cancel.is_null());
        assert_eq!(MockLibrary::counts().cancels_freed, 1);
        cancel.release();
    }
    assert_eq!(MockLibrary::counts().cancels_freed, 1);
}

#[test]
fn moving_a_guard_transfers_ownership() {
    MockLibrary::reset_counts();
    let first = unsafe { ResultGuard::from_raw(MockLibrary::alloc_result(MockResult::default())) };
    let handle = first.as_ptr();
    let second = first;
    assert_eq!(second.as_ptr(), handle);
    drop(second);
    assert_eq!(MockLibrary::counts().results_cleared, 1);
}

fn failing_step(fail: bool) -> Result<usize, PqMiddlewareError> {
    let result = unsafe {
        ResultGuard::from_raw(MockLibrary::alloc_result(
            MockResult::default().column("n", 23).row(&[Some("1")]),
        ))
    };
    if fail {
        return Err(PqMiddlewareError::ExecutionError("early exit".into()));
    }
    Ok(result.row_count())
}

#[test]
fn early_error_return_still_releases() {
    MockLibrary::reset_counts();
    assert!(failing_step(true).is_err());
    assert_eq!(MockLibrary::counts().results_cleared, 1);
    assert_eq!(failing_step(false).ok(), Some(1));
    assert_eq!(MockLibrary::counts().results_cleared, 2);
}

#[test]
fn conninfo_guard_exposes_entries() {
    MockLibrary::reset_counts();
    let options = unsafe {
        Options::from_raw(MockLibrary::alloc_conninfo(&[("host", "db"), ("port", "5432")]))
    };
    let entries = options.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].keyword, "port");
    assert_eq!(entries[1].value.as_deref(), Some("5432"));
    assert!(format!("{options:?}").contains("conninfo options"));
}
