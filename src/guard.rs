//! Scoped release of native handles.
//!
//! A guard is created right after the native allocation succeeds and frees
//! the handle when it goes out of scope, on every exit path. Each guard
//! owns exactly one handle: it is neither `Clone` nor `Send`, and a move
//! hands ownership to the destination.
//!
//! ```rust
//! # #![allow(unsafe_code)]
//! use pq_middleware::guard::ResultClear;
//! use pq_middleware::test_utils::mock_library::{MockLibrary, MockResult};
//!
//! let raw = MockLibrary::alloc_result(MockResult::default());
//! {
//!     let _result = unsafe { ResultClear::<MockLibrary>::from_raw(raw) };
//! }
//! assert_eq!(MockLibrary::counts().results_cleared, 1);
//! ```
#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::native::{ClientLibrary, ConnInfoEntry};

/// A kind of native handle together with its release call.
pub trait HandleKind {
    type Raw;

    /// Name used in log events.
    const NAME: &'static str;

    /// # Safety
    /// `raw` must be a live handle of this kind that nobody else releases.
    unsafe fn release(raw: NonNull<Self::Raw>);
}

/// Connection-info option list, released with `PQconninfoFree`.
pub struct ConnInfoOptions<L>(PhantomData<L>);

/// Query result, released with `PQclear`.
pub struct QueryResult<L>(PhantomData<L>);

/// Cancel request handle, released with `PQfreeCancel`.
pub struct CancelRequest<L>(PhantomData<L>);

impl<L: ClientLibrary> HandleKind for ConnInfoOptions<L> {
    type Raw = L::ConnInfoOption;
    const NAME: &'static str = "conninfo options";

    unsafe fn release(raw: NonNull<Self::Raw>) {
        // SAFETY: forwarded from the caller.
        unsafe { L::free_conninfo_options(raw) }
    }
}

impl<L: ClientLibrary> HandleKind for QueryResult<L> {
    type Raw = L::Result;
    const NAME: &'static str = "query result";

    unsafe fn release(raw: NonNull<Self::Raw>) {
        // SAFETY: forwarded from the caller.
        unsafe { L::clear_result(raw) }
    }
}

impl<L: ClientLibrary> HandleKind for CancelRequest<L> {
    type Raw = L::Cancel;
    const NAME: &'static str = "cancel request";

    unsafe fn release(raw: NonNull<Self::Raw>) {
        // SAFETY: forwarded from the caller.
        unsafe { L::free_cancel(raw) }
    }
}

/// Exclusive owner of one native handle.
pub struct HandleGuard<K: HandleKind> {
    handle: Option<NonNull<K::Raw>>,
    _kind: PhantomData<K>,
}

/// Frees a connection-info option list on drop.
pub type ConnInfoOptionsFree<L> = HandleGuard<ConnInfoOptions<L>>;

/// Clears a query result on drop.
pub type ResultClear<L> = HandleGuard<QueryResult<L>>;

/// Frees a cancel request handle on drop.
pub type CancelFree<L> = HandleGuard<CancelRequest<L>>;

impl<K: HandleKind> HandleGuard<K> {
    /// Take ownership of a handle the native library just allocated.
    ///
    /// A null `raw` yields a guard whose release does nothing.
    ///
    /// # Safety
    /// A non-null `raw` must be a live handle of kind `K` that is not owned
    /// or released by anything else.
    #[must_use]
    pub unsafe fn from_raw(raw: *mut K::Raw) -> Self {
        Self {
            handle: NonNull::new(raw),
            _kind: PhantomData,
        }
    }

    /// The owned handle, or `None` once released (or if it was never set).
    #[must_use]
    pub fn as_ptr(&self) -> Option<NonNull<K::Raw>> {
        self.handle
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.handle.is_none()
    }

    /// Free the handle now. Later calls, and the eventual drop, are no-ops.
    pub fn release(&mut self) {
        if let Some(raw) = self.handle.take() {
            tracing::trace!(kind = K::NAME, "releasing native handle");
            // SAFETY: `from_raw` made us the sole owner, and `take` ensures
            // this runs at most once per handle.
            unsafe { K::release(raw) }
        }
    }
}

impl<K: HandleKind> Drop for HandleGuard<K> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K: HandleKind> fmt::Debug for HandleGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleGuard")
            .field("kind", &K::NAME)
            .field("handle", &self.handle)
            .finish()
    }
}

impl<L: ClientLibrary> HandleGuard<ConnInfoOptions<L>> {
    /// Keyword/value pairs of the owned option list; empty once released.
    #[must_use]
    pub fn entries(&self) -> Vec<ConnInfoEntry> {
        match self.handle {
            // SAFETY: the guard keeps the list alive for this call.
            Some(options) => unsafe { L::conninfo_entries(options) },
            None => Vec::new(),
        }
    }
}
