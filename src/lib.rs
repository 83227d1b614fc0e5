//! Parameter marshalling and scoped handle release for connectors built on
//! libpq.
//!
//! * [`InputParameter`] and [`OutputParameter`] carry bound values to and
//!   result cells from the native library without copying caller buffers
//!   or result buffers.
//! * [`ConnInfoOptionsFree`], [`ResultClear`] and [`CancelFree`] own one
//!   native handle each and release it exactly once.
//! * [`Params`] and [`extract`] translate between [`RowValues`] and the
//!   libpq text/binary representation.
//!
//! The native library is reached through [`ClientLibrary`]; enable the
//! `libpq` feature for the `pq-sys` backed implementation.

pub mod config;
pub mod error;
pub mod extract;
pub mod guard;
pub mod input;
pub mod native;
pub mod output;
pub mod params;
pub mod prelude;
pub mod result;
pub mod results;
pub mod types;

#[cfg(feature = "libpq")]
pub mod libpq;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::ConnectionSettings;
pub use error::PqMiddlewareError;
pub use extract::{build_result_set, extract_value, field_type_for_oid};
pub use guard::{CancelFree, ConnInfoOptionsFree, HandleGuard, HandleKind, ResultClear};
pub use input::{BindArrays, InputParameter, InputParameterVector};
pub use native::{ClientLibrary, ConnInfoEntry, Oid};
pub use output::{OutputParameter, OutputParameterVector, UNSET_OID};
pub use params::Params;
pub use results::{CustomDbRow, ResultSet};
pub use types::{FieldType, ParamConverter, RowValues};

/// Convert framework values with any [`ParamConverter`].
///
/// # Errors
/// Propagates the converter's error.
pub fn convert_sql_params<'a, T: ParamConverter<'a>>(
    params: &'a [RowValues],
) -> Result<T::Converted, PqMiddlewareError> {
    T::convert_sql_params(params)
}
