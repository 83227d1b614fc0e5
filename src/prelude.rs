//! Convenient imports for common functionality.

pub use crate::config::ConnectionSettings;
pub use crate::error::PqMiddlewareError;
pub use crate::extract::{build_result_set, extract_value};
pub use crate::guard::{CancelFree, ConnInfoOptionsFree, ResultClear};
pub use crate::input::{BindArrays, InputParameter};
pub use crate::native::ClientLibrary;
pub use crate::output::OutputParameter;
pub use crate::params::Params;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::types::{FieldType, RowValues};
pub use crate::convert_sql_params;

#[cfg(feature = "libpq")]
pub use crate::libpq::{Libpq, PgCancelFree, PqConnectionInfoOptionsFree, PqResultClear};
