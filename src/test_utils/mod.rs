/// In-memory stand-in for libpq that counts every release call
pub mod mock_library;

pub use mock_library::{MockCounts, MockLibrary, MockResult};
