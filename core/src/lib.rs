pub mod autosave;
pub mod document;
pub mod error;
pub mod models;
pub mod reader;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Error, Result};
pub use reader::Reader;
