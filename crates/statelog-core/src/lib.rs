//! # statelog Core
//!
//! Error type and file-format constants shared by the statelog crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format_version;

pub use error::{Error, Result};
pub use format_version::{FormatVersion, FORMAT_NAME, FORMAT_NAME_SIZE, LOG_FORMAT_VERSION};
