//! Utility modules for common functionality
//!
//! Report file output, progress display and TIFF write alignment helpers.

pub mod logger;
pub mod progress;
pub(crate) mod write_utils;
