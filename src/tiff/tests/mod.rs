//! Tests for the TIFF container layer

mod test_utils;
mod types_tests;
mod writer_tests;
