//! Tests for pattern derivation, axis guessing, index translation and stitching

mod test_utils;
mod stitcher_tests;
