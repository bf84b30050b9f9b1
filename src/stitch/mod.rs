//! Multi-file stitching
//!
//! Turns a family of numbered files into one dataset:
//!
//! * [`pattern`] derives the file pattern of a family from a directory listing,
//! * [`axis`] decides which axis each numbered block varies,
//! * [`indexing`] maps stitched plane indices onto files and planes,
//! * [`external`] keeps the lazily opened readers of one family,
//! * [`stitcher`] ties them together behind [`FileStitcher`].

pub mod errors;
pub mod pattern;
pub mod axis;
pub mod indexing;
pub mod external;
pub mod stitcher;

#[cfg(test)]
mod tests;

pub use axis::{guess_axes, AxisAssignment, AxisType, UnresolvedAxisPolicy};
pub use errors::{StitchError, StitchResult};
pub use external::ExternalSeries;
pub use indexing::{AxisLengths, PlaneLocation};
pub use pattern::{derive_pattern, find_pattern, find_series_patterns, FilePattern, NumberBlock};
pub use stitcher::FileStitcher;
