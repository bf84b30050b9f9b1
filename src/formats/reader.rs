//! Single-file reader interface
//!
//! Every concrete format implements [`FormatReader`]. A reader is bound to
//! one file at a time through `set_id`, reports one [`CoreMetadata`] per
//! series it contains, and produces raw plane bytes on demand.

use crate::formats::core::{CoreMetadata, Region};
use crate::formats::errors::{FormatError, FormatResult};

/// Strategy trait for reading one physical file
pub trait FormatReader: Send {
    /// Short name of the format
    fn format_name(&self) -> &'static str;

    /// Opens a file, replacing any file currently open
    fn set_id(&mut self, path: &str) -> FormatResult<()>;

    /// Releases the current file; safe to call when nothing is open
    fn close(&mut self);

    /// Path of the open file, if any
    fn current_file(&self) -> Option<&str>;

    /// Number of series in the open file (0 when closed)
    fn series_count(&self) -> usize;

    /// Metadata of one series
    fn core(&self, series: usize) -> FormatResult<&CoreMetadata>;

    /// Reads a region of one plane
    ///
    /// Samples keep the byte order reported by `core(series).little_endian`;
    /// RGB planes are returned interleaved.
    fn open_bytes(&mut self, series: usize, no: usize, region: &Region) -> FormatResult<Vec<u8>>;

    /// Every file the open dataset consists of
    fn used_files(&self) -> Vec<String> {
        self.current_file().map(|f| vec![f.to_string()]).unwrap_or_default()
    }
}

/// Looks up a series in a reader's metadata list
pub fn series_core(cores: &[CoreMetadata], series: usize) -> FormatResult<&CoreMetadata> {
    cores.get(series).ok_or(FormatError::SeriesOutOfRange {
        series,
        count: cores.len(),
    })
}

/// Validates a plane request against a series
pub fn check_plane_request(core: &CoreMetadata, no: usize, region: &Region) -> FormatResult<()> {
    if no >= core.image_count {
        return Err(FormatError::PlaneOutOfRange {
            plane: no,
            count: core.image_count,
        });
    }
    if !region.fits(core.size_x, core.size_y) {
        return Err(FormatError::RegionOutOfBounds {
            region: region.to_string(),
            size_x: core.size_x,
            size_y: core.size_y,
        });
    }
    Ok(())
}

/// Copies a region out of a full interleaved plane
pub fn crop_plane(plane: &[u8], core: &CoreMetadata, region: &Region) -> Vec<u8> {
    let pixel = core.rgb_channel_count * core.pixel_type.bytes_per_pixel();
    if region.x == 0 && region.width == core.size_x && region.y == 0 && region.height == core.size_y {
        return plane.to_vec();
    }

    let row_bytes = core.size_x * pixel;
    let out_row = region.width * pixel;
    let mut out = Vec::with_capacity(out_row * region.height);
    for row in region.y..region.y + region.height {
        let start = row * row_bytes + region.x * pixel;
        out.extend_from_slice(&plane[start..start + out_row]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_plane() {
        let core = CoreMetadata { size_x: 4, size_y: 3, ..CoreMetadata::default() };
        let plane: Vec<u8> = (0..12).collect();

        assert_eq!(crop_plane(&plane, &core, &Region::new(1, 1, 2, 2)), vec![5, 6, 9, 10]);
        assert_eq!(crop_plane(&plane, &core, &Region::full(&core)), plane);
    }

    #[test]
    fn test_check_plane_request() {
        let core = CoreMetadata { size_x: 4, size_y: 3, ..CoreMetadata::default() };
        assert!(check_plane_request(&core, 0, &Region::full(&core)).is_ok());
        assert!(matches!(
            check_plane_request(&core, 1, &Region::full(&core)),
            Err(FormatError::PlaneOutOfRange { plane: 1, count: 1 })
        ));
        assert!(matches!(
            check_plane_request(&core, 0, &Region::new(3, 0, 2, 1)),
            Err(FormatError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_series_lookup() {
        let cores = vec![CoreMetadata::default()];
        assert!(series_core(&cores, 0).is_ok());
        assert!(matches!(series_core(&cores, 1), Err(FormatError::SeriesOutOfRange { series: 1, count: 1 })));
    }
}
