//! Core metadata shared by every reader
//!
//! A series is described by [`CoreMetadata`]: its XY extent, the Z/C/T
//! extents, the order in which planes are rasterized, and how pixels are
//! encoded. Readers report it per series; the stitcher synthesizes it for
//! stitched series.

use std::fmt;

use crate::formats::errors::{FormatError, FormatResult};
use crate::stitch::indexing;

/// Pixel sample type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float,
    Double,
}

impl PixelType {
    /// Bytes per sample
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelType::Int8 | PixelType::Uint8 => 1,
            PixelType::Int16 | PixelType::Uint16 => 2,
            PixelType::Int32 | PixelType::Uint32 | PixelType::Float => 4,
            PixelType::Double => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelType::Int8 => "int8",
            PixelType::Uint8 => "uint8",
            PixelType::Int16 => "int16",
            PixelType::Uint16 => "uint16",
            PixelType::Int32 => "int32",
            PixelType::Uint32 => "uint32",
            PixelType::Float => "float",
            PixelType::Double => "double",
        }
    }

    /// Parses a pixel type name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "int8" => Some(PixelType::Int8),
            "uint8" => Some(PixelType::Uint8),
            "int16" => Some(PixelType::Int16),
            "uint16" => Some(PixelType::Uint16),
            "int32" => Some(PixelType::Int32),
            "uint32" => Some(PixelType::Uint32),
            "float" | "float32" => Some(PixelType::Float),
            "double" | "float64" => Some(PixelType::Double),
            _ => None,
        }
    }

    /// Maps TIFF BitsPerSample and SampleFormat to a pixel type
    pub fn from_tiff(bits_per_sample: u64, sample_format: u64) -> Option<Self> {
        match (sample_format, bits_per_sample) {
            (1, 8) => Some(PixelType::Uint8),
            (1, 16) => Some(PixelType::Uint16),
            (1, 32) => Some(PixelType::Uint32),
            (2, 8) => Some(PixelType::Int8),
            (2, 16) => Some(PixelType::Int16),
            (2, 32) => Some(PixelType::Int32),
            (3, 32) => Some(PixelType::Float),
            (3, 64) => Some(PixelType::Double),
            _ => None,
        }
    }

    /// TIFF (BitsPerSample, SampleFormat) pair for this pixel type
    pub fn tiff_encoding(&self) -> (u16, u16) {
        let bits = (self.bytes_per_pixel() * 8) as u16;
        let format = match self {
            PixelType::Uint8 | PixelType::Uint16 | PixelType::Uint32 => 1,
            PixelType::Int8 | PixelType::Int16 | PixelType::Int32 => 2,
            PixelType::Float | PixelType::Double => 3,
        };
        (bits, format)
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rasterization order of a series, always a permutation of `XYZCT`
///
/// Only the relative order of Z, C and T matters for plane indexing;
/// the first of them varies fastest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionOrder(String);

impl DimensionOrder {
    pub const CANONICAL: &'static str = "XYZCT";

    /// Normalizes arbitrary text into a valid order
    ///
    /// Letters outside `XYZCT` are dropped, repeated letters keep their
    /// first occurrence, and missing letters are appended in `XYZCT` order.
    pub fn sanitize(text: &str) -> Self {
        let mut order = String::with_capacity(5);
        for ch in text.chars().map(|c| c.to_ascii_uppercase()) {
            if Self::CANONICAL.contains(ch) && !order.contains(ch) {
                order.push(ch);
            }
        }
        for ch in Self::CANONICAL.chars() {
            if !order.contains(ch) {
                order.push(ch);
            }
        }
        DimensionOrder(order)
    }

    /// Parses an order that must already be a permutation of `XYZCT`
    pub fn parse(text: &str) -> FormatResult<Self> {
        let sanitized = Self::sanitize(text);
        if text.len() == 5 && sanitized.0 == text.to_ascii_uppercase() {
            Ok(sanitized)
        } else {
            Err(FormatError::InvalidDimensionOrder(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The Z, C and T letters, fastest-varying first
    pub fn zct_letters(&self) -> Vec<char> {
        self.0.chars().filter(|c| matches!(c, 'Z' | 'C' | 'T')).collect()
    }

    /// Position of an axis letter within the full order string
    pub fn position(&self, axis: char) -> Option<usize> {
        self.0.find(axis.to_ascii_uppercase())
    }

    /// The same order with Z and T exchanged
    pub fn swap_zt(&self) -> Self {
        let swapped: String = self
            .0
            .chars()
            .map(|c| match c {
                'Z' => 'T',
                'T' => 'Z',
                other => other,
            })
            .collect();
        DimensionOrder(swapped)
    }

    /// Whether X and Y lead the order, as every reader here requires
    pub fn is_xy_first(&self) -> bool {
        self.0.starts_with("XY")
    }
}

impl Default for DimensionOrder {
    fn default() -> Self {
        DimensionOrder(Self::CANONICAL.to_string())
    }
}

impl fmt::Display for DimensionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rectangular pixel region of a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Region { x, y, width, height }
    }

    /// The whole XY extent of a series
    pub fn full(core: &CoreMetadata) -> Self {
        Region::new(0, 0, core.size_x, core.size_y)
    }

    /// Whether the region is non-empty and lies within the given extent
    pub fn fits(&self, size_x: usize, size_y: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).map_or(false, |end| end <= size_x)
            && self.y.checked_add(self.height).map_or(false, |end| end <= size_y)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Dimensional and pixel metadata of one series
#[derive(Debug, Clone, PartialEq)]
pub struct CoreMetadata {
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    /// Channel count including the samples of RGB planes
    pub size_c: usize,
    pub size_t: usize,
    pub image_count: usize,
    pub pixel_type: PixelType,
    /// Samples stored together in one plane (1 for grayscale)
    pub rgb_channel_count: usize,
    pub little_endian: bool,
    /// Whether the samples of an RGB plane are interleaved
    pub interleaved: bool,
    pub dimension_order: DimensionOrder,
    pub order_certain: bool,
}

impl Default for CoreMetadata {
    fn default() -> Self {
        CoreMetadata {
            size_x: 0,
            size_y: 0,
            size_z: 1,
            size_c: 1,
            size_t: 1,
            image_count: 1,
            pixel_type: PixelType::Uint8,
            rgb_channel_count: 1,
            little_endian: true,
            interleaved: true,
            dimension_order: DimensionOrder::default(),
            order_certain: true,
        }
    }
}

impl CoreMetadata {
    pub fn is_rgb(&self) -> bool {
        self.rgb_channel_count > 1
    }

    /// Number of channel planes, with RGB samples folded out
    pub fn effective_size_c(&self) -> usize {
        self.size_c / self.rgb_channel_count.max(1)
    }

    /// Size in bytes of a region of one plane
    pub fn region_bytes(&self, region: &Region) -> usize {
        region.width * region.height * self.rgb_channel_count * self.pixel_type.bytes_per_pixel()
    }

    /// Size in bytes of a full plane
    pub fn plane_bytes(&self) -> usize {
        self.region_bytes(&Region::full(self))
    }

    /// Decodes a plane index into (z, c, t) with the series' order
    pub fn zct_coords(&self, no: usize) -> [usize; 3] {
        indexing::zct_coords(&self.dimension_order, self.size_z, self.effective_size_c(), self.size_t, no)
    }

    /// Encodes (z, c, t) into a plane index with the series' order
    pub fn plane_index(&self, z: usize, c: usize, t: usize) -> usize {
        indexing::plane_index(&self.dimension_order, self.size_z, self.effective_size_c(), self.size_t, [z, c, t])
    }

    /// Checks `image_count == size_z * size_t * effective_size_c`
    pub fn validate(&self) -> FormatResult<()> {
        if self.rgb_channel_count == 0 || self.size_c % self.rgb_channel_count != 0 {
            return Err(FormatError::InvalidMetadata(format!(
                "sizeC {} is not a multiple of the RGB channel count {}",
                self.size_c, self.rgb_channel_count
            )));
        }
        let expected = self.size_z * self.size_t * self.effective_size_c();
        if self.image_count != expected {
            return Err(FormatError::InvalidMetadata(format!(
                "image count {} does not match Z*C*T = {}",
                self.image_count, expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_order() {
        assert_eq!(DimensionOrder::sanitize("XYZCT").as_str(), "XYZCT");
        assert_eq!(DimensionOrder::sanitize("xyctz").as_str(), "XYCTZ");
        assert_eq!(DimensionOrder::sanitize("XYCZTZC").as_str(), "XYCZT");
        assert_eq!(DimensionOrder::sanitize("XYQT").as_str(), "XYTZC");
        assert_eq!(DimensionOrder::sanitize("").as_str(), "XYZCT");
    }

    #[test]
    fn test_parse_order_requires_permutation() {
        assert!(DimensionOrder::parse("XYCZT").is_ok());
        assert!(DimensionOrder::parse("XYZZT").is_err());
        assert!(DimensionOrder::parse("XYZC").is_err());
    }

    #[test]
    fn test_order_helpers() {
        let order = DimensionOrder::sanitize("XYCZT");
        assert_eq!(order.zct_letters(), vec!['C', 'Z', 'T']);
        assert_eq!(order.swap_zt().as_str(), "XYCTZ");
        assert_eq!(order.position('z'), Some(3));
        assert!(order.is_xy_first());
    }

    #[test]
    fn test_effective_channels_and_bytes() {
        let core = CoreMetadata {
            size_x: 4,
            size_y: 2,
            size_c: 6,
            image_count: 2,
            rgb_channel_count: 3,
            pixel_type: PixelType::Uint16,
            ..CoreMetadata::default()
        };
        assert!(core.is_rgb());
        assert_eq!(core.effective_size_c(), 2);
        assert_eq!(core.plane_bytes(), 4 * 2 * 3 * 2);
        assert!(core.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_count() {
        let core = CoreMetadata { size_z: 2, image_count: 3, ..CoreMetadata::default() };
        assert!(core.validate().is_err());
    }

    #[test]
    fn test_region_fits() {
        assert!(Region::new(0, 0, 4, 4).fits(4, 4));
        assert!(!Region::new(1, 0, 4, 4).fits(4, 4));
        assert!(!Region::new(0, 0, 0, 4).fits(4, 4));
    }

    #[test]
    fn test_pixel_type_names() {
        assert_eq!(PixelType::from_name("UINT16"), Some(PixelType::Uint16));
        assert_eq!(PixelType::from_tiff(32, 3), Some(PixelType::Float));
        assert_eq!(PixelType::Int16.tiff_encoding(), (16, 2));
        assert_eq!(PixelType::from_name("bit"), None);
    }
}
