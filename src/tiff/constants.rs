//! TIFF format constants
//!
//! Named values for the header, field types, and the baseline tags that
//! plane decoding relies on.

/// TIFF header constants
pub mod header {
    /// Standard TIFF version number (42)
    pub const TIFF_VERSION: u16 = 42;

    /// BigTIFF version number (43)
    pub const BIG_TIFF_VERSION: u16 = 43;

    /// "II" byte order marker for little-endian
    pub const LITTLE_ENDIAN_MARKER: [u8; 2] = [0x49, 0x49];

    /// "MM" byte order marker for big-endian
    pub const BIG_ENDIAN_MARKER: [u8; 2] = [0x4D, 0x4D];

    /// BigTIFF offset size (8 bytes)
    pub const BIGTIFF_OFFSET_SIZE: u16 = 8;

    /// Size of a classic TIFF header
    pub const TIFF_HEADER_SIZE: u64 = 8;
}

/// Field types as defined in the TIFF spec
pub mod field_types {
    pub const BYTE: u16 = 1;       // 8-bit unsigned integer
    pub const ASCII: u16 = 2;      // 8-bit byte containing ASCII character
    pub const SHORT: u16 = 3;      // 16-bit unsigned integer
    pub const LONG: u16 = 4;       // 32-bit unsigned integer
    pub const RATIONAL: u16 = 5;   // Two LONGs: numerator and denominator
    pub const SBYTE: u16 = 6;      // 8-bit signed integer
    pub const UNDEFINED: u16 = 7;  // 8-bit byte with unspecified format
    pub const SSHORT: u16 = 8;     // 16-bit signed integer
    pub const SLONG: u16 = 9;      // 32-bit signed integer
    pub const SRATIONAL: u16 = 10; // Two SLONGs: numerator and denominator
    pub const FLOAT: u16 = 11;     // Single precision IEEE floating point
    pub const DOUBLE: u16 = 12;    // Double precision IEEE floating point
    pub const LONG8: u16 = 16;     // BigTIFF 64-bit unsigned integer
    pub const SLONG8: u16 = 17;    // BigTIFF 64-bit signed integer
    pub const IFD8: u16 = 18;      // BigTIFF 64-bit IFD offset
}

/// Baseline TIFF tags used for plane decoding
pub mod tags {
    pub const NEW_SUBFILE_TYPE: u16 = 254;         // Subfile data descriptor
    pub const IMAGE_WIDTH: u16 = 256;              // Width of the image in pixels
    pub const IMAGE_LENGTH: u16 = 257;             // Height of the image in pixels
    pub const BITS_PER_SAMPLE: u16 = 258;          // Bits per component
    pub const COMPRESSION: u16 = 259;              // Compression scheme
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262; // Color space of image data
    pub const IMAGE_DESCRIPTION: u16 = 270;        // ImageJ / OME-XML description
    pub const STRIP_OFFSETS: u16 = 273;            // Offsets to the data strips
    pub const SAMPLES_PER_PIXEL: u16 = 277;        // Number of components per pixel
    pub const ROWS_PER_STRIP: u16 = 278;           // Rows per strip of data
    pub const STRIP_BYTE_COUNTS: u16 = 279;        // Bytes counts for strips
    pub const PLANAR_CONFIGURATION: u16 = 284;     // How components are stored
    pub const SOFTWARE: u16 = 305;                 // Software used to create the image
    pub const PREDICTOR: u16 = 317;                // Prediction scheme used on image data
    pub const TILE_WIDTH: u16 = 322;               // Width of a tile
    pub const TILE_LENGTH: u16 = 323;              // Length of a tile
    pub const TILE_OFFSETS: u16 = 324;             // Offsets to the data tiles
    pub const TILE_BYTE_COUNTS: u16 = 325;         // Byte counts for tiles
    pub const SAMPLE_FORMAT: u16 = 339;            // Interpretation of sample data
}

/// Compression types
pub mod compression {
    pub const NONE: u64 = 1;              // No compression
    pub const DEFLATE: u64 = 8;           // Adobe Deflate (zlib)
    pub const ZSTD: u64 = 14;             // Zstandard compression
    pub const DEFLATE_OLD: u64 = 32946;   // Pre-standard deflate code
    pub const ZSTD_OLD: u64 = 50000;      // libtiff's private zstd code
}

/// Photometric interpretation values
pub mod photometric {
    pub const BLACK_IS_ZERO: u16 = 1;     // Minimum value is black
    pub const RGB: u16 = 2;               // RGB color model
}

/// Planar configuration values
pub mod planar_config {
    pub const CHUNKY: u64 = 1;            // Components stored interleaved (RGBRGBRGB)
    pub const PLANAR: u64 = 2;            // Components stored separately (RRR...GGG...BBB)
}

/// Sample format values
pub mod sample_format {
    pub const UNSIGNED: u64 = 1;          // Unsigned integer data
    pub const SIGNED: u64 = 2;            // Signed integer data
    pub const IEEEFP: u64 = 3;            // IEEE floating point data
}

/// Predictor values
pub mod predictor {
    pub const NONE: u64 = 1;                    // No prediction scheme
    pub const HORIZONTAL_DIFFERENCING: u64 = 2; // Horizontal differencing
}

/// Subfile type bit flags
pub mod new_subfile_type {
    pub const REDUCED_RESOLUTION: u64 = 1;      // Reduced resolution version of another image
}
