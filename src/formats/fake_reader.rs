//! Virtual reader for `.fake` file names
//!
//! A fake file carries its whole description in its name, so datasets of
//! any shape can be assembled without pixel data on disk:
//!
//! `name&sizeX=64&sizeY=64&sizeZ=3&sizeC=1&sizeT=1&pixelType=uint16.fake`
//!
//! Recognized keys: `sizeX`, `sizeY`, `sizeZ`, `sizeC`, `sizeT`,
//! `pixelType`, `rgb`, `series`, `dimOrder`, `little`, `certain`. The file
//! itself is never opened. Plane contents are a deterministic function of
//! the file name, series and plane index, and never contain a zero byte.

use log::debug;

use crate::formats::core::{CoreMetadata, DimensionOrder, PixelType, Region};
use crate::formats::errors::{FormatError, FormatResult};
use crate::formats::reader::{check_plane_request, crop_plane, series_core, FormatReader};
use crate::io::location;

pub const FAKE_SUFFIX: &str = ".fake";

/// Whether a path names a fake file
pub fn is_fake(path: &str) -> bool {
    path.to_lowercase().ends_with(FAKE_SUFFIX)
}

/// Reader producing synthetic planes described by the file name
#[derive(Debug, Default)]
pub struct FakeReader {
    current: Option<String>,
    seed: u64,
    cores: Vec<CoreMetadata>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the `key=value` list embedded in a fake file name
    pub fn parse_name(path: &str) -> FormatResult<(CoreMetadata, usize)> {
        let name = location::file_name(path);
        if !is_fake(&name) {
            return Err(FormatError::InvalidFakeName {
                name,
                reason: format!("missing {} suffix", FAKE_SUFFIX),
            });
        }
        let stem = &name[..name.len() - FAKE_SUFFIX.len()];

        let mut core = CoreMetadata {
            size_x: 512,
            size_y: 512,
            ..CoreMetadata::default()
        };
        let mut series = 1;

        for token in stem.split('&').skip(1) {
            let (key, value) = token.split_once('=').ok_or_else(|| FormatError::InvalidFakeName {
                name: name.clone(),
                reason: format!("expected key=value, found '{}'", token),
            })?;
            let invalid = |what: &str| FormatError::InvalidFakeName {
                name: name.clone(),
                reason: format!("invalid {} '{}'", what, value),
            };
            let positive = |what: &str| -> FormatResult<usize> {
                match value.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(invalid(what)),
                }
            };

            match key {
                "sizeX" => core.size_x = positive(key)?,
                "sizeY" => core.size_y = positive(key)?,
                "sizeZ" => core.size_z = positive(key)?,
                "sizeC" => core.size_c = positive(key)?,
                "sizeT" => core.size_t = positive(key)?,
                "rgb" => core.rgb_channel_count = positive(key)?,
                "series" => series = positive(key)?,
                "pixelType" => core.pixel_type = PixelType::from_name(value).ok_or_else(|| invalid(key))?,
                "dimOrder" => {
                    core.dimension_order = DimensionOrder::parse(value).map_err(|_| invalid(key))?
                }
                "little" => core.little_endian = value.parse().map_err(|_| invalid(key))?,
                "certain" => core.order_certain = value.parse().map_err(|_| invalid(key))?,
                _ => debug!("Ignoring unknown fake key '{}' in {}", key, name),
            }
        }

        if core.size_c % core.rgb_channel_count != 0 {
            return Err(FormatError::InvalidFakeName {
                name,
                reason: format!("sizeC {} is not a multiple of rgb {}", core.size_c, core.rgb_channel_count),
            });
        }
        core.image_count = core.size_z * core.size_t * core.effective_size_c();
        Ok((core, series))
    }

    fn fill_plane(&self, core: &CoreMetadata, series: usize, no: usize) -> Vec<u8> {
        let base = self
            .seed
            .wrapping_add((series as u64).wrapping_mul(0x9E37_79B9))
            .wrapping_add((no as u64).wrapping_mul(0x85EB_CA6B));
        (0..core.plane_bytes() as u64)
            .map(|k| 1 + (base.wrapping_add(k.wrapping_mul(7)) % 251) as u8)
            .collect()
    }
}

/// FNV-1a over the file name
fn name_seed(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

impl FormatReader for FakeReader {
    fn format_name(&self) -> &'static str {
        "Fake"
    }

    fn set_id(&mut self, path: &str) -> FormatResult<()> {
        let (core, series) = Self::parse_name(path)?;
        debug!(
            "Fake file {}: {}x{} Z={} C={} T={} {} x{} series",
            path, core.size_x, core.size_y, core.size_z, core.size_c, core.size_t, core.pixel_type, series
        );
        self.seed = name_seed(&location::file_name(path));
        self.cores = vec![core; series];
        self.current = Some(path.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.current = None;
        self.cores.clear();
    }

    fn current_file(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn series_count(&self) -> usize {
        self.cores.len()
    }

    fn core(&self, series: usize) -> FormatResult<&CoreMetadata> {
        series_core(&self.cores, series)
    }

    fn open_bytes(&mut self, series: usize, no: usize, region: &Region) -> FormatResult<Vec<u8>> {
        if self.current.is_none() {
            return Err(FormatError::NotOpen);
        }
        let core = series_core(&self.cores, series)?;
        check_plane_request(core, no, region)?;
        let plane = self.fill_plane(core, series, no);
        Ok(crop_plane(&plane, core, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let (core, series) = FakeReader::parse_name("dir/plain.fake").unwrap();
        assert_eq!((core.size_x, core.size_y), (512, 512));
        assert_eq!(core.image_count, 1);
        assert_eq!(core.pixel_type, PixelType::Uint8);
        assert!(core.order_certain);
        assert_eq!(series, 1);
    }

    #[test]
    fn test_parse_keys() {
        let (core, series) = FakeReader::parse_name(
            "img&sizeX=8&sizeY=4&sizeZ=3&sizeC=6&rgb=3&sizeT=2&pixelType=uint16&series=2&dimOrder=XYCZT&little=false&certain=false.fake",
        )
        .unwrap();
        assert_eq!((core.size_x, core.size_y, core.size_z, core.size_c, core.size_t), (8, 4, 3, 6, 2));
        assert_eq!(core.image_count, 3 * 2 * 2);
        assert_eq!(core.dimension_order.as_str(), "XYCZT");
        assert!(!core.little_endian);
        assert!(!core.order_certain);
        assert_eq!(series, 2);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(FakeReader::parse_name("img&sizeZ=0.fake").is_err());
        assert!(FakeReader::parse_name("img&sizeC=4&rgb=3.fake").is_err());
        assert!(FakeReader::parse_name("img&pixelType=bit.fake").is_err());
        assert!(FakeReader::parse_name("img&sizeZ.fake").is_err());
        assert!(FakeReader::parse_name("img.tif").is_err());
    }

    #[test]
    fn test_planes_are_deterministic_and_distinct() {
        let mut reader = FakeReader::new();
        reader.set_id("img&sizeX=4&sizeY=4&sizeT=2.fake").unwrap();
        let core = reader.core(0).unwrap().clone();
        let region = Region::full(&core);

        let first = reader.open_bytes(0, 0, &region).unwrap();
        let again = reader.open_bytes(0, 0, &region).unwrap();
        let second = reader.open_bytes(0, 1, &region).unwrap();

        assert_eq!(first.len(), 16);
        assert_eq!(first, again);
        assert_ne!(first, second);
        assert!(first.iter().all(|&b| b != 0));
        assert!(reader.open_bytes(0, 2, &region).is_err());
    }

    #[test]
    fn test_close_resets_state() {
        let mut reader = FakeReader::new();
        reader.set_id("a.fake").unwrap();
        assert_eq!(reader.used_files(), vec!["a.fake".to_string()]);
        reader.close();
        assert_eq!(reader.series_count(), 0);
        assert!(reader.current_file().is_none());
        assert!(matches!(
            reader.open_bytes(0, 0, &Region::new(0, 0, 1, 1)),
            Err(FormatError::NotOpen)
        ));
    }
}
