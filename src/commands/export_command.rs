//! Series export command
//!
//! Writes every plane of one stitched series either into a single
//! multi-page TIFF (an ImageJ hyperstack, planes in XYCZT order) or into
//! one PNG file per plane.

use std::io::{Seek, Write};

use clap::ArgMatches;
use image::{ImageBuffer, Luma, Rgb};
use log::{debug, info};

use crate::commands::command_traits::Command;
use crate::commands::open_dataset;
use crate::compression::CompressionFactory;
use crate::formats::core::{CoreMetadata, PixelType};
use crate::io::byte_order::ByteOrder;
use crate::stitch::errors::{StitchError, StitchResult};
use crate::stitch::stitcher::FileStitcher;
use crate::tiff::writer::{PageLayout, TiffWriter};
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;

/// Output container of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Tiff,
    Png,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "tif" | "tiff" => Some(ExportFormat::Tiff),
            "png" => Some(ExportFormat::Png),
            _ => None,
        }
    }
}

/// ImageJ hyperstack description for a series
pub fn imagej_description(core: &CoreMetadata) -> String {
    format!(
        "ImageJ=1.11a\nimages={}\nchannels={}\nslices={}\nframes={}\nhyperstack=true\n",
        core.image_count,
        core.effective_size_c(),
        core.size_z,
        core.size_t
    )
}

/// Stitched plane indices in XYCZT order
fn hyperstack_planes(core: &CoreMetadata) -> Vec<usize> {
    let mut planes = Vec::with_capacity(core.image_count);
    for t in 0..core.size_t {
        for z in 0..core.size_z {
            for c in 0..core.effective_size_c() {
                planes.push(core.plane_index(z, c, t));
            }
        }
    }
    planes
}

/// Reverses the bytes of every sample of a big-endian plane
fn to_little_endian(mut data: Vec<u8>, core: &CoreMetadata) -> Vec<u8> {
    let width = core.pixel_type.bytes_per_pixel();
    if !core.little_endian && width > 1 {
        for sample in data.chunks_exact_mut(width) {
            sample.reverse();
        }
    }
    data
}

/// Writes a series as a little-endian multi-page TIFF
///
/// # Arguments
/// * `stitcher` - Opened dataset
/// * `series` - Series to export
/// * `writer` - Freshly created TIFF writer
/// * `progress` - Advanced once per written plane
///
/// # Returns
/// The underlying writer after the last page
pub fn write_tiff_series<W: Write + Seek>(
    stitcher: &mut FileStitcher,
    series: usize,
    mut writer: TiffWriter<W>,
    progress: &ProgressTracker,
) -> StitchResult<W> {
    let core = stitcher.core(series)?.clone();
    let (bits_per_sample, sample_format) = core.pixel_type.tiff_encoding();
    let layout = PageLayout {
        width: dimension(core.size_x)?,
        height: dimension(core.size_y)?,
        samples_per_pixel: core.rgb_channel_count as u16,
        bits_per_sample,
        sample_format,
    };
    let description = imagej_description(&core);

    for (page, no) in hyperstack_planes(&core).into_iter().enumerate() {
        let data = to_little_endian(stitcher.open_plane(series, no)?, &core);
        let text = if page == 0 { Some(description.as_str()) } else { None };
        writer.write_page(&layout, &data, text)?;
        progress.increment(1);
    }
    Ok(writer.finish()?)
}

fn dimension(size: usize) -> StitchResult<u32> {
    u32::try_from(size).map_err(|_| StitchError::Export(format!("plane extent {} exceeds TIFF limits", size)))
}

/// Path of the PNG for one plane, next to `output`
pub fn png_plane_path(output: &str, zct: [usize; 3]) -> String {
    let stem = output
        .strip_suffix(".png")
        .or_else(|| output.strip_suffix(".PNG"))
        .unwrap_or(output);
    format!("{}_z{}_c{}_t{}.png", stem, zct[0], zct[1], zct[2])
}

fn save_png(path: &str, core: &CoreMetadata, data: Vec<u8>) -> StitchResult<()> {
    let (width, height) = (dimension(core.size_x)?, dimension(core.size_y)?);
    let malformed = || StitchError::Export(format!("plane for {} does not match {}x{}", path, width, height));
    let saved = match (core.pixel_type, core.rgb_channel_count) {
        (PixelType::Uint8, 1) => ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data)
            .ok_or_else(malformed)?
            .save(path),
        (PixelType::Uint8, 3) => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data)
            .ok_or_else(malformed)?
            .save(path),
        (PixelType::Uint16, samples @ (1 | 3)) => {
            let order = if core.little_endian { ByteOrder::LittleEndian } else { ByteOrder::BigEndian };
            let words: Vec<u16> = data.chunks_exact(2).map(|pair| order.u16_from(pair)).collect();
            if samples == 1 {
                ImageBuffer::<Luma<u16>, _>::from_raw(width, height, words)
                    .ok_or_else(malformed)?
                    .save(path)
            } else {
                ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, words)
                    .ok_or_else(malformed)?
                    .save(path)
            }
        }
        (pixel_type, samples) => {
            return Err(StitchError::Export(format!(
                "PNG export supports uint8 and uint16 gray or RGB planes, not {} with {} samples",
                pixel_type, samples
            )))
        }
    };
    saved.map_err(|e| StitchError::Export(format!("cannot write {}: {}", path, e)))
}

/// Writes every plane of a series as its own PNG
///
/// # Returns
/// The written paths, in stitched plane order
pub fn write_png_series(
    stitcher: &mut FileStitcher,
    series: usize,
    output: &str,
    progress: &ProgressTracker,
) -> StitchResult<Vec<String>> {
    let core = stitcher.core(series)?.clone();
    let mut written = Vec::with_capacity(core.image_count);
    for no in 0..core.image_count {
        let path = png_plane_path(output, core.zct_coords(no));
        debug!("Writing plane {} to {}", no, path);
        save_png(&path, &core, stitcher.open_plane(series, no)?)?;
        progress.increment(1);
        written.push(path);
    }
    Ok(written)
}

/// Command exporting one stitched series
pub struct ExportCommand<'a> {
    output: String,
    series: usize,
    format: ExportFormat,
    compression: Option<String>,
    stitcher: FileStitcher,
    logger: &'a Logger,
}

impl<'a> ExportCommand<'a> {
    /// Create a new export command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Report writer for recording operations
    ///
    /// # Returns
    /// A new ExportCommand instance or an error
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> StitchResult<Self> {
        let output = args
            .get_one::<String>("export")
            .ok_or_else(|| StitchError::Export("Missing output path".to_string()))?
            .clone();

        let format = match args.get_one::<String>("format") {
            Some(name) => ExportFormat::from_name(name)
                .ok_or_else(|| StitchError::Export(format!("Unknown export format: {}", name)))?,
            None => ExportFormat::Tiff,
        };

        let compression = args.get_one::<String>("compression").cloned();
        if let Some(name) = &compression {
            if format == ExportFormat::Png {
                return Err(StitchError::Export("--compression applies to TIFF export only".to_string()));
            }
            let handler = CompressionFactory::get_handler_by_name(name)?;
            info!("Using compression: {}", handler.name());
        }

        let (_, stitcher) = open_dataset(args)?;
        let series = args.get_one::<usize>("series").copied().unwrap_or(0);
        stitcher.core(series)?;

        Ok(ExportCommand {
            output,
            series,
            format,
            compression,
            stitcher,
            logger,
        })
    }
}

impl<'a> Command for ExportCommand<'a> {
    fn execute(&mut self) -> StitchResult<()> {
        let total = self.stitcher.image_count(self.series)?;
        info!("Exporting series {} ({} planes) to {}", self.series, total, self.output);
        let progress = ProgressTracker::new(total as u64, "Exporting planes");

        let written = match self.format {
            ExportFormat::Tiff => {
                let mut writer = TiffWriter::create(&self.output, ByteOrder::LittleEndian)?;
                if let Some(name) = &self.compression {
                    writer = writer.with_compression(CompressionFactory::get_handler_by_name(name)?);
                }
                let mut file = write_tiff_series(&mut self.stitcher, self.series, writer, &progress)?;
                file.flush()?;
                vec![self.output.clone()]
            }
            ExportFormat::Png => write_png_series(&mut self.stitcher, self.series, &self.output, &progress)?,
        };
        progress.finish();

        info!("Export complete: {} planes in {} file(s)", total, written.len());
        self.logger.log_section(
            &format!("Exported series {} ({} planes)", self.series, total),
            &written,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use crate::config::StitchConfig;
    use crate::formats::reader::FormatReader;
    use crate::formats::registry::ReaderRegistry;
    use crate::formats::tiff_reader::TiffFormatReader;
    use crate::io::location::MemoryFileSystem;

    fn page(value: u8) -> Vec<u8> {
        let layout = PageLayout { width: 2, height: 1, samples_per_pixel: 1, bits_per_sample: 8, sample_format: 1 };
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap();
        writer.write_page(&layout, &[value, value], None).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_export_round_trip() {
        let fs = MemoryFileSystem::new();
        for z in 1..=2u8 {
            for c in 1..=3u8 {
                fs.insert(&format!("img_z{}_c{}.tif", z, c), page(10 * z + c));
            }
        }
        let mut stitcher = FileStitcher::new(ReaderRegistry::new(Arc::new(fs.clone())), StitchConfig::default());
        stitcher.initialize("img_z1_c1.tif").unwrap();

        let writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap();
        let progress = ProgressTracker::hidden(6);
        let bytes = write_tiff_series(&mut stitcher, 0, writer, &progress).unwrap().into_inner();
        assert_eq!(progress.position(), 6);

        fs.insert("out/stack.tif", bytes);
        let mut reader = TiffFormatReader::new(Arc::new(fs));
        reader.set_id("out/stack.tif").unwrap();
        let core = reader.core(0).unwrap().clone();
        assert_eq!((core.size_z, core.size_c, core.size_t), (2, 3, 1));
        assert!(core.order_certain);

        // XYCZT: channel fastest
        let full = crate::formats::core::Region::full(&core);
        assert_eq!(reader.open_bytes(0, 0, &full).unwrap(), vec![11, 11]);
        assert_eq!(reader.open_bytes(0, 1, &full).unwrap(), vec![12, 12]);
        assert_eq!(reader.open_bytes(0, 3, &full).unwrap(), vec![21, 21]);
    }

    #[test]
    fn test_helpers() {
        assert_eq!(ExportFormat::from_name("TIF"), Some(ExportFormat::Tiff));
        assert_eq!(ExportFormat::from_name("jpeg"), None);
        assert_eq!(png_plane_path("out/plane.png", [1, 0, 2]), "out/plane_z1_c0_t2.png");
        assert_eq!(png_plane_path("out/plane", [0, 0, 0]), "out/plane_z0_c0_t0.png");

        let core = CoreMetadata {
            pixel_type: PixelType::Uint16,
            little_endian: false,
            ..CoreMetadata::default()
        };
        assert_eq!(to_little_endian(vec![1, 2, 3, 4], &core), vec![2, 1, 4, 3]);

        let core = CoreMetadata { size_z: 2, size_c: 3, size_t: 4, image_count: 24, ..CoreMetadata::default() };
        assert!(imagej_description(&core).contains("channels=3\nslices=2\nframes=4"));
        assert_eq!(hyperstack_planes(&core).len(), 24);
    }
}
