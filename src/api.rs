use std::io::Write;
use std::sync::Arc;

use log::info;

use crate::commands::export_command::{write_png_series, write_tiff_series};
use crate::commands::info_command::describe_dataset;
use crate::compression::CompressionFactory;
use crate::config::StitchConfig;
use crate::formats::registry::ReaderRegistry;
use crate::io::byte_order::ByteOrder;
use crate::io::location::{FileSystem, LocalFileSystem};
use crate::stitch::axis::AxisType;
use crate::stitch::errors::StitchResult;
use crate::stitch::stitcher::FileStitcher;
use crate::tiff::writer::TiffWriter;
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;

/// Main interface to the StitchKit library
pub struct StitchKit {
    fs: Arc<dyn FileSystem>,
    config: StitchConfig,
    logger: Logger,
}

impl StitchKit {
    /// Create a new StitchKit instance over the local file system
    ///
    /// # Arguments
    /// * `log_file` - Optional path of a report file; without one nothing is recorded
    ///
    /// # Returns
    /// A StitchKit instance or an error if the report file cannot be created
    pub fn new(log_file: Option<&str>) -> StitchResult<Self> {
        let logger = match log_file {
            Some(path) => Logger::new(path)?,
            None => Logger::disabled(),
        };
        Ok(StitchKit {
            fs: Arc::new(LocalFileSystem),
            config: StitchConfig::default(),
            logger,
        })
    }

    /// Create an instance reading from any file system, without a report file
    pub fn with_file_system(fs: Arc<dyn FileSystem>, config: StitchConfig) -> Self {
        StitchKit {
            fs,
            config,
            logger: Logger::disabled(),
        }
    }

    /// Replace the stitcher configuration
    pub fn with_config(mut self, config: StitchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// Open a dataset
    ///
    /// # Arguments
    /// * `seed` - Any file of the family, a `.fake` name, or a pattern
    ///
    /// # Returns
    /// An initialized stitcher
    pub fn open(&self, seed: &str) -> StitchResult<FileStitcher> {
        let mut stitcher = FileStitcher::new(ReaderRegistry::new(self.fs.clone()), self.config.clone());
        stitcher.initialize(seed)?;
        Ok(stitcher)
    }

    /// Describe the stitched layout of a dataset
    ///
    /// # Returns
    /// String containing one summary block per series
    pub fn describe(&self, seed: &str) -> StitchResult<String> {
        let stitcher = self.open(seed)?;
        let lines = describe_dataset(&stitcher)?;
        self.logger.log_section(&format!("Dataset {}", seed), &lines)?;

        let mut result = format!("Dataset {}\n", seed);
        for line in lines {
            result.push_str(&line);
            result.push('\n');
        }
        Ok(result)
    }

    /// Axis assigned to each numbered block of a series' file pattern
    pub fn axes(&self, seed: &str, series: usize) -> StitchResult<Vec<AxisType>> {
        let stitcher = self.open(seed)?;
        Ok(stitcher.axis_types(series)?.to_vec())
    }

    /// Export one series to a multi-page TIFF on disk
    ///
    /// # Arguments
    /// * `seed` - Dataset to read
    /// * `series` - Series to export
    /// * `output_path` - Destination TIFF
    /// * `compression` - Optional compression name (none, deflate, zstd)
    ///
    /// # Returns
    /// The number of planes written
    pub fn export_tiff(&self, seed: &str, series: usize, output_path: &str, compression: Option<&str>) -> StitchResult<usize> {
        let mut stitcher = self.open(seed)?;
        let total = stitcher.image_count(series)?;

        let mut writer = TiffWriter::create(output_path, ByteOrder::LittleEndian)?;
        if let Some(name) = compression {
            writer = writer.with_compression(CompressionFactory::get_handler_by_name(name)?);
        }
        let progress = ProgressTracker::hidden(total as u64);
        let mut file = write_tiff_series(&mut stitcher, series, writer, &progress)?;
        file.flush()?;

        info!("Exported {} planes of {} to {}", total, seed, output_path);
        self.logger.log(&format!("Exported series {} of {} to {}", series, seed, output_path))?;
        Ok(total)
    }

    /// Export one series as one PNG per plane
    ///
    /// # Returns
    /// The written paths, in plane order
    pub fn export_png(&self, seed: &str, series: usize, output_path: &str) -> StitchResult<Vec<String>> {
        let mut stitcher = self.open(seed)?;
        let progress = ProgressTracker::hidden(stitcher.image_count(series)? as u64);
        let written = write_png_series(&mut stitcher, series, output_path, &progress)?;
        self.logger.log_section(&format!("Exported series {} of {}", series, seed), &written)?;
        Ok(written)
    }
}
