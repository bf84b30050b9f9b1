//! Dataset summary command
//!
//! Prints the stitched layout of every series: extents, dimension order,
//! the file pattern behind it and how many files it spans.

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::open_dataset;
use crate::stitch::errors::StitchResult;
use crate::stitch::stitcher::FileStitcher;
use crate::utils::logger::Logger;

/// Summary lines for every series of an opened dataset
pub fn describe_dataset(stitcher: &FileStitcher) -> StitchResult<Vec<String>> {
    let mut lines = Vec::new();
    for series in 0..stitcher.series_count() {
        let core = stitcher.core(series)?;
        lines.push(format!(
            "Series {}: {}x{} {}, Z={} C={} T={}, order {} ({}), {} planes",
            series,
            core.size_x,
            core.size_y,
            core.pixel_type,
            core.size_z,
            core.size_c,
            core.size_t,
            core.dimension_order,
            if core.order_certain { "certain" } else { "guessed" },
            core.image_count
        ));
        if core.is_rgb() {
            lines.push(format!("  {} samples per pixel", core.rgb_channel_count));
        }
        lines.push(format!(
            "  Pattern: {} ({} files)",
            stitcher.file_pattern(series)?,
            stitcher.file_count(series)?
        ));
    }
    lines.push(format!("Files used: {}", stitcher.used_files()?.len()));
    Ok(lines)
}

/// Command summarizing a stitched dataset
pub struct InfoCommand<'a> {
    seed: String,
    verbose: bool,
    stitcher: FileStitcher,
    logger: &'a Logger,
}

impl<'a> InfoCommand<'a> {
    /// Create a new info command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Report writer for recording operations
    ///
    /// # Returns
    /// A new InfoCommand instance or an error if the dataset cannot be opened
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> StitchResult<Self> {
        let (seed, stitcher) = open_dataset(args)?;
        Ok(InfoCommand {
            seed,
            verbose: args.get_flag("verbose"),
            stitcher,
            logger,
        })
    }
}

impl<'a> Command for InfoCommand<'a> {
    fn execute(&mut self) -> StitchResult<()> {
        let lines = describe_dataset(&self.stitcher)?;
        info!("Dataset {}:", self.seed);
        for line in &lines {
            info!("{}", line);
        }
        if self.verbose {
            for series in 0..self.stitcher.series_count() {
                info!("Files of series {}:", series);
                for file in self.stitcher.series_used_files(series)? {
                    info!("  {}", file);
                }
            }
        }
        self.logger.log_section(&format!("Dataset {}", self.seed), &lines)?;
        Ok(())
    }
}
