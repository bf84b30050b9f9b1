//! Axis assignment command
//!
//! Lists the numbered blocks of each series' file pattern with the axis
//! each one was assigned and the number of values it takes.

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::open_dataset;
use crate::stitch::errors::StitchResult;
use crate::stitch::stitcher::FileStitcher;
use crate::utils::logger::Logger;

/// One line per pattern block of a series
pub fn describe_axes(stitcher: &FileStitcher, series: usize) -> StitchResult<Vec<String>> {
    let pattern = stitcher.file_pattern(series)?;
    let axes = stitcher.axis_types(series)?;
    if pattern.blocks().is_empty() {
        return Ok(vec![format!("{}: no numbered blocks", pattern)]);
    }

    Ok(pattern
        .blocks()
        .iter()
        .zip(axes)
        .enumerate()
        .map(|(index, (block, axis))| {
            format!("Block {} {} ({} values): {}", index, block.text(), block.count(), axis)
        })
        .collect())
}

/// Command showing how file name blocks map onto axes
pub struct AxesCommand<'a> {
    series: Option<usize>,
    stitcher: FileStitcher,
    logger: &'a Logger,
}

impl<'a> AxesCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> StitchResult<Self> {
        let (_, stitcher) = open_dataset(args)?;
        Ok(AxesCommand {
            series: args.get_one::<usize>("series").copied(),
            stitcher,
            logger,
        })
    }
}

impl<'a> Command for AxesCommand<'a> {
    fn execute(&mut self) -> StitchResult<()> {
        let selected: Vec<usize> = match self.series {
            Some(series) => vec![series],
            None => (0..self.stitcher.series_count()).collect(),
        };
        for series in selected {
            let lines = describe_axes(&self.stitcher, series)?;
            info!("Series {} ({}):", series, self.stitcher.dimension_order(series)?);
            for line in &lines {
                info!("  {}", line);
            }
            self.logger.log_section(&format!("Axes of series {}", series), &lines)?;
        }
        Ok(())
    }
}
