//! CLI command implementations
//!
//! This module contains implementations of the commands supported by the
//! CLI application using the Command pattern. Every command opens the
//! dataset named on the command line through [`open_dataset`].

pub mod command_traits;
pub mod info_command;
pub mod axes_command;
pub mod export_command;

pub use command_traits::{Command, CommandFactory};
pub use info_command::InfoCommand;
pub use axes_command::AxesCommand;
pub use export_command::{ExportCommand, ExportFormat};

use std::sync::Arc;

use clap::ArgMatches;
use log::{debug, info};

use crate::config::StitchConfig;
use crate::formats::registry::ReaderRegistry;
use crate::io::location::LocalFileSystem;
use crate::stitch::axis::AxisType;
use crate::stitch::errors::{StitchError, StitchResult};
use crate::stitch::stitcher::FileStitcher;
use crate::utils::logger::Logger;

/// Builds the stitcher configuration from `--config` and the flags overriding it
pub fn load_config(args: &ArgMatches) -> StitchResult<StitchConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => StitchConfig::from_file(path)?,
        None => StitchConfig::default(),
    };
    if args.get_flag("no-group") {
        config.group_files = false;
    }
    debug!("Stitcher configuration: {:?}", config);
    Ok(config)
}

/// Parses a comma-separated axis list such as `Z,C,T`
pub fn parse_axis_list(text: &str) -> StitchResult<Vec<AxisType>> {
    text.split(',')
        .map(|name| {
            AxisType::from_name(name)
                .ok_or_else(|| StitchError::Config(format!("Unknown axis '{}' in '{}'", name.trim(), text)))
        })
        .collect()
}

/// Opens the dataset named by the `input` argument
///
/// # Returns
/// The seed and an initialized stitcher over the local file system, with
/// any `--axis-types` override applied to the selected series
pub fn open_dataset(args: &ArgMatches) -> StitchResult<(String, FileStitcher)> {
    let seed = args
        .get_one::<String>("input")
        .ok_or_else(|| StitchError::Config("Missing input file".to_string()))?
        .clone();
    let config = load_config(args)?;

    let mut stitcher = FileStitcher::new(ReaderRegistry::new(Arc::new(LocalFileSystem)), config);
    stitcher.initialize(&seed)?;

    if let Some(list) = args.get_one::<String>("axis-types") {
        let series = args.get_one::<usize>("series").copied().unwrap_or(0);
        let axes = parse_axis_list(list)?;
        info!("Overriding axes of series {} with {}", series, list);
        stitcher.set_axis_types(series, &axes)?;
    }
    Ok((seed, stitcher))
}

/// Factory for creating command instances based on CLI arguments
///
/// `--export` selects the export command, `--axes` the axis listing;
/// otherwise the dataset is summarized.
pub struct StitchkitCommandFactory;

impl StitchkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        StitchkitCommandFactory
    }
}

impl Default for StitchkitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for StitchkitCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> StitchResult<Box<dyn Command + 'a>> {
        if args.get_one::<String>("export").is_some() {
            Ok(Box::new(ExportCommand::new(args, logger)?))
        } else if args.get_flag("axes") {
            Ok(Box::new(AxesCommand::new(args, logger)?))
        } else {
            Ok(Box::new(InfoCommand::new(args, logger)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_axis_list() {
        assert_eq!(parse_axis_list("z, C,t").unwrap(), vec![AxisType::Z, AxisType::C, AxisType::T]);
        assert_eq!(parse_axis_list("series").unwrap(), vec![AxisType::Series]);
        assert!(matches!(parse_axis_list("Z,w"), Err(StitchError::Config(_))));
    }
}
