use clap::{value_parser, Arg, ArgAction, Command as ClapCommand};
use log::{error, LevelFilter};
use std::process;

use stitchkit::commands::{CommandFactory, StitchkitCommandFactory};
use stitchkit::utils::logger::Logger;

fn main() {
    let matches = ClapCommand::new("StitchKit")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Maurice Schilpp")
        .about("Group numbered microscopy files into one multi-dimensional dataset")
        .arg(
            Arg::new("input")
                .help("Any file of the family, a .fake name, or a pattern such as img_z<1-5>.tif")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("axes")
                .short('a')
                .long("axes")
                .help("List the axis assigned to each numbered block")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("series")
                .short('s')
                .long("series")
                .help("Series to inspect or export")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .required(false),
        )
        .arg(
            Arg::new("axis-types")
                .long("axis-types")
                .help("Override the guessed block axes, e.g. 'Z,C' (one per block)")
                .value_name("LIST")
                .required(false),
        )
        .arg(
            Arg::new("export")
                .short('e')
                .long("export")
                .help("Export the selected series to this file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Export format (tiff, png)")
                .value_name("FORMAT")
                .default_value("tiff")
                .required(false),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .help("TIFF export compression by name (none, deflate, zstd)")
                .value_name("NAME")
                .required(false),
        )
        .arg(
            Arg::new("no-group")
                .long("no-group")
                .help("Read only the given file instead of its whole family")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file with a [stitch] table")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .help("Write a plain-text report of the run to this file")
                .value_name("FILE")
                .required(false),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .init();

    let logger = match matches.get_one::<String>("report") {
        Some(path) => match Logger::new(path) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error creating report file {}: {}", path, e);
                process::exit(1);
            }
        },
        None => Logger::disabled(),
    };

    let factory = StitchkitCommandFactory::new();

    let command_result = factory.create_command(&matches, &logger);
    match command_result {
        Ok(mut command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
