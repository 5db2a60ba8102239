use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use textdet_ort::models::{DetectorConfig, DB_INPUT_SIZE, EAST_INPUT_SIZE};
use textdet_ort::{Error, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "textdet-annotate")]
#[command(about = "Draw detected text regions onto every image under a directory")]
#[command(version)]
struct Cli {
    /// Root directory to scan for .png/.jpg/.jpeg images
    #[arg(short = 'i', long = "inputImage", value_name = "DIR")]
    input_image: Option<PathBuf>,

    /// EAST model (.onnx); enables the EAST detector
    #[arg(short = 'e', long = "eastModel", value_name = "FILE")]
    east_model: Option<PathBuf>,

    /// DB model (.onnx); enables the DB detector
    #[arg(short = 'd', long = "dbModel", value_name = "FILE")]
    db_model: Option<PathBuf>,

    /// EAST input edge in pixels, rounded down to a multiple of 32 (320 matches the upstream default)
    #[arg(long = "eastInputSize", value_name = "PX", default_value_t = EAST_INPUT_SIZE)]
    east_input_size: u32,

    /// DB input edge in pixels, rounded down to a multiple of 32
    #[arg(long = "dbInputSize", value_name = "PX", default_value_t = DB_INPUT_SIZE)]
    db_input_size: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    let Some(input_image) = cli.input_image.clone() else {
        if std::env::args_os().len() > 1 {
            let err = Error::Config("--inputImage <DIR> is required".to_string());
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    initialize_logging(cli.verbose);

    match try_main(cli, input_image) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli, input_image: PathBuf) -> anyhow::Result<()> {
    let mut options = RunOptions::new(&input_image);
    options.east_model = cli.east_model;
    options.db_model = cli.db_model;
    options.east_config =
        DetectorConfig::east().with_input_size(cli.east_input_size, cli.east_input_size);
    options.db_config =
        DetectorConfig::db().with_input_size(cli.db_input_size, cli.db_input_size);

    textdet_ort::run(options)
        .with_context(|| format!("failed to annotate images under {}", input_image.display()))?;

    Ok(())
}

/// Initialize logging based on CLI verbosity settings.
fn initialize_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for crate_name in ["textdet_ort", "textdet_annotate"] {
        if let Ok(directive) = format!("{crate_name}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }
    if let Ok(directive) = "ort=warn".parse() {
        filter = filter.add_directive(directive);
    }

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn long_and_short_flags_parse() {
        let cli = Cli::try_parse_from([
            "textdet-annotate",
            "--inputImage",
            "photos",
            "-e",
            "east.onnx",
            "--dbModel",
            "db.onnx",
        ])
        .unwrap();
        assert_eq!(cli.input_image, Some(PathBuf::from("photos")));
        assert_eq!(cli.east_model, Some(PathBuf::from("east.onnx")));
        assert_eq!(cli.db_model, Some(PathBuf::from("db.onnx")));
        assert_eq!(cli.east_input_size, EAST_INPUT_SIZE);
    }

    #[test]
    fn no_arguments_is_not_a_parse_error() {
        let cli = Cli::try_parse_from(["textdet-annotate"]).unwrap();
        assert!(cli.input_image.is_none());
    }

    #[test]
    fn help_and_bad_flags_are_distinguished() {
        let help = Cli::try_parse_from(["textdet-annotate", "-h"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);

        let bad = Cli::try_parse_from(["textdet-annotate", "--bogus"]).unwrap_err();
        assert_eq!(bad.kind(), ErrorKind::UnknownArgument);
    }
}
