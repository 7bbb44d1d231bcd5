//! DM4 Reader - Print the tag tree of a Digital Micrograph 4 file.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dm4_reader::{Config, Dm4Error, Dm4File, OutputFormat, TreePrinter};

fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}: {}", config.path.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), Dm4Error> {
    let mut file = Dm4File::open_with_options(&config.path, config.reader_options())?;
    let root = file.read_directory(None)?;

    info!(
        version = file.header().version,
        endian = ?file.endian(),
        entries = root.len(),
        "read tag tree"
    );

    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    let result = match config.format {
        OutputFormat::Text => {
            let mut printer = TreePrinter::with_options(out, config.print_options());
            printer.print_tree(&mut file, &root)
        }
        OutputFormat::Json => write_json(out, &root),
    };

    file.close();
    result
}

fn write_json<W: Write>(mut out: W, root: &dm4_reader::TagDirectory) -> Result<(), Dm4Error> {
    let write_err = |e: String| Dm4Error::from(dm4_reader::IoError::Write(e));

    serde_json::to_writer_pretty(&mut out, root).map_err(|e| write_err(e.to_string()))?;
    writeln!(out).map_err(|e| write_err(e.to_string()))?;
    out.flush().map_err(|e| write_err(e.to_string()))
}

/// Initialize the tracing/logging subsystem.
///
/// Logs go to stderr so they never mix with the tree on stdout.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "dm4_reader=debug"
    } else {
        "dm4_reader=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
