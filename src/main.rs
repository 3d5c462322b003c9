mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use qrlabel::config::{resolve_font_path, EncoderOptions, QrSymbolConfig, RenderConfig};
use qrlabel::driver::Driver;
use qrlabel::encoder::Encoder;
use qrlabel::labeler::Labeler;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dir = match cli.dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    info!(dir = %dir.display(), "starting QR code generation");

    let driver = prepare(&cli, &dir).context("startup failed")?;
    let summary = driver.run(&dir)?;

    println!("Finished {} folder(s) in {}", summary.processed, dir.display());
    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{} table(s) failed, see log above", summary.failed);
        Ok(ExitCode::FAILURE)
    }
}

/// Loads the label font and builds the pipeline.
///
/// The font is required even when labeling is off, so a missing font stops
/// the program before any table is touched.
fn prepare(cli: &Cli, dir: &Path) -> qrlabel::Result<Driver> {
    let font_path = resolve_font_path(cli.font.as_deref(), dir);
    let render = RenderConfig::load(&font_path)?;
    debug!(font = %font_path.display(), "font loaded");

    let encoder = Encoder::new(EncoderOptions {
        symbol: QrSymbolConfig::DEFAULT,
        on_existing: cli.on_existing,
        on_row_error: cli.on_row_error,
    });
    let labeler = cli.label.then(|| Labeler::new(render));
    Ok(Driver::new(encoder, labeler))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
