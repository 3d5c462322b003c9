use std::path::PathBuf;

use clap::Parser;

use qrlabel::config::{OnExisting, OnRowError};

#[derive(Parser, Debug)]
#[command(name = "qrlabel")]
#[command(
    about = "Generate labeled QR code images from every CSV table in a folder",
    long_about = None
)]
pub struct Cli {
    /// Folder to scan for tables (default: current directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Draw the name from each file name onto its image
    #[arg(long)]
    pub label: bool,

    /// Font used for labels (default: calibri.ttf next to the executable)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// What to do when an output image already exists
    #[arg(long, value_enum, default_value_t = OnExisting::Overwrite)]
    pub on_existing: OnExisting,

    /// What to do when a row cannot be encoded
    #[arg(long, value_enum, default_value_t = OnRowError::Abort)]
    pub on_row_error: OnRowError,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
