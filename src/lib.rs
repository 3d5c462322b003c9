//! # qrlabel
//!
//! Turns rows of CSV tables into labeled QR code images.
//!
//! Every table `X.csv` in a folder becomes a folder `X_QR_codes/unsent/` holding one PNG per row.
//! Column 0 of a row is encoded as a version 10, low error correction QR symbol; column 1 names
//! the image. Once every row is written the table itself is moved to `X_QR_codes/X.csv`.
//! An optional pass burns the name found in each image's file name into its bottom edge.
//!
//! ## Example
//!
//! Encode a single table:
//!
//! ```no_run
//! use qrlabel::{config::EncoderOptions, encoder::Encoder};
//! use std::path::Path;
//!
//! let report = Encoder::new(EncoderOptions::default())
//!     .encode_table("campers.csv", Path::new("."))
//!     .expect("table should encode");
//! println!("{} images in {}", report.written.len(), report.output.unsent.display());
//! ```
//!
//! Render a symbol in memory:
//!
//! ```rust
//! use qrlabel::{config::QrSymbolConfig, symbol::render_payload};
//!
//! let img = render_payload("Hello, World!", &QrSymbolConfig::DEFAULT).unwrap();
//! assert_eq!(img.dimensions(), (810, 810));
//! ```
//!
//! ## Modules
//!
//! - [`symbol`]: QR encoding at a fixed version and rasterization.
//! - [`table`]: Reading input rows.
//! - [`encoder`]: One table to one output folder.
//! - [`labeler`]: Name overlay.
//! - [`driver`]: Discovery and the whole-folder run.

pub mod config;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod labeler;
pub mod symbol;
pub mod table;

pub use error::{QrLabelError, Result};
