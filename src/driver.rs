//! Discovers input tables and runs the pipeline over each of them.

use std::path::Path;

use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::TABLE_EXTENSION;
use crate::encoder::Encoder;
use crate::error::{QrLabelError, Result};
use crate::labeler::Labeler;

/// File names of the tables directly inside `dir`, sorted.
///
/// Matches the extension case-sensitively and does not descend into
/// sub-folders, so already processed tables inside `_QR_codes` are not found.
pub fn discover_tables(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(QrLabelError::file_access(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut tables = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().map_or(true, |ext| ext != TABLE_EXTENSION) {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => tables.push(name.to_string()),
            None => warn!(file = %path.display(), "skipping table with non UTF-8 name"),
        }
    }
    Ok(tables)
}

/// Totals over one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Tables fully encoded and moved into their output folder.
    pub processed: usize,
    /// Tables that failed or were left with skipped rows.
    pub failed: usize,
    /// Images labeled by the post-pass.
    pub labeled: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct Driver {
    encoder: Encoder,
    labeler: Option<Labeler>,
}

impl Driver {
    /// `labeler` enables the labeling post-pass over each produced folder.
    pub fn new(encoder: Encoder, labeler: Option<Labeler>) -> Self {
        Self { encoder, labeler }
    }

    /// Processes every table in `dir`.
    ///
    /// A failing table is logged and counted; the remaining tables still run.
    pub fn run(&self, dir: &Path) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for table in discover_tables(dir)? {
            info!(table = %table, "processing table");
            let report = match self.encoder.encode_table(&table, dir) {
                Ok(report) => report,
                Err(err) => {
                    error!(table = %table, error = %err, "table failed");
                    summary.failed += 1;
                    continue;
                }
            };
            if report.relocated_to.is_none() {
                summary.failed += 1;
                continue;
            }
            summary.processed += 1;

            if let Some(labeler) = &self.labeler {
                match labeler.label_folder(&report.output.unsent) {
                    Ok(count) => summary.labeled += count,
                    Err(err) => {
                        error!(table = %table, error = %err, "labeling failed");
                        summary.failed += 1;
                    }
                }
            }
        }
        info!(
            processed = summary.processed,
            failed = summary.failed,
            "finished {} folder(s)",
            summary.processed
        );
        Ok(summary)
    }
}
