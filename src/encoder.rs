//! Turns one input table into a folder of QR images.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, info, warn};

use crate::config::{EncoderOptions, OnExisting, OnRowError, OUTPUT_SUFFIX, UNSENT_DIR};
use crate::error::{QrLabelError, Result};
use crate::symbol;
use crate::table::{InputRecord, TableReader};

/// Output locations derived from a table path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFolder {
    /// `<dir>/<stem>_QR_codes/`, where the consumed table ends up.
    pub root: PathBuf,
    /// `<dir>/<stem>_QR_codes/unsent/`, where the images are written.
    pub unsent: PathBuf,
}

impl OutputFolder {
    pub fn for_table(table: &Path) -> Self {
        let stem = table
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = table.parent().unwrap_or_else(|| Path::new(""));
        let root = parent.join(format!("{stem}{OUTPUT_SUFFIX}"));
        let unsent = root.join(UNSENT_DIR);
        Self { root, unsent }
    }
}

/// Result of running the [`Encoder`] over one table.
#[derive(Debug)]
pub struct EncodeReport {
    pub source: PathBuf,
    pub output: OutputFolder,
    /// Images written, in row order.
    pub written: Vec<PathBuf>,
    /// Rows that failed under [`OnRowError::Skip`].
    pub failures: Vec<QrLabelError>,
    /// Where the table was moved, if every row succeeded.
    pub relocated_to: Option<PathBuf>,
}

pub struct Encoder {
    options: EncoderOptions,
}

impl Encoder {
    pub fn new(options: EncoderOptions) -> Self {
        Self { options }
    }

    /// Writes one image per row of `filepath/filename`, then moves the table
    /// into its `_QR_codes` folder.
    ///
    /// The move only happens when every row produced an image.
    ///
    /// # Arguments
    ///
    /// * `filename` - Name of the table inside `filepath`, e.g. `week1.csv`.
    /// * `filepath` - Folder holding the table; output goes to
    ///   `filepath/<stem>_QR_codes/unsent/`.
    ///
    /// # Errors
    ///
    /// * [`QrLabelError::FileAccess`] if the table cannot be read or an output
    ///   folder or image cannot be written.
    /// * [`QrLabelError::MalformedRow`] for rows with fewer than two fields or
    ///   an unusable file name.
    /// * [`QrLabelError::Encoding`] when a payload does not fit the symbol.
    /// * [`QrLabelError::Conflict`] when the table's destination is taken, or an
    ///   image exists under [`OnExisting::Fail`].
    ///
    /// Row errors are collected in [`EncodeReport::failures`] instead under
    /// [`OnRowError::Skip`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use qrlabel::{config::EncoderOptions, encoder::Encoder};
    /// use std::path::Path;
    ///
    /// let report = Encoder::new(EncoderOptions::default())
    ///     .encode_table("week1.csv", Path::new("/data/camp"))
    ///     .unwrap();
    /// assert!(report.relocated_to.is_some());
    /// ```
    pub fn encode_table(&self, filename: &str, filepath: &Path) -> Result<EncodeReport> {
        let source = filepath.join(filename);
        let output = OutputFolder::for_table(&source);
        let rows = TableReader::open(&source)?;

        info!(folder = %output.unsent.display(), "generating QR codes");
        fs::create_dir_all(&output.unsent)
            .map_err(|e| QrLabelError::file_access(&output.unsent, e))?;

        let mut report = EncodeReport {
            source: source.clone(),
            output,
            written: Vec::new(),
            failures: Vec::new(),
            relocated_to: None,
        };

        for row in rows {
            let outcome =
                row.and_then(|record| self.write_record(&source, &report.output, &record));
            match outcome {
                Ok(path) => report.written.push(path),
                Err(err) => match self.options.on_row_error {
                    OnRowError::Abort => return Err(err),
                    OnRowError::Skip => {
                        warn!(error = %err, "skipping row");
                        report.failures.push(err);
                    }
                },
            }
        }

        if report.failures.is_empty() {
            let dst = report.output.root.join(filename);
            relocate(&source, &dst)?;
            info!(to = %dst.display(), rows = report.written.len(), "table processed");
            report.relocated_to = Some(dst);
        } else {
            warn!(
                table = %source.display(),
                failed = report.failures.len(),
                "table left in place because some rows failed"
            );
        }
        Ok(report)
    }

    fn write_record(
        &self,
        source: &Path,
        output: &OutputFolder,
        record: &InputRecord,
    ) -> Result<PathBuf> {
        let dest = output.unsent.join(&record.label);
        let format = ImageFormat::from_path(&dest).map_err(|e| QrLabelError::image(&dest, e))?;

        let img = symbol::render_payload(&record.payload, &self.options.symbol).map_err(|err| {
            QrLabelError::Encoding {
                path: source.to_path_buf(),
                row: record.index,
                source: err,
            }
        })?;

        match self.options.on_existing {
            OnExisting::Overwrite => img
                .save_with_format(&dest, format)
                .map_err(|e| QrLabelError::image(&dest, e))?,
            OnExisting::Fail => {
                let mut writer = BufWriter::new(create_new(&dest)?);
                img.write_to(&mut writer, format)
                    .map_err(|e| QrLabelError::image(&dest, e))?;
                writer
                    .flush()
                    .map_err(|e| QrLabelError::file_access(&dest, e))?;
            }
        }
        debug!(row = record.index, file = %dest.display(), "wrote symbol");
        Ok(dest)
    }
}

/// Opens `path` for writing only if nothing exists there yet.
fn create_new(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => QrLabelError::Conflict {
                path: path.to_path_buf(),
            },
            _ => QrLabelError::file_access(path, e),
        })
}

/// Moves `src` to `dst`, refusing to replace an existing file.
///
/// Linking fails atomically when `dst` exists, unlike `rename`.
fn relocate(src: &Path, dst: &Path) -> Result<()> {
    fs::hard_link(src, dst).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => QrLabelError::Conflict {
            path: dst.to_path_buf(),
        },
        _ => QrLabelError::file_access(dst, e),
    })?;
    fs::remove_file(src).map_err(|e| QrLabelError::file_access(src, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::tests::decode;

    fn write_table(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn pngs_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn output_folder_layout() {
        let out = OutputFolder::for_table(Path::new("/data/week1.csv"));
        assert_eq!(out.root, PathBuf::from("/data/week1_QR_codes"));
        assert_eq!(out.unsent, PathBuf::from("/data/week1_QR_codes/unsent"));
    }

    #[test]
    fn three_rows_make_three_images_and_move_table() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            "week1.csv",
            "https://x.example/?a=1&amp;b=2,jane doe_1.png\n\
             second payload,john smith_2.png\n\
             THIRD,ann lee_3.png\n",
        );

        let report = Encoder::new(EncoderOptions::default())
            .encode_table("week1.csv", dir.path())
            .unwrap();

        let unsent = dir.path().join("week1_QR_codes/unsent");
        assert_eq!(report.written.len(), 3);
        assert_eq!(
            pngs_in(&unsent),
            vec!["ann lee_3.png", "jane doe_1.png", "john smith_2.png"]
        );
        assert!(!dir.path().join("week1.csv").exists());
        let moved = dir.path().join("week1_QR_codes/week1.csv");
        assert!(moved.is_file());
        assert_eq!(report.relocated_to, Some(moved));

        let img = image::open(unsent.join("jane doe_1.png")).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (810, 810));
        assert_eq!(decode(&img), "https://x.example/?a=1&b=2");
    }

    #[test]
    fn over_capacity_payload_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "big.csv", &format!("{},big_1.png\n", "z".repeat(400)));

        let err = Encoder::new(EncoderOptions::default())
            .encode_table("big.csv", dir.path())
            .unwrap_err();

        assert!(matches!(err, QrLabelError::Encoding { row: 0, .. }));
        assert!(!dir.path().join("big_QR_codes/unsent/big_1.png").exists());
        assert!(dir.path().join("big.csv").exists());
    }

    #[test]
    fn duplicate_labels_overwrite_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "dup.csv", "first,same_1.png\nsecond,same_1.png\n");

        let report = Encoder::new(EncoderOptions::default())
            .encode_table("dup.csv", dir.path())
            .unwrap();

        assert_eq!(report.written.len(), 2);
        let unsent = dir.path().join("dup_QR_codes/unsent");
        assert_eq!(pngs_in(&unsent), vec!["same_1.png"]);
        let img = image::open(unsent.join("same_1.png")).unwrap().to_luma8();
        assert_eq!(decode(&img), "second");
    }

    #[test]
    fn duplicate_labels_conflict_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "dup.csv", "first,same_1.png\nsecond,same_1.png\n");
        let options = EncoderOptions {
            on_existing: OnExisting::Fail,
            ..EncoderOptions::default()
        };

        let err = Encoder::new(options).encode_table("dup.csv", dir.path()).unwrap_err();

        assert!(matches!(err, QrLabelError::Conflict { .. }));
        let img = image::open(dir.path().join("dup_QR_codes/unsent/same_1.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(decode(&img), "first");
        assert!(dir.path().join("dup.csv").exists());
    }

    #[test]
    fn occupied_move_destination_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "t.csv", "a,a_1.png\n");
        fs::create_dir_all(dir.path().join("t_QR_codes")).unwrap();
        fs::write(dir.path().join("t_QR_codes/t.csv"), "older").unwrap();

        let err = Encoder::new(EncoderOptions::default())
            .encode_table("t.csv", dir.path())
            .unwrap_err();

        assert!(matches!(err, QrLabelError::Conflict { .. }));
        assert!(dir.path().join("t.csv").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("t_QR_codes/t.csv")).unwrap(),
            "older"
        );
    }

    #[test]
    fn relocate_never_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("t.csv");
        let dst = dir.path().join("moved.csv");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        let err = relocate(&src, &dst).unwrap_err();

        assert!(matches!(err, QrLabelError::Conflict { .. }));
        assert_eq!(fs::read_to_string(&src).unwrap(), "new");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");

        fs::remove_file(&dst).unwrap();
        relocate(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
    }

    #[test]
    fn fail_policy_keeps_file_from_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "t.csv", "a,a_1.png\n");
        let unsent = dir.path().join("t_QR_codes/unsent");
        fs::create_dir_all(&unsent).unwrap();
        fs::write(unsent.join("a_1.png"), b"kept").unwrap();
        let options = EncoderOptions {
            on_existing: OnExisting::Fail,
            ..EncoderOptions::default()
        };

        let err = Encoder::new(options).encode_table("t.csv", dir.path()).unwrap_err();

        assert!(matches!(err, QrLabelError::Conflict { .. }));
        assert_eq!(fs::read(unsent.join("a_1.png")).unwrap(), b"kept");
    }

    #[test]
    fn fail_policy_writes_fresh_images() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "t.csv", "a,a_1.png\nb,b_2.png\n");
        let options = EncoderOptions {
            on_existing: OnExisting::Fail,
            ..EncoderOptions::default()
        };

        let report = Encoder::new(options).encode_table("t.csv", dir.path()).unwrap();

        assert_eq!(report.written.len(), 2);
        let img = image::open(dir.path().join("t_QR_codes/unsent/b_2.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(decode(&img), "b");
    }

    #[test]
    fn aborts_on_first_bad_row_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "t.csv", "a,a_1.png\nshort\nc,c_3.png\n");

        let err = Encoder::new(EncoderOptions::default())
            .encode_table("t.csv", dir.path())
            .unwrap_err();

        assert!(matches!(err, QrLabelError::MalformedRow { row: 1, .. }));
        assert_eq!(pngs_in(&dir.path().join("t_QR_codes/unsent")), vec!["a_1.png"]);
        assert!(dir.path().join("t.csv").exists());
    }

    #[test]
    fn skip_policy_continues_but_keeps_table() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "t.csv", "a,a_1.png\nshort\nc,c_3.png\n");
        let options = EncoderOptions {
            on_row_error: OnRowError::Skip,
            ..EncoderOptions::default()
        };

        let report = Encoder::new(options).encode_table("t.csv", dir.path()).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.relocated_to.is_none());
        assert!(dir.path().join("t.csv").exists());
    }

    #[test]
    fn rerun_over_unmoved_table_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "t.csv", "a,a_1.png\n");
        let unsent = dir.path().join("t_QR_codes/unsent");
        fs::create_dir_all(&unsent).unwrap();
        fs::write(unsent.join("a_1.png"), b"stale").unwrap();

        Encoder::new(EncoderOptions::default())
            .encode_table("t.csv", dir.path())
            .unwrap();

        let img = image::open(unsent.join("a_1.png")).unwrap().to_luma8();
        assert_eq!(decode(&img), "a");
    }

    #[test]
    fn missing_table_is_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Encoder::new(EncoderOptions::default())
            .encode_table("absent.csv", dir.path())
            .unwrap_err();
        assert!(matches!(err, QrLabelError::FileAccess { .. }));
        assert!(!dir.path().join("absent_QR_codes").exists());
    }
}
