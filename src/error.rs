//! Error type shared by every stage of the pipeline.

use std::path::{Path, PathBuf};

use qrcode::types::QrError;
use thiserror::Error;

/// Everything that can go wrong while turning a table into labeled images.
///
/// Each variant carries the file it concerns and, for row-level failures, the
/// zero-based row index, so a log line is enough to find the offending input.
#[derive(Error, Debug)]
pub enum QrLabelError {
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row {row} in {}: {reason}", path.display())]
    MalformedRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("cannot encode row {row} of {}: {source}", path.display())]
    Encoding {
        path: PathBuf,
        row: usize,
        #[source]
        source: QrError,
    },

    #[error("cannot load font {}: {reason}", path.display())]
    FontLoad { path: PathBuf, reason: String },

    #[error("refusing to overwrite existing file {}", path.display())]
    Conflict { path: PathBuf },
}

impl QrLabelError {
    pub(crate) fn file_access(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Maps an `image` crate failure onto [`QrLabelError::FileAccess`].
    ///
    /// Decoding and encoding problems are reported as `InvalidData` so the
    /// path stays attached to the message.
    pub(crate) fn image(path: impl AsRef<Path>, error: image::ImageError) -> Self {
        let source = match error {
            image::ImageError::IoError(io) => io,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        };
        Self::file_access(path, source)
    }
}

pub type Result<T> = std::result::Result<T, QrLabelError>;
