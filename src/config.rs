//! Fixed parameters and per-run options.
//!
//! The symbol format and font tiers are constants; the only things a run can
//! change are the policies for existing output and failing rows, plus where
//! the font lives.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use clap::ValueEnum;
use qrcode::EcLevel;

use crate::error::{QrLabelError, Result};

/// Suffix appended to a table's stem to name its output folder.
pub const OUTPUT_SUFFIX: &str = "_QR_codes";
/// Sub-folder holding freshly generated images.
pub const UNSENT_DIR: &str = "unsent";
/// Extension of the input tables picked up by discovery.
pub const TABLE_EXTENSION: &str = "csv";

pub const DEFAULT_FONT_FILE: &str = "calibri.ttf";
pub const FONT_LARGE_PX: f32 = 55.0;
pub const FONT_MEDIUM_PX: f32 = 45.0;
pub const FONT_SMALL_PX: f32 = 35.0;
/// Distance in pixels between the top of the label and the bottom edge.
pub const LABEL_BOTTOM_OFFSET: u32 = 90;

/// Encoding parameters shared by every symbol of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrSymbolConfig {
    /// Grid-size class, 1 to 40.
    pub version: i16,
    pub ec_level: EcLevel,
    /// Pixels per module.
    pub box_size: u32,
    /// Quiet zone width in modules.
    pub border: u32,
}

impl QrSymbolConfig {
    pub const DEFAULT: QrSymbolConfig = QrSymbolConfig {
        version: 10,
        ec_level: EcLevel::L,
        box_size: 10,
        border: 12,
    };

    /// Modules per side of the symbol, excluding the border.
    pub fn modules(&self) -> u32 {
        17 + 4 * self.version as u32
    }

    /// Side length of the rendered image in pixels.
    pub fn image_side(&self) -> u32 {
        (self.modules() + 2 * self.border) * self.box_size
    }
}

impl Default for QrSymbolConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What to do when an output image already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OnExisting {
    /// Replace the file; later rows win over earlier rows with the same label.
    #[default]
    Overwrite,
    /// Fail the row with a conflict error.
    Fail,
}

/// What to do when a single row cannot be turned into an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OnRowError {
    /// Stop processing the table at the first failing row.
    #[default]
    Abort,
    /// Log the failure and continue; the table is left unmoved.
    Skip,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderOptions {
    pub symbol: QrSymbolConfig,
    pub on_existing: OnExisting,
    pub on_row_error: OnRowError,
}

/// Size class of the label text, picked from the name length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    Large,
    Medium,
    Small,
}

impl FontSize {
    /// Picks the tier for a name: under 15 characters is large, 15 through 25
    /// is medium, anything longer is small.
    pub fn for_name(name: &str) -> Self {
        match name.chars().count() {
            0..=14 => FontSize::Large,
            15..=25 => FontSize::Medium,
            _ => FontSize::Small,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontTier {
    pub scale: PxScale,
}

impl FontTier {
    pub fn new(px: f32) -> Self {
        Self {
            scale: PxScale::from(px),
        }
    }
}

/// Font and layout used by the [`Labeler`](crate::labeler::Labeler).
///
/// Built once at startup and handed to the labeler, so a missing font is
/// reported before any table is touched.
pub struct RenderConfig {
    pub font: FontVec,
    pub large: FontTier,
    pub medium: FontTier,
    pub small: FontTier,
    pub bottom_offset: u32,
}

impl std::fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderConfig")
            .field("large", &self.large)
            .field("medium", &self.medium)
            .field("small", &self.small)
            .field("bottom_offset", &self.bottom_offset)
            .finish_non_exhaustive()
    }
}

impl RenderConfig {
    pub fn new(font: FontVec) -> Self {
        Self {
            font,
            large: FontTier::new(FONT_LARGE_PX),
            medium: FontTier::new(FONT_MEDIUM_PX),
            small: FontTier::new(FONT_SMALL_PX),
            bottom_offset: LABEL_BOTTOM_OFFSET,
        }
    }

    /// Reads a TrueType/OpenType font from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| QrLabelError::FontLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| QrLabelError::FontLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(font))
    }

    pub fn tier(&self, size: FontSize) -> FontTier {
        match size {
            FontSize::Large => self.large,
            FontSize::Medium => self.medium,
            FontSize::Small => self.small,
        }
    }
}

/// Locates the label font.
///
/// An explicit path is used as given. Otherwise [`DEFAULT_FONT_FILE`] is looked
/// up next to the running executable, then in `working_dir`. When neither
/// exists the working-directory candidate is returned so the load error names
/// a concrete path.
pub fn resolve_font_path(explicit: Option<&Path>, working_dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_FONT_FILE)));
    match beside_exe {
        Some(path) if path.is_file() => path,
        _ => working_dir.join(DEFAULT_FONT_FILE),
    }
}
