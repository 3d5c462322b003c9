//! Burns a person's name into the bottom of a generated image.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Luma, Rgb};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, info};

use crate::config::{FontSize, RenderConfig};
use crate::error::{QrLabelError, Result};

/// Takes the name from an image file name: everything before the first `_`,
/// normalized with [`normalize_name`].
///
/// A file name without `_` falls back to its stem.
///
/// ```
/// use qrlabel::labeler::camper_name;
///
/// assert_eq!(camper_name("john smith_1.png"), "John Smith");
/// ```
pub fn camper_name(file_name: &str) -> String {
    let raw = match file_name.split_once('_') {
        Some((head, _)) => head,
        None => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name),
    };
    normalize_name(raw)
}

/// Lower-cases `raw`, then capitalizes each space-separated word.
///
/// Within a word a letter is upper-cased when it does not follow another
/// letter, so `o'neil` becomes `O'Neil`.
pub fn normalize_name(raw: &str) -> String {
    raw.to_lowercase()
        .split(' ')
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut after_letter = false;
    for c in word.chars() {
        if after_letter {
            out.push(c);
        } else {
            // `ß` upper-cases to `SS`; only the first character stays capital
            let mut upper = c.to_uppercase();
            out.extend(upper.next());
            out.extend(upper.flat_map(char::to_lowercase));
        }
        after_letter = c.is_alphabetic();
    }
    out
}

/// Top-left corner of a `text_width` wide label centered horizontally,
/// `bottom_offset` pixels above the bottom edge.
pub fn text_origin(
    image_width: u32,
    image_height: u32,
    text_width: u32,
    bottom_offset: u32,
) -> (i32, i32) {
    let x = (image_width as i32 - text_width as i32) / 2;
    let y = image_height as i32 - bottom_offset as i32;
    (x, y)
}

pub struct Labeler {
    render: RenderConfig,
}

impl Labeler {
    pub fn new(render: RenderConfig) -> Self {
        Self { render }
    }

    /// Draws the name derived from `path`'s file name onto the image and saves
    /// it back to `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - A generated image; its file name supplies the label text.
    ///
    /// # Returns
    ///
    /// The name that was drawn.
    ///
    /// # Errors
    ///
    /// Returns [`QrLabelError::FileAccess`] if the image cannot be read, decoded
    /// or written back, or its extension is not an image format.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use qrlabel::config::RenderConfig;
    /// use qrlabel::labeler::Labeler;
    /// use std::path::Path;
    ///
    /// let render = RenderConfig::load(Path::new("calibri.ttf")).unwrap();
    /// let name = Labeler::new(render)
    ///     .label_image(Path::new("week1_QR_codes/unsent/jane doe_1.png"))
    ///     .unwrap();
    /// assert_eq!(name, "Jane Doe");
    /// ```
    pub fn label_image(&self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = camper_name(&file_name);

        let format = ImageFormat::from_path(path).map_err(|e| QrLabelError::image(path, e))?;
        let img = image::open(path).map_err(|e| QrLabelError::image(path, e))?;

        let tier = self.render.tier(FontSize::for_name(&name));
        let font = &self.render.font;
        let (text_width, _) = text_size(tier.scale, font, &name);
        let (x, y) = text_origin(
            img.width(),
            img.height(),
            text_width,
            self.render.bottom_offset,
        );

        let labeled = match img {
            DynamicImage::ImageLuma8(mut gray) => {
                draw_text_mut(&mut gray, Luma([0u8]), x, y, tier.scale, font, &name);
                DynamicImage::ImageLuma8(gray)
            }
            other => {
                let mut rgb = other.to_rgb8();
                draw_text_mut(&mut rgb, Rgb([0u8, 0, 0]), x, y, tier.scale, font, &name);
                DynamicImage::ImageRgb8(rgb)
            }
        };
        labeled
            .save_with_format(path, format)
            .map_err(|e| QrLabelError::image(path, e))?;
        debug!(file = %path.display(), name = %name, x, y, "labeled image");
        Ok(name)
    }

    /// Labels every image directly inside `dir`, in file name order.
    ///
    /// Files whose extension is not an image format are ignored.
    pub fn label_folder(&self, dir: &Path) -> Result<usize> {
        info!(folder = %dir.display(), "adding text at bottom of QR codes");
        let entries = fs::read_dir(dir).map_err(|e| QrLabelError::file_access(dir, e))?;
        let mut images: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| QrLabelError::file_access(dir, e))?.path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                images.push(path);
            }
        }
        images.sort();

        for path in &images {
            self.label_image(path)?;
        }
        info!(folder = %dir.display(), count = images.len(), "labeling finished");
        Ok(images.len())
    }
}
