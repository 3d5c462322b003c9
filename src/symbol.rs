//! QR symbol encoding and rasterization.
//!
//! Encoding itself is done by the `qrcode` crate at exactly the configured
//! version; this module pins the parameters and turns the module grid into a
//! black-on-white bitmap.

use image::{GrayImage, ImageBuffer, Luma};
use qrcode::types::{QrError, QrResult};
use qrcode::{Color, QrCode, Version};

use crate::config::QrSymbolConfig;

/// Encodes `payload` at the fixed version and error-correction level.
///
/// # Arguments
///
/// * `payload` - The text to encode, already sanitized.
/// * `cfg` - Symbol version and error correction level to use.
///
/// # Errors
///
/// Returns [`QrError::DataTooLong`] when the payload does not fit, instead of
/// growing the version or truncating the payload, and
/// [`QrError::InvalidVersion`] for a version outside 1 to 40.
///
/// # Example
///
/// ```rust
/// use qrlabel::{config::QrSymbolConfig, symbol::encode_payload};
///
/// let code = encode_payload("HELLO WORLD", &QrSymbolConfig::DEFAULT).unwrap();
/// assert_eq!(code.width(), 57);
/// assert!(encode_payload(&"x".repeat(300), &QrSymbolConfig::DEFAULT).is_err());
/// ```
pub fn encode_payload(payload: &str, cfg: &QrSymbolConfig) -> QrResult<QrCode> {
    if !(1..=40).contains(&cfg.version) {
        return Err(QrError::InvalidVersion);
    }
    QrCode::with_version(payload.as_bytes(), Version::Normal(cfg.version), cfg.ec_level)
}

/// Draws `code` with `cfg.box_size` pixels per module and a `cfg.border`
/// module quiet zone on every side.
pub fn rasterize(code: &QrCode, cfg: &QrSymbolConfig) -> GrayImage {
    let width = code.width() as u32;
    let border = cfg.border;
    let box_size = cfg.box_size.max(1);
    let side = (width + 2 * border) * box_size;
    let colors = code.to_colors();

    let mut img = ImageBuffer::new(side, side);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let mx = (x / box_size) as i64 - border as i64;
        let my = (y / box_size) as i64 - border as i64;
        let inside = (0..width as i64).contains(&mx) && (0..width as i64).contains(&my);
        let dark = inside && colors[(my as usize) * width as usize + mx as usize] == Color::Dark;
        *pixel = if dark {
            Luma([0u8]) // Black
        } else {
            Luma([255u8]) // White
        };
    }
    img
}

/// Encodes and rasterizes in one step.
pub fn render_payload(payload: &str, cfg: &QrSymbolConfig) -> QrResult<GrayImage> {
    let code = encode_payload(payload, cfg)?;
    Ok(rasterize(&code, cfg))
}
