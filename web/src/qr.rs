//! QR images for redemption codes.
//!
//! Rendering is pluggable through [`QrRenderer`]. [`PngQr`] draws a real
//! QR symbol; the HTTP layer always answers with base64 PNG data and falls
//! back to a 1×1 placeholder when rendering fails.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::Luma;
use image::codecs::png::PngEncoder;
use qrcode::QrCode;
use thiserror::Error;

/// Base64 of a 1×1 PNG, served whenever rendering is unavailable.
pub const PLACEHOLDER_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR4nGMAAQAABQABDQottAAAAABJRU5ErkJggg==";

/// QR rendering failure.
#[derive(Debug, Error)]
pub enum QrError {
    /// The code cannot be rendered.
    #[error("cannot render QR for code: {0}")]
    Render(String),
}

/// Renders a redemption code as PNG bytes.
pub trait QrRenderer: Send + Sync {
    /// PNG image encoding `code`.
    ///
    /// # Errors
    ///
    /// Returns [`QrError`] when no image can be produced.
    fn render_png(&self, code: &str) -> Result<Vec<u8>, QrError>;
}

/// Pixels per QR module in rendered images.
pub const MODULE_PIXELS: u32 = 5;

/// Grayscale PNG renderer backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy)]
pub struct PngQr {
    module_pixels: u32,
}

impl PngQr {
    /// Renderer drawing each module as a `module_pixels` square.
    #[must_use]
    pub const fn new(module_pixels: u32) -> Self {
        Self { module_pixels }
    }
}

impl Default for PngQr {
    fn default() -> Self {
        Self::new(MODULE_PIXELS)
    }
}

impl QrRenderer for PngQr {
    fn render_png(&self, code: &str) -> Result<Vec<u8>, QrError> {
        let symbol =
            QrCode::new(code.as_bytes()).map_err(|e| QrError::Render(e.to_string()))?;
        let pixels = symbol
            .render::<Luma<u8>>()
            .module_dimensions(self.module_pixels, self.module_pixels)
            .build();

        let mut png = Vec::new();
        pixels
            .write_with_encoder(PngEncoder::new(&mut png))
            .map_err(|e| QrError::Render(e.to_string()))?;
        Ok(png)
    }
}

/// Renderer that always yields the placeholder image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderQr;

impl QrRenderer for PlaceholderQr {
    fn render_png(&self, _code: &str) -> Result<Vec<u8>, QrError> {
        STANDARD
            .decode(PLACEHOLDER_PNG_BASE64)
            .map_err(|e| QrError::Render(e.to_string()))
    }
}

/// Render `code` and encode it as base64, falling back to the placeholder.
#[must_use]
pub fn qr_base64(renderer: &dyn QrRenderer, code: &str) -> String {
    match renderer.render_png(code) {
        Ok(png) => STANDARD.encode(png),
        Err(err) => {
            tracing::warn!(error = %err, "QR rendering failed, serving placeholder");
            PLACEHOLDER_PNG_BASE64.to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Broken;

    impl QrRenderer for Broken {
        fn render_png(&self, code: &str) -> Result<Vec<u8>, QrError> {
            Err(QrError::Render(code.to_string()))
        }
    }

    struct Echo;

    impl QrRenderer for Echo {
        fn render_png(&self, code: &str) -> Result<Vec<u8>, QrError> {
            Ok(code.as_bytes().to_vec())
        }
    }

    #[test]
    fn placeholder_round_trips_to_the_same_base64() {
        assert_eq!(qr_base64(&PlaceholderQr, "RES_1"), PLACEHOLDER_PNG_BASE64);
    }

    #[test]
    fn placeholder_is_a_png() {
        let png = PlaceholderQr.render_png("RES_1").unwrap_or_default();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn failures_fall_back_to_placeholder() {
        assert_eq!(qr_base64(&Broken, "RES_1"), PLACEHOLDER_PNG_BASE64);
    }

    #[test]
    fn png_renderer_draws_a_scaled_symbol() {
        let png = PngQr::default().render_png("RES_0123456789abcdef").unwrap();
        let decoded = image::load_from_memory(&png).unwrap();

        assert_eq!(&png[..4], b"\x89PNG");
        // Smallest symbol is 21 modules, plus a 4-module quiet zone per side.
        assert!(decoded.width() >= (21 + 8) * MODULE_PIXELS);
        assert_eq!(decoded.width() % MODULE_PIXELS, 0);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn distinct_codes_render_distinct_images() {
        let first = qr_base64(&PngQr::default(), "RES_aaaa");
        let second = qr_base64(&PngQr::default(), "RES_bbbb");

        assert_ne!(first, second);
        assert_ne!(first, PLACEHOLDER_PNG_BASE64);
    }

    #[test]
    fn oversized_codes_fall_back_to_placeholder() {
        let huge = "x".repeat(8000);
        assert!(PngQr::default().render_png(&huge).is_err());
        assert_eq!(qr_base64(&PngQr::default(), &huge), PLACEHOLDER_PNG_BASE64);
    }

    #[test]
    fn rendered_bytes_are_base64_encoded() {
        assert_eq!(qr_base64(&Echo, "hi"), "aGk=");
    }
}
