use qrcode::{EcLevel, QrCode, render::svg};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::qr_renderer::QrRenderer,
};

/// Renders signed values as SVG QR codes at medium error correction.
pub struct SvgQrRenderer {
    size: u32,
}

impl SvgQrRenderer {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl QrRenderer for SvgQrRenderer {
    fn render(&self, signed_value: &str) -> AppResult<Vec<u8>> {
        let code = QrCode::with_error_correction_level(signed_value.as_bytes(), EcLevel::M)
            .map_err(|e| AppError::Internal(format!("QR encoding failed: {e}")))?;

        let image = code
            .render::<svg::Color>()
            .min_dimensions(self.size, self.size)
            .build();

        Ok(image.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}
