use crate::app_error::AppResult;

/// Turns a signed token into scannable image bytes.
///
/// Implementations must be pure: the same input always yields the same bytes
/// and no state is kept between calls.
pub trait QrRenderer: Send + Sync {
    fn render(&self, signed_value: &str) -> AppResult<Vec<u8>>;

    /// MIME type of the bytes returned by `render`.
    fn content_type(&self) -> &'static str;
}
