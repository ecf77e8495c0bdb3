use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};

use crate::app_error::AppError;

/// Header the gateway sets to the authenticated caller's id.
pub const CALLER_ID_HEADER: &str = "uuid";

/// Authenticated caller, resolved from `CALLER_ID_HEADER`.
///
/// Rejects with `401` unless the header is present exactly once with a
/// non-blank value.
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_id_from_headers(&parts.headers).map(CallerId)
    }
}

pub fn caller_id_from_headers(headers: &HeaderMap) -> Result<String, AppError> {
    let mut values = headers.get_all(CALLER_ID_HEADER).iter();

    let (Some(value), None) = (values.next(), values.next()) else {
        tracing::debug!("Caller id header missing or repeated");
        return Err(AppError::Unauthenticated);
    };

    match value.to_str().map(str::trim) {
        Ok(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(AppError::Unauthenticated),
    }
}
