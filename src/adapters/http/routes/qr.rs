//! QR token routes: issue, redeem, and status lookup.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, middleware::CallerId},
    app_error::AppResult,
    domain::entities::{qr_token::TokenStatus, redemption::DenyReason},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateQrResponse {
    qr_payload: String,
    content_type: &'static str,
}

#[derive(Deserialize)]
struct VerifyQrPayload {
    token: String,
    action: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyQrResponse {
    access_granted: bool,
    reason: Option<DenyReason>,
}

#[derive(Deserialize)]
struct TokenStatusPayload {
    token: String,
}

#[derive(Serialize)]
struct TokenStatusResponse {
    status: TokenStatus,
}

/// POST /api/qr
/// Issues a fresh single-use token for the caller and returns it rendered
/// as a base64 encoded image.
async fn create_qr(
    State(app_state): State<AppState>,
    CallerId(caller_id): CallerId,
) -> AppResult<impl IntoResponse> {
    let signed_value = app_state.token_issuer.create_qr(&caller_id).await?;
    let image = app_state.qr_renderer.render(&signed_value)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateQrResponse {
            qr_payload: STANDARD.encode(image),
            content_type: app_state.qr_renderer.content_type(),
        }),
    ))
}

/// POST /api/qr/verify
/// Redeems a scanned token. Denials are a normal 200 answer with a reason;
/// only storage failures produce an error status.
async fn verify_qr(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyQrPayload>,
) -> AppResult<impl IntoResponse> {
    let redemption = app_state
        .token_redeemer
        .verify_qr(&payload.token, payload.action.as_deref())
        .await?;

    Ok(Json(VerifyQrResponse {
        access_granted: redemption.access_granted(),
        reason: redemption.deny_reason(),
    }))
}

/// POST /api/qr/status
async fn token_status(
    State(app_state): State<AppState>,
    CallerId(caller_id): CallerId,
    Json(payload): Json<TokenStatusPayload>,
) -> AppResult<impl IntoResponse> {
    let status = app_state
        .token_issuer
        .token_status(&caller_id, &payload.token)
        .await?;

    Ok(Json(TokenStatusResponse { status }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/qr", post(create_qr))
        .route("/qr/verify", post(verify_qr))
        .route("/qr/status", post(token_status))
}
