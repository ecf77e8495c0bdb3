use std::sync::Arc;

use crate::{
    application::{
        ports::qr_renderer::QrRenderer,
        use_cases::{qr_issue::TokenIssuer, qr_redeem::TokenRedeemer},
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub token_issuer: Arc<TokenIssuer>,
    pub token_redeemer: Arc<TokenRedeemer>,
    pub qr_renderer: Arc<dyn QrRenderer>,
}
