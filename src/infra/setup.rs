use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, qr_render::SvgQrRenderer},
    infra::{InfraError, config::AppConfig, postgres_persistence},
    jwt::ClaimCodec,
    use_cases::{
        action_guard::{ActionGuard, ActionRepo},
        qr_issue::{QrTokenRepo, TokenIssuer},
        qr_redeem::TokenRedeemer,
    },
};

pub async fn init_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let codec = Arc::new(ClaimCodec::new(&config.signing_key).map_err(InfraError::CodecInit)?);

    let postgres_arc = Arc::new(
        postgres_persistence(&config.database_url, config.database_max_connections).await?,
    );
    let token_repo_arc = postgres_arc.clone() as Arc<dyn QrTokenRepo>;

    let token_issuer = TokenIssuer::new(token_repo_arc.clone(), codec.clone(), config.token_ttl);

    let mut token_redeemer = TokenRedeemer::new(token_repo_arc, codec);
    if config.action_guard_enabled {
        let action_repo_arc = postgres_arc.clone() as Arc<dyn ActionRepo>;
        token_redeemer = token_redeemer.with_action_guard(ActionGuard::new(action_repo_arc));
    }

    tracing::info!(
        ttl_secs = token_issuer.ttl().whole_seconds(),
        action_guard = token_redeemer.action_guard_enabled(),
        "QR services ready"
    );

    let qr_renderer = Arc::new(SvgQrRenderer::new(config.qr_image_size));

    Ok(AppState {
        config: Arc::new(config),
        token_issuer: Arc::new(token_issuer),
        token_redeemer: Arc::new(token_redeemer),
        qr_renderer,
    })
}

pub fn init_tracing(log_file: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qr_access=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs); skipped when the file can't be created
    let json_layer = match File::create(log_file) {
        Ok(file) => Some(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
        ),
        Err(err) => {
            eprintln!("cannot create log file {log_file}: {err}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
