use std::net::SocketAddr;

use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;

/// Longest lifetime a QR token may be configured with (one day).
pub const MAX_TOKEN_TTL_SECS: i64 = 86_400;

pub struct AppConfig {
    /// HMAC secret the QR claims are signed with.
    pub signing_key: SecretString,
    /// How long an issued QR token can be redeemed.
    pub token_ttl: Duration,
    /// Reject a redemption whose declared action repeats the owner's previous one.
    pub action_guard_enabled: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Upper bound for a single request, including its storage round-trips.
    pub request_timeout_secs: u64,
    /// Minimum edge length of the rendered QR image.
    pub qr_image_size: u32,
    pub log_file: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let signing_key: SecretString =
            SecretString::new(get_env::<String>("QR_SIGNING_KEY").into());

        let token_ttl_secs: i64 = get_env_default("QR_TOKEN_TTL_SECS", 30);
        let action_guard_enabled: bool = get_env_default("ACTION_GUARD_ENABLED", false);

        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);

        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3002)));
        let request_timeout_secs: u64 = get_env_default("REQUEST_TIMEOUT_SECS", 10);
        let qr_image_size: u32 = get_env_default("QR_IMAGE_SIZE", 256);
        let log_file: String = get_env_default("LOG_FILE", "app.log".to_string());

        Self {
            signing_key,
            token_ttl: token_ttl_from_secs(token_ttl_secs),
            action_guard_enabled,
            database_url,
            database_max_connections,
            bind_addr,
            request_timeout_secs,
            qr_image_size,
            log_file,
        }
    }
}

/// Clamp a configured TTL into `1..=MAX_TOKEN_TTL_SECS` seconds.
pub fn token_ttl_from_secs(secs: i64) -> Duration {
    Duration::seconds(secs.clamp(1, MAX_TOKEN_TTL_SECS))
}
