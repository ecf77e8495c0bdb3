//! Test data factories for creating valid test fixtures.

use std::net::SocketAddr;

use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use time::Duration;

use crate::{infra::config::AppConfig, jwt::ClaimCodec};

pub const TEST_SIGNING_KEY: &str = "test-signing-key";

/// Codec signing with `TEST_SIGNING_KEY`.
pub fn test_codec() -> ClaimCodec {
    ClaimCodec::new(&SecretString::new(TEST_SIGNING_KEY.into())).unwrap()
}

/// Fixed instant so time-dependent tests are deterministic.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// Create a test config with sensible defaults.
pub fn test_config(overrides: impl FnOnce(&mut AppConfig)) -> AppConfig {
    let mut config = AppConfig {
        signing_key: SecretString::new(TEST_SIGNING_KEY.into()),
        token_ttl: Duration::seconds(30),
        action_guard_enabled: false,
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        request_timeout_secs: 10,
        qr_image_size: 256,
        log_file: String::new(),
    };
    overrides(&mut config);
    config
}
