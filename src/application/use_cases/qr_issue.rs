use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use time::Duration;
use tracing::{info, instrument};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::qr_token::{QrToken, TokenStatus},
    jwt::{ClaimCodec, QrClaims, token_fingerprint},
};

/// Durable store for issued tokens.
///
/// Any backing store must implement `atomic_transition` as one indivisible
/// conditional update. It is the only thing that keeps two concurrent
/// redemptions of the same token from both succeeding; callers never lock.
#[async_trait]
pub trait QrTokenRepo: Send + Sync {
    /// Insert a `pending` token. Fails if `signed_value` is already stored.
    async fn store_token(
        &self,
        owner_id: &str,
        signed_value: &str,
        now: DateTime<Utc>,
    ) -> AppResult<QrToken>;

    async fn get_status(&self, signed_value: &str) -> AppResult<Option<TokenStatus>>;

    /// Set the status to `to` only if it currently is `from`.
    ///
    /// Returns `true` iff exactly one row changed.
    async fn atomic_transition(
        &self,
        signed_value: &str,
        from: TokenStatus,
        to: TokenStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Creates signed one-time tokens and answers status queries from their owners.
#[derive(Clone)]
pub struct TokenIssuer {
    repo: Arc<dyn QrTokenRepo>,
    codec: Arc<ClaimCodec>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(repo: Arc<dyn QrTokenRepo>, codec: Arc<ClaimCodec>, ttl: Duration) -> Self {
        Self { repo, codec, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create_qr(&self, owner_id: &str) -> AppResult<String> {
        self.create_qr_at(owner_id, Utc::now()).await
    }

    /// Sign and persist a new pending token for `owner_id`.
    ///
    /// The signed value is only returned once it has been stored.
    #[instrument(skip(self))]
    pub async fn create_qr_at(&self, owner_id: &str, now: DateTime<Utc>) -> AppResult<String> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        let claims = QrClaims::issue(owner_id, now.timestamp(), self.ttl);
        let signed_value = self.codec.sign(&claims)?;

        let token = self.repo.store_token(owner_id, &signed_value, now).await?;

        info!(
            token_id = %token.id,
            token_fp = %token_fingerprint(&signed_value),
            expires_at = claims.exp,
            "QR token issued"
        );

        Ok(signed_value)
    }

    pub async fn token_status(&self, caller_id: &str, signed_value: &str) -> AppResult<TokenStatus> {
        self.token_status_at(caller_id, signed_value, Utc::now())
            .await
    }

    /// Current state of a token, visible to its owner only.
    ///
    /// A pending token whose claim has run out is reported as expired; the
    /// stored row is left for the next redemption attempt to flip.
    #[instrument(skip(self, signed_value), fields(token_fp = %token_fingerprint(signed_value)))]
    pub async fn token_status_at(
        &self,
        caller_id: &str,
        signed_value: &str,
        now: DateTime<Utc>,
    ) -> AppResult<TokenStatus> {
        let claims = self
            .codec
            .verify(signed_value)
            .map_err(|e| AppError::InvalidInput(format!("Invalid token: {e}")))?;

        if claims.sub != caller_id {
            return Err(AppError::NotFound);
        }

        let status = self
            .repo
            .get_status(signed_value)
            .await?
            .ok_or(AppError::NotFound)?;

        if status == TokenStatus::Pending && claims.is_expired_at(now.timestamp()) {
            return Ok(TokenStatus::Expired);
        }
        Ok(status)
    }
}
