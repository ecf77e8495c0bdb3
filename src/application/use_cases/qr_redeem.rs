use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    app_error::AppResult,
    domain::entities::{
        qr_token::TokenStatus,
        redemption::{DenyReason, Redemption},
    },
    jwt::{ClaimCodec, token_fingerprint},
    use_cases::{
        action_guard::{ActionGuard, ActionScan},
        qr_issue::QrTokenRepo,
    },
};

/// Redeems signed tokens at most once.
///
/// Storage errors are returned as `Err` and never turn into a grant; every
/// other outcome is a `Redemption`.
#[derive(Clone)]
pub struct TokenRedeemer {
    repo: Arc<dyn QrTokenRepo>,
    codec: Arc<ClaimCodec>,
    action_guard: Option<ActionGuard>,
}

impl TokenRedeemer {
    pub fn new(repo: Arc<dyn QrTokenRepo>, codec: Arc<ClaimCodec>) -> Self {
        Self {
            repo,
            codec,
            action_guard: None,
        }
    }

    pub fn with_action_guard(mut self, guard: ActionGuard) -> Self {
        self.action_guard = Some(guard);
        self
    }

    pub fn action_guard_enabled(&self) -> bool {
        self.action_guard.is_some()
    }

    pub async fn verify_qr(
        &self,
        signed_value: &str,
        action: Option<&str>,
    ) -> AppResult<Redemption> {
        self.verify_qr_at(signed_value, action, Utc::now()).await
    }

    #[instrument(skip(self, signed_value), fields(token_fp = %token_fingerprint(signed_value)))]
    pub async fn verify_qr_at(
        &self,
        signed_value: &str,
        action: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Redemption> {
        let redemption = self.redeem(signed_value, action, now).await?;

        match redemption {
            Redemption::Granted => info!("QR token redeemed"),
            Redemption::Denied(reason) => info!(reason = reason.as_str(), "QR redemption denied"),
        }
        Ok(redemption)
    }

    async fn redeem(
        &self,
        signed_value: &str,
        action: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Redemption> {
        let claims = match self.codec.verify(signed_value) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(error = %err, "QR token rejected");
                return Ok(Redemption::Denied(DenyReason::InvalidToken));
            }
        };

        let guarded = self.action_guard.as_ref().zip(declared_action(action));

        // Checked before the token is touched so a repeated action never burns it.
        if let Some((guard, action)) = guarded
            && guard.is_replay(&claims.sub, action).await?
        {
            return Ok(Redemption::Denied(DenyReason::ReplayAction));
        }

        if claims.is_expired_at(now.timestamp()) {
            let flipped = self
                .repo
                .atomic_transition(signed_value, TokenStatus::Pending, TokenStatus::Expired, now)
                .await?;
            debug!(flipped, owner_id = %claims.sub, "QR token expired");
            return Ok(Redemption::Denied(DenyReason::TokenExpired));
        }

        let scanned = match guarded {
            // The action is only recorded when the token is actually consumed.
            Some((guard, action)) => match guard.scan(signed_value, &claims.sub, action, now).await? {
                ActionScan::Scanned { .. } => true,
                ActionScan::NotPending => false,
                // A concurrent grant recorded the same action first.
                ActionScan::Replay => return Ok(Redemption::Denied(DenyReason::ReplayAction)),
            },
            None => {
                self.repo
                    .atomic_transition(signed_value, TokenStatus::Pending, TokenStatus::Scanned, now)
                    .await?
            }
        };

        debug!(scanned, owner_id = %claims.sub, "QR token transition");
        if scanned {
            Ok(Redemption::Granted)
        } else {
            Ok(Redemption::Denied(DenyReason::TokenAlreadyUsed))
        }
    }
}

fn declared_action(action: Option<&str>) -> Option<&str> {
    action.map(str::trim).filter(|a| !a.is_empty())
}
