use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::app_error::AppResult;

/// Outcome of consuming a token together with the owner's declared action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionScan {
    /// Token moved pending -> scanned and `action` replaced `previous`.
    Scanned { previous: Option<String> },
    /// `action` equals the stored latest action; nothing was written.
    Replay,
    /// Token was no longer pending; nothing was written.
    NotPending,
}

#[async_trait]
pub trait ActionRepo: Send + Sync {
    async fn latest_action(&self, owner_id: &str) -> AppResult<Option<String>>;

    /// Atomically read the owner's latest action and, unless it equals
    /// `action`, transition `signed_value` pending -> scanned and overwrite
    /// the latest action. Either both writes happen or neither does.
    async fn record_latest_action(
        &self,
        owner_id: &str,
        action: &str,
        signed_value: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ActionScan>;
}

/// Rejects an owner declaring the same action twice in a row.
///
/// Only granted redemptions move the owner's latest action.
#[derive(Clone)]
pub struct ActionGuard {
    repo: Arc<dyn ActionRepo>,
}

impl ActionGuard {
    pub fn new(repo: Arc<dyn ActionRepo>) -> Self {
        Self { repo }
    }

    /// `true` if `action` repeats the owner's latest recorded action. Read only.
    pub async fn is_replay(&self, owner_id: &str, action: &str) -> AppResult<bool> {
        let previous = self.repo.latest_action(owner_id).await?;

        let replay = previous.as_deref() == Some(action);
        if replay {
            warn!(owner_id, action, "Repeated action rejected");
        }
        Ok(replay)
    }

    /// Consume `signed_value` and record `action` as one step.
    pub async fn scan(
        &self,
        signed_value: &str,
        owner_id: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ActionScan> {
        let outcome = self
            .repo
            .record_latest_action(owner_id, action, signed_value, now)
            .await?;

        match &outcome {
            ActionScan::Scanned { previous } => {
                debug!(owner_id, action, previous = ?previous, "Latest action recorded")
            }
            ActionScan::Replay => {
                warn!(owner_id, action, "Repeated action rejected at scan")
            }
            ActionScan::NotPending => {}
        }
        Ok(outcome)
    }
}
