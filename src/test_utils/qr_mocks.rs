//! In-memory mock implementations for the QR repository traits.
//!
//! Both mocks take their lock for the whole check-and-write, which gives the
//! same single-step semantics the Postgres queries provide. Failure flags let
//! tests inject storage errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::qr_renderer::QrRenderer,
        use_cases::{
            action_guard::{ActionRepo, ActionScan},
            qr_issue::QrTokenRepo,
        },
    },
    domain::entities::{
        action::LatestAction,
        qr_token::{QrToken, TokenStatus},
    },
};

// ============================================================================
// InMemoryQrTokenRepo
// ============================================================================

/// In-memory implementation of QrTokenRepo for testing.
#[derive(Default)]
pub struct InMemoryQrTokenRepo {
    pub tokens: Mutex<HashMap<String, QrToken>>,
    fail_store: AtomicBool,
    fail_transitions: AtomicBool,
}

impl InMemoryQrTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_transitions(&self, fail: bool) {
        self.fail_transitions.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, signed_value: &str) -> Option<QrToken> {
        self.tokens.lock().unwrap().get(signed_value).cloned()
    }

    pub fn status_of(&self, signed_value: &str) -> Option<TokenStatus> {
        self.get(signed_value).map(|t| t.status)
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compare-and-set on the token status under a single lock.
    fn transition(
        &self,
        signed_value: &str,
        from: TokenStatus,
        to: TokenStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected transition failure".into()));
        }

        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(signed_value) {
            Some(token) if token.status == from => {
                token.status = to;
                token.scanned_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl QrTokenRepo for InMemoryQrTokenRepo {
    async fn store_token(
        &self,
        owner_id: &str,
        signed_value: &str,
        now: DateTime<Utc>,
    ) -> AppResult<QrToken> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected store failure".into()));
        }

        let mut tokens = self.tokens.lock().unwrap();
        if tokens.contains_key(signed_value) {
            return Err(AppError::Database(
                "A record with this value already exists".into(),
            ));
        }

        let token = QrToken {
            id: Uuid::new_v4(),
            signed_value: signed_value.to_string(),
            owner_id: owner_id.to_string(),
            status: TokenStatus::Pending,
            created_at: now,
            scanned_at: None,
        };
        tokens.insert(token.signed_value.clone(), token.clone());
        Ok(token)
    }

    async fn get_status(&self, signed_value: &str) -> AppResult<Option<TokenStatus>> {
        Ok(self.status_of(signed_value))
    }

    async fn atomic_transition(
        &self,
        signed_value: &str,
        from: TokenStatus,
        to: TokenStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.transition(signed_value, from, to, now)
    }
}

// ============================================================================
// InMemoryActionRepo
// ============================================================================

/// In-memory implementation of ActionRepo for testing.
///
/// Shares the token repo so a scan and its action are written under the
/// actions lock, mirroring the Postgres transaction.
pub struct InMemoryActionRepo {
    pub actions: Mutex<HashMap<String, LatestAction>>,
    tokens: Arc<InMemoryQrTokenRepo>,
    fail: AtomicBool,
}

impl InMemoryActionRepo {
    pub fn new(tokens: Arc<InMemoryQrTokenRepo>) -> Self {
        Self {
            actions: Mutex::new(HashMap::new()),
            tokens,
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn latest(&self, owner_id: &str) -> Option<String> {
        self.actions
            .lock()
            .unwrap()
            .get(owner_id)
            .map(|a| a.last_action.clone())
    }

    fn check_fail(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected action failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionRepo for InMemoryActionRepo {
    async fn latest_action(&self, owner_id: &str) -> AppResult<Option<String>> {
        self.check_fail()?;
        Ok(self.latest(owner_id))
    }

    async fn record_latest_action(
        &self,
        owner_id: &str,
        action: &str,
        signed_value: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ActionScan> {
        self.check_fail()?;

        let mut actions = self.actions.lock().unwrap();
        let previous = actions.get(owner_id).map(|a| a.last_action.clone());
        if previous.as_deref() == Some(action) {
            return Ok(ActionScan::Replay);
        }

        if !self
            .tokens
            .transition(signed_value, TokenStatus::Pending, TokenStatus::Scanned, now)?
        {
            return Ok(ActionScan::NotPending);
        }

        actions.insert(
            owner_id.to_string(),
            LatestAction {
                owner_id: owner_id.to_string(),
                last_action: action.to_string(),
                updated_at: now,
            },
        );
        Ok(ActionScan::Scanned { previous })
    }
}

// ============================================================================
// StubQrRenderer
// ============================================================================

/// Renderer that returns the signed value itself, so tests can read the
/// token back out of a `qrPayload`.
#[derive(Default)]
pub struct StubQrRenderer;

impl QrRenderer for StubQrRenderer {
    fn render(&self, signed_value: &str) -> AppResult<Vec<u8>> {
        Ok(signed_value.as_bytes().to_vec())
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_datetime;

    #[tokio::test]
    async fn store_token_rejects_duplicates() {
        let repo = InMemoryQrTokenRepo::new();
        let now = test_datetime();

        repo.store_token("owner", "signed", now).await.unwrap();
        let dup = repo.store_token("other", "signed", now).await;

        assert!(matches!(dup, Err(AppError::Database(_))));
        assert_eq!(repo.get("signed").unwrap().owner_id, "owner");
    }

    #[tokio::test]
    async fn transition_applies_only_from_expected_status() {
        let repo = InMemoryQrTokenRepo::new();
        let now = test_datetime();
        repo.store_token("owner", "signed", now).await.unwrap();

        let wrong_from = repo
            .atomic_transition("signed", TokenStatus::Scanned, TokenStatus::Expired, now)
            .await
            .unwrap();
        let applied = repo
            .atomic_transition("signed", TokenStatus::Pending, TokenStatus::Scanned, now)
            .await
            .unwrap();
        let again = repo
            .atomic_transition("signed", TokenStatus::Pending, TokenStatus::Scanned, now)
            .await
            .unwrap();

        assert!(!wrong_from);
        assert!(applied);
        assert!(!again);
    }

    #[tokio::test]
    async fn transition_of_unknown_token_does_not_apply() {
        let repo = InMemoryQrTokenRepo::new();
        let applied = repo
            .atomic_transition(
                "missing",
                TokenStatus::Pending,
                TokenStatus::Scanned,
                test_datetime(),
            )
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn record_latest_action_writes_only_with_the_scan() {
        let tokens = Arc::new(InMemoryQrTokenRepo::new());
        let repo = InMemoryActionRepo::new(tokens.clone());
        let now = test_datetime();
        tokens.store_token("o", "t1", now).await.unwrap();
        tokens.store_token("o", "t2", now).await.unwrap();

        assert_eq!(
            repo.record_latest_action("o", "a", "t1", now).await.unwrap(),
            ActionScan::Scanned { previous: None }
        );
        assert_eq!(
            repo.record_latest_action("o", "b", "t1", now).await.unwrap(),
            ActionScan::NotPending
        );
        assert_eq!(repo.latest("o").as_deref(), Some("a"));

        assert_eq!(
            repo.record_latest_action("o", "a", "t2", now).await.unwrap(),
            ActionScan::Replay
        );
        assert_eq!(tokens.status_of("t2"), Some(TokenStatus::Pending));

        assert_eq!(
            repo.record_latest_action("o", "b", "t2", now).await.unwrap(),
            ActionScan::Scanned {
                previous: Some("a".to_string())
            }
        );
        assert_eq!(repo.latest("o").as_deref(), Some("b"));
    }
}
