use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::{
    adapters::persistence::{PostgresPersistence, qr_token::transition_status},
    app_error::{AppError, AppResult},
    application::use_cases::action_guard::{ActionRepo, ActionScan},
    domain::entities::qr_token::TokenStatus,
};

#[async_trait]
impl ActionRepo for PostgresPersistence {
    async fn latest_action(&self, owner_id: &str) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT last_action FROM qr_actions WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(row.map(|r| r.get("last_action")))
    }

    async fn record_latest_action(
        &self,
        owner_id: &str,
        action: &str,
        signed_value: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ActionScan> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // Serialise per owner until commit/rollback, so the comparison, the
        // token scan and the overwrite form one step.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;

        let previous: Option<String> =
            sqlx::query("SELECT last_action FROM qr_actions WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::from)?
                .map(|row| row.get("last_action"));

        if previous.as_deref() == Some(action) {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(ActionScan::Replay);
        }

        let scanned = transition_status(
            &mut *tx,
            signed_value,
            TokenStatus::Pending,
            TokenStatus::Scanned,
            now,
        )
        .await
        .map_err(AppError::from)?;

        if !scanned {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(ActionScan::NotPending);
        }

        sqlx::query(
            r#"
            INSERT INTO qr_actions (owner_id, last_action, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner_id) DO UPDATE
            SET last_action = EXCLUDED.last_action, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(action)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;

        Ok(ActionScan::Scanned { previous })
    }
}
