use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::qr_issue::QrTokenRepo,
    domain::entities::qr_token::{QrToken, TokenStatus},
};

fn parse_status(raw: &str) -> AppResult<TokenStatus> {
    raw.parse().map_err(|e| {
        tracing::error!(error = %e, "Corrupt token status in database");
        AppError::Internal("Unknown token status".into())
    })
}

fn row_to_token(row: sqlx::postgres::PgRow) -> AppResult<QrToken> {
    let status: String = row.get("status");
    Ok(QrToken {
        id: row.get("id"),
        signed_value: row.get("signed_value"),
        owner_id: row.get("owner_id"),
        status: parse_status(&status)?,
        created_at: row.get("created_at"),
        scanned_at: row.get("scanned_at"),
    })
}

#[async_trait]
impl QrTokenRepo for PostgresPersistence {
    async fn store_token(
        &self,
        owner_id: &str,
        signed_value: &str,
        now: DateTime<Utc>,
    ) -> AppResult<QrToken> {
        let row = sqlx::query(
            r#"
            INSERT INTO qr_tokens (id, signed_value, owner_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, signed_value, owner_id, status, created_at, scanned_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(signed_value)
        .bind(owner_id)
        .bind(TokenStatus::Pending.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        row_to_token(row)
    }

    async fn get_status(&self, signed_value: &str) -> AppResult<Option<TokenStatus>> {
        let row = sqlx::query("SELECT status FROM qr_tokens WHERE signed_value = $1")
            .bind(signed_value)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;

        row.map(|r| parse_status(r.get::<&str, _>("status")))
            .transpose()
    }

    async fn atomic_transition(
        &self,
        signed_value: &str,
        from: TokenStatus,
        to: TokenStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        transition_status(&self.pool, signed_value, from, to, now)
            .await
            .map_err(AppError::from)
    }
}

/// Compare-and-set in one statement: concurrent callers race on the row
/// lock and only the first sees `status = from`.
pub(super) async fn transition_status<'e, E>(
    executor: E,
    signed_value: &str,
    from: TokenStatus,
    to: TokenStatus,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE qr_tokens
        SET status = $3, scanned_at = $4
        WHERE signed_value = $1 AND status = $2
        "#,
    )
    .bind(signed_value)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
