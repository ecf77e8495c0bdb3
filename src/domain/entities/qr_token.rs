use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Redemption state of a stored token.
///
/// `Pending` is the only non-terminal state: a token moves to either
/// `Scanned` or `Expired` exactly once and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Pending,
    Scanned,
    Expired,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Pending => "pending",
            TokenStatus::Scanned => "scanned",
            TokenStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown token status '{0}'")]
pub struct UnknownTokenStatus(pub String);

impl FromStr for TokenStatus {
    type Err = UnknownTokenStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TokenStatus::Pending),
            "scanned" => Ok(TokenStatus::Scanned),
            "expired" => Ok(TokenStatus::Expired),
            other => Err(UnknownTokenStatus(other.to_string())),
        }
    }
}

/// A persisted one-time token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrToken {
    pub id: Uuid,
    pub signed_value: String,
    pub owner_id: String,
    pub status: TokenStatus,
    pub created_at: DateTime<Utc>,
    /// Time of the terminal transition (scanned or expired).
    pub scanned_at: Option<DateTime<Utc>>,
}
