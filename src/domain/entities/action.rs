use chrono::{DateTime, Utc};

/// Last action an owner declared while redeeming a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestAction {
    pub owner_id: String,
    pub last_action: String,
    pub updated_at: DateTime<Utc>,
}
