use serde::Serialize;

/// Why a redemption attempt did not grant access.
///
/// These are ordinary outcomes, not failures: the caller receives
/// `accessGranted = false` together with the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    InvalidToken,
    TokenExpired,
    TokenAlreadyUsed,
    ReplayAction,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::InvalidToken => "INVALID_TOKEN",
            DenyReason::TokenExpired => "TOKEN_EXPIRED",
            DenyReason::TokenAlreadyUsed => "TOKEN_ALREADY_USED",
            DenyReason::ReplayAction => "REPLAY_ACTION",
        }
    }
}

/// Result of presenting a signed token for redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    Granted,
    Denied(DenyReason),
}

impl Redemption {
    pub fn access_granted(&self) -> bool {
        matches!(self, Redemption::Granted)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Redemption::Granted => None,
            Redemption::Denied(reason) => Some(*reason),
        }
    }
}
