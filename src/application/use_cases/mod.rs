pub mod action_guard;
pub mod qr_issue;
pub mod qr_redeem;
