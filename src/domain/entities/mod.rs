pub mod action;
pub mod qr_token;
pub mod redemption;
