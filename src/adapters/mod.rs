pub mod http;
pub mod persistence;
pub mod qr_render;
