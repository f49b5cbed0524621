pub mod api;
pub mod config;
pub mod internal;
pub mod session;
pub mod tui;
pub mod utils;
