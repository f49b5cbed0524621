pub mod cache;
pub mod feed;
pub mod loader;
pub mod models;
pub mod notification;
pub mod quiz;
pub mod ui;
pub mod watch;
