pub mod app_state;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod database;
pub mod filenames;
pub mod identifiers;
pub mod logging;
pub mod records;
pub mod server;
pub mod sessions;
pub mod storage;
pub mod templates;
pub mod uploads;
