pub mod auth;
pub mod downloads;
pub mod files;
pub mod home;
pub mod paste;
pub mod shared;
pub mod uploads;
