pub mod auth;
pub mod board;
pub mod config;
pub mod prefs;
pub mod profile;
pub mod task;
pub mod timer;
