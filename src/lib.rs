pub mod api;
pub mod config;
pub mod error;
pub mod schedule;
pub mod session;
pub mod ui;
