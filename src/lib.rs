#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod identity;
pub mod loader;
pub mod media;
pub mod model;
pub mod screen;
pub mod storage;
pub mod store;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
