//! Core types, configuration, and error handling for truechurn.
//!
//! This crate provides the shared foundation used by all other truechurn crates:
//! - [`ChurnError`]: unified error type using `thiserror`
//! - [`ChurnConfig`]: configuration loaded from `.truechurn.toml` (or JSON)
//! - Shared types: [`ChurnResult`], [`Window`], [`OutputFormat`]

mod config;
mod error;
mod types;
mod window;

pub use config::{ChurnConfig, HistoryConfig, WindowConfig, DEFAULT_CONFIG_FILE};
pub use error::ChurnError;
pub use types::{ChurnResult, OutputFormat};
pub use window::Window;

/// A convenience `Result` type for truechurn operations.
pub type Result<T> = std::result::Result<T, ChurnError>;
