//! Shared types, error model, and configuration for Folio.
//!
//! This crate is the foundation depended on by all other Folio crates.
//! It provides:
//! - [`FolioError`] — the unified error type
//! - Domain types ([`FileKey`], [`Stage`], [`RequestId`])
//! - Configuration ([`AppConfig`], [`ServerConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LogTarget, ServeConfig, ServerConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{FolioError, Result};
pub use types::{
    FileKey, ROOT_KEY, RequestId, STATUS_INTERNAL_SERVER_ERROR, STATUS_OK, Stage,
};
