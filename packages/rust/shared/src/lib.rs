//! Shared types, error model, and configuration for rosterbook.
//!
//! This crate is the foundation depended on by all other rosterbook crates.
//! It provides:
//! - [`RosterbookError`] — the unified error type
//! - Domain types ([`DutyRecord`], [`CycleAssignment`], [`LocationSeed`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, config_dir, config_file_path, db_path, init_config, load_config,
    load_config_from,
};
pub use error::{Result, RosterbookError};
pub use types::{
    CycleAssignment, DEFAULT_PERIOD, DutyRecord, ImportKind, ImportStatus, LocationSeed,
    new_record_id,
};
