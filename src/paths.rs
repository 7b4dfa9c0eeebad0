//! Project path functions - single source of truth for local file paths.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//!
//! This allows running several isolated client profiles side by side:
//! ```bash
//! DATA_DIR=data/teacher edu_portal whoami
//! DATA_DIR=data/student edu_portal whoami
//! ```

use std::env;
use std::sync::OnceLock;

/// Lazily initialized data directory from DATA_DIR env var
static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// Durable key-value store holding the persisted session
pub fn store_path() -> String {
    format!("{}/portal.db", data_dir())
}

/// Optional config file, resolved relative to the working directory
pub const CONFIG_FILE: &str = "config.toml";
