//! crawlprobe Common Library
//!
//! Shared types, configuration and workbook validation for the crawlprobe
//! harness.

pub mod config;
pub mod error;
pub mod types;
pub mod workbook;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

// Re-export commonly used types
pub use config::{is_module_path, HarnessConfig, LocatorConfig, ParserSignature, SheetRules, TargetConfig};
pub use error::{Error, Result};
pub use types::*;
pub use workbook::{WorkbookError, WorkbookValidator};

/// Default configuration file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "crawlprobe.toml";
