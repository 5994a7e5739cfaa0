//! Configuration module for Kin-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use kin_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Listing: {}", config.listing.url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DetailConfig, FetchConfig, ListingConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
