//! # PCAT Common Library
//!
//! Shared code for the playlist categorizer crates:
//! - Error type and result alias
//! - TOML bootstrap configuration
//! - Config file and access token resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
