//! # Common Components
//!
//! Shared utilities used by both binaries.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing utilities

pub mod config;
