//! Core types and configuration for the gap-fill pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Raw and normalized candle types
//! - Session and gap record types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
