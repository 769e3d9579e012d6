//! # pixmatch Common Library
//!
//! Shared code for the pixmatch services including:
//! - Error types
//! - Bootstrap configuration (TOML + compiled defaults)
//! - Event types (PixmatchEvent enum) and the EventBus
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
