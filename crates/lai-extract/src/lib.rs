//! LaTeXAI Extraction Engine
//!
//! Splits assistant prose into the text around a single sentinel-delimited
//! document payload.
//!
//! # Core Concepts
//!
//! - [`extract`]: Split content on the default [`LATEX_DELIMITER`]
//! - [`extract_with`]: Split content on an arbitrary sentinel
//! - [`ExtractionResult`]: `prefix`, optional `payload`, `suffix`
//!
//! # Example
//!
//! ```rust
//! use lai_extract::extract;
//!
//! let parsed = extract("Here you go [%LATEX%]\\section{A}[%LATEX%] done");
//! assert_eq!(parsed.prefix, "Here you go ");
//! assert_eq!(parsed.payload.as_deref(), Some("\\section{A}"));
//! assert_eq!(parsed.suffix, " done");
//! ```

#![warn(unreachable_pub)]

mod delimiter;

pub use delimiter::{extract, extract_with, sentinel_count, ExtractionResult, LATEX_DELIMITER};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
