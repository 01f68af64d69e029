//! Result sanitizing and output formatting
//!
//! - `sanitize`: strips BSON-only kinds from results so they serialize as
//!   plain JSON
//! - `json`: renders outcome envelopes for the terminal

pub mod json;
pub mod sanitize;

pub use json::OutcomeFormatter;
pub use sanitize::{datetime_to_iso_string, sanitize, sanitize_document, sanitize_result};
