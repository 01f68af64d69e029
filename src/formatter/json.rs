//! JSON rendering of query outcomes
//!
//! Outcomes are already sanitized, so this only deals with layout:
//! pretty-printed or compact output and optional terminal colors.

use colored_json::prelude::*;

use crate::error::Result;
use crate::executor::QueryOutcome;
use crate::executor::writer::to_indented_json;

/// JSON formatter for [`QueryOutcome`] envelopes
pub struct OutcomeFormatter {
    /// Enable pretty printing
    pretty: bool,

    /// Indentation level
    indent: usize,

    /// Enable colored output
    use_colors: bool,
}

impl OutcomeFormatter {
    /// Create a new outcome formatter
    ///
    /// # Arguments
    /// * `pretty` - Enable pretty printing
    /// * `use_colors` - Enable colored output
    /// * `indent` - Spaces per nesting level when pretty printing
    pub fn new(pretty: bool, use_colors: bool, indent: usize) -> Self {
        Self {
            pretty,
            indent,
            use_colors,
        }
    }

    /// Render an outcome as a JSON string
    pub fn format(&self, outcome: &QueryOutcome) -> Result<String> {
        let json_str = if self.pretty {
            String::from_utf8_lossy(&to_indented_json(outcome, self.indent)?).into_owned()
        } else {
            serde_json::to_string(outcome)?
        };

        // Compact JSON stays plain for piping
        if self.use_colors && self.pretty {
            Ok(json_str.to_colored_json_auto().unwrap_or(json_str))
        } else {
            Ok(json_str)
        }
    }
}

impl Default for OutcomeFormatter {
    fn default() -> Self {
        Self::new(true, false, 4)
    }
}
