//! Query-string parser
//!
//! Turns shell-style query text into a typed operation sequence.
//!
//! # Architecture
//!
//! The parser is split into focused modules:
//! - `command`: operation type definitions (OperationCall, Operation, etc.)
//! - `chain_lexer`: tokenizer for `db.collection.method(args)` chains
//! - `repair`: rewrites loose shell literals into strict JSON text
//! - `decoder`: strict decode with a repair-and-retry fallback, then BSON
//! - `compiler`: per-method interpretation of the raw argument text
//!
//! # Examples
//!
//! ```
//! use mongo_query_exec::parser::Parser;
//!
//! let parser = Parser::new();
//! let query = parser
//!     .parse("db.orders.find({status:'open'}).sort({date:-1}).limit(10)")
//!     .unwrap();
//! assert_eq!(query.collection, "orders");
//! assert_eq!(query.operations.len(), 3);
//! ```

mod chain_lexer;
mod command;
mod compiler;
pub mod decoder;
pub mod repair;

// Re-export public API
pub use chain_lexer::{ChainLexer, split_arguments};
pub use command::*;
pub use compiler::{compile, compile_call};

use crate::error::Result;

/// Main parser for query strings
///
/// Stateless; exists so callers can hold a parser alongside other
/// pipeline components.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    /// Create a new parser instance
    pub fn new() -> Self {
        Self
    }

    /// Parse and compile a query string
    ///
    /// # Arguments
    ///
    /// * `input` - Query text such as `db.users.find({ age: { $gt: 18 } })`
    ///
    /// # Returns
    ///
    /// * `Result<CompiledQuery>` - Compiled operations or the first parse error
    pub fn parse(&self, input: &str) -> Result<CompiledQuery> {
        compile(input)
    }

    /// Tokenize without compiling, for diagnostics
    pub fn tokenize(&self, input: &str) -> Result<ParsedChain> {
        ChainLexer::parse(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, QueryError};
    use mongodb::bson::doc;

    #[test]
    fn test_parse_find_empty() {
        let query = Parser::new().parse("db.users.find()").unwrap();
        assert_eq!(query.collection, "users");
        assert_eq!(
            query.operations,
            vec![Operation::Find {
                filter: doc! {},
                projection: None
            }]
        );
    }

    #[test]
    fn test_parse_count_chain() {
        let query = Parser::new()
            .parse("db.orders.count({status:'open'}).limit(3)")
            .unwrap();
        assert_eq!(
            query.operations[0],
            Operation::Count {
                filter: doc! { "status": "open" }
            }
        );
        assert!(query.operations[0].is_terminal());
    }

    #[test]
    fn test_tokenize_keeps_raw_arguments() {
        let chain = Parser::new().tokenize("db.orders.sort({date:-1})").unwrap();
        assert_eq!(chain.calls[0].args_text, "{date:-1}");
    }

    #[test]
    fn test_invalid_content_is_reported() {
        let err = Parser::new().parse("db.orders.find({status: })").unwrap_err();
        assert!(matches!(
            err,
            QueryError::Parse(ParseError::InvalidQueryContent { .. })
        ));
    }
}
