//! Call-chain tokenizer for `db.collection.method(args)` syntax
//!
//! A small recursive-descent scanner over a shared position into the input.
//! It only understands the chain shape; argument text is captured verbatim
//! (balanced on brackets, aware of quoted strings) and left for the compiler.
//!
//! ```text
//! chain := "db" "." ident "." call ("." call)* ";"*
//! call  := ident "(" raw-args ")"
//! ```
//!
//! Whitespace is allowed around every dot and parenthesis.

use tracing::debug;

use super::command::{OperationCall, ParsedChain};
use crate::error::{ParseError, Result};

/// Chain tokenizer
pub struct ChainLexer {
    input: Vec<char>,
    pos: usize,
}

impl ChainLexer {
    /// Create a new lexer from input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize a complete query chain.
    ///
    /// Fails with `MalformedQuery` when the head `db.<collection>.<method>(...)`
    /// does not match, when a call is left unterminated, or when anything
    /// other than trailing semicolons follows the last call.
    pub fn parse(input: &str) -> Result<ParsedChain> {
        let mut lexer = Self::new(input.trim());
        if lexer.is_at_end() {
            return Err(ParseError::MalformedQuery("empty query".to_string()).into());
        }

        let collection = lexer.parse_head()?;
        let mut calls = vec![lexer.parse_call()?];

        loop {
            lexer.skip_whitespace();
            if lexer.current_char() != '.' {
                break;
            }
            lexer.advance();
            calls.push(lexer.parse_call()?);
        }

        lexer.skip_trailing_semicolons();
        if !lexer.is_at_end() {
            return Err(ParseError::MalformedQuery(format!(
                "unexpected trailing text '{}'",
                lexer.rest()
            ))
            .into());
        }

        debug!(
            "Tokenized chain on collection '{}': {:?}",
            collection,
            calls.iter().map(|c| c.method.as_str()).collect::<Vec<_>>()
        );

        Ok(ParsedChain { collection, calls })
    }

    /// `db . <collection> .`
    fn parse_head(&mut self) -> Result<String> {
        self.skip_whitespace();
        match self.scan_identifier() {
            Some(ref word) if word == "db" => {}
            _ => return Err(Self::malformed_head()),
        }
        self.expect_dot()?;
        let collection = self.scan_identifier().ok_or_else(Self::malformed_head)?;
        self.expect_dot()?;
        Ok(collection)
    }

    /// `<method> ( <args> )`
    fn parse_call(&mut self) -> Result<OperationCall> {
        self.skip_whitespace();
        let method = self.scan_identifier().ok_or_else(|| {
            ParseError::MalformedQuery(format!(
                "expected a method name at position {}",
                self.pos
            ))
        })?;

        self.skip_whitespace();
        if self.current_char() != '(' {
            return Err(ParseError::MalformedQuery(format!(
                "expected '(' after method '{method}'"
            ))
            .into());
        }
        self.advance();

        let args_text = self.scan_arguments().ok_or_else(|| {
            ParseError::MalformedQuery(format!("unterminated argument list for '{method}'"))
        })?;

        Ok(OperationCall { method, args_text })
    }

    /// Capture everything up to the `)` that closes the current call.
    ///
    /// Nested `()`, `[]` and `{}` are tracked so `ObjectId("...")` inside a
    /// filter does not end the call early. Quoted strings are skipped whole.
    fn scan_arguments(&mut self) -> Option<String> {
        let start = self.pos;
        let mut depth = 0usize;

        while !self.is_at_end() {
            let ch = self.current_char();
            match ch {
                '"' | '\'' => self.skip_string(ch),
                '(' | '[' | '{' => {
                    depth += 1;
                    self.advance();
                }
                ')' if depth == 0 => {
                    let text: String = self.input[start..self.pos].iter().collect();
                    self.advance();
                    return Some(text);
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => self.advance(),
            }
        }

        None
    }

    /// Skip a quoted string, honoring backslash escapes
    fn skip_string(&mut self, quote: char) {
        self.advance(); // Opening quote
        while !self.is_at_end() {
            let ch = self.current_char();
            self.advance();
            if ch == '\\' {
                self.advance();
            } else if ch == quote {
                return;
            }
        }
    }

    /// Scan `\w+`
    fn scan_identifier(&mut self) -> Option<String> {
        let start = self.pos;
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        if self.pos == start {
            None
        } else {
            Some(self.input[start..self.pos].iter().collect())
        }
    }

    fn expect_dot(&mut self) -> Result<()> {
        self.skip_whitespace();
        if self.current_char() != '.' {
            return Err(Self::malformed_head());
        }
        self.advance();
        self.skip_whitespace();
        Ok(())
    }

    fn skip_trailing_semicolons(&mut self) {
        loop {
            self.skip_whitespace();
            if self.current_char() == ';' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn malformed_head() -> crate::error::QueryError {
        ParseError::MalformedQuery(
            "expected 'db.<collection>.<method>(...)'".to_string(),
        )
        .into()
    }

    fn rest(&self) -> String {
        self.input[self.pos..].iter().collect()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Get current character
    fn current_char(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.pos]
        }
    }

    /// Advance position
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

/// Split call arguments at top-level commas.
///
/// `{a: 1, b: 2}, {c: 1}` yields two pieces; commas nested in brackets or
/// inside quoted strings do not split. Pieces are trimmed and an all-blank
/// argument list yields no pieces.
pub fn split_arguments(args_text: &str) -> Vec<String> {
    if args_text.trim().is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in args_text.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                pieces.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    pieces.push(current.trim().to_string());
    pieces
}
