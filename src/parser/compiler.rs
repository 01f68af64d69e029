//! Operation compiler
//!
//! Lowers each raw [`OperationCall`] into a typed [`Operation`]. Dispatch is
//! case-insensitive on the method name and closed: anything outside the
//! recognized set is rejected with `UnsupportedMethod`. Compilation never
//! touches a store.

use mongodb::bson::{Bson, Document};
use tracing::debug;

use super::chain_lexer::{ChainLexer, split_arguments};
use super::command::{
    CompiledQuery, CursorArg, DistinctTarget, Operation, OperationCall, Pipeline,
};
use super::decoder::{bson_kind, decode_bson, decode_document};
use crate::error::{ParseError, Result};

/// Tokenize and compile a query string.
///
/// # Examples
///
/// ```
/// use mongo_query_exec::parser::{compile, CursorArg, Operation};
/// use mongodb::bson::doc;
///
/// let query = compile("db.c.find({}).limit(5)").unwrap();
/// assert_eq!(query.collection, "c");
/// assert_eq!(
///     query.operations,
///     vec![
///         Operation::Find { filter: doc! {}, projection: None },
///         Operation::Limit(CursorArg::Count(5)),
///     ]
/// );
/// ```
pub fn compile(input: &str) -> Result<CompiledQuery> {
    let chain = ChainLexer::parse(input)?;
    let operations = chain
        .calls
        .iter()
        .map(compile_call)
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Compiled {} operation(s) for collection '{}'",
        operations.len(),
        chain.collection
    );

    Ok(CompiledQuery {
        collection: chain.collection,
        operations,
    })
}

/// Compile a single call.
pub fn compile_call(call: &OperationCall) -> Result<Operation> {
    match call.method.to_ascii_lowercase().as_str() {
        "find" => compile_find(call),
        "aggregate" => compile_aggregate(call),
        "count" | "countdocuments" => compile_count(call),
        "distinct" => compile_distinct(call),
        "limit" => Ok(Operation::Limit(compile_cursor_arg(&call.args_text))),
        "skip" => Ok(Operation::Skip(compile_cursor_arg(&call.args_text))),
        "sort" => Ok(Operation::Sort(decode_document(&call.args_text)?)),
        _ => Err(ParseError::UnsupportedMethod(call.method.clone()).into()),
    }
}

/// `find(filter?, projection?)`
fn compile_find(call: &OperationCall) -> Result<Operation> {
    let args = expect_at_most(call, 2)?;
    let filter = optional_document(args.first())?;
    let projection = args.get(1).map(|text| decode_document(text)).transpose()?;
    Ok(Operation::Find { filter, projection })
}

/// `aggregate([stages])` or `aggregate({stage})`
fn compile_aggregate(call: &OperationCall) -> Result<Operation> {
    let args = expect_at_most(call, 1)?;
    let Some(text) = args.first() else {
        return Ok(Operation::Aggregate {
            pipeline: Pipeline::Stages(Vec::new()),
        });
    };

    let pipeline = match decode_bson(text)? {
        Bson::Array(items) => Pipeline::Stages(
            items
                .into_iter()
                .map(|stage| match stage {
                    Bson::Document(doc) => Ok(doc),
                    other => Err(invalid_content(
                        text,
                        format!("pipeline stage must be an object, found {}", bson_kind(&other)),
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        Bson::Document(stage) => Pipeline::Single(stage),
        other => {
            return Err(invalid_content(
                text,
                format!("pipeline must be an array or object, found {}", bson_kind(&other)),
            ));
        }
    };

    Ok(Operation::Aggregate { pipeline })
}

/// `count(filter?)` / `countDocuments(filter?)`
fn compile_count(call: &OperationCall) -> Result<Operation> {
    let args = expect_at_most(call, 1)?;
    Ok(Operation::Count {
        filter: optional_document(args.first())?,
    })
}

/// `distinct(field, filter?)`
///
/// The field may be a quoted string, a bare word, or a mapping whose first
/// key names the field.
fn compile_distinct(call: &OperationCall) -> Result<Operation> {
    let args = expect_at_most(call, 2)?;
    let Some(field_text) = args.first() else {
        return Err(invalid_content(&call.args_text, "distinct requires a field name"));
    };

    let target = match decode_bson(field_text) {
        Ok(Bson::String(name)) => DistinctTarget::Field(name),
        Ok(Bson::Document(doc)) => DistinctTarget::Mapping(doc),
        Ok(other) => DistinctTarget::Value(other),
        Err(_) => DistinctTarget::Field(field_text.trim().to_string()),
    };
    let filter = args.get(1).map(|text| decode_document(text)).transpose()?;

    Ok(Operation::Distinct { target, filter })
}

/// Integer literal, or the raw text when it is not purely digits.
fn compile_cursor_arg(args_text: &str) -> CursorArg {
    let text = args_text.trim();
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = text.parse::<u64>() {
            return CursorArg::Count(n);
        }
    }
    CursorArg::Raw(text.to_string())
}

fn optional_document(text: Option<&String>) -> Result<Document> {
    match text {
        Some(text) => decode_document(text),
        None => Ok(Document::new()),
    }
}

fn expect_at_most(call: &OperationCall, max: usize) -> Result<Vec<String>> {
    let args = split_arguments(&call.args_text);
    if args.len() > max {
        return Err(invalid_content(
            &call.args_text,
            format!(
                "{}() accepts at most {} argument(s), got {}",
                call.method,
                max,
                args.len()
            ),
        ));
    }
    Ok(args)
}

fn invalid_content(fragment: &str, reason: impl Into<String>) -> crate::error::QueryError {
    ParseError::InvalidQueryContent {
        fragment: fragment.trim().to_string(),
        reason: reason.into(),
    }
    .into()
}
