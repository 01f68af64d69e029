//! Command type definitions for the query pipeline
//!
//! The tokenizer produces a [`ParsedChain`] of raw [`OperationCall`]s; the
//! compiler lowers it into a [`CompiledQuery`] whose [`Operation`]s only
//! carry decoded structured data.

use mongodb::bson::{Bson, Document, doc};

/// One `.<method>(<args>)` segment of a query chain, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCall {
    /// Method name exactly as written
    pub method: String,

    /// Raw text between the call parentheses
    pub args_text: String,
}

/// Result of tokenizing `db.<collection>.<method>(...)[.<method>(...)]*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChain {
    /// Collection name following `db.`
    pub collection: String,

    /// Calls in execution order
    pub calls: Vec<OperationCall>,
}

/// A fully compiled query, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Target collection
    pub collection: String,

    /// Operations in execution order
    pub operations: Vec<Operation>,
}

/// A typed operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Open a filtered cursor
    Find {
        filter: Document,
        projection: Option<Document>,
    },

    /// Open an aggregation cursor
    Aggregate { pipeline: Pipeline },

    /// Count matching documents (terminal)
    Count { filter: Document },

    /// Distinct values of a field (terminal)
    Distinct {
        target: DistinctTarget,
        filter: Option<Document>,
    },

    /// Cap the number of documents returned
    Limit(CursorArg),

    /// Skip leading documents
    Skip(CursorArg),

    /// Order the cursor
    Sort(Document),
}

impl Operation {
    /// Name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Find { .. } => "find",
            Operation::Aggregate { .. } => "aggregate",
            Operation::Count { .. } => "count",
            Operation::Distinct { .. } => "distinct",
            Operation::Limit(_) => "limit",
            Operation::Skip(_) => "skip",
            Operation::Sort(_) => "sort",
        }
    }

    /// Whether the operation ends the chain with a scalar or value list.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Operation::Count { .. } | Operation::Distinct { .. })
    }

    /// Describe the operation as `{ <name>: <arguments> }` for display.
    pub fn to_document(&self) -> Document {
        let args: Bson = match self {
            Operation::Find { filter, projection } => {
                let mut args = doc! { "filter": filter.clone() };
                if let Some(projection) = projection {
                    args.insert("projection", projection.clone());
                }
                args.into()
            }
            Operation::Aggregate { pipeline } => Bson::Array(
                pipeline
                    .clone()
                    .into_stages()
                    .into_iter()
                    .map(Bson::Document)
                    .collect(),
            ),
            Operation::Count { filter } => filter.clone().into(),
            Operation::Distinct { target, filter } => {
                let mut args = Document::new();
                match target.field_name() {
                    Some(field) => args.insert("field", field),
                    None => args.insert("target", target.to_bson()),
                };
                if let Some(filter) = filter {
                    args.insert("filter", filter.clone());
                }
                args.into()
            }
            Operation::Limit(arg) | Operation::Skip(arg) => arg.to_bson(),
            Operation::Sort(sort) => sort.clone().into(),
        };

        let mut described = Document::new();
        described.insert(self.name(), args);
        described
    }
}

/// Aggregation pipeline argument.
///
/// The shell dialect accepts a bare stage object in place of a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Pipeline {
    /// `aggregate([{...}, {...}])`
    Stages(Vec<Document>),

    /// `aggregate({...})`
    Single(Document),
}

impl Pipeline {
    /// Flatten into the stage list submitted to the store.
    pub fn into_stages(self) -> Vec<Document> {
        match self {
            Pipeline::Stages(stages) => stages,
            Pipeline::Single(stage) => vec![stage],
        }
    }
}

/// Argument of `limit()`/`skip()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorArg {
    /// Purely numeric argument
    Count(u64),

    /// Anything else, kept verbatim until a cursor tries to use it
    Raw(String),
}

impl CursorArg {
    fn to_bson(&self) -> Bson {
        match self {
            CursorArg::Count(n) => i64::try_from(*n).map_or_else(|_| Bson::String(n.to_string()), Bson::Int64),
            CursorArg::Raw(text) => Bson::String(text.clone()),
        }
    }
}

/// Argument of `distinct()`.
#[derive(Debug, Clone, PartialEq)]
pub enum DistinctTarget {
    /// `distinct('status')` or `distinct(status)`
    Field(String),

    /// `distinct({status: 1})`; the first key names the field
    Mapping(Document),

    /// Any other decoded value
    Value(Bson),
}

impl DistinctTarget {
    /// Resolve the field name the store should be asked about.
    pub fn field_name(&self) -> Option<String> {
        match self {
            DistinctTarget::Field(name) => Some(name.clone()),
            DistinctTarget::Mapping(doc) => doc.keys().next().cloned(),
            DistinctTarget::Value(Bson::String(name)) => Some(name.clone()),
            DistinctTarget::Value(_) => None,
        }
    }

    fn to_bson(&self) -> Bson {
        match self {
            DistinctTarget::Field(name) => Bson::String(name.clone()),
            DistinctTarget::Mapping(doc) => Bson::Document(doc.clone()),
            DistinctTarget::Value(value) => value.clone(),
        }
    }
}
