//! Query document normalization.
//!
//! Callers may pass query text or an already parsed document. The gateway needs
//! both forms: the document for operation-name extraction and the printed text
//! for the execution engine.

use graphql_parser::query::{parse_query, Definition, Document, OperationDefinition};

use crate::error::GatewayError;

pub type QueryDocument = Document<'static, String>;

/// Query as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    Text(String),
    Document(QueryDocument),
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput::Text(text)
    }
}

impl From<QueryDocument> for QueryInput {
    fn from(document: QueryDocument) -> Self {
        QueryInput::Document(document)
    }
}

impl QueryInput {
    /// Text form of the query. Documents are printed.
    pub fn to_text(&self) -> String {
        match self {
            QueryInput::Text(text) => text.clone(),
            QueryInput::Document(document) => print_document(document),
        }
    }
}

/// A query in both representations plus its selected operation name.
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    pub document: QueryDocument,
    pub text: String,
    pub operation_name: Option<String>,
}

impl NormalizedQuery {
    pub fn from_input(input: QueryInput) -> Result<Self, GatewayError> {
        let (document, text) = match input {
            QueryInput::Text(text) => (parse_document(&text)?, text),
            QueryInput::Document(document) => {
                let text = print_document(&document);
                (document, text)
            }
        };
        let operation_name = operation_name(&document);
        Ok(Self {
            document,
            text,
            operation_name,
        })
    }
}

/// Parse query text into an owned document.
pub fn parse_document(text: &str) -> Result<QueryDocument, GatewayError> {
    parse_query::<String>(text)
        .map(|document| document.into_static())
        .map_err(|e| GatewayError::Parse(e.to_string()))
}

pub fn print_document(document: &QueryDocument) -> String {
    document.to_string()
}

/// Name of the first operation definition, if that operation is named.
///
/// Shorthand (`{ ... }`) and anonymous operations yield `None`, leaving
/// operation selection to the engine.
pub fn operation_name(document: &QueryDocument) -> Option<String> {
    document
        .definitions
        .iter()
        .find_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        })
        .and_then(|operation| match operation {
            OperationDefinition::SelectionSet(_) => None,
            OperationDefinition::Query(query) => query.name.clone(),
            OperationDefinition::Mutation(mutation) => mutation.name.clone(),
            OperationDefinition::Subscription(subscription) => subscription.name.clone(),
        })
}
