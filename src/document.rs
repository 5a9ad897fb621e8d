//! Main-definition classification used by the transport router.
//!
//! Routing only needs to know what the first definition of a document is. The
//! [`DocumentClassifier`] trait keeps that decision a pure function over the query text so
//! the router can be exercised without any particular parser; [`ParsedDocumentClassifier`]
//! is the default, backed by `async-graphql-parser`.

// crates.io
use async_graphql_parser::types::{DocumentOperations, ExecutableDocument, OperationType};
// self
use crate::_prelude::*;

/// Kind of the document's main definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
	/// `query`, `mutation`, `subscription`, or an anonymous selection set.
	Operation,
	/// Fragment definition (document holds no operation).
	Fragment,
}

/// Execution kind of an operation definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Read-only operation.
	Query,
	/// Write operation.
	Mutation,
	/// Long-lived event stream.
	Subscription,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Query => "query",
			Self::Mutation => "mutation",
			Self::Subscription => "subscription",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl From<OperationType> for OperationKind {
	fn from(ty: OperationType) -> Self {
		match ty {
			OperationType::Query => Self::Query,
			OperationType::Mutation => Self::Mutation,
			OperationType::Subscription => Self::Subscription,
		}
	}
}

/// Statically parsed shape of a document's main definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MainDefinition {
	/// Definition kind.
	pub kind: DefinitionKind,
	/// Operation type; `None` for fragments.
	pub operation: Option<OperationKind>,
}
impl MainDefinition {
	/// Main definition for an operation of the given type.
	pub const fn operation(kind: OperationKind) -> Self {
		Self { kind: DefinitionKind::Operation, operation: Some(kind) }
	}

	/// Main definition for a fragment-only document.
	pub const fn fragment() -> Self {
		Self { kind: DefinitionKind::Fragment, operation: None }
	}

	/// `true` iff this is an operation definition of type subscription.
	pub fn is_subscription(&self) -> bool {
		self.kind == DefinitionKind::Operation
			&& self.operation == Some(OperationKind::Subscription)
	}
}

/// Failures raised while classifying a document.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DocumentError {
	/// Document is not valid GraphQL.
	#[error("Query document is invalid: {message}.")]
	Syntax {
		/// Parser diagnostic.
		message: String,
	},
	/// Document holds neither an operation nor a fragment.
	#[error("Query document contains no definitions.")]
	NoDefinitions,
}

/// Pure classification of a query document.
pub trait DocumentClassifier
where
	Self: Send + Sync,
{
	/// Returns the shape of the document's main definition.
	fn classify(&self, query: &str) -> Result<MainDefinition, DocumentError>;
}
impl<F> DocumentClassifier for F
where
	F: Send + Sync + Fn(&str) -> Result<MainDefinition, DocumentError>,
{
	fn classify(&self, query: &str) -> Result<MainDefinition, DocumentError> {
		self(query)
	}
}

/// Default classifier backed by `async-graphql-parser`.
///
/// The main definition is the first operation in source order; a document holding only
/// fragments classifies as [`DefinitionKind::Fragment`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ParsedDocumentClassifier;
impl ParsedDocumentClassifier {
	const PROBE: &'static str = "query __MainDefinitionProbe { __typename }";

	fn first_operation(doc: &ExecutableDocument) -> Option<OperationKind> {
		match &doc.operations {
			DocumentOperations::Single(op) => Some(op.node.ty.into()),
			DocumentOperations::Multiple(ops) => ops
				.values()
				.min_by_key(|op| (op.pos.line, op.pos.column))
				.map(|op| op.node.ty.into()),
		}
	}

	// The parser rejects documents without an operation. Re-parse with a probe operation
	// appended: if that succeeds, the original held only fragments (or nothing at all).
	fn classify_without_operation(query: &str) -> Option<Result<MainDefinition, DocumentError>> {
		let probed = format!("{query}\n{}", Self::PROBE);
		let doc = async_graphql_parser::parse_query(probed).ok()?;

		if doc.fragments.is_empty() {
			Some(Err(DocumentError::NoDefinitions))
		} else {
			Some(Ok(MainDefinition::fragment()))
		}
	}
}
impl DocumentClassifier for ParsedDocumentClassifier {
	fn classify(&self, query: &str) -> Result<MainDefinition, DocumentError> {
		match async_graphql_parser::parse_query(query) {
			Ok(doc) => Self::first_operation(&doc)
				.map(MainDefinition::operation)
				.ok_or(DocumentError::NoDefinitions),
			Err(e) => Self::classify_without_operation(query)
				.unwrap_or_else(|| Err(DocumentError::Syntax { message: e.to_string() })),
		}
	}
}
