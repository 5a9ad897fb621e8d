//! Operation and response models passed through the link chain.

// self
use crate::_prelude::*;

/// GraphQL request descriptor travelling through the chain.
#[derive(Clone, Debug, Default)]
pub struct Operation {
	/// Query document source.
	pub query: String,
	/// Operation to execute when the document holds several.
	pub operation_name: Option<String>,
	/// Variable values keyed by name.
	pub variables: Option<Value>,
	/// Protocol extensions forwarded verbatim.
	pub extensions: Option<Value>,
	/// Per-operation context mutated by links.
	pub context: OperationContext,
}
impl Operation {
	/// Creates an operation for the provided query document.
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), ..Default::default() }
	}

	/// Sets the operation name.
	pub fn operation_name(mut self, name: impl Into<String>) -> Self {
		self.operation_name = Some(name.into());

		self
	}

	/// Sets the variables object.
	pub fn variables(mut self, variables: Value) -> Self {
		self.variables = Some(variables);

		self
	}

	/// Sets a single variable, creating the variables object on demand.
	pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
		let vars = self.variables.get_or_insert_with(|| Value::Object(Default::default()));

		if let Value::Object(map) = vars {
			map.insert(name.into(), value);
		}

		self
	}

	/// Sets protocol extensions.
	pub fn extensions(mut self, extensions: Value) -> Self {
		self.extensions = Some(extensions);

		self
	}

	/// Adds an outbound header to the operation context.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.context.headers.insert(name, value);

		self
	}
}

/// Mutable per-operation state links use to talk to the transports.
#[derive(Clone, Debug, Default)]
pub struct OperationContext {
	/// Headers merged into the outbound HTTP request.
	pub headers: HeaderMap,
}

/// Standard GraphQL response document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
	/// Result data.
	#[serde(default)]
	pub data: Option<Value>,
	/// Application-level errors.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub errors: Option<Vec<GraphQlError>>,
	/// Response extensions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Value>,
}
impl GraphQlResponse {
	/// Application-level errors; empty when the server reported none.
	pub fn errors(&self) -> &[GraphQlError] {
		self.errors.as_deref().unwrap_or_default()
	}

	/// `true` when at least one application-level error is present.
	pub fn has_errors(&self) -> bool {
		!self.errors().is_empty()
	}
}

/// Single GraphQL error entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
	/// Error message.
	pub message: String,
	/// Source locations in the query document.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub locations: Vec<ErrorLocation>,
	/// Response path of the failing field.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub path: Vec<PathSegment>,
	/// Server-specific error extensions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Value>,
}
impl GraphQlError {
	/// Builds an error carrying only a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), locations: Vec::new(), path: Vec::new(), extensions: None }
	}

	/// Renders the path as `a.b.[0].c`; empty when the error has no path.
	pub fn path_string(&self) -> String {
		self.path.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
	}
}
impl Display for GraphQlError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.message)?;

		for (idx, loc) in self.locations.iter().enumerate() {
			f.write_str(if idx == 0 { " at " } else { ", " })?;
			write!(f, "{}:{}", loc.line, loc.column)?;
		}

		Ok(())
	}
}

/// Line/column position inside the query document (1-indexed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
	/// Line number.
	pub line: u32,
	/// Column number.
	pub column: u32,
}

/// Response path segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
	/// Field name or alias.
	Field(String),
	/// List index.
	Index(usize),
}
impl Display for PathSegment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Field(name) => f.write_str(name),
			Self::Index(idx) => write!(f, "[{idx}]"),
		}
	}
}

/// Transport metadata attached to a response.
#[derive(Clone, Debug, Default)]
pub struct ResponseContext {
	/// HTTP status, for request/response transports.
	pub status: Option<u16>,
	/// Raw transport headers; `None` for streaming responses.
	pub headers: Option<HeaderMap>,
}

/// One result delivered by a link.
#[derive(Clone, Debug, Default)]
pub struct Response {
	/// Decoded GraphQL payload.
	pub body: GraphQlResponse,
	/// Transport metadata.
	pub context: ResponseContext,
}
impl Response {
	/// Wraps a payload received over a streaming transport (no headers).
	pub fn streamed(body: GraphQlResponse) -> Self {
		Self { body, context: ResponseContext::default() }
	}

	/// Returns the data, or [`Error::GraphQl`] when the server reported errors.
	pub fn into_data(self) -> Result<Value> {
		match self.body.errors {
			Some(errors) if !errors.is_empty() => Err(Error::GraphQl(errors)),
			_ => Ok(self.body.data.unwrap_or(Value::Null)),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_collects_variables_and_headers() {
		let op = Operation::new("query Q($id: ID!) { user(id: $id) { id } }")
			.operation_name("Q")
			.variable("id", serde_json::json!(1))
			.variable("flag", serde_json::json!(true))
			.header(HeaderName::from_static("x-trace"), HeaderValue::from_static("abc"));

		assert_eq!(op.operation_name.as_deref(), Some("Q"));
		assert_eq!(op.variables, Some(serde_json::json!({ "id": 1, "flag": true })));
		assert_eq!(op.context.headers.get("x-trace").and_then(|v| v.to_str().ok()), Some("abc"));
	}

	#[test]
	fn errors_decode_with_locations_and_path() {
		let body: GraphQlResponse = serde_json::from_value(serde_json::json!({
			"data": null,
			"errors": [{
				"message": "Boom",
				"locations": [{ "line": 2, "column": 3 }],
				"path": ["users", 0, "name"]
			}]
		}))
		.expect("Error payload should decode.");
		let error = &body.errors()[0];

		assert!(body.has_errors());
		assert_eq!(error.to_string(), "Boom at 2:3");
		assert_eq!(error.path_string(), "users.[0].name");
	}

	#[test]
	fn into_data_surfaces_graphql_errors() {
		let ok = Response::streamed(GraphQlResponse {
			data: Some(serde_json::json!({ "ok": true })),
			..Default::default()
		});

		assert_eq!(
			ok.into_data().expect("Data should be returned."),
			serde_json::json!({ "ok": true })
		);

		let failed = Response::streamed(GraphQlResponse {
			data: None,
			errors: Some(vec![GraphQlError::new("nope")]),
			extensions: None,
		});

		assert!(matches!(failed.into_data(), Err(Error::GraphQl(errors)) if errors.len() == 1));
	}
}
