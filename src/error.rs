//! Link-level error types shared across stores, transports, and the router.

// self
use crate::{_prelude::*, operation::GraphQlError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced by links and the assembled client.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (network, HTTP status, WebSocket, decoding).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Query document could not be classified.
	#[error(transparent)]
	Document(#[from] crate::document::DocumentError),

	/// Server answered with GraphQL errors where data was required.
	#[error("GraphQL response contained {} error(s): {}.", .0.len(), join_messages(.0))]
	GraphQl(Vec<GraphQlError>),
}
impl Error {
	/// Returns `true` when the failure happened below the GraphQL layer.
	pub fn is_network(&self) -> bool {
		matches!(self, Self::Transport(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Required environment variable is not set.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Required endpoint was not supplied to the builder.
	#[error("The {endpoint} endpoint is required.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// Endpoint cannot be parsed or uses the wrong scheme.
	#[error("The {endpoint} endpoint is invalid: {reason}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Transport option is outside its accepted range.
	#[error("Option `{name}` is invalid: {reason}.")]
	InvalidOption {
		/// Option name.
		name: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Credential or context header cannot be encoded as an HTTP header value.
	#[error("Header `{name}` carries a value that is not a valid HTTP header value.")]
	InvalidHeaderValue {
		/// Header name.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, status, socket, decoding).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the GraphQL endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Endpoint answered with a non-success HTTP status.
	#[error("GraphQL endpoint responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body for diagnostics.
		body: String,
	},
	/// Response body is not a GraphQL response document.
	#[error("GraphQL endpoint returned malformed JSON.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// WebSocket handshake or frame failure.
	#[error("WebSocket error: {message}.")]
	WebSocket {
		/// Human-readable error payload.
		message: String,
	},
	/// Server violated the subscription protocol.
	#[error("Subscription protocol error: {message}.")]
	Protocol {
		/// Human-readable error payload.
		message: String,
	},
	/// Streaming connection closed and will not be re-established.
	#[error("Subscription connection closed: {reason}.")]
	ConnectionClosed {
		/// Why the connection went away.
		reason: String,
	},
	/// Link completed without yielding a response.
	#[error("Link chain completed without producing a response.")]
	EmptyResponse,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Terminal close carrying `reason`.
	pub fn closed(reason: impl Into<String>) -> Self {
		Self::ConnectionClosed { reason: reason.into() }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
	fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
		Self::WebSocket { message: e.to_string() }
	}
}

fn join_messages(errors: &[GraphQlError]) -> String {
	errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}
