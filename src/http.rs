//! GraphQL-over-HTTP request/response transport.
//!
//! [`HttpTransport`] is the terminal link of the request branch. It POSTs the operation as a
//! JSON document, merges the context headers produced by upstream links, and exposes the
//! raw response headers through [`ResponseContext`] so the credential refresher can pick up
//! rotated tokens. Non-success statuses and undecodable bodies surface as
//! [`TransportError`]s; nothing is retried here.

// std
use std::time::Duration;
// crates.io
use futures::{StreamExt, stream};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	link::{Link, ResponseStream},
	obs::{OperationSpan, TransportKind},
	operation::{GraphQlResponse, Operation, Response, ResponseContext},
};

const BODY_PREVIEW_LIMIT: usize = 512;

/// Tunables for the request/response transport.
#[derive(Clone, Debug)]
pub struct HttpOptions {
	/// Per-request timeout; `None` leaves timing to the HTTP client defaults.
	pub timeout: Option<Duration>,
	/// `User-Agent` header value.
	pub user_agent: String,
}
impl Default for HttpOptions {
	fn default() -> Self {
		Self {
			timeout: None,
			user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
		}
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
	query: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	operation_name: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	variables: Option<&'a Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	extensions: Option<&'a Value>,
}
impl<'a> From<&'a Operation> for RequestBody<'a> {
	fn from(op: &'a Operation) -> Self {
		Self {
			query: &op.query,
			operation_name: op.operation_name.as_deref(),
			variables: op.variables.as_ref(),
			extensions: op.extensions.as_ref(),
		}
	}
}

/// Terminal link sending operations as GraphQL-over-HTTP POST requests.
#[derive(Clone, Debug)]
pub struct HttpTransport {
	client: ReqwestClient,
	endpoint: Url,
}
impl HttpTransport {
	/// Builds a transport with its own reqwest client configured from `options`.
	pub fn new(endpoint: Url, options: &HttpOptions) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder().user_agent(options.user_agent.as_str());

		if let Some(timeout) = options.timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self::with_client(builder.build()?, endpoint))
	}

	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient, endpoint: Url) -> Self {
		Self { client, endpoint }
	}

	/// Endpoint every operation is posted to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn send(client: ReqwestClient, endpoint: Url, operation: Operation) -> Result<Response> {
		let body = serde_json::to_vec(&RequestBody::from(&operation))
			.map_err(|e| TransportError::Protocol { message: e.to_string() })?;
		let response = client
			.post(endpoint)
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.headers(operation.context.headers)
			.body(body)
			.send()
			.await
			.map_err(TransportError::from)?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let bytes = response.bytes().await.map_err(TransportError::from)?;

		if !status.is_success() {
			return Err(TransportError::Status {
				status: status.as_u16(),
				body: body_preview(&bytes),
			}
			.into());
		}

		let mut de = serde_json::Deserializer::from_slice(&bytes);
		let body: GraphQlResponse = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| TransportError::Decode { source, status: Some(status.as_u16()) })?;

		Ok(Response {
			body,
			context: ResponseContext { status: Some(status.as_u16()), headers: Some(headers) },
		})
	}
}
impl Link for HttpTransport {
	fn execute(&self, operation: Operation) -> ResponseStream {
		let span = OperationSpan::new(
			TransportKind::Http,
			"http_transport",
			operation.operation_name.as_deref(),
		);
		let fut = Self::send(self.client.clone(), self.endpoint.clone(), operation);

		stream::once(span.instrument(fut)).boxed()
	}
}

fn body_preview(bytes: &[u8]) -> String {
	let text = String::from_utf8_lossy(bytes);

	match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}...", &text[..idx]),
		None => text.into_owned(),
	}
}
