//! Observability helpers shared by links and transports.
//!
//! # Feature Flags
//!
//! - Spans named `graphql_token_link.operation` (fields `transport`, `stage`, `operation`) are
//!   always emitted through `tracing`.
//! - Enable `metrics` to increment `graphql_token_link_route_total` (labeled by `transport`) for
//!   every routing decision and `graphql_token_link_response_total` (labeled by `outcome`) for
//!   every observed result.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Transports an operation can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
	/// GraphQL-over-HTTP request/response transport.
	Http,
	/// Persistent GraphQL-over-WebSocket transport.
	WebSocket,
}
impl TransportKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TransportKind::Http => "http",
			TransportKind::WebSocket => "websocket",
		}
	}
}
impl Display for TransportKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each observed result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseOutcome {
	/// Response without GraphQL errors.
	Success,
	/// Response carrying application-level errors.
	GraphQlErrors,
	/// Transport-level failure.
	NetworkError,
	/// Failure raised inside the chain (store, config, document).
	LinkError,
}
impl ResponseOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResponseOutcome::Success => "ok",
			ResponseOutcome::GraphQlErrors => "graphql_error",
			ResponseOutcome::NetworkError => "network_error",
			ResponseOutcome::LinkError => "link_error",
		}
	}
}
impl Display for ResponseOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
