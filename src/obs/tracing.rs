// crates.io
use tracing::{Span, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::TransportKind};

/// Span wrapper used by transports to tag in-flight operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	span: Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the transport, stage, and optional operation name.
	pub fn new(transport: TransportKind, stage: &'static str, operation: Option<&str>) -> Self {
		let span = tracing::info_span!(
			"graphql_token_link.operation",
			transport = transport.as_str(),
			stage,
			operation = operation.unwrap_or("<anonymous>"),
		);

		Self { span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		tracing::Instrument::instrument(fut, self.span.clone())
	}

	/// Underlying span, for callers that need to enter it synchronously.
	pub fn span(&self) -> &Span {
		&self.span
	}
}
