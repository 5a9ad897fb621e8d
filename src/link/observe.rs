//! Passive error logging at the head of the chain.

// crates.io
use futures::StreamExt;
// self
use crate::{
	_prelude::*,
	link::{Link, Middleware, ResponseStream},
	obs::{self, ResponseOutcome},
	operation::{Operation, Response},
};

/// Middleware logging GraphQL and network errors without altering the stream.
///
/// Every GraphQL error is logged at `warn` with its message, locations, and path; every
/// failed item is logged at `error`. Items are forwarded unchanged, never retried or
/// swallowed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorObserver;
impl ErrorObserver {
	/// Logs `item` and returns the outcome label recorded for it.
	pub fn observe(operation: Option<&str>, item: &Result<Response>) -> ResponseOutcome {
		let operation = operation.unwrap_or("<anonymous>");
		let outcome = match item {
			Ok(response) if response.body.has_errors() => {
				for error in response.body.errors() {
					let locations = error
						.locations
						.iter()
						.map(|loc| format!("{}:{}", loc.line, loc.column))
						.collect::<Vec<_>>()
						.join(", ");

					tracing::warn!(
						operation,
						locations = %locations,
						path = %error.path_string(),
						"[GraphQL error]: {}",
						error.message
					);
				}

				ResponseOutcome::GraphQlErrors
			},
			Ok(_) => ResponseOutcome::Success,
			Err(e) if e.is_network() => {
				tracing::error!(operation, "[Network error]: {e}");

				ResponseOutcome::NetworkError
			},
			Err(e) => {
				tracing::error!(operation, "[Link error]: {e}");

				ResponseOutcome::LinkError
			},
		};

		obs::record_response(outcome);

		outcome
	}
}
impl Middleware for ErrorObserver {
	fn wrap(&self, next: Arc<dyn Link>) -> Arc<dyn Link> {
		Arc::new(ObserveLink { next })
	}
}

struct ObserveLink {
	next: Arc<dyn Link>,
}
impl Link for ObserveLink {
	fn execute(&self, operation: Operation) -> ResponseStream {
		let name = operation.operation_name.clone();

		self.next
			.execute(operation)
			.inspect(move |item| {
				ErrorObserver::observe(name.as_deref(), item);
			})
			.boxed()
	}
}
