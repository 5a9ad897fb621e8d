//! Routes subscriptions to the streaming transport and everything else to the request transport.

// self
use crate::{
	_prelude::*,
	document::DocumentClassifier,
	link::{self, Link, ResponseStream},
	obs::{self, TransportKind},
	operation::Operation,
};

/// Terminal link choosing one of two transports per operation.
///
/// The choice is made once from the statically parsed main definition and never revisited:
/// there is no fallback from one transport to the other.
#[derive(Clone)]
pub struct TransportRouter {
	classifier: Arc<dyn DocumentClassifier>,
	streaming: Arc<dyn Link>,
	request: Arc<dyn Link>,
}
impl TransportRouter {
	/// Creates a router over the two transports.
	pub fn new(
		classifier: Arc<dyn DocumentClassifier>,
		streaming: Arc<dyn Link>,
		request: Arc<dyn Link>,
	) -> Self {
		Self { classifier, streaming, request }
	}

	/// Returns the transport `operation` would be routed to.
	pub fn route(&self, operation: &Operation) -> Result<TransportKind> {
		let main = self.classifier.classify(&operation.query)?;

		Ok(if main.is_subscription() { TransportKind::WebSocket } else { TransportKind::Http })
	}
}
impl Link for TransportRouter {
	fn execute(&self, operation: Operation) -> ResponseStream {
		let transport = match self.route(&operation) {
			Ok(transport) => transport,
			Err(e) => return link::failed(e),
		};

		obs::record_route(transport);
		tracing::trace!(%transport, operation = ?operation.operation_name, "routing operation");

		match transport {
			TransportKind::WebSocket => self.streaming.execute(operation),
			TransportKind::Http => self.request.execute(operation),
		}
	}
}
impl Debug for TransportRouter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TransportRouter(..)")
	}
}
