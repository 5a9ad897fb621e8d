// self
use crate::obs::{ResponseOutcome, TransportKind};

/// Records a routing decision via the global metrics recorder (when enabled).
pub fn record_route(transport: TransportKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("graphql_token_link_route_total", "transport" => transport.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = transport;
	}
}

/// Records an observed result via the global metrics recorder (when enabled).
pub fn record_response(outcome: ResponseOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("graphql_token_link_response_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_is_safe_without_a_recorder() {
		record_route(TransportKind::WebSocket);
		record_response(ResponseOutcome::NetworkError);
	}
}
