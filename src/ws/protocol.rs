//! Wire messages for the two GraphQL-over-WebSocket subprotocols.

// self
use crate::{
	_prelude::*,
	operation::{GraphQlError, GraphQlResponse, Operation},
};

/// GraphQL-over-WebSocket subprotocol spoken by the streaming transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WsProtocol {
	/// Legacy `graphql-ws` subprotocol (`start` / `data` / `stop` / `ka`).
	#[default]
	GraphqlWs,
	/// `graphql-transport-ws` subprotocol (`subscribe` / `next` / `complete` / `ping`).
	GraphqlTransportWs,
}
impl WsProtocol {
	/// Value sent in `Sec-WebSocket-Protocol`.
	pub const fn subprotocol(self) -> &'static str {
		match self {
			Self::GraphqlWs => "graphql-ws",
			Self::GraphqlTransportWs => "graphql-transport-ws",
		}
	}

	pub(crate) fn init(self, params: Value) -> ClientMessage {
		let payload = match params {
			Value::Object(ref map) if map.is_empty() => None,
			Value::Null => None,
			other => Some(other),
		};

		ClientMessage::ConnectionInit { payload }
	}

	pub(crate) fn start(self, id: &str, payload: &SubscribePayload) -> ClientMessage {
		let id = id.to_owned();
		let payload = payload.clone();

		match self {
			Self::GraphqlWs => ClientMessage::Start { id, payload },
			Self::GraphqlTransportWs => ClientMessage::Subscribe { id, payload },
		}
	}

	pub(crate) fn stop(self, id: &str) -> ClientMessage {
		let id = id.to_owned();

		match self {
			Self::GraphqlWs => ClientMessage::Stop { id },
			Self::GraphqlTransportWs => ClientMessage::Complete { id },
		}
	}

	pub(crate) fn pong(self, payload: Option<Value>) -> Option<ClientMessage> {
		match self {
			Self::GraphqlWs => None,
			Self::GraphqlTransportWs => Some(ClientMessage::Pong { payload }),
		}
	}

	pub(crate) fn terminate(self) -> Option<ClientMessage> {
		match self {
			Self::GraphqlWs => Some(ClientMessage::ConnectionTerminate),
			Self::GraphqlTransportWs => None,
		}
	}
}

/// Operation payload carried by `start` / `subscribe`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscribePayload {
	pub(crate) query: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub(crate) operation_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub(crate) variables: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub(crate) extensions: Option<Value>,
}
impl From<Operation> for SubscribePayload {
	fn from(op: Operation) -> Self {
		Self {
			query: op.query,
			operation_name: op.operation_name,
			variables: op.variables,
			extensions: op.extensions,
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ClientMessage {
	ConnectionInit {
		#[serde(skip_serializing_if = "Option::is_none")]
		payload: Option<Value>,
	},
	Start {
		id: String,
		payload: SubscribePayload,
	},
	Stop {
		id: String,
	},
	Subscribe {
		id: String,
		payload: SubscribePayload,
	},
	Complete {
		id: String,
	},
	Pong {
		#[serde(skip_serializing_if = "Option::is_none")]
		payload: Option<Value>,
	},
	ConnectionTerminate,
}
impl ClientMessage {
	pub(crate) fn encode(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ServerMessage {
	ConnectionAck {},
	ConnectionError {
		#[serde(default)]
		payload: Option<Value>,
	},
	#[serde(rename = "ka")]
	KeepAlive {},
	#[serde(alias = "next")]
	Data {
		id: String,
		payload: GraphQlResponse,
	},
	Error {
		id: String,
		#[serde(default)]
		payload: Value,
	},
	Complete {
		id: String,
	},
	Ping {
		#[serde(default)]
		payload: Option<Value>,
	},
	Pong {},
}

/// Normalizes an `error` payload: `graphql-transport-ws` sends a list, the legacy protocol a
/// single object (or occasionally a bare string).
pub(crate) fn errors_from_payload(payload: Value) -> Vec<GraphQlError> {
	match payload {
		Value::Array(items) => items.into_iter().map(error_from_value).collect(),
		other => vec![error_from_value(other)],
	}
}

fn error_from_value(value: Value) -> GraphQlError {
	match value {
		Value::String(message) => GraphQlError::new(message),
		Value::Object(_) => serde_json::from_value::<GraphQlError>(value.clone())
			.unwrap_or_else(|_| GraphQlError::new(value.to_string())),
		other => GraphQlError::new(other.to_string()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn payload() -> SubscribePayload {
		SubscribePayload::from(Operation::new("subscription { tick }").operation_name("Tick"))
	}

	#[test]
	fn legacy_protocol_messages() {
		let protocol = WsProtocol::GraphqlWs;

		assert_eq!(protocol.subprotocol(), "graphql-ws");
		assert_eq!(
			protocol.start("1", &payload()).encode().expect("Start should encode."),
			r#"{"type":"start","id":"1","payload":{"query":"subscription { tick }","operationName":"Tick"}}"#
		);
		assert_eq!(
			protocol.stop("1").encode().expect("Stop should encode."),
			r#"{"type":"stop","id":"1"}"#
		);
		assert!(protocol.pong(None).is_none());
		assert_eq!(
			protocol.terminate().map(|m| m.encode().expect("Terminate should encode.")),
			Some(r#"{"type":"connection_terminate"}"#.to_owned())
		);
	}

	#[test]
	fn transport_ws_protocol_messages() {
		let protocol = WsProtocol::GraphqlTransportWs;

		assert_eq!(protocol.subprotocol(), "graphql-transport-ws");
		assert!(
			protocol
				.start("7", &payload())
				.encode()
				.expect("Subscribe should encode.")
				.starts_with(r#"{"type":"subscribe","id":"7""#)
		);
		assert_eq!(
			protocol.stop("7").encode().expect("Complete should encode."),
			r#"{"type":"complete","id":"7"}"#
		);
		assert_eq!(
			protocol.pong(None).map(|m| m.encode().expect("Pong should encode.")),
			Some(r#"{"type":"pong"}"#.to_owned())
		);
		assert!(protocol.terminate().is_none());
	}

	#[test]
	fn init_omits_empty_params() {
		let protocol = WsProtocol::default();

		assert_eq!(
			protocol.init(serde_json::json!({})).encode().expect("Init should encode."),
			r#"{"type":"connection_init"}"#
		);
		assert_eq!(
			protocol
				.init(serde_json::json!({ "token": "T" }))
				.encode()
				.expect("Init should encode."),
			r#"{"type":"connection_init","payload":{"token":"T"}}"#
		);
	}

	#[test]
	fn server_messages_from_both_protocols_decode() {
		let data: ServerMessage =
			serde_json::from_str(r#"{"type":"data","id":"1","payload":{"data":{"tick":1}}}"#)
				.expect("Legacy data should decode.");
		let next: ServerMessage =
			serde_json::from_str(r#"{"type":"next","id":"2","payload":{"data":{"tick":2}}}"#)
				.expect("Next should decode.");
		let ka: ServerMessage =
			serde_json::from_str(r#"{"type":"ka"}"#).expect("Keep-alive should decode.");

		assert!(matches!(data, ServerMessage::Data { id, .. } if id == "1"));
		assert!(matches!(next, ServerMessage::Data { id, .. } if id == "2"));
		assert!(matches!(ka, ServerMessage::KeepAlive {}));
	}

	#[test]
	fn ack_payload_is_ignored() {
		let ack: ServerMessage =
			serde_json::from_str(r#"{"type":"connection_ack","payload":{"server":"v2"}}"#)
				.expect("Ack with a payload should decode.");

		assert!(matches!(ack, ServerMessage::ConnectionAck {}));
	}

	#[test]
	fn error_payloads_are_normalized() {
		let list = errors_from_payload(serde_json::json!([{ "message": "a" }, { "message": "b" }]));
		let single = errors_from_payload(serde_json::json!({ "message": "c" }));
		let bare = errors_from_payload(serde_json::json!("d"));

		assert_eq!(list.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(), ["a", "b"]);
		assert_eq!(single[0].message, "c");
		assert_eq!(bare[0].message, "d");
	}
}
