//! Background task owning the WebSocket and multiplexing subscriptions over it.

// std
use std::mem;
// crates.io
use futures::{SinkExt, StreamExt};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
	MaybeTlsStream, WebSocketStream,
	tungstenite::{
		Message,
		client::IntoClientRequest,
		http::header::SEC_WEBSOCKET_PROTOCOL,
		protocol::CloseFrame,
	},
};
// self
use crate::{
	_prelude::*,
	error::TransportError,
	operation::{GraphQlResponse, Response},
	ws::{
		ConnectionParams, WsOptions,
		protocol::{ClientMessage, ServerMessage, SubscribePayload, errors_from_payload},
	},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type Sink = mpsc::UnboundedSender<Result<Response>>;

pub(crate) enum Command {
	Subscribe { id: String, payload: SubscribePayload, sink: Sink },
	Unsubscribe { id: String },
}

struct Active {
	payload: SubscribePayload,
	sink: Sink,
}

enum Disconnect {
	Lost(TransportError),
	Shutdown,
}

pub(crate) struct Connection {
	url: Url,
	options: WsOptions,
	params: ConnectionParams,
	commands: mpsc::UnboundedReceiver<Command>,
	active: BTreeMap<String, Active>,
}
impl Connection {
	pub(crate) fn new(
		url: Url,
		options: WsOptions,
		params: ConnectionParams,
		commands: mpsc::UnboundedReceiver<Command>,
	) -> Self {
		Self { url, options, params, commands, active: BTreeMap::new() }
	}

	/// Drives the socket until every command sender is gone or reconnects are exhausted.
	pub(crate) async fn run(mut self) {
		let mut failures = 0_u32;

		loop {
			if self.active.is_empty() && !self.await_subscription().await {
				return;
			}

			let outcome = match self.connect().await {
				Ok(socket) => {
					failures = 0;

					self.serve(socket).await
				},
				Err(e) => Disconnect::Lost(e),
			};
			let reason = match outcome {
				Disconnect::Shutdown => return,
				Disconnect::Lost(reason) => reason,
			};

			tracing::warn!(url = %self.url, error = %reason, "subscription connection lost");

			let exhausted = self.options.max_attempts.is_some_and(|max| failures >= max);

			if !self.options.reconnect || exhausted {
				self.terminate(reason).await;

				return;
			}

			let delay = self.options.backoff.delay(failures);

			failures += 1;

			tracing::info!(
				attempt = failures,
				delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
				"reconnecting subscription transport"
			);

			let sleep = tokio::time::sleep(delay);

			tokio::pin!(sleep);

			loop {
				tokio::select! {
					_ = &mut sleep => break,
					command = self.commands.recv() => match command {
						Some(command) => self.apply_offline(command),
						None => return,
					},
				}
			}
		}
	}

	// Waits while idle; the socket is only opened once something subscribes.
	async fn await_subscription(&mut self) -> bool {
		while self.active.is_empty() {
			match self.commands.recv().await {
				Some(command) => self.apply_offline(command),
				None => return false,
			}
		}

		true
	}

	fn apply_offline(&mut self, command: Command) {
		match command {
			Command::Subscribe { id, payload, sink } => {
				self.active.insert(id, Active { payload, sink });
			},
			Command::Unsubscribe { id } => {
				self.active.remove(&id);
			},
		}
	}

	async fn connect(&mut self) -> Result<Socket, TransportError> {
		let protocol = self.options.protocol;
		let credentials = self.params.resolve().await.map_err(|e| TransportError::WebSocket {
			message: format!("connection params are unavailable: {e}"),
		})?;
		let mut request = self.url.as_str().into_client_request()?;
		let headers = request.headers_mut();

		headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(protocol.subprotocol()));
		headers.extend(
			credentials
				.to_headers()
				.map_err(|e| TransportError::WebSocket { message: e.to_string() })?,
		);

		let (mut socket, _) = tokio_tungstenite::connect_async(request).await?;

		send(&mut socket, &protocol.init(credentials.connection_params())).await?;
		tokio::time::timeout(self.options.ack_timeout, await_ack(&mut socket))
			.await
			.map_err(|_| TransportError::Protocol {
				message: format!(
					"no connection_ack within {}ms",
					self.options.ack_timeout.as_millis()
				),
			})??;

		tracing::debug!(
			url = %self.url,
			protocol = protocol.subprotocol(),
			"subscription connection acknowledged"
		);

		Ok(socket)
	}

	async fn serve(&mut self, mut socket: Socket) -> Disconnect {
		let protocol = self.options.protocol;
		let resume = self
			.active
			.iter()
			.map(|(id, active)| protocol.start(id, &active.payload))
			.collect::<Vec<_>>();

		for message in &resume {
			if let Err(e) = send(&mut socket, message).await {
				return Disconnect::Lost(e);
			}
		}

		loop {
			tokio::select! {
				command = self.commands.recv() => match command {
					Some(Command::Subscribe { id, payload, sink }) => {
						let message = protocol.start(&id, &payload);

						self.active.insert(id, Active { payload, sink });

						if let Err(e) = send(&mut socket, &message).await {
							return Disconnect::Lost(e);
						}
					},
					Some(Command::Unsubscribe { id }) => {
						let stopped = match self.active.remove(&id) {
							Some(_) => send(&mut socket, &protocol.stop(&id)).await,
							None => Ok(()),
						};

						if let Err(e) = stopped {
							return Disconnect::Lost(e);
						}
					},
					None => {
						if let Some(message) = protocol.terminate() {
							let _ = send(&mut socket, &message).await;
						}

						let _ = socket.close(None).await;

						return Disconnect::Shutdown;
					},
				},
				frame = socket.next() => match frame {
					Some(Ok(Message::Text(text))) => {
						if let Err(e) = self.dispatch(&mut socket, text.as_str()).await {
							return Disconnect::Lost(e);
						}
					},
					Some(Ok(Message::Close(frame))) =>
						return Disconnect::Lost(closed_by_peer(frame)),
					Some(Ok(_)) => {},
					Some(Err(e)) => return Disconnect::Lost(e.into()),
					None => return Disconnect::Lost(TransportError::closed("socket ended")),
				},
			}
		}
	}

	async fn dispatch(&mut self, socket: &mut Socket, text: &str) -> Result<(), TransportError> {
		let protocol = self.options.protocol;
		let message = match serde_json::from_str::<ServerMessage>(text) {
			Ok(message) => message,
			Err(e) => {
				tracing::warn!(error = %e, "ignoring undecodable subscription message");

				return Ok(());
			},
		};

		match message {
			ServerMessage::Data { id, payload } => {
				let delivered = match self.active.get(&id) {
					Some(active) => active.sink.send(Ok(Response::streamed(payload))).is_ok(),
					None => true,
				};

				if !delivered {
					self.active.remove(&id);
					send(socket, &protocol.stop(&id)).await?;
				}
			},
			ServerMessage::Error { id, payload } =>
				if let Some(active) = self.active.remove(&id) {
					let body = GraphQlResponse {
						errors: Some(errors_from_payload(payload)),
						..Default::default()
					};
					let _ = active.sink.send(Ok(Response::streamed(body)));
				},
			ServerMessage::Complete { id } => {
				self.active.remove(&id);
			},
			ServerMessage::Ping { payload } =>
				if let Some(pong) = protocol.pong(payload) {
					send(socket, &pong).await?;
				},
			ServerMessage::ConnectionError { payload } =>
				return Err(TransportError::Protocol { message: rejection(payload) }),
			ServerMessage::ConnectionAck {}
			| ServerMessage::KeepAlive {}
			| ServerMessage::Pong {} => {},
		}

		Ok(())
	}

	async fn terminate(mut self, reason: TransportError) {
		let reason = reason.to_string();

		for (_, active) in mem::take(&mut self.active) {
			let _ = active.sink.send(Err(TransportError::closed(reason.clone()).into()));
		}

		self.commands.close();

		while let Some(command) = self.commands.recv().await {
			if let Command::Subscribe { sink, .. } = command {
				let _ = sink.send(Err(TransportError::closed(reason.clone()).into()));
			}
		}
	}
}

async fn await_ack(socket: &mut Socket) -> Result<(), TransportError> {
	while let Some(frame) = socket.next().await {
		let text = match frame? {
			Message::Text(text) => text,
			Message::Close(frame) => return Err(closed_by_peer(frame)),
			_ => continue,
		};

		match serde_json::from_str::<ServerMessage>(text.as_str()) {
			Ok(ServerMessage::ConnectionAck {}) => return Ok(()),
			Ok(ServerMessage::ConnectionError { payload }) =>
				return Err(TransportError::Protocol { message: rejection(payload) }),
			Ok(
				ServerMessage::KeepAlive {} | ServerMessage::Ping { .. } | ServerMessage::Pong {},
			) => {},
			Ok(other) =>
				return Err(TransportError::Protocol {
					message: format!("unexpected {other:?} before connection_ack"),
				}),
			Err(e) =>
				return Err(TransportError::Protocol {
					message: format!("undecodable handshake message: {e}"),
				}),
		}
	}

	Err(TransportError::closed("socket ended before connection_ack"))
}

async fn send(socket: &mut Socket, message: &ClientMessage) -> Result<(), TransportError> {
	let text = message.encode().map_err(|e| TransportError::Protocol { message: e.to_string() })?;

	socket.send(Message::text(text)).await?;

	Ok(())
}

fn closed_by_peer(frame: Option<CloseFrame>) -> TransportError {
	match frame {
		Some(frame) if !frame.reason.is_empty() =>
			TransportError::closed(format!("peer closed with {} ({})", frame.code, frame.reason)),
		Some(frame) => TransportError::closed(format!("peer closed with {}", frame.code)),
		None => TransportError::closed("peer closed"),
	}
}

fn rejection(payload: Option<Value>) -> String {
	match payload {
		Some(Value::Object(map)) => match map.get("message").and_then(Value::as_str) {
			Some(message) => format!("connection rejected: {message}"),
			None => format!("connection rejected: {}", Value::Object(map)),
		},
		Some(other) => format!("connection rejected: {other}"),
		None => "connection rejected".into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejection_prefers_message_field() {
		assert_eq!(
			rejection(Some(serde_json::json!({ "message": "bad token" }))),
			"connection rejected: bad token"
		);
		assert_eq!(rejection(Some(serde_json::json!("nope"))), "connection rejected: \"nope\"");
		assert_eq!(rejection(None), "connection rejected");
	}

	#[test]
	fn offline_commands_update_the_registry() {
		let (_tx, rx) = mpsc::unbounded_channel();
		let mut connection = Connection::new(
			Url::parse("ws://localhost/graphql").expect("Static URL should parse."),
			WsOptions::default(),
			ConnectionParams::Captured(Default::default()),
			rx,
		);
		let (sink, _stream) = mpsc::unbounded_channel();

		connection.apply_offline(Command::Subscribe {
			id: "1".into(),
			payload: SubscribePayload {
				query: "subscription { tick }".into(),
				operation_name: None,
				variables: None,
				extensions: None,
			},
			sink,
		});

		assert!(connection.active.contains_key("1"));

		connection.apply_offline(Command::Unsubscribe { id: "1".into() });

		assert!(connection.active.is_empty());
	}

	#[tokio::test]
	async fn terminate_fails_active_and_late_subscribers() {
		let (tx, rx) = mpsc::unbounded_channel();
		let mut connection = Connection::new(
			Url::parse("ws://localhost/graphql").expect("Static URL should parse."),
			WsOptions::default(),
			ConnectionParams::Captured(Default::default()),
			rx,
		);
		let (sink, mut active_stream) = mpsc::unbounded_channel();
		let (late_sink, mut late_stream) = mpsc::unbounded_channel();
		let payload = SubscribePayload {
			query: "subscription { tick }".into(),
			operation_name: None,
			variables: None,
			extensions: None,
		};

		connection.apply_offline(Command::Subscribe {
			id: "1".into(),
			payload: payload.clone(),
			sink,
		});
		tx.send(Command::Subscribe { id: "2".into(), payload, sink: late_sink })
			.unwrap_or_else(|_| panic!("Command channel should be open."));
		connection.terminate(TransportError::closed("refused")).await;

		for stream in [&mut active_stream, &mut late_stream] {
			let item = stream.recv().await.expect("Terminated subscribers should get an error.");

			assert!(matches!(
				item,
				Err(Error::Transport(TransportError::ConnectionClosed { reason }))
					if reason.contains("refused")
			));
		}
	}
}
