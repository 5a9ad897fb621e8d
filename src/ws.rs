//! GraphQL-over-WebSocket streaming transport.
//!
//! [`WebSocketTransport`] keeps one persistent socket shared by every subscription. The socket
//! is opened lazily by a background task when the first subscription arrives, authenticated
//! through the `connection_init` payload, and re-established with jittered backoff when it
//! drops; active subscriptions are re-sent after every reconnect. Dropping a subscription
//! stream stops the operation on the server.

mod backoff;
mod connection;
mod protocol;

pub use backoff::*;
pub use protocol::WsProtocol;

// std
use std::{
	mem,
	sync::atomic::{AtomicU64, Ordering},
	task::{Context, Poll},
	time::Duration,
};
// crates.io
use futures::{Stream, StreamExt, TryStreamExt, stream};
use tokio::sync::mpsc;
// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	error::TransportError,
	link::{Link, ResponseStream},
	obs::{OperationSpan, TransportKind},
	operation::{Operation, Response},
	store::{CredentialStore, StoreError},
	ws::{
		connection::{Command, Connection},
		protocol::SubscribePayload,
	},
};

/// Tunables for the streaming transport.
#[derive(Clone, Debug)]
pub struct WsOptions {
	/// Subprotocol spoken on the socket.
	pub protocol: WsProtocol,
	/// Re-establish the socket after it drops.
	pub reconnect: bool,
	/// Consecutive failed reconnects tolerated before giving up; `None` retries forever.
	pub max_attempts: Option<u32>,
	/// Delay schedule between reconnects.
	pub backoff: Backoff,
	/// How long to wait for `connection_ack` after `connection_init`.
	pub ack_timeout: Duration,
}
impl Default for WsOptions {
	fn default() -> Self {
		Self {
			protocol: WsProtocol::default(),
			reconnect: true,
			max_attempts: None,
			backoff: Backoff::default(),
			ack_timeout: Duration::from_secs(10),
		}
	}
}

/// Source of the `connection_init` payload.
#[derive(Clone)]
pub enum ConnectionParams {
	/// Pair captured once; every (re)connect sends the same values.
	Captured(CredentialPair),
	/// Pair re-read from the store before every (re)connect, so rotated tokens reach the
	/// socket on the next reconnect.
	Store(Arc<dyn CredentialStore>),
}
impl ConnectionParams {
	/// Captures the pair currently held by `store`.
	pub async fn capture(store: &dyn CredentialStore) -> Result<Self, StoreError> {
		Ok(Self::Captured(CredentialPair::load(store).await?))
	}

	pub(crate) async fn resolve(&self) -> Result<CredentialPair, StoreError> {
		match self {
			Self::Captured(pair) => Ok(pair.clone()),
			Self::Store(store) => CredentialPair::load(store.as_ref()).await,
		}
	}
}
impl Default for ConnectionParams {
	fn default() -> Self {
		Self::Captured(CredentialPair::default())
	}
}
impl Debug for ConnectionParams {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Captured(pair) => f.debug_tuple("Captured").field(pair).finish(),
			Self::Store(_) => f.write_str("Store(..)"),
		}
	}
}

/// Terminal link multiplexing subscriptions over one WebSocket.
#[derive(Clone)]
pub struct WebSocketTransport {
	inner: Arc<Shared>,
}
impl WebSocketTransport {
	/// Creates the transport; nothing is dialed until the first subscription.
	pub fn new(endpoint: Url, options: WsOptions, params: ConnectionParams) -> Self {
		let (commands, receiver) = mpsc::unbounded_channel();
		let pending = Connection::new(endpoint.clone(), options, params, receiver);

		Self {
			inner: Arc::new(Shared {
				endpoint,
				commands,
				pending: Mutex::new(Some(pending)),
				next_id: AtomicU64::new(1),
			}),
		}
	}

	/// Endpoint the socket connects to.
	pub fn endpoint(&self) -> &Url {
		&self.inner.endpoint
	}

	/// `true` once the background connection task has been started.
	pub fn is_started(&self) -> bool {
		self.inner.pending.lock().is_none()
	}
}
impl Link for WebSocketTransport {
	fn execute(&self, operation: Operation) -> ResponseStream {
		let span = OperationSpan::new(
			TransportKind::WebSocket,
			"ws_transport",
			operation.operation_name.as_deref(),
		);
		let shared = self.inner.clone();
		let id = shared.next_id.fetch_add(1, Ordering::Relaxed).to_string();
		let payload = SubscribePayload::from(operation);
		let subscribe = async move {
			shared.ensure_started();

			let (sink, receiver) = mpsc::unbounded_channel();

			shared
				.commands
				.send(Command::Subscribe { id: id.clone(), payload, sink })
				.map_err(|_| TransportError::closed("subscription transport has shut down"))?;

			tracing::debug!(id = %id, "subscription started");

			Ok::<_, Error>(Subscription { id, receiver, commands: shared.commands.clone() })
		};

		stream::once(span.instrument(subscribe)).try_flatten().boxed()
	}
}
impl Debug for WebSocketTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WebSocketTransport")
			.field("endpoint", &self.inner.endpoint.as_str())
			.field("started", &self.is_started())
			.finish()
	}
}

struct Shared {
	endpoint: Url,
	commands: mpsc::UnboundedSender<Command>,
	pending: Mutex<Option<Connection>>,
	next_id: AtomicU64,
}
impl Shared {
	fn ensure_started(&self) {
		if let Some(connection) = self.pending.lock().take() {
			tracing::debug!(url = %self.endpoint, "starting subscription connection task");
			tokio::spawn(connection.run());
		}
	}
}

// Stream handed to the caller; dropping it stops the server-side operation.
struct Subscription {
	id: String,
	receiver: mpsc::UnboundedReceiver<Result<Response>>,
	commands: mpsc::UnboundedSender<Command>,
}
impl Stream for Subscription {
	type Item = Result<Response>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.receiver.poll_recv(cx)
	}
}
impl Drop for Subscription {
	fn drop(&mut self) {
		let _ = self.commands.send(Command::Unsubscribe { id: mem::take(&mut self.id) });
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[tokio::test]
	async fn captured_params_do_not_follow_the_store() {
		let store = MemoryStore::with_entries([("x-token", "T1")]);
		let params = ConnectionParams::capture(&store).await.expect("Capture should succeed.");

		store.set("x-token", "T2".into()).await.expect("Updating the store should succeed.");

		let resolved = params.resolve().await.expect("Captured params should resolve.");

		assert_eq!(resolved, CredentialPair::new(Some("T1"), None));
	}

	#[tokio::test]
	async fn store_params_follow_rotation() {
		let store = MemoryStore::with_entries([("x-token", "T1")]);
		let params = ConnectionParams::Store(Arc::new(store.clone()));

		store.set("x-token", "T2".into()).await.expect("Updating the store should succeed.");

		let resolved = params.resolve().await.expect("Store params should resolve.");

		assert_eq!(resolved, CredentialPair::new(Some("T2"), None));
		assert_eq!(format!("{params:?}"), "Store(..)");
	}

	#[tokio::test]
	async fn connection_task_starts_lazily() {
		let transport = WebSocketTransport::new(
			Url::parse("ws://127.0.0.1:9/graphql").expect("Static URL should parse."),
			WsOptions { reconnect: false, ..Default::default() },
			ConnectionParams::default(),
		);

		assert!(!transport.is_started());

		let item = transport.execute(Operation::new("subscription { tick }")).next().await;

		assert!(transport.is_started());
		assert!(matches!(
			item,
			Some(Err(Error::Transport(TransportError::ConnectionClosed { .. })))
		));
	}
}
