//! Assembled client wiring the store, the link chain, and both transports together.
//!
//! The default chain is
//!
//! ```text
//! [extra middlewares] -> ErrorObserver -> TransportRouter
//!                                           |- subscription -> WebSocketTransport
//!                                           `- otherwise    -> CredentialRefresher
//!                                                                -> CredentialAttacher
//!                                                                -> HttpTransport
//! ```
//!
//! There is no result cache: every query goes to the network.

// crates.io
use futures::StreamExt;
// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	config::ClientConfig,
	document::{DocumentClassifier, ParsedDocumentClassifier},
	error::TransportError,
	http::HttpTransport,
	link::{
		self, CredentialAttacher, CredentialRefresher, ErrorObserver, Link, Middleware,
		ResponseStream, TransportRouter,
	},
	obs::TransportKind,
	operation::{Operation, Response},
	store::{CredentialStore, MemoryStore},
	ws::{ConnectionParams, WebSocketTransport},
};

/// GraphQL client executing operations through the credential-aware link chain.
#[derive(Clone)]
pub struct Client {
	link: Arc<dyn Link>,
	router: TransportRouter,
	store: Arc<dyn CredentialStore>,
	ws: WebSocketTransport,
	config: ClientConfig,
}
impl Client {
	/// Starts a builder for `config`.
	pub fn builder(config: ClientConfig) -> ClientBuilder {
		ClientBuilder::new(config)
	}

	/// Runs `operation` through the chain.
	pub fn execute(&self, operation: Operation) -> ResponseStream {
		self.link.execute(operation)
	}

	/// Executes a query and returns its single response.
	pub async fn query(&self, operation: Operation) -> Result<Response> {
		self.first(operation).await
	}

	/// Executes a mutation and returns its single response.
	pub async fn mutate(&self, operation: Operation) -> Result<Response> {
		self.first(operation).await
	}

	/// Starts a subscription; the stream ends when the server completes the operation.
	pub fn subscribe(&self, operation: Operation) -> ResponseStream {
		self.execute(operation)
	}

	/// Transport `operation` would be routed to.
	pub fn transport_for(&self, operation: &Operation) -> Result<TransportKind> {
		self.router.route(operation)
	}

	/// Credential store shared by every link.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Reads the current credential pair from the store.
	pub async fn credentials(&self) -> Result<CredentialPair> {
		Ok(CredentialPair::load(self.store.as_ref()).await?)
	}

	/// Replaces the stored credentials, e.g. after sign-in.
	pub async fn set_credentials(&self, pair: &CredentialPair) -> Result<()> {
		pair.persist(self.store.as_ref()).await?;

		tracing::debug!(
			token = pair.token.is_some(),
			refresh_token = pair.refresh_token.is_some(),
			"credentials replaced"
		);

		Ok(())
	}

	/// Removes both tokens from the store, e.g. on sign-out.
	pub async fn clear_credentials(&self) -> Result<()> {
		CredentialPair::clear(self.store.as_ref()).await?;

		Ok(())
	}

	/// Streaming transport shared by all subscriptions.
	pub fn ws_transport(&self) -> &WebSocketTransport {
		&self.ws
	}

	/// Configuration the client was built from.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	async fn first(&self, operation: Operation) -> Result<Response> {
		self.execute(operation)
			.next()
			.await
			.unwrap_or_else(|| Err(TransportError::EmptyResponse.into()))
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("http_endpoint", &self.config.http_endpoint.as_str())
			.field("ws", &self.ws)
			.finish()
	}
}

/// Builder for [`Client`].
pub struct ClientBuilder {
	config: ClientConfig,
	store: Option<Arc<dyn CredentialStore>>,
	classifier: Option<Arc<dyn DocumentClassifier>>,
	connection_params: Option<ConnectionParams>,
	http_client: Option<ReqwestClient>,
	middlewares: Vec<Arc<dyn Middleware>>,
}
impl ClientBuilder {
	fn new(config: ClientConfig) -> Self {
		Self {
			config,
			store: None,
			classifier: None,
			connection_params: None,
			http_client: None,
			middlewares: Vec::new(),
		}
	}

	/// Uses `store` for credentials; defaults to a fresh [`MemoryStore`].
	pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Overrides the document classifier; defaults to [`ParsedDocumentClassifier`].
	pub fn classifier(mut self, classifier: Arc<dyn DocumentClassifier>) -> Self {
		self.classifier = Some(classifier);

		self
	}

	/// Overrides the `connection_init` payload source. By default the pair held by the store
	/// at build time is captured.
	pub fn connection_params(mut self, params: ConnectionParams) -> Self {
		self.connection_params = Some(params);

		self
	}

	/// Reuses an existing reqwest client for the request transport; transport options from
	/// the config are then ignored.
	pub fn http_client(mut self, client: ReqwestClient) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Appends a middleware placed outside the error observer. Middlewares run in the order
	/// they were added, the first one outermost.
	pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);

		self
	}

	/// Assembles the chain. Reads the store once when connection params are captured.
	pub async fn build(self) -> Result<Client> {
		let Self { config, store, classifier, connection_params, http_client, mut middlewares } =
			self;
		let store = store.unwrap_or_else(|| Arc::new(MemoryStore::default()));
		let classifier = classifier.unwrap_or_else(|| Arc::new(ParsedDocumentClassifier));
		let params = match connection_params {
			Some(params) => params,
			None => ConnectionParams::capture(store.as_ref()).await?,
		};
		let http = match http_client {
			Some(client) => HttpTransport::with_client(client, config.http_endpoint.clone()),
			None => HttpTransport::new(config.http_endpoint.clone(), &config.http)?,
		};
		let ws = WebSocketTransport::new(config.ws_endpoint.clone(), config.ws.clone(), params);
		let request_branch: Vec<Arc<dyn Middleware>> = vec![
			Arc::new(CredentialRefresher::new(store.clone())),
			Arc::new(CredentialAttacher::new(store.clone())),
		];
		let request = link::compose(request_branch, Arc::new(http));
		let router = TransportRouter::new(classifier, Arc::new(ws.clone()), request);

		middlewares.push(Arc::new(ErrorObserver));

		let link = link::compose(middlewares, Arc::new(router.clone()));

		tracing::debug!(
			http_endpoint = %config.http_endpoint,
			ws_endpoint = %config.ws_endpoint,
			"GraphQL client assembled"
		);

		Ok(Client { link, router, store, ws, config })
	}
}
impl Debug for ClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("config", &self.config)
			.field("middlewares", &self.middlewares.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{link::FnLink, ws::WsOptions};

	fn config() -> ClientConfig {
		ClientConfig::builder()
			.http_endpoint_str("http://127.0.0.1:9/graphql")
			.and_then(|b| b.ws_endpoint_str("ws://127.0.0.1:9/graphql"))
			.expect("Static endpoints should parse.")
			.ws_options(WsOptions { reconnect: false, ..Default::default() })
			.build()
			.expect("Static config should validate.")
	}

	#[tokio::test]
	async fn routes_by_main_definition() {
		let client = Client::builder(config()).build().await.expect("Client should build.");

		assert_eq!(
			client.transport_for(&Operation::new("subscription { tick }")).expect("Route."),
			TransportKind::WebSocket
		);
		assert_eq!(
			client.transport_for(&Operation::new("mutation { save }")).expect("Route."),
			TransportKind::Http
		);
		assert!(!client.ws_transport().is_started());
	}

	#[tokio::test]
	async fn outer_middleware_can_short_circuit() {
		let short_circuit: Arc<dyn Middleware> = Arc::new(|_next: Arc<dyn Link>| {
			Arc::new(FnLink::new(|_op: Operation| futures::stream::empty().boxed()))
				as Arc<dyn Link>
		});
		let client = Client::builder(config())
			.middleware(short_circuit)
			.build()
			.await
			.expect("Client should build.");
		let err = client
			.query(Operation::new("{ me { id } }"))
			.await
			.expect_err("An empty chain result must be reported.");

		assert!(matches!(err, Error::Transport(TransportError::EmptyResponse)));
	}

	#[tokio::test]
	async fn credential_helpers_use_the_shared_store() {
		let store = MemoryStore::default();
		let client = Client::builder(config())
			.store(Arc::new(store.clone()))
			.build()
			.await
			.expect("Client should build.");

		client
			.set_credentials(&CredentialPair::new(Some("T"), Some("R")))
			.await
			.expect("Setting credentials should succeed.");

		assert_eq!(store.snapshot().get("x-token").map(String::as_str), Some("T"));
		assert_eq!(
			client.credentials().await.expect("Loading should succeed."),
			CredentialPair::new(Some("T"), Some("R"))
		);

		client.clear_credentials().await.expect("Clearing should succeed.");

		assert!(store.snapshot().is_empty());
	}

	#[tokio::test]
	async fn unreachable_subscription_endpoint_surfaces_connection_closed() {
		let client = Client::builder(config()).build().await.expect("Client should build.");
		let item = client.subscribe(Operation::new("subscription { tick }")).next().await;

		assert!(matches!(
			item,
			Some(Err(Error::Transport(TransportError::ConnectionClosed { .. })))
		));
	}
}
