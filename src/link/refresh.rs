//! Strips cache metadata from outbound variables and persists rotated tokens from responses.

// crates.io
use futures::StreamExt;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, CredentialPair},
	link::{Link, Middleware, ResponseStream},
	operation::{Operation, Response},
	store::CredentialStore,
};

/// Cache-internal metadata key removed from variables before transmission.
pub const RESERVED_FIELD: &str = "__typename";

/// Returns a copy of `value` with every [`RESERVED_FIELD`] key removed at any depth.
///
/// Objects nested inside arrays are cleaned too. Remaining keys keep their order and
/// values; the input is left untouched.
pub fn strip_reserved_fields(value: &Value) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.iter()
				.filter(|(key, _)| key.as_str() != RESERVED_FIELD)
				.map(|(key, value)| (key.clone(), strip_reserved_fields(value)))
				.collect(),
		),
		Value::Array(items) => Value::Array(items.iter().map(strip_reserved_fields).collect()),
		other => other.clone(),
	}
}

/// Middleware wrapping the request transport: cleans variables on the way out and writes
/// rotated `x-token` / `x-refresh-token` response headers back to the store on the way in.
///
/// Persistence failures are logged and never withhold the response from the caller.
#[derive(Clone)]
pub struct CredentialRefresher {
	store: Arc<dyn CredentialStore>,
}
impl CredentialRefresher {
	/// Creates a refresher persisting into `store`.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self { store }
	}
}
impl Middleware for CredentialRefresher {
	fn wrap(&self, next: Arc<dyn Link>) -> Arc<dyn Link> {
		Arc::new(RefreshLink { store: self.store.clone(), next })
	}
}
impl Debug for CredentialRefresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialRefresher(..)")
	}
}

struct RefreshLink {
	store: Arc<dyn CredentialStore>,
	next: Arc<dyn Link>,
}
impl RefreshLink {
	async fn persist_rotation(store: &dyn CredentialStore, response: &Response) {
		let Some(headers) = response.context.headers.as_ref() else { return };
		let rotated = CredentialPair::from_headers(headers);

		if rotated.is_empty() {
			return;
		}

		for kind in CredentialKind::ALL.into_iter().filter(|kind| rotated.get(*kind).is_some()) {
			tracing::debug!(key = kind.key(), "persisting rotated credential");
		}

		if let Err(e) = rotated.persist(store).await {
			tracing::warn!(error = %e, "failed to persist rotated credentials");
		}
	}
}
impl Link for RefreshLink {
	fn execute(&self, mut operation: Operation) -> ResponseStream {
		if let Some(variables) = operation.variables.as_ref() {
			operation.variables = Some(strip_reserved_fields(variables));
		}

		let store = self.store.clone();

		self.next
			.execute(operation)
			.then(move |item| {
				let store = store.clone();

				async move {
					if let Ok(response) = &item {
						Self::persist_rotation(store.as_ref(), response).await;
					}

					item
				}
			})
			.boxed()
	}
}
