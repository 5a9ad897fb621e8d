//! Attaches the stored credential pair to every outbound operation.

// crates.io
use futures::{StreamExt, TryStreamExt, stream};
// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	link::{Link, Middleware, ResponseStream},
	operation::Operation,
	store::CredentialStore,
};

/// Middleware merging `x-token` / `x-refresh-token` into the operation context.
///
/// The pair is re-read from the store immediately before each send; absent tokens are
/// omitted rather than sent empty.
#[derive(Clone)]
pub struct CredentialAttacher {
	store: Arc<dyn CredentialStore>,
}
impl CredentialAttacher {
	/// Creates an attacher reading from `store`.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self { store }
	}
}
impl Middleware for CredentialAttacher {
	fn wrap(&self, next: Arc<dyn Link>) -> Arc<dyn Link> {
		Arc::new(AttachLink { store: self.store.clone(), next })
	}
}
impl Debug for CredentialAttacher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialAttacher(..)")
	}
}

struct AttachLink {
	store: Arc<dyn CredentialStore>,
	next: Arc<dyn Link>,
}
impl Link for AttachLink {
	fn execute(&self, mut operation: Operation) -> ResponseStream {
		let store = self.store.clone();
		let next = self.next.clone();

		stream::once(async move {
			let headers = CredentialPair::load(store.as_ref()).await?.to_headers()?;

			operation.context.headers.extend(headers);

			Ok::<_, Error>(next.execute(operation))
		})
		.try_flatten()
		.boxed()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		link::{FnLink, compose, single},
		operation::{GraphQlResponse, Response},
		store::MemoryStore,
	};

	fn echo_headers() -> Arc<dyn Link> {
		Arc::new(FnLink::new(|op: Operation| {
			let headers = op
				.context
				.headers
				.iter()
				.map(|(name, value)| {
					(name.as_str().to_owned(), Value::String(value.to_str().unwrap_or("").into()))
				})
				.collect::<serde_json::Map<_, _>>();

			single(Ok(Response::streamed(GraphQlResponse {
				data: Some(Value::Object(headers)),
				..Default::default()
			})))
		}))
	}

	async fn sent_headers(store: MemoryStore, op: Operation) -> Value {
		let attacher: Arc<dyn Middleware> = Arc::new(CredentialAttacher::new(Arc::new(store)));
		let chain = compose([attacher], echo_headers());

		chain
			.execute(op)
			.next()
			.await
			.expect("Chain should yield a result.")
			.expect("Attaching credentials should succeed.")
			.body
			.data
			.expect("Echo link should return the headers.")
	}

	#[tokio::test]
	async fn stored_pair_becomes_headers() {
		let store = MemoryStore::with_entries([("x-token", "T"), ("x-refresh-token", "R")]);
		let headers = sent_headers(store, Operation::new("{ me { id } }")).await;

		assert_eq!(headers, serde_json::json!({ "x-token": "T", "x-refresh-token": "R" }));
	}

	#[tokio::test]
	async fn absent_token_header_is_omitted() {
		let store = MemoryStore::with_entries([("x-refresh-token", "R")]);
		let headers = sent_headers(store, Operation::new("{ me { id } }")).await;

		assert_eq!(headers, serde_json::json!({ "x-refresh-token": "R" }));
	}

	#[tokio::test]
	async fn credentials_replace_caller_supplied_values_and_keep_others() {
		let store = MemoryStore::with_entries([("x-token", "fresh")]);
		let op = Operation::new("{ me { id } }")
			.header(HeaderName::from_static("x-token"), HeaderValue::from_static("stale"))
			.header(HeaderName::from_static("x-trace"), HeaderValue::from_static("t-1"));
		let headers = sent_headers(store, op).await;

		assert_eq!(headers, serde_json::json!({ "x-token": "fresh", "x-trace": "t-1" }));
	}

	#[tokio::test]
	async fn store_is_reread_for_every_operation() {
		let store = MemoryStore::with_entries([("x-token", "T1")]);
		let first = sent_headers(store.clone(), Operation::new("{ a }")).await;

		store.set("x-token", "T2".into()).await.expect("Updating the store should succeed.");

		let second = sent_headers(store, Operation::new("{ a }")).await;

		assert_eq!(first["x-token"], "T1");
		assert_eq!(second["x-token"], "T2");
	}
}
