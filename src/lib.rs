//! GraphQL client link chain: credential headers, token rotation persistence,
//! subscription-aware transport routing, and error observation in one crate.
//!
//! Operations flow through an explicit list of [`link::Middleware`]s folded onto a terminal
//! [`link::Link`]. [`client::Client`] assembles the standard chain: an
//! [`link::ErrorObserver`] in front of a [`link::TransportRouter`] that sends subscriptions
//! over a shared [`ws::WebSocketTransport`] and everything else through a
//! [`link::CredentialRefresher`] and a [`link::CredentialAttacher`] to an
//! [`http::HttpTransport`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod link;
pub mod obs;
pub mod operation;
pub mod store;
pub mod ws;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::time::Duration;
	// self
	use crate::{
		client::Client,
		config::ClientConfig,
		store::{CredentialStore, MemoryStore},
		ws::WsOptions,
	};

	/// Builds a config pointing at local test servers. Reconnects are disabled and the ack
	/// timeout is short so a misbehaving server fails the test quickly.
	pub fn test_config(http_endpoint: &str, ws_endpoint: &str) -> ClientConfig {
		ClientConfig::builder()
			.http_endpoint_str(http_endpoint)
			.and_then(|builder| builder.ws_endpoint_str(ws_endpoint))
			.expect("Failed to parse test endpoints.")
			.ws_options(WsOptions {
				reconnect: false,
				ack_timeout: Duration::from_secs(5),
				..Default::default()
			})
			.build()
			.expect("Failed to validate test client config.")
	}

	/// Constructs a [`Client`] backed by an in-memory store seeded with `entries`.
	pub async fn build_test_client<I>(
		http_endpoint: &str,
		ws_endpoint: &str,
		entries: I,
	) -> (Client, MemoryStore)
	where
		I: IntoIterator<Item = (&'static str, &'static str)>,
	{
		let store = MemoryStore::with_entries(entries);
		let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());
		let client = Client::builder(test_config(http_endpoint, ws_endpoint))
			.store(shared)
			.build()
			.await
			.expect("Failed to build test client.");

		(client, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{
		Client as ReqwestClient, Error as ReqwestError,
		header::{HeaderMap, HeaderName, HeaderValue},
	};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
