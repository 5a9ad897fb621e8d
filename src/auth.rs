//! Credential pair model shared by the attacher, the refresher, and the streaming transport.
//!
//! The store is the source of truth: [`CredentialPair::load`] re-reads both keys on every
//! call so concurrent operations sharing one store always observe the latest rotation.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	store::{CredentialStore, StoreError},
};

/// Which half of the credential pair a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
	/// Short-lived access token.
	Token,
	/// Long-lived refresh token.
	RefreshToken,
}
impl CredentialKind {
	/// Both kinds, in header order.
	pub const ALL: [Self; 2] = [Self::Token, Self::RefreshToken];

	/// Store key and HTTP header name (they are identical on the wire).
	pub const fn key(self) -> &'static str {
		match self {
			Self::Token => "x-token",
			Self::RefreshToken => "x-refresh-token",
		}
	}

	/// Field name used inside WebSocket connection params.
	pub const fn param(self) -> &'static str {
		match self {
			Self::Token => "token",
			Self::RefreshToken => "refreshToken",
		}
	}

	/// Header name for this credential.
	pub fn header_name(self) -> HeaderName {
		HeaderName::from_static(self.key())
	}
}

/// Redacted token wrapper keeping credentials out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Wraps `value` unless it is empty; empty strings count as "no token".
	pub fn non_empty(value: impl Into<String>) -> Option<Self> {
		let value = value.into();

		if value.is_empty() { None } else { Some(Self(value)) }
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access token plus refresh token, either of which may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialPair {
	/// Access token sent as `x-token`.
	pub token: Option<TokenSecret>,
	/// Refresh token sent as `x-refresh-token`.
	pub refresh_token: Option<TokenSecret>,
}
impl CredentialPair {
	/// Builds a pair from optional raw values, discarding empty strings.
	pub fn new(token: Option<&str>, refresh_token: Option<&str>) -> Self {
		Self {
			token: token.and_then(TokenSecret::non_empty),
			refresh_token: refresh_token.and_then(TokenSecret::non_empty),
		}
	}

	/// Returns the secret for `kind`.
	pub fn get(&self, kind: CredentialKind) -> Option<&TokenSecret> {
		match kind {
			CredentialKind::Token => self.token.as_ref(),
			CredentialKind::RefreshToken => self.refresh_token.as_ref(),
		}
	}

	fn slot_mut(&mut self, kind: CredentialKind) -> &mut Option<TokenSecret> {
		match kind {
			CredentialKind::Token => &mut self.token,
			CredentialKind::RefreshToken => &mut self.refresh_token,
		}
	}

	/// `true` when neither token is present.
	pub fn is_empty(&self) -> bool {
		self.token.is_none() && self.refresh_token.is_none()
	}

	/// Reads both tokens from `store`.
	pub async fn load(store: &dyn CredentialStore) -> Result<Self, StoreError> {
		let mut pair = Self::default();

		for kind in CredentialKind::ALL {
			*pair.slot_mut(kind) = store.get(kind.key()).await?.and_then(TokenSecret::non_empty);
		}

		Ok(pair)
	}

	/// Writes the present tokens to `store`, overwriting previous values; absent tokens
	/// leave the stored value untouched.
	pub async fn persist(&self, store: &dyn CredentialStore) -> Result<(), StoreError> {
		for kind in CredentialKind::ALL {
			if let Some(secret) = self.get(kind) {
				store.set(kind.key(), secret.expose().to_owned()).await?;
			}
		}

		Ok(())
	}

	/// Removes both tokens from `store`.
	pub async fn clear(store: &dyn CredentialStore) -> Result<(), StoreError> {
		for kind in CredentialKind::ALL {
			store.remove(kind.key()).await?;
		}

		Ok(())
	}

	/// Builds the outbound header set. Absent tokens are omitted, never sent empty.
	pub fn to_headers(&self) -> Result<HeaderMap, ConfigError> {
		let mut headers = HeaderMap::new();

		for kind in CredentialKind::ALL {
			let Some(secret) = self.get(kind) else { continue };
			let mut value = HeaderValue::from_str(secret.expose())
				.map_err(|_| ConfigError::InvalidHeaderValue { name: kind.key().into() })?;

			value.set_sensitive(true);
			headers.insert(kind.header_name(), value);
		}

		Ok(headers)
	}

	/// Extracts rotated tokens from response headers. Missing, empty, or non-UTF-8
	/// values count as absent.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		let mut pair = Self::default();

		for kind in CredentialKind::ALL {
			*pair.slot_mut(kind) = headers
				.get(kind.key())
				.and_then(|value| value.to_str().ok())
				.and_then(TokenSecret::non_empty);
		}

		pair
	}

	/// Builds the WebSocket `connection_init` payload, omitting absent tokens.
	pub fn connection_params(&self) -> Value {
		let mut params = serde_json::Map::new();

		for kind in CredentialKind::ALL {
			if let Some(secret) = self.get(kind) {
				params.insert(kind.param().into(), Value::String(secret.expose().into()));
			}
		}

		Value::Object(params)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(<redacted>)");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert!(!format!("{:?}", CredentialPair::new(Some("xyz-secret"), None)).contains("xyz"));
	}

	#[test]
	fn headers_carry_both_tokens() {
		let headers = CredentialPair::new(Some("T"), Some("R"))
			.to_headers()
			.expect("Plain ASCII tokens should encode as headers.");

		assert_eq!(headers.len(), 2);
		assert_eq!(headers.get("x-token").and_then(|v| v.to_str().ok()), Some("T"));
		assert_eq!(headers.get("x-refresh-token").and_then(|v| v.to_str().ok()), Some("R"));
	}

	#[test]
	fn absent_tokens_are_omitted_from_headers() {
		let headers = CredentialPair::new(None, Some("R"))
			.to_headers()
			.expect("Refresh-only pair should encode as headers.");

		assert!(!headers.contains_key("x-token"));
		assert_eq!(headers.get("x-refresh-token").and_then(|v| v.to_str().ok()), Some("R"));
		assert!(
			CredentialPair::default()
				.to_headers()
				.expect("Empty pair should encode as headers.")
				.is_empty()
		);
	}

	#[test]
	fn invalid_header_values_are_rejected() {
		let err = CredentialPair::new(Some("line\nbreak"), None)
			.to_headers()
			.expect_err("Control characters must not be sent as header values.");

		assert!(matches!(err, ConfigError::InvalidHeaderValue { name } if name == "x-token"));
	}

	#[test]
	fn rotation_headers_are_extracted() {
		let mut headers = HeaderMap::new();

		headers.insert("x-token", HeaderValue::from_static("T2"));
		headers.insert("x-refresh-token", HeaderValue::from_static(""));

		let pair = CredentialPair::from_headers(&headers);

		assert_eq!(pair.token.as_ref().map(TokenSecret::expose), Some("T2"));
		assert_eq!(pair.refresh_token, None);
	}

	#[test]
	fn connection_params_use_camel_case_and_skip_absent() {
		let params = CredentialPair::new(Some("T"), Some("R")).connection_params();

		assert_eq!(params, serde_json::json!({ "token": "T", "refreshToken": "R" }));
		assert_eq!(
			CredentialPair::new(None, Some("R")).connection_params(),
			serde_json::json!({ "refreshToken": "R" })
		);
	}

	#[tokio::test]
	async fn load_and_persist_round_trip_through_store() {
		let store = MemoryStore::default();
		let pair = CredentialPair::new(Some("T"), Some("R"));

		pair.persist(&store).await.expect("Persisting into memory store should succeed.");

		let loaded = CredentialPair::load(&store).await.expect("Loading should succeed.");

		assert_eq!(loaded, pair);

		CredentialPair::new(Some("T2"), None)
			.persist(&store)
			.await
			.expect("Partial rotation should persist.");

		let loaded = CredentialPair::load(&store).await.expect("Loading should succeed.");

		assert_eq!(loaded, CredentialPair::new(Some("T2"), Some("R")));

		CredentialPair::clear(&store).await.expect("Clearing should succeed.");

		assert!(
			CredentialPair::load(&store).await.expect("Loading should succeed.").is_empty()
		);
	}
}
