//! Client configuration: endpoints plus per-transport tunables.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError, http::HttpOptions, ws::WsOptions};

/// Environment variable holding the request/response endpoint.
pub const HTTP_ENDPOINT_ENV: &str = "GRAPHQL_ENDPOINT";
/// Environment variable holding the subscription endpoint.
pub const WS_ENDPOINT_ENV: &str = "GRAPHQL_SUBSCRIPTIONS_ENDPOINT";

/// Validated configuration consumed by [`crate::client::Client::builder`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// GraphQL-over-HTTP endpoint (`http` / `https`).
	pub http_endpoint: Url,
	/// GraphQL-over-WebSocket endpoint (`ws` / `wss`).
	pub ws_endpoint: Url,
	/// Request/response transport options.
	pub http: HttpOptions,
	/// Streaming transport options.
	pub ws: WsOptions,
}
impl ClientConfig {
	/// Starts an empty builder.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Reads both endpoints from [`HTTP_ENDPOINT_ENV`] and [`WS_ENDPOINT_ENV`], using
	/// default transport options.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Same as [`ClientConfig::from_env`] with a caller-supplied variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &'static str| {
			lookup(name)
				.filter(|value| !value.trim().is_empty())
				.ok_or(ConfigError::MissingEnv { name })
		};
		let http = read(HTTP_ENDPOINT_ENV)?;
		let ws = read(WS_ENDPOINT_ENV)?;

		Self::builder().http_endpoint_str(&http)?.ws_endpoint_str(&ws)?.build()
	}
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
	/// Request/response endpoint.
	pub http_endpoint: Option<Url>,
	/// Subscription endpoint.
	pub ws_endpoint: Option<Url>,
	/// Request/response transport options.
	pub http: HttpOptions,
	/// Streaming transport options.
	pub ws: WsOptions,
}
impl ClientConfigBuilder {
	/// Sets the request/response endpoint.
	pub fn http_endpoint(mut self, url: Url) -> Self {
		self.http_endpoint = Some(url);

		self
	}

	/// Parses and sets the request/response endpoint.
	pub fn http_endpoint_str(self, url: &str) -> Result<Self, ConfigError> {
		Ok(self.http_endpoint(parse_endpoint("http", url)?))
	}

	/// Sets the subscription endpoint.
	pub fn ws_endpoint(mut self, url: Url) -> Self {
		self.ws_endpoint = Some(url);

		self
	}

	/// Parses and sets the subscription endpoint.
	pub fn ws_endpoint_str(self, url: &str) -> Result<Self, ConfigError> {
		Ok(self.ws_endpoint(parse_endpoint("websocket", url)?))
	}

	/// Overrides the request/response transport options.
	pub fn http_options(mut self, options: HttpOptions) -> Self {
		self.http = options;

		self
	}

	/// Overrides the streaming transport options.
	pub fn ws_options(mut self, options: WsOptions) -> Self {
		self.ws = options;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let http_endpoint =
			self.http_endpoint.ok_or(ConfigError::MissingEndpoint { endpoint: "http" })?;
		let ws_endpoint =
			self.ws_endpoint.ok_or(ConfigError::MissingEndpoint { endpoint: "websocket" })?;
		let config = ClientConfig { http_endpoint, ws_endpoint, http: self.http, ws: self.ws };

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		validate_scheme("http", &self.http_endpoint, &["http", "https"])?;
		validate_scheme("websocket", &self.ws_endpoint, &["ws", "wss"])?;

		if self.ws.ack_timeout.is_zero() {
			return Err(ConfigError::InvalidOption {
				name: "ack_timeout",
				reason: "the connection_ack timeout must be positive".into(),
			});
		}
		if self.ws.backoff.min.is_zero() {
			return Err(ConfigError::InvalidOption {
				name: "backoff.min",
				reason: "the minimum reconnect delay must be positive".into(),
			});
		}
		if self.ws.backoff.min > self.ws.backoff.max {
			return Err(ConfigError::InvalidOption {
				name: "backoff.max",
				reason: "the maximum reconnect delay must not be below the minimum".into(),
			});
		}
		if self.ws.backoff.factor.is_nan() || self.ws.backoff.factor < 1.0 {
			return Err(ConfigError::InvalidOption {
				name: "backoff.factor",
				reason: "the backoff factor must be at least 1.0".into(),
			});
		}

		Ok(())
	}
}

fn parse_endpoint(endpoint: &'static str, url: &str) -> Result<Url, ConfigError> {
	Url::parse(url.trim())
		.map_err(|e| ConfigError::InvalidEndpoint { endpoint, reason: e.to_string() })
}

fn validate_scheme(endpoint: &'static str, url: &Url, allowed: &[&str]) -> Result<(), ConfigError> {
	if allowed.contains(&url.scheme()) {
		Ok(())
	} else {
		Err(ConfigError::InvalidEndpoint {
			endpoint,
			reason: format!("scheme `{}` is not one of {}", url.scheme(), allowed.join("/")),
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::time::Duration;
	// self
	use super::*;
	use crate::ws::Backoff;

	fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
		move |name| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| (*v).to_owned())
	}

	#[test]
	fn builder_requires_both_endpoints() {
		let err = ClientConfig::builder()
			.http_endpoint_str("https://api.example.com/graphql")
			.expect("HTTP endpoint should parse.")
			.build()
			.expect_err("Missing websocket endpoint must be rejected.");

		assert!(matches!(err, ConfigError::MissingEndpoint { endpoint: "websocket" }));
	}

	#[test]
	fn schemes_are_checked_per_transport() {
		let swapped = ClientConfig::builder()
			.http_endpoint_str("wss://api.example.com/graphql")
			.and_then(|b| b.ws_endpoint_str("https://api.example.com/graphql"))
			.expect("Both URLs should parse.")
			.build()
			.expect_err("Swapped schemes must be rejected.");

		assert!(matches!(swapped, ConfigError::InvalidEndpoint { endpoint: "http", .. }));

		let config = ClientConfig::builder()
			.http_endpoint_str("http://localhost:4000/graphql")
			.and_then(|b| b.ws_endpoint_str("ws://localhost:4000/graphql"))
			.expect("Both URLs should parse.")
			.build()
			.expect("Plain local endpoints should be accepted.");

		assert_eq!(config.ws.ack_timeout, Duration::from_secs(10));
		assert!(config.ws.reconnect);
	}

	#[test]
	fn degenerate_ws_options_are_rejected() {
		let err = ClientConfig::builder()
			.http_endpoint_str("http://localhost/graphql")
			.and_then(|b| b.ws_endpoint_str("ws://localhost/graphql"))
			.expect("Both URLs should parse.")
			.ws_options(WsOptions { ack_timeout: Duration::ZERO, ..Default::default() })
			.build()
			.expect_err("A zero ack timeout must be rejected.");

		assert!(matches!(err, ConfigError::InvalidOption { name: "ack_timeout", .. }));
	}

	#[test]
	fn backoff_bounds_are_validated() {
		let build = |backoff: Backoff| {
			ClientConfig::builder()
				.http_endpoint_str("http://localhost/graphql")
				.and_then(|b| b.ws_endpoint_str("ws://localhost/graphql"))
				.expect("Both URLs should parse.")
				.ws_options(WsOptions { backoff, ..Default::default() })
				.build()
		};
		let zero_min = build(Backoff { min: Duration::ZERO, ..Default::default() })
			.expect_err("A zero minimum delay must be rejected.");

		assert!(matches!(zero_min, ConfigError::InvalidOption { name: "backoff.min", .. }));

		let inverted = build(Backoff {
			min: Duration::from_secs(60),
			max: Duration::from_secs(1),
			..Default::default()
		})
		.expect_err("A maximum below the minimum must be rejected.");

		assert!(matches!(inverted, ConfigError::InvalidOption { name: "backoff.max", .. }));

		let slow_factor = build(Backoff { factor: 0.5, ..Default::default() })
			.expect_err("A shrinking schedule must be rejected.");

		assert!(matches!(slow_factor, ConfigError::InvalidOption { name: "backoff.factor", .. }));
		assert!(build(Backoff::default()).is_ok());
	}

	#[test]
	fn env_lookup_reads_both_variables() {
		let vars = [
			(HTTP_ENDPOINT_ENV, "https://api.example.com/graphql"),
			(WS_ENDPOINT_ENV, "wss://api.example.com/graphql"),
		];
		let config = ClientConfig::from_lookup(lookup(&vars)).expect("Env config should load.");

		assert_eq!(config.http_endpoint.as_str(), "https://api.example.com/graphql");
		assert_eq!(config.ws_endpoint.as_str(), "wss://api.example.com/graphql");
	}

	#[test]
	fn env_lookup_reports_missing_and_invalid_values() {
		let missing = ClientConfig::from_lookup(lookup(&[(HTTP_ENDPOINT_ENV, "https://a/graphql")]))
			.expect_err("Missing subscription endpoint must be reported.");

		assert!(matches!(missing, ConfigError::MissingEnv { name: WS_ENDPOINT_ENV }));

		let blank = ClientConfig::from_lookup(lookup(&[(HTTP_ENDPOINT_ENV, "  ")]))
			.expect_err("Blank values count as missing.");

		assert!(matches!(blank, ConfigError::MissingEnv { name: HTTP_ENDPOINT_ENV }));

		let invalid = ClientConfig::from_lookup(lookup(&[
			(HTTP_ENDPOINT_ENV, "not a url"),
			(WS_ENDPOINT_ENV, "wss://a/graphql"),
		]))
		.expect_err("Unparseable endpoint must be reported.");

		assert!(matches!(invalid, ConfigError::InvalidEndpoint { endpoint: "http", .. }));
	}
}
