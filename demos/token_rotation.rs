//! Demonstrates the assembled client against a mock GraphQL endpoint: stored credentials
//! are attached to the request, `__typename` is stripped from variables, and rotated tokens
//! returned in the response headers land back in the store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use graphql_token_link::{
	auth::CredentialPair,
	client::Client,
	config::ClientConfig,
	operation::Operation,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/graphql")
				.header("x-token", "demo-access")
				.json_body(json!({
					"query": "mutation Rename($input: RenameInput!) { rename(input: $input) { id } }",
					"variables": { "input": { "id": "1", "name": "renamed" } }
				}));
			then.status(200)
				.header("content-type", "application/json")
				.header("x-token", "demo-access-rotated")
				.json_body(json!({ "data": { "rename": { "id": "1" } } }));
		})
		.await;
	let store = MemoryStore::with_entries([("x-token", "demo-access")]);
	let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());
	let config = ClientConfig::builder()
		.http_endpoint_str(&server.url("/graphql"))?
		.ws_endpoint_str("ws://127.0.0.1:9/graphql")?
		.build()?;
	let client = Client::builder(config).store(shared).build().await?;
	let data = client
		.mutate(
			Operation::new(
				"mutation Rename($input: RenameInput!) { rename(input: $input) { id } }",
			)
			.variables(json!({
				"input": { "__typename": "RenameInput", "id": "1", "name": "renamed" }
			})),
		)
		.await?
		.into_data()?;

	mock.assert_async().await;

	println!("Mutation data: {data}.");
	println!(
		"Stored token rotated: {}.",
		CredentialPair::load(&store).await?.token.is_some_and(|t| t.expose() != "demo-access")
	);

	Ok(())
}
