//! Prices a parcel end to end against a local mock of the carrier: the first call exchanges the
//! client credentials and caches the sealed token, the second reuses it.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use rating_broker::{
	auth::ClientCredentials,
	cipher::ChaChaTokenCipher,
	config::CarrierConfig,
	flows::ReqwestRatingService,
	rating::QuoteForm,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/security/v1/oauth/token").header_exists("x-merchant-id");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "demo-access", "expires_in": "14399" }));
		})
		.await;
	let rating_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/rating/v2403/shop");
			then.status(200)
				.header("content-type", "application/json")
				.header("transId", "demo-1")
				.json_body(json!({
					"RateResponse": {
						"RatedShipment": [
							{
								"Service": { "Code": "65", "Description": "Worldwide Saver" },
								"TotalCharges": { "CurrencyCode": "USD", "MonetaryValue": "84.20" },
								"NegotiatedRateCharges": { "TotalCharge": { "MonetaryValue": "71.57" } },
								"GuaranteedDelivery": { "BusinessDaysInTransit": "2" }
							},
							{
								"Service": { "Code": "08", "Description": "Worldwide Expedited" },
								"TotalCharges": { "CurrencyCode": "USD", "MonetaryValue": "66.05" }
							}
						]
					}
				}));
		})
		.await;
	let config = CarrierConfig::builder()
		.sandbox_base_url(Url::parse(&server.base_url())?)
		.account_number("DEMO01")
		.credentials(ClientCredentials::new("demo-client", "demo-secret"))
		.build()?;
	let store = Arc::new(MemoryStore::default());
	let service =
		ReqwestRatingService::new(config, store.clone(), Arc::new(ChaChaTokenCipher::generate()))?
			.with_lock_provider(store);
	let form: QuoteForm = serde_json::from_value(json!({
		"origin": "Calle 100 #15-20, Bogota",
		"destination": "1 Biscayne Blvd, Miami",
		"weight": 2.5,
		"height": 10,
		"width": 10,
		"length": 10
	}))?;
	let request = form.validate()?;

	for _ in 0..2 {
		let outcome = service.get_rates(&request).await;

		println!("{}", serde_json::to_string_pretty(&outcome)?);

		if let Some(failure) = outcome.failure() {
			return Err(eyre!("Rating failed: {failure}."));
		}
	}

	token_mock.assert_calls_async(1).await;
	rating_mock.assert_calls_async(2).await;

	Ok(())
}
