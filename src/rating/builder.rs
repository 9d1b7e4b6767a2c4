//! Pure mapping from [`RateQuoteRequest`] into the carrier's nested rate-request schema.

// self
use crate::{
	_prelude::*,
	config::{CarrierConfig, UnitCodes},
	rating::request::{
		DEFAULT_DESTINATION_COUNTRY, DEFAULT_ORIGIN_COUNTRY, Location, RateQuoteRequest,
		RequestMode,
	},
};

/// Packaging type code for customer-supplied packaging.
pub const CUSTOMER_SUPPLIED_PACKAGING: &str = "02";

const CUSTOMER_CONTEXT: &str = "Rating and Service";

/// Carrier wire payload for a rate request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarrierPayload {
	/// Request envelope.
	pub rate_request: RateRequestBody,
}
impl CarrierPayload {
	/// Rating mode encoded in the payload; selects the endpoint.
	pub fn mode(&self) -> RequestMode {
		self.rate_request.request.request_option
	}
}

/// Body of [`CarrierPayload`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RateRequestBody {
	/// Request options.
	pub request: RequestHeader,
	/// Shipment description.
	pub shipment: Shipment,
}

/// Request-level options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestHeader {
	/// `shop` or `rate`.
	pub request_option: RequestMode,
	/// Free-form context echoed back by the carrier.
	pub transaction_reference: TransactionReference,
}

/// Context echoed back by the carrier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionReference {
	/// Caller-chosen context string.
	pub customer_context: String,
}

/// Shipment section of the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Shipment {
	/// Shipper party.
	pub shipper: Shipper,
	/// Recipient party.
	pub ship_to: Party,
	/// Package description.
	pub package: Package,
	/// Requested service; present only in `rate` mode.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub service: Option<ServiceCode>,
}

/// Shipper party, which also carries the account number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Shipper {
	/// Display name.
	pub name: String,
	/// Shipper account number.
	pub shipper_number: String,
	/// Address.
	pub address: Address,
}

/// Non-shipper party.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Party {
	/// Display name.
	pub name: String,
	/// Address.
	pub address: Address,
}

/// Wire address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
	/// Free-text address lines.
	pub address_line: Vec<String>,
	/// Postal code; empty when unknown.
	pub postal_code: String,
	/// ISO-3166 alpha-2 country code.
	pub country_code: String,
}

/// Package section of the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
	/// Packaging type.
	pub packaging_type: CodeDescription,
	/// Package dimensions.
	pub dimensions: PackageDimensions,
	/// Package weight.
	pub package_weight: PackageWeight,
}

/// Code + description pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeDescription {
	/// Code.
	pub code: String,
	/// Human-readable description.
	pub description: String,
}

/// Code-only wrapper used for units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnitOfMeasurement {
	/// Unit code.
	pub code: String,
}

/// Service selector attached in `rate` mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceCode {
	/// Carrier service code.
	pub code: String,
}

/// Package dimensions serialized as strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageDimensions {
	/// Dimension unit.
	pub unit_of_measurement: UnitOfMeasurement,
	/// Length.
	pub length: String,
	/// Width.
	pub width: String,
	/// Height.
	pub height: String,
}

/// Package weight serialized as a string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageWeight {
	/// Weight unit.
	pub unit_of_measurement: UnitOfMeasurement,
	/// Weight.
	pub weight: String,
}

/// Deterministic translator from quote requests to [`CarrierPayload`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateRequestBuilder {
	/// Shipper account number.
	pub account_number: String,
	/// Shipper display name.
	pub shipper_name: String,
	/// Recipient display name.
	pub recipient_name: String,
	/// Unit-of-measurement codes.
	pub units: UnitCodes,
}
impl RateRequestBuilder {
	/// Captures the payload-relevant settings from `config`.
	pub fn from_config(config: &CarrierConfig) -> Self {
		Self {
			account_number: config.account_number.clone(),
			shipper_name: config.shipper_name.clone(),
			recipient_name: config.recipient_name.clone(),
			units: config.units.clone(),
		}
	}

	/// Maps `request` into the carrier schema.
	pub fn build(&self, request: &RateQuoteRequest) -> CarrierPayload {
		let service = match (request.mode, request.service_code.as_deref().map(str::trim)) {
			(RequestMode::Rate, Some(code)) if !code.is_empty() =>
				Some(ServiceCode { code: code.to_owned() }),
			_ => None,
		};
		let dimensions = &request.dimensions;

		CarrierPayload {
			rate_request: RateRequestBody {
				request: RequestHeader {
					request_option: request.mode,
					transaction_reference: TransactionReference {
						customer_context: CUSTOMER_CONTEXT.into(),
					},
				},
				shipment: Shipment {
					shipper: Shipper {
						name: self.shipper_name.clone(),
						shipper_number: self.account_number.clone(),
						address: address(&request.origin, DEFAULT_ORIGIN_COUNTRY),
					},
					ship_to: Party {
						name: self.recipient_name.clone(),
						address: address(&request.destination, DEFAULT_DESTINATION_COUNTRY),
					},
					package: Package {
						packaging_type: CodeDescription {
							code: CUSTOMER_SUPPLIED_PACKAGING.into(),
							description: "Customer Supplied".into(),
						},
						dimensions: PackageDimensions {
							unit_of_measurement: UnitOfMeasurement {
								code: self.units.dimension.clone(),
							},
							length: measure(dimensions.length),
							width: measure(dimensions.width),
							height: measure(dimensions.height),
						},
						package_weight: PackageWeight {
							unit_of_measurement: UnitOfMeasurement {
								code: self.units.weight.clone(),
							},
							weight: measure(request.weight),
						},
					},
					service,
				},
			},
		}
	}
}

fn address(location: &Location, default_country: &str) -> Address {
	let country_code = location
		.country_code
		.as_deref()
		.map(str::trim)
		.filter(|code| !code.is_empty())
		.unwrap_or(default_country);

	Address {
		address_line: vec![location.address.clone()],
		postal_code: location.postal_code.clone().unwrap_or_default(),
		country_code: country_code.to_owned(),
	}
}

// Shortest decimal that round-trips; whole numbers render without a fraction.
fn measure(value: f64) -> String {
	value.to_string()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::{Value, json};
	// self
	use super::*;
	use crate::rating::request::Dimensions;

	fn builder() -> RateRequestBuilder {
		RateRequestBuilder {
			account_number: "A1B2C3".into(),
			shipper_name: "Shipper".into(),
			recipient_name: "Recipient".into(),
			units: UnitCodes::default(),
		}
	}

	fn shop_request() -> RateQuoteRequest {
		RateQuoteRequest::shop(
			Location::new("Calle 100 #15-20, Bogota"),
			Location::new("1 Biscayne Blvd, Miami"),
			Dimensions::new(10.0, 10.0, 10.0),
			2.5,
		)
	}

	fn to_value(payload: &CarrierPayload) -> Value {
		serde_json::to_value(payload).expect("Payload should serialize.")
	}

	#[test]
	fn shop_payload_matches_carrier_schema() {
		let payload = builder().build(&shop_request());

		assert_eq!(payload.mode(), RequestMode::Shop);
		assert_eq!(
			to_value(&payload),
			json!({
				"RateRequest": {
					"Request": {
						"RequestOption": "shop",
						"TransactionReference": { "CustomerContext": "Rating and Service" }
					},
					"Shipment": {
						"Shipper": {
							"Name": "Shipper",
							"ShipperNumber": "A1B2C3",
							"Address": {
								"AddressLine": ["Calle 100 #15-20, Bogota"],
								"PostalCode": "",
								"CountryCode": "CO"
							}
						},
						"ShipTo": {
							"Name": "Recipient",
							"Address": {
								"AddressLine": ["1 Biscayne Blvd, Miami"],
								"PostalCode": "",
								"CountryCode": "US"
							}
						},
						"Package": {
							"PackagingType": { "Code": "02", "Description": "Customer Supplied" },
							"Dimensions": {
								"UnitOfMeasurement": { "Code": "CM" },
								"Length": "10",
								"Width": "10",
								"Height": "10"
							},
							"PackageWeight": {
								"UnitOfMeasurement": { "Code": "KGS" },
								"Weight": "2.5"
							}
						}
					}
				}
			})
		);
	}

	#[test]
	fn measurements_round_trip_as_numeric_strings() {
		for (length, width, height, weight) in
			[(10.0, 10.0, 10.0, 2.5), (0.1, 499.99, 33.333, 999.9), (1e-3, 12.0, 7.25, 0.5)]
		{
			let mut request = shop_request();

			request.dimensions = Dimensions::new(length, width, height);
			request.weight = weight;

			let package = builder().build(&request).rate_request.shipment.package;
			let parse = |value: &str| value.parse::<f64>().expect("Measure should be numeric.");

			assert_eq!(parse(&package.dimensions.length), length);
			assert_eq!(parse(&package.dimensions.width), width);
			assert_eq!(parse(&package.dimensions.height), height);
			assert_eq!(parse(&package.package_weight.weight), weight);
		}
	}

	#[test]
	fn explicit_locations_override_defaults() {
		let mut request = shop_request();

		request.origin = Location::new("Toronto").with_postal_code("M5V 2T6").with_country_code("CA");
		request.destination = Location::new("Madrid").with_country_code("  ");

		let shipment = builder().build(&request).rate_request.shipment;

		assert_eq!(shipment.shipper.address.country_code, "CA");
		assert_eq!(shipment.shipper.address.postal_code, "M5V 2T6");
		assert_eq!(shipment.ship_to.address.country_code, "US");
	}

	#[test]
	fn service_block_only_in_rate_mode() {
		let mut request = shop_request();

		request.service_code = Some("03".into());

		assert!(to_value(&builder().build(&request))["RateRequest"]["Shipment"].get("Service").is_none());

		request.mode = RequestMode::Rate;

		let value = to_value(&builder().build(&request));

		assert_eq!(value["RateRequest"]["Request"]["RequestOption"], "rate");
		assert_eq!(value["RateRequest"]["Shipment"]["Service"], json!({ "Code": "03" }));

		request.service_code = None;

		assert!(to_value(&builder().build(&request))["RateRequest"]["Shipment"].get("Service").is_none());
	}

	#[test]
	fn configured_units_are_used() {
		let mut builder = builder();

		builder.units = UnitCodes { dimension: "IN".into(), weight: "LBS".into() };

		let package = builder.build(&shop_request()).rate_request.shipment.package;

		assert_eq!(package.dimensions.unit_of_measurement.code, "IN");
		assert_eq!(package.package_weight.unit_of_measurement.code, "LBS");
	}
}
