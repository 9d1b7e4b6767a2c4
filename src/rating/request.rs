//! Validated rate-quote request model.

// self
use crate::_prelude::*;

/// Country code applied when the origin omits one.
pub const DEFAULT_ORIGIN_COUNTRY: &str = "CO";
/// Country code applied when the destination omits one.
pub const DEFAULT_DESTINATION_COUNTRY: &str = "US";

/// Rating mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
	#[default]
	/// Compare every available service.
	Shop,
	/// Price one named service.
	Rate,
}
impl RequestMode {
	/// Returns the wire label, which is also the endpoint's final path segment.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Shop => "shop",
			Self::Rate => "rate",
		}
	}
}
impl Display for RequestMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for RequestMode {
	type Err = UnknownRequestMode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			value if value.eq_ignore_ascii_case("shop") => Ok(Self::Shop),
			value if value.eq_ignore_ascii_case("rate") => Ok(Self::Rate),
			value => Err(UnknownRequestMode(value.to_owned())),
		}
	}
}

/// Error returned when parsing an unsupported request mode.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Request mode `{0}` is not one of shop, rate.")]
pub struct UnknownRequestMode(pub String);

/// Free-text shipment endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
	/// Free-text address line.
	pub address: String,
	/// Postal code, if known.
	#[serde(default)]
	pub postal_code: Option<String>,
	/// ISO-3166 alpha-2 country code, if known.
	#[serde(default)]
	pub country_code: Option<String>,
}
impl Location {
	/// Creates a location with only an address line.
	pub fn new(address: impl Into<String>) -> Self {
		Self { address: address.into(), postal_code: None, country_code: None }
	}

	/// Sets the postal code.
	pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
		self.postal_code = Some(postal_code.into());

		self
	}

	/// Sets the country code.
	pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
		self.country_code = Some(country_code.into());

		self
	}
}

/// Package dimensions in the configured dimension unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
	/// Length.
	pub length: f64,
	/// Width.
	pub width: f64,
	/// Height.
	pub height: f64,
}
impl Dimensions {
	/// Creates a dimension triple.
	pub fn new(length: f64, width: f64, height: f64) -> Self {
		Self { length, width, height }
	}
}

/// Already-validated quote request handed to the rating service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateQuoteRequest {
	/// Shipment origin.
	pub origin: Location,
	/// Shipment destination.
	pub destination: Location,
	/// Package dimensions.
	pub dimensions: Dimensions,
	/// Package weight in the configured weight unit.
	pub weight: f64,
	/// Rating mode.
	#[serde(default)]
	pub mode: RequestMode,
	/// Service code; only meaningful in [`RequestMode::Rate`].
	#[serde(default)]
	pub service_code: Option<String>,
}
impl RateQuoteRequest {
	/// Builds a request comparing every available service.
	pub fn shop(origin: Location, destination: Location, dimensions: Dimensions, weight: f64) -> Self {
		Self { origin, destination, dimensions, weight, mode: RequestMode::Shop, service_code: None }
	}

	/// Builds a request pricing the service identified by `service_code`.
	pub fn rate(
		origin: Location,
		destination: Location,
		dimensions: Dimensions,
		weight: f64,
		service_code: impl Into<String>,
	) -> Self {
		Self {
			origin,
			destination,
			dimensions,
			weight,
			mode: RequestMode::Rate,
			service_code: Some(service_code.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_mode_parses_case_insensitively() {
		assert_eq!("SHOP".parse::<RequestMode>(), Ok(RequestMode::Shop));
		assert_eq!(" rate ".parse::<RequestMode>(), Ok(RequestMode::Rate));
		assert!("ship".parse::<RequestMode>().is_err());
		assert_eq!(RequestMode::default(), RequestMode::Shop);
	}

	#[test]
	fn request_deserializes_with_defaults() {
		let request: RateQuoteRequest = serde_json::from_str(
			r#"{
				"origin": { "address": "Bogota" },
				"destination": { "address": "Miami", "postal_code": "33101" },
				"dimensions": { "length": 10, "width": 10, "height": 10 },
				"weight": 2.5
			}"#,
		)
		.expect("Minimal request JSON should deserialize.");

		assert_eq!(request.mode, RequestMode::Shop);
		assert_eq!(request.service_code, None);
		assert_eq!(request.destination.postal_code.as_deref(), Some("33101"));
		assert_eq!(request.origin.country_code, None);
	}
}
