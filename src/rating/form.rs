//! Intake validation turning raw inbound fields into a [`RateQuoteRequest`].
//!
//! Every rule is checked and every violation collected, so a caller can report all problems in
//! one round trip. Text values are trimmed and blank values count as absent. Numeric fields
//! accept JSON numbers or numeric strings.

// crates.io
use serde::Deserializer;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	rating::request::{Dimensions, Location, RateQuoteRequest, RequestMode},
};

const LOCATION_CHARS: (usize, usize) = (2, 80);
const POSTAL_MAX_CHARS: usize = 16;
const SERVICE_CODE_CHARS: (usize, usize) = (1, 3);
const WEIGHT_LIMIT: f64 = 1000.;
const DIMENSION_LIMIT: f64 = 500.;

/// Raw quote fields as submitted by an inbound collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteForm {
	/// Origin address line.
	#[serde(default, deserialize_with = "lenient_text")]
	pub origin: Option<String>,
	/// Destination address line.
	#[serde(default, deserialize_with = "lenient_text")]
	pub destination: Option<String>,
	/// Package weight.
	#[serde(default, deserialize_with = "lenient_text")]
	pub weight: Option<String>,
	/// Package height.
	#[serde(default, deserialize_with = "lenient_text")]
	pub height: Option<String>,
	/// Package width.
	#[serde(default, deserialize_with = "lenient_text")]
	pub width: Option<String>,
	/// Package length.
	#[serde(default, deserialize_with = "lenient_text")]
	pub length: Option<String>,
	/// Origin postal code.
	#[serde(default, deserialize_with = "lenient_text")]
	pub origin_postal: Option<String>,
	/// Origin country code.
	#[serde(default, deserialize_with = "lenient_text")]
	pub origin_country: Option<String>,
	/// Destination postal code.
	#[serde(default, deserialize_with = "lenient_text")]
	pub destination_postal: Option<String>,
	/// Destination country code.
	#[serde(default, deserialize_with = "lenient_text")]
	pub destination_country: Option<String>,
	/// `shop` or `rate`; defaults to `shop`.
	#[serde(default, deserialize_with = "lenient_text")]
	pub request_option: Option<String>,
	/// Service code; required in `rate` mode.
	#[serde(default, deserialize_with = "lenient_text")]
	pub service_code: Option<String>,
}
impl QuoteForm {
	/// Checks every rule and builds the request, or reports all violations.
	pub fn validate(&self) -> Result<RateQuoteRequest, ValidationError> {
		let mut check = Checker::default();
		let origin = check.location("origin", &self.origin);
		let destination = check.location("destination", &self.destination);
		let weight = check.measure("weight", &self.weight, WEIGHT_LIMIT);
		let height = check.measure("height", &self.height, DIMENSION_LIMIT);
		let width = check.measure("width", &self.width, DIMENSION_LIMIT);
		let length = check.measure("length", &self.length, DIMENSION_LIMIT);
		let origin_postal = check.postal("origin_postal", &self.origin_postal);
		let origin_country = check.country("origin_country", &self.origin_country);
		let destination_postal = check.postal("destination_postal", &self.destination_postal);
		let destination_country = check.country("destination_country", &self.destination_country);
		let mode = match present(&self.request_option) {
			None => Some(RequestMode::Shop),
			Some(raw) => match raw.parse::<RequestMode>() {
				Ok(mode) => Some(mode),
				Err(_) => {
					check.fail("request_option", "must be one of shop, rate");

					None
				},
			},
		};
		let service_code = present(&self.service_code);

		match service_code {
			None if mode == Some(RequestMode::Rate) =>
				check.fail("service_code", "is required when request_option is rate"),
			Some(code) => check.length("service_code", code, SERVICE_CODE_CHARS),
			None => (),
		}

		if !check.violations.is_empty() {
			return Err(ValidationError { violations: check.violations });
		}

		match (origin, destination, weight, height, width, length, mode) {
			(
				Some(origin),
				Some(destination),
				Some(weight),
				Some(height),
				Some(width),
				Some(length),
				Some(mode),
			) => Ok(RateQuoteRequest {
				origin: Location {
					address: origin,
					postal_code: origin_postal,
					country_code: origin_country,
				},
				destination: Location {
					address: destination,
					postal_code: destination_postal,
					country_code: destination_country,
				},
				dimensions: Dimensions::new(length, width, height),
				weight,
				mode,
				service_code: service_code.map(ToOwned::to_owned),
			}),
			_ => Err(ValidationError {
				violations: vec![FieldViolation::new("form", "is incomplete")],
			}),
		}
	}
}

/// Single rule violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
	/// Offending field.
	pub field: String,
	/// Rule description.
	pub message: String,
}
impl FieldViolation {
	fn new(field: &str, message: impl Into<String>) -> Self {
		Self { field: field.into(), message: message.into() }
	}
}
impl Display for FieldViolation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} {}", self.field, self.message)
	}
}

/// Every violation found in a [`QuoteForm`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Quote request is invalid: {}.", render(.violations))]
pub struct ValidationError {
	/// Violations in field order.
	pub violations: Vec<FieldViolation>,
}
impl ValidationError {
	/// Returns `true` when `field` has at least one violation.
	pub fn has_violation(&self, field: &str) -> bool {
		self.violations.iter().any(|violation| violation.field == field)
	}
}

#[derive(Default)]
struct Checker {
	violations: Vec<FieldViolation>,
}
impl Checker {
	fn fail(&mut self, field: &str, message: impl Into<String>) {
		self.violations.push(FieldViolation::new(field, message));
	}

	fn length(&mut self, field: &str, value: &str, (min, max): (usize, usize)) {
		let chars = value.chars().count();

		if chars < min || chars > max {
			self.fail(field, format!("must be between {min} and {max} characters"));
		}
	}

	fn location(&mut self, field: &str, value: &Option<String>) -> Option<String> {
		let Some(value) = present(value) else {
			self.fail(field, "is required");

			return None;
		};
		let before = self.violations.len();

		self.length(field, value, LOCATION_CHARS);

		(self.violations.len() == before).then(|| value.to_owned())
	}

	fn measure(&mut self, field: &str, value: &Option<String>, limit: f64) -> Option<f64> {
		let Some(raw) = present(value) else {
			self.fail(field, "is required");

			return None;
		};

		match raw.parse::<f64>() {
			Ok(number) if number.is_finite() && number > 0. && number < limit => Some(number),
			Ok(number) if number.is_finite() => {
				self.fail(field, format!("must be greater than 0 and less than {limit}"));

				None
			},
			_ => {
				self.fail(field, "must be a number");

				None
			},
		}
	}

	fn postal(&mut self, field: &str, value: &Option<String>) -> Option<String> {
		let value = present(value)?;

		if value.chars().count() > POSTAL_MAX_CHARS {
			self.fail(field, format!("must be at most {POSTAL_MAX_CHARS} characters"));

			return None;
		}

		Some(value.to_owned())
	}

	fn country(&mut self, field: &str, value: &Option<String>) -> Option<String> {
		let value = present(value)?;

		if value.len() != 2 || !value.bytes().all(|b| b.is_ascii_alphabetic()) {
			self.fail(field, "must be a 2-letter country code");

			return None;
		}

		Some(value.to_ascii_uppercase())
	}
}

fn present(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn render(violations: &[FieldViolation]) -> String {
	violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Option::<Value>::deserialize(deserializer)? {
		Some(Value::String(text)) => Some(text),
		Some(Value::Number(number)) => Some(number.to_string()),
		_ => None,
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn form() -> QuoteForm {
		serde_json::from_value(json!({
			"origin": "Calle 100 #15-20, Bogota",
			"destination": "1 Biscayne Blvd, Miami",
			"weight": 2.5,
			"height": "10",
			"width": 10,
			"length": 10,
			"origin_country": "co",
			"destination_postal": " 33131 "
		}))
		.expect("Fixture form should deserialize.")
	}

	#[test]
	fn valid_form_builds_shop_request() {
		let request = form().validate().expect("Fixture form should validate.");

		assert_eq!(request.mode, RequestMode::Shop);
		assert_eq!(request.weight, 2.5);
		assert_eq!(request.dimensions, Dimensions::new(10., 10., 10.));
		assert_eq!(request.origin.country_code.as_deref(), Some("CO"));
		assert_eq!(request.destination.postal_code.as_deref(), Some("33131"));
		assert_eq!(request.destination.country_code, None);
		assert_eq!(request.service_code, None);
	}

	#[test]
	fn rate_mode_without_service_code_is_rejected() {
		let mut form = form();

		form.request_option = Some("rate".into());

		let err = form.validate().expect_err("Rate mode requires a service code.");

		assert_eq!(
			err.violations,
			vec![FieldViolation::new("service_code", "is required when request_option is rate")]
		);

		form.service_code = Some("03".into());

		let request = form.validate().expect("Rate mode with a service code should validate.");

		assert_eq!(request.mode, RequestMode::Rate);
		assert_eq!(request.service_code.as_deref(), Some("03"));
	}

	#[test]
	fn every_violation_is_reported() {
		let form = QuoteForm {
			origin: Some("B".into()),
			destination: Some("  ".into()),
			weight: Some("1000".into()),
			height: Some("0".into()),
			width: Some("wide".into()),
			length: Some("499.9".into()),
			origin_postal: Some("12345678901234567".into()),
			origin_country: Some("COL".into()),
			destination_postal: None,
			destination_country: Some("u1".into()),
			request_option: Some("ship".into()),
			service_code: Some("0001".into()),
		};
		let err = form.validate().expect_err("Invalid form should be rejected.");

		for field in [
			"origin",
			"destination",
			"weight",
			"height",
			"width",
			"origin_postal",
			"origin_country",
			"destination_country",
			"request_option",
			"service_code",
		] {
			assert!(err.has_violation(field), "Expected a violation for `{field}`.");
		}

		assert!(!err.has_violation("length"));
		assert!(err.to_string().starts_with("Quote request is invalid: origin must be between 2 and 80"));
	}

	#[test]
	fn unicode_lengths_count_characters() {
		let mut form = form();

		form.origin = Some("ñ".repeat(80));

		assert!(form.validate().is_ok());

		form.origin = Some("ñ".repeat(81));

		assert!(form.validate().expect_err("81 characters exceed the limit.").has_violation("origin"));
	}
}
