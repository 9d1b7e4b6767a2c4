//! Tolerant conversion of carrier rate responses into [`RatedService`] rows.
//!
//! The carrier's schema varies between accounts and API versions: the rated-shipment list may
//! be absent, empty, or collapsed into a single object, and scalar leaves may arrive as strings
//! or numbers. Every lookup here is optional; a missing leaf takes its per-field default and
//! never fails the conversion.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, rating::outcome::RatedService};

/// Service name used when the carrier omits a description.
pub const UNKNOWN_SERVICE: &str = "N/A";
/// Currency assumed when the carrier omits one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Parsed body of a successful rating call.
#[derive(Clone, Debug, PartialEq)]
pub struct CarrierResponse {
	/// Response document; [`Value::Null`] for an empty body.
	pub body: Value,
	/// Transaction id read from the response headers.
	pub transaction_id: Option<String>,
}
impl CarrierResponse {
	/// Wraps a response document without a transaction id.
	pub fn new(body: Value) -> Self {
		Self { body, transaction_id: None }
	}
}

/// Stateless mapper from [`CarrierResponse`] to [`RatedService`] rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseNormalizer;
impl ResponseNormalizer {
	/// Extracts one [`RatedService`] per rated shipment, preserving carrier order.
	pub fn normalize(&self, response: &CarrierResponse) -> Vec<RatedService> {
		match response.body.pointer("/RateResponse/RatedShipment") {
			Some(Value::Array(shipments)) => shipments.iter().map(rated_service).collect(),
			Some(shipment @ Value::Object(_)) => vec![rated_service(shipment)],
			_ => Vec::new(),
		}
	}
}

fn rated_service(shipment: &Value) -> RatedService {
	RatedService {
		service: text(shipment, "/Service/Description").unwrap_or_else(|| UNKNOWN_SERVICE.into()),
		code: text(shipment, "/Service/Code"),
		published: text(shipment, "/TotalCharges/MonetaryValue"),
		negotiated: text(shipment, "/NegotiatedRateCharges/TotalCharge/MonetaryValue"),
		currency: text(shipment, "/TotalCharges/CurrencyCode")
			.unwrap_or_else(|| DEFAULT_CURRENCY.into()),
		eta: days(shipment, "/GuaranteedDelivery/BusinessDaysInTransit"),
	}
}

// Strings and numbers both render as text; blanks count as absent.
fn text(value: &Value, pointer: &str) -> Option<String> {
	match value.pointer(pointer)? {
		Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(ToOwned::to_owned),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn days(value: &Value, pointer: &str) -> Option<u32> {
	match value.pointer(pointer)? {
		Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}
