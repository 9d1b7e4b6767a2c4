//! Uniform result shape handed back to collaborators.

// crates.io
use serde::ser::{SerializeStruct, Serializer};
// self
use crate::{_prelude::*, error::FailureKind};

/// One priced carrier service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedService {
	/// Service display name; `N/A` when the carrier omits it.
	pub service: String,
	/// Carrier service code, when present.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	/// Published (list) total charge.
	pub published: Option<String>,
	/// Negotiated total charge; not every account receives one.
	pub negotiated: Option<String>,
	/// ISO-4217 currency code; `USD` when the carrier omits it.
	pub currency: String,
	/// Guaranteed transit time in business days.
	pub eta: Option<u32>,
}

/// Structured failure produced at the rating boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatingFailure {
	/// Error classification.
	pub kind: FailureKind,
	/// Human-readable detail including the underlying causes.
	pub message: String,
	/// Carrier transaction id usable for support escalation.
	pub correlation_id: Option<String>,
}
impl From<&Error> for RatingFailure {
	fn from(e: &Error) -> Self {
		Self {
			kind: e.kind(),
			message: error_chain(e),
			correlation_id: e.correlation_id().map(ToOwned::to_owned),
		}
	}
}
impl From<Error> for RatingFailure {
	fn from(e: Error) -> Self {
		Self::from(&e)
	}
}
impl Display for RatingFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.kind, self.message)?;

		if let Some(id) = &self.correlation_id {
			write!(f, " (correlation id {id})")?;
		}

		Ok(())
	}
}

/// Tagged result of [`RatingService::get_rates`](crate::flows::RatingService::get_rates).
///
/// There is no partial success: either every normalized rate or a single failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RatingOutcome {
	/// Normalized rates in carrier order.
	Success(Vec<RatedService>),
	/// Pipeline failure.
	Failure(RatingFailure),
}
impl RatingOutcome {
	/// Returns `true` for [`RatingOutcome::Success`].
	pub fn is_ok(&self) -> bool {
		matches!(self, Self::Success(_))
	}

	/// Rates carried by a successful outcome.
	pub fn rates(&self) -> Option<&[RatedService]> {
		match self {
			Self::Success(rates) => Some(rates),
			Self::Failure(_) => None,
		}
	}

	/// Failure carried by an unsuccessful outcome.
	pub fn failure(&self) -> Option<&RatingFailure> {
		match self {
			Self::Success(_) => None,
			Self::Failure(failure) => Some(failure),
		}
	}

	/// Converts into a standard [`std::result::Result`].
	pub fn into_result(self) -> std::result::Result<Vec<RatedService>, RatingFailure> {
		match self {
			Self::Success(rates) => Ok(rates),
			Self::Failure(failure) => Err(failure),
		}
	}
}
impl From<Result<Vec<RatedService>>> for RatingOutcome {
	fn from(result: Result<Vec<RatedService>>) -> Self {
		match result {
			Ok(rates) => Self::Success(rates),
			Err(e) => Self::Failure(e.into()),
		}
	}
}
impl Serialize for RatingOutcome {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Self::Success(rates) => {
				let mut state = serializer.serialize_struct("RatingOutcome", 2)?;

				state.serialize_field("ok", &true)?;
				state.serialize_field("rates", rates)?;
				state.end()
			},
			Self::Failure(failure) => {
				let mut state = serializer.serialize_struct("RatingOutcome", 4)?;

				state.serialize_field("ok", &false)?;
				state.serialize_field("kind", &failure.kind)?;
				state.serialize_field("error", &failure.message)?;
				state.serialize_field("corr_id", &failure.correlation_id)?;
				state.end()
			},
		}
	}
}

fn error_chain(e: &Error) -> String {
	let mut parts = vec![e.to_string()];
	let mut source = StdError::source(e);

	while let Some(cause) = source {
		let rendered = cause.to_string();

		if parts.last() != Some(&rendered) {
			parts.push(rendered);
		}

		source = cause.source();
	}

	parts.join(": ")
}
