//! Optional observability helpers for the token lifecycle and the rating pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `rating_broker.flow` with the `flow` and
//!   `stage` fields, plus events for cache-entry discards and pipeline failures.
//! - Enable `metrics` to increment `rating_broker_flow_total` (labeled by `flow` + `outcome`) and
//!   `rating_broker_token_cache_total` (labeled by `event`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Token lookup through the cache, lock, and refresh path.
	Token,
	/// Upstream client-credentials exchange.
	TokenRefresh,
	/// End-to-end rating call.
	Rating,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Token => "token",
			FlowKind::TokenRefresh => "token_refresh",
			FlowKind::Rating => "rating",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token cache lookups as seen by the token manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// A sealed entry decrypted successfully.
	Hit,
	/// No entry was stored.
	Miss,
	/// An entry failed to decrypt and was removed.
	Discarded,
	/// An entry decrypted to a token past its expiry and was removed.
	Expired,
}
impl CacheEvent {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Miss => "miss",
			CacheEvent::Discarded => "discarded",
			CacheEvent::Expired => "expired",
		}
	}
}
impl Display for CacheEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
