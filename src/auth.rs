//! Credential and token models for the carrier's OAuth exchange.

pub mod credentials;
pub mod token;

pub use credentials::*;
pub use token::{access::*, secret::*};
