//! Rate-quote request shaping, the rating call, and response normalization.
//!
//! `request` holds the validated quote model, `form` the inbound validation that produces it,
//! `builder` the pure mapping into the carrier's nested wire schema, `client` the
//! bearer-authenticated rating call, `normalize` the tolerant flattening of the carrier response,
//! and `outcome` the uniform success/failure result handed back to collaborators.

pub mod builder;
pub mod client;
pub mod form;
pub mod normalize;
pub mod outcome;
pub mod request;

pub use builder::*;
pub use client::*;
pub use form::*;
pub use normalize::*;
pub use outcome::*;
pub use request::*;
