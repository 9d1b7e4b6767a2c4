//! Access-token value types and cache lifetime arithmetic.

pub mod access;
pub mod secret;
