//! Orchestration of the token lifecycle and the rating pipeline.

pub mod rating;
pub mod token;

pub use rating::*;
pub use token::*;
