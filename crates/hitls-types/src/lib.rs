#![forbid(unsafe_code)]
#![doc = "Common error codes, algorithm identifiers, and protocol constants for hitls-session."]

pub mod algorithm;
pub mod error;

pub use algorithm::*;
pub use error::*;
