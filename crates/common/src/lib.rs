//! Common types, protocol definitions, and errors shared across `profile-manager` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
