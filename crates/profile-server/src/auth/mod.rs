//! Credentials: password hashing and session tokens.
//!
//! Nothing in this module touches the store or HTTP types; handlers combine
//! the pieces.

pub mod password;
pub mod token;

pub use password::{hash_password, prepare_dummy_hash, verify_dummy, verify_password};
pub use token::TokenIssuer;
