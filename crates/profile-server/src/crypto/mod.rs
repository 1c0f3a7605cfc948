//! Field-level encryption at rest.
//!
//! This module is intentionally free of HTTP and storage dependencies. It
//! provides the AEAD primitives ([`cipher`]) and the ordered, fail-fast helpers
//! that transform the sensitive slots of a record in place ([`fields`]).
//!
//! # Ciphertext format
//!
//! ```text
//! base64-standard(nonce[12] ‖ ciphertext ‖ tag[16])
//! ```
//!
//! The format must stay stable: rows written under the current key have to
//! remain decryptable, so the key is never rotated within a deployment.

pub mod cipher;
pub mod fields;

pub use cipher::FieldCipher;
pub use fields::{decrypt_fields, encrypt_fields};
