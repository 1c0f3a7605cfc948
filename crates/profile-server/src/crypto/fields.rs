//! In-place encryption of named string slots.
//!
//! A record hands over an ordered list of `(name, &mut String)` slots. Each one
//! is transformed in order; empty slots mean "absent" and are left untouched.
//! The first failure stops processing and names the slot that failed, so a
//! half-encrypted record is never silently accepted. Callers must discard the
//! record on error.

use thiserror::Error;

use super::cipher::{CipherError, FieldCipher};

/// Direction of a slot transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Encrypt,
    Decrypt,
}

/// One slot of a record paired with the transform to apply to it.
#[derive(Debug)]
pub struct FieldOp<'a> {
    pub name: &'static str,
    pub slot: &'a mut String,
    pub transform: Transform,
}

impl<'a> FieldOp<'a> {
    pub fn encrypt(name: &'static str, slot: &'a mut String) -> Self {
        Self {
            name,
            slot,
            transform: Transform::Encrypt,
        }
    }

    pub fn decrypt(name: &'static str, slot: &'a mut String) -> Self {
        Self {
            name,
            slot,
            transform: Transform::Decrypt,
        }
    }
}

/// A slot transformation failed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("field `{field}`: {source}")]
pub struct FieldError {
    /// Name of the slot that failed.
    pub field: &'static str,
    /// Underlying cipher error.
    #[source]
    pub source: CipherError,
}

/// Apply every op in order, stopping at the first error.
///
/// A failing slot keeps its previous value; slots before it have already been
/// transformed.
///
/// # Errors
///
/// Returns a [`FieldError`] naming the first slot whose transform failed.
pub fn apply<'a>(
    cipher: &FieldCipher,
    ops: impl IntoIterator<Item = FieldOp<'a>>,
) -> Result<(), FieldError> {
    for op in ops {
        if op.slot.is_empty() {
            continue;
        }
        let transformed = match op.transform {
            Transform::Encrypt => cipher.encrypt(op.slot.as_str()),
            Transform::Decrypt => cipher.decrypt(op.slot.as_str()),
        }
        .map_err(|source| FieldError {
            field: op.name,
            source,
        })?;
        *op.slot = transformed;
    }
    Ok(())
}

/// Encrypt each non-empty slot in place.
///
/// # Errors
///
/// See [`apply`].
pub fn encrypt_fields<'a>(
    cipher: &FieldCipher,
    slots: impl IntoIterator<Item = (&'static str, &'a mut String)>,
) -> Result<(), FieldError> {
    apply(
        cipher,
        slots
            .into_iter()
            .map(|(name, slot)| FieldOp::encrypt(name, slot)),
    )
}

/// Decrypt each non-empty slot in place.
///
/// # Errors
///
/// See [`apply`].
pub fn decrypt_fields<'a>(
    cipher: &FieldCipher,
    slots: impl IntoIterator<Item = (&'static str, &'a mut String)>,
) -> Result<(), FieldError> {
    apply(
        cipher,
        slots
            .into_iter()
            .map(|(name, slot)| FieldOp::decrypt(name, slot)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::new("0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn empty_slot_is_left_alone_both_ways() {
        let c = cipher();
        let mut empty = String::new();
        encrypt_fields(&c, [("aadhaar_number", &mut empty)]).unwrap();
        assert!(empty.is_empty());
        decrypt_fields(&c, [("aadhaar_number", &mut empty)]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn slots_round_trip_in_place() {
        let c = cipher();
        let mut a = "234567890124".to_owned();
        let mut b = "second".to_owned();
        encrypt_fields(&c, [("a", &mut a), ("b", &mut b)]).unwrap();
        assert_ne!(a, "234567890124");
        assert_ne!(b, "second");
        decrypt_fields(&c, [("a", &mut a), ("b", &mut b)]).unwrap();
        assert_eq!(a, "234567890124");
        assert_eq!(b, "second");
    }

    #[test]
    fn stops_at_first_failing_slot() {
        let c = cipher();
        let mut good = c.encrypt("first").unwrap();
        let mut bad = "not-a-ciphertext".to_owned();
        let mut never = c.encrypt("third").unwrap();
        let never_before = never.clone();

        let err = decrypt_fields(
            &c,
            [("good", &mut good), ("bad", &mut bad), ("never", &mut never)],
        )
        .unwrap_err();

        assert_eq!(err.field, "bad");
        assert_eq!(err.source, CipherError::Malformed);
        assert_eq!(good, "first");
        assert_eq!(bad, "not-a-ciphertext");
        assert_eq!(never, never_before);
    }

    #[test]
    fn mixed_transforms_apply_in_order() {
        let c = cipher();
        let mut sealed = c.encrypt("open me").unwrap();
        let mut plain = "seal me".to_owned();
        apply(
            &c,
            [
                FieldOp::decrypt("sealed", &mut sealed),
                FieldOp::encrypt("plain", &mut plain),
            ],
        )
        .unwrap();
        assert_eq!(sealed, "open me");
        assert_eq!(c.decrypt(&plain).unwrap(), "seal me");
    }

    #[test]
    fn error_display_names_the_slot() {
        let c = cipher();
        let mut bad = "AAAA".to_owned();
        let err = decrypt_fields(&c, [("aadhaar_number", &mut bad)]).unwrap_err();
        assert!(err.to_string().contains("aadhaar_number"));
    }
}
