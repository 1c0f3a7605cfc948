//! Request validation.
//!
//! Checks collect `field -> message` pairs keyed by the JSON field name. The
//! first failure recorded for a field wins.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use common::protocol::{ProfileRequest, RegisterRequest};
use regex::Regex;

pub type FieldErrors = BTreeMap<String, String>;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const FULL_NAME_MIN: usize = 3;
const FULL_NAME_MAX: usize = 40;
const PASSWORD_MIN: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?(\d{1,3})?[-.\s]?\(?\d{1,4}?\)?[-.\s]?\d{1,4}[-.\s]?\d{1,9}$")
        .unwrap_or_else(|e| panic!("phone regex: {e}"))
});

static AADHAAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[2-9][0-9]{11}$").unwrap_or_else(|e| panic!("aadhaar regex: {e}")));

#[derive(Debug, Default)]
struct Validator {
    errors: FieldErrors,
}

impl Validator {
    fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.into());
        }
    }

    fn length(&mut self, value: &str, field: &str, min: usize, max: usize) {
        let trimmed = value.trim().chars().count();
        let total = value.chars().count();
        self.check(
            trimmed >= min && total < max,
            field,
            format!("must be between {min} and {} characters", max - 1),
        );
    }

    fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_registration(req: &RegisterRequest) -> Result<(), FieldErrors> {
    let mut v = Validator::default();
    v.length(&req.username, "username", USERNAME_MIN, USERNAME_MAX);
    v.check(
        EMAIL_RE.is_match(&normalize_email(&req.email)),
        "email",
        "invalid email address",
    );
    v.check(
        req.password.chars().count() >= PASSWORD_MIN,
        "password",
        format!("must be at least {PASSWORD_MIN} characters"),
    );
    v.finish()
}

/// Validate a profile body. `today` bounds the date of birth.
pub fn validate_profile(req: &ProfileRequest, today: NaiveDate) -> Result<(), FieldErrors> {
    let mut v = Validator::default();
    v.length(&req.full_name, "full_name", FULL_NAME_MIN, FULL_NAME_MAX);
    v.check(
        PHONE_RE.is_match(&req.phone_number),
        "phone_number",
        "invalid phone number",
    );
    v.check(!req.address.trim().is_empty(), "address", "this field cannot be empty");
    v.check(
        req.date_of_birth <= today,
        "date_of_birth",
        "must not be in the future",
    );
    if !req.aadhaar_number.is_empty() {
        v.check(
            AADHAAR_RE.is_match(&req.aadhaar_number) && verhoeff_valid(&req.aadhaar_number),
            "aadhaar_number",
            "invalid aadhaar number",
        );
    }
    v.finish()
}

const VERHOEFF_D: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

const VERHOEFF_P: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 6, 8, 7, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

/// Verhoeff checksum over a string of ASCII digits, check digit last.
pub fn verhoeff_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut c = 0u8;
    for (i, ch) in digits.bytes().rev().enumerate() {
        if !ch.is_ascii_digit() {
            return false;
        }
        let digit = usize::from(ch - b'0');
        c = VERHOEFF_D[usize::from(c)][usize::from(VERHOEFF_P[i % 8][digit])];
    }
    c == 0
}
