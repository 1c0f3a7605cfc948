//! Row types shared by every store backend.

use chrono::{DateTime, NaiveDate, Utc};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`super::UserStore::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// A stored profile. `aadhaar_number` is the ciphertext form.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub aadhaar_number: String,
    pub phone_number: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable profile columns, keyed by owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub user_id: i64,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub aadhaar_number: String,
    pub phone_number: String,
    pub address: String,
}
