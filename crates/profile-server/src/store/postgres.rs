//! [`PgStore`]: Postgres backend via sqlx, plus pool bootstrap.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::time;
use tracing::{info, warn};

use super::{NewUser, Profile, ProfileFields, ProfileStore, StoreError, User, UserStore};

const USER_COLUMNS: &str = "id, email, username, password_hash, created_at, updated_at";
const PROFILE_COLUMNS: &str = "id, user_id, full_name, date_of_birth, aadhaar_number, \
                               phone_number, address, created_at, updated_at";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound,
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Connect to Postgres, retrying while the database comes up.
///
/// # Errors
///
/// Returns the last connection error once `attempts` tries have failed.
pub async fn connect_with_retry(
    url: &str,
    max_connections: u32,
    attempts: u32,
    delay: Duration,
) -> Result<PgPool> {
    let mut last_err = None;
    for attempt in 1..=attempts {
        info!(attempt, attempts, "connecting to postgres");
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
        {
            Ok(pool) => {
                info!(attempt, "postgres connection established");
                return Ok(pool);
            }
            Err(e) => {
                warn!(attempt, error = %e, "postgres not ready");
                last_err = Some(e);
                if attempt < attempts {
                    time::sleep(delay).await;
                }
            }
        }
    }
    match last_err {
        Some(e) => Err(e).with_context(|| format!("failed to connect to postgres after {attempts} attempts")),
        None => anyhow::bail!("no postgres connection attempts were made"),
    }
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns an error if any migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    info!("database migrations applied");
    Ok(())
}

/// Both stores over one connection pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn by_email(&self, email: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn by_user_id(&self, user_id: i64) -> Result<Profile, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
        sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, fields: ProfileFields) -> Result<Profile, StoreError> {
        let sql = format!(
            "INSERT INTO profiles \
             (user_id, full_name, date_of_birth, aadhaar_number, phone_number, address) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PROFILE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(fields.user_id)
            .bind(&fields.full_name)
            .bind(fields.date_of_birth)
            .bind(&fields.aadhaar_number)
            .bind(&fields.phone_number)
            .bind(&fields.address)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, fields: ProfileFields) -> Result<Profile, StoreError> {
        let sql = format!(
            "UPDATE profiles SET full_name = $1, date_of_birth = $2, aadhaar_number = $3, \
             phone_number = $4, address = $5, updated_at = now() \
             WHERE user_id = $6 RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&sql)
            .bind(&fields.full_name)
            .bind(fields.date_of_birth)
            .bind(&fields.aadhaar_number)
            .bind(&fields.phone_number)
            .bind(&fields.address)
            .bind(fields.user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, user_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn other_errors_map_to_database() {
        let e = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(e, StoreError::Database(_)));
    }

    #[test]
    fn column_lists_match_row_types() {
        assert_eq!(USER_COLUMNS.split(',').count(), 6);
        assert_eq!(PROFILE_COLUMNS.split(',').count(), 9);
    }
}
