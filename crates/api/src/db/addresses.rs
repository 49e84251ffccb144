//! Shipping address repository.
//!
//! Every write that creates or removes an address also updates
//! `user.has_shipping_address` in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::{ShippingAddressId, UserId};

use super::RepositoryError;
use crate::models::ShippingAddress;

const ADDRESS_COLUMNS: &str = "id, user_id, first_name, last_name, address, city, postal_code, \
                               province, country, phone, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ShippingAddressRow {
    id: i32,
    user_id: i32,
    first_name: String,
    last_name: String,
    address: String,
    city: String,
    postal_code: String,
    province: String,
    country: String,
    phone: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShippingAddressRow> for ShippingAddress {
    fn from(row: ShippingAddressRow) -> Self {
        Self {
            id: ShippingAddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            first_name: row.first_name,
            last_name: row.last_name,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            province: row.province,
            country: row.country,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A complete address, as required when creating or replacing one.
#[derive(Debug, Clone)]
pub struct NewShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
    pub phone: String,
}

/// Partial address update. `None` fields are left unchanged.
#[derive(Debug, Default, Clone)]
pub struct ShippingAddressUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// Repository for shipping address operations.
pub struct ShippingAddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingAddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's address, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ShippingAddress>, RepositoryError> {
        let row = sqlx::query_as::<_, ShippingAddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM mart.shipping_address WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create the user's address, replacing an existing one.
    ///
    /// Returns the address and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    #[instrument(skip(self, address))]
    pub async fn upsert(
        &self,
        user_id: UserId,
        address: NewShippingAddress,
    ) -> Result<(ShippingAddress, bool), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM mart.shipping_address WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, ShippingAddressRow>(&format!(
            "INSERT INTO mart.shipping_address \
                (user_id, first_name, last_name, address, city, postal_code, province, country, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id) DO UPDATE SET \
                first_name = EXCLUDED.first_name, \
                last_name = EXCLUDED.last_name, \
                address = EXCLUDED.address, \
                city = EXCLUDED.city, \
                postal_code = EXCLUDED.postal_code, \
                province = EXCLUDED.province, \
                country = EXCLUDED.country, \
                phone = EXCLUDED.phone, \
                updated_at = NOW() \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&address.first_name)
        .bind(&address.last_name)
        .bind(&address.address)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.province)
        .bind(&address.country)
        .bind(&address.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        set_has_shipping_address(&mut tx, user_id, true).await?;
        tx.commit().await?;

        Ok((row.into(), !existed))
    }

    /// Partially update the user's existing address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no address.
    pub async fn update(
        &self,
        user_id: UserId,
        update: ShippingAddressUpdate,
    ) -> Result<ShippingAddress, RepositoryError> {
        let row = sqlx::query_as::<_, ShippingAddressRow>(&format!(
            "UPDATE mart.shipping_address SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                address = COALESCE($4, address), \
                city = COALESCE($5, city), \
                postal_code = COALESCE($6, postal_code), \
                province = COALESCE($7, province), \
                country = COALESCE($8, country), \
                phone = COALESCE($9, phone), \
                updated_at = NOW() \
             WHERE user_id = $1 RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.address)
        .bind(update.city)
        .bind(update.postal_code)
        .bind(update.province)
        .bind(update.country)
        .bind(update.phone)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete the user's address and clear the flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no address.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM mart.shipping_address WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        set_has_shipping_address(&mut tx, user_id, false).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn set_has_shipping_address(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
    value: bool,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE mart.user SET has_shipping_address = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
