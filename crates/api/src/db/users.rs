//! User repository for database operations.
//!
//! Queries are built at runtime with `sqlx::query_as` and mapped through
//! private row types, so the crate compiles without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::{Email, Role, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, fullname, is_admin, is_active, has_shipping_address, \
                            date_joined, last_login";

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    fullname: String,
    is_admin: bool,
    is_active: bool,
    has_shipping_address: bool,
    date_joined: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            fullname: row.fullname,
            role: Role::from_is_admin(row.is_admin),
            is_admin: row.is_admin,
            is_active: row.is_active,
            has_shipping_address: row.has_shipping_address,
            date_joined: row.date_joined,
            last_login: row.last_login,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// The identity and flags an access token is checked against on every request.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AccountStatus {
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
}

/// Fields an admin may change on any account.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub fullname: Option<String>,
    pub email: Option<Email>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM mart.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get the current email, role and activity of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_status(&self, id: UserId) -> Result<Option<AccountStatus>, RepositoryError> {
        let status = sqlx::query_as::<_, AccountStatus>(
            "SELECT email, is_admin, is_active FROM mart.user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(status)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM mart.user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM mart.user ORDER BY date_joined DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Newest accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM mart.user ORDER BY date_joined DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a new user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, password_hash), fields(email = %email))]
    pub async fn create_with_password(
        &self,
        email: &Email,
        fullname: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO mart.user (email, fullname, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(fullname)
        .bind(password_hash)
        .bind(role.is_admin())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.try_into()
    }

    /// Get a user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM mart.user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let user = User::try_from(r.user)?;
        Ok(Some((user, r.password_hash)))
    }

    /// Get a user's password hash by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM mart.user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(hash)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE mart.user SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE mart.user SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Apply a partial update. `None` fields are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: UserId, update: UserUpdate) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE mart.user SET \
                fullname = COALESCE($2, fullname), \
                email = COALESCE($3, email), \
                is_admin = COALESCE($4, is_admin), \
                is_active = COALESCE($5, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.fullname)
        .bind(update.email)
        .bind(update.is_admin)
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a user and everything that belongs to them.
    ///
    /// Removes, in one transaction: reviews and wishlist entries written by
    /// the user, orders, revoked tokens, the shipping address, products the
    /// user owns (with those products' images, reviews and wishlist entries),
    /// then the user row. Returns the media public ids of deleted images so
    /// the caller can clean up remote assets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let owned_products = "SELECT id FROM mart.product WHERE owner_id = $1";

        let image_ids = sqlx::query_scalar::<_, String>(&format!(
            "DELETE FROM mart.product_image WHERE product_id IN ({owned_products}) \
             RETURNING public_id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for statement in [
            format!("DELETE FROM mart.review WHERE user_id = $1 OR product_id IN ({owned_products})"),
            format!(
                "DELETE FROM mart.wishlist_item WHERE user_id = $1 OR product_id IN ({owned_products})"
            ),
            "DELETE FROM mart.product WHERE owner_id = $1".to_string(),
            "DELETE FROM mart.customer_order WHERE user_id = $1".to_string(),
            "DELETE FROM mart.revoked_token WHERE user_id = $1".to_string(),
            "DELETE FROM mart.shipping_address WHERE user_id = $1".to_string(),
        ] {
            sqlx::query(&statement).bind(id).execute(&mut *tx).await?;
        }

        let result = sqlx::query("DELETE FROM mart.user WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        tracing::info!(user_id = %id, images = image_ids.len(), "User deleted");

        Ok(image_ids)
    }
}
