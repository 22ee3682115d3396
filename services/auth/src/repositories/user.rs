//! User repository for database operations

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{error, info};
use uuid::Uuid;

use resolution::error::StoreError;
use resolution::models::{LinkedProviders, NewUser, ProviderKind, User};
use resolution::ports::UserStore;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, avatar_url, bio, \
                            google_id, facebook_id, twitter_id, password_hash, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, filter);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row.as_ref().map(user_from_row))
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("LOWER(email) = LOWER($1)", email).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_provider(
        &self,
        kind: ProviderKind,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        self.find_one(&format!("{} = $1", provider_column(kind)), external_id)
            .await
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username = $1 OR LOWER(email) = LOWER($1)", login)
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        info!("Creating new user: {}", user.username);

        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| StoreError::Backend("refusing to store a user without a credential".to_string()))?;

        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, avatar_url,
                               google_id, facebook_id, twitter_id, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.avatar_url)
            .bind(&user.providers.google_id)
            .bind(&user.providers.facebook_id)
            .bind(&user.providers.twitter_id)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(user_from_row(&row))
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, avatar_url = $4, bio = $5,
                google_id = $6, facebook_id = $7, twitter_id = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .bind(&user.providers.google_id)
        .bind(&user.providers.facebook_id)
        .bind(&user.providers.twitter_id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn provider_column(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Google => "google_id",
        ProviderKind::Facebook => "facebook_id",
        ProviderKind::Twitter => "twitter_id",
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        avatar_url: row.get("avatar_url"),
        bio: row.get("bio"),
        providers: LinkedProviders {
            google_id: row.get("google_id"),
            facebook_id: row.get("facebook_id"),
            twitter_id: row.get("twitter_id"),
        },
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Map driver errors onto the store taxonomy; 23505 is unique_violation
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Conflict(db.constraint().unwrap_or("unique constraint").to_string())
        }
        other => {
            error!("User query failed: {}", other);
            StoreError::Backend(other.to_string())
        }
    }
}
