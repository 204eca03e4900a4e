//! Postgres-backed store.
//!
//! Schema is created by [`PostgresStore::migrate`] if absent. Advertisements
//! reference their author with `ON DELETE CASCADE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use classifieds_auth::{DirectoryError, DirectoryUser, Role, UserDirectory};
use classifieds_core::{AdvertisementId, UserId};

use super::{
    Advertisement, AdvertisementChanges, AdvertisementFilter, AdvertisementRepository,
    NewAdvertisement, NewUser, StoreError, StoreResult, UserChanges, UserRecord, UserRepository,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username VARCHAR(100) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL,
        password_verifier TEXT NOT NULL,
        user_group VARCHAR(16) NOT NULL DEFAULT 'user',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS advertisements (
        id UUID PRIMARY KEY,
        title VARCHAR(200) NOT NULL,
        description TEXT,
        price DOUBLE PRECISION NOT NULL,
        author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS advertisements_created_at_idx ON advertisements (created_at DESC)",
];

const USER_COLUMNS: &str =
    "id, username, email, password_verifier, user_group, is_active, created_at";
const AD_COLUMNS: &str = "id, title, description, price, author_id, created_at";

/// Postgres store over a shared `sqlx` pool.
///
/// The pool is `Send + Sync` and internally reference counted.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend)?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        }
        tracing::info!("database schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn write_error(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{what} already exists"))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::Conflict("referenced record does not exist".to_string())
        }
        _ => backend(e),
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<UserRecord> {
    let group: String = row.try_get("user_group").map_err(backend)?;
    let role = group
        .parse::<Role>()
        .map_err(|e| StoreError::Backend(format!("corrupt user_group column: {e}")))?;

    Ok(UserRecord {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(backend)?),
        username: row.try_get("username").map_err(backend)?,
        email: row.try_get("email").map_err(backend)?,
        password_verifier: row.try_get("password_verifier").map_err(backend)?,
        role,
        active: row.try_get("is_active").map_err(backend)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(backend)?,
    })
}

fn advertisement_from_row(row: &PgRow) -> StoreResult<Advertisement> {
    Ok(Advertisement {
        id: AdvertisementId::from_uuid(row.try_get::<Uuid, _>("id").map_err(backend)?),
        title: row.try_get("title").map_err(backend)?,
        description: row.try_get("description").map_err(backend)?,
        price: row.try_get("price").map_err(backend)?,
        author_id: UserId::from_uuid(row.try_get::<Uuid, _>("author_id").map_err(backend)?),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(backend)?,
    })
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_verifier, user_group) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*UserId::new().as_uuid())
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_verifier)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "username"))?;
        user_from_row(&row)
    }

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn update_user(&self, id: &UserId, changes: UserChanges) -> StoreResult<UserRecord> {
        let sql = format!(
            "UPDATE users SET \
               username = COALESCE($2, username), \
               email = COALESCE($3, email), \
               password_verifier = COALESCE($4, password_verifier) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.password_verifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "username"))?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row)
    }

    async fn set_user_active(&self, id: &UserId, active: bool) -> StoreResult<UserRecord> {
        let sql = format!("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(active)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row)
    }

    async fn delete_user(&self, id: &UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AdvertisementRepository for PostgresStore {
    async fn create_advertisement(&self, new: NewAdvertisement) -> StoreResult<Advertisement> {
        let sql = format!(
            "INSERT INTO advertisements (id, title, description, price, author_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {AD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*AdvertisementId::new().as_uuid())
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.price)
            .bind(new.author_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "advertisement"))?;
        advertisement_from_row(&row)
    }

    async fn get_advertisement(&self, id: &AdvertisementId) -> StoreResult<Option<Advertisement>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM advertisements WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .as_ref()
            .map(advertisement_from_row)
            .transpose()
    }

    async fn advertisement_owner(&self, id: &AdvertisementId) -> StoreResult<Option<UserId>> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM advertisements WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(owner.map(UserId::from_uuid))
    }

    async fn update_advertisement(
        &self,
        id: &AdvertisementId,
        changes: AdvertisementChanges,
    ) -> StoreResult<Advertisement> {
        let sql = format!(
            "UPDATE advertisements SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               price = COALESCE($4, price) \
             WHERE id = $1 RETURNING {AD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.price)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        advertisement_from_row(&row)
    }

    async fn delete_advertisement(&self, id: &AdvertisementId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM advertisements WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn search_advertisements(
        &self,
        filter: &AdvertisementFilter,
    ) -> StoreResult<Vec<Advertisement>> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {AD_COLUMNS} FROM advertisements WHERE TRUE"));

        if let Some(title) = &filter.title {
            qb.push(" AND title ILIKE ").push_bind(like_pattern(title));
        }
        if let Some(description) = &filter.description {
            qb.push(" AND description ILIKE ")
                .push_bind(like_pattern(description));
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND price <= ").push_bind(max);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(backend)?;
        rows.iter().map(advertisement_from_row).collect()
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
        super::directory_lookup_by_id(self, id).await
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        super::directory_lookup_by_username(self, username).await
    }
}

/// Substring pattern with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("bike"), "%bike%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
