/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,          -- always lowercase
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255) NOT NULL,
///     avatar_url VARCHAR(512),
///     timezone VARCHAR(64) NOT NULL DEFAULT 'UTC',
///     wip_limit INTEGER NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The password hash never leaves the server. Anything returned to a client
/// goes through [`PublicUser`].
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     CreateUser {
///         email: "Ada@Example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         name: "Ada".to_string(),
///     },
/// )
/// .await?;
/// assert_eq!(user.email, "ada@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Full user row, including the password hash
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Lowercased email address, unique across users
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    pub name: String,
    pub avatar_url: Option<String>,

    /// IANA timezone name, `UTC` unless the user changed it
    pub timezone: String,

    /// Personal work-in-progress preference
    pub wip_limit: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User shape safe to serialize to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub timezone: String,
    pub wip_limit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            avatar_url: user.avatar_url,
            timezone: user.timezone,
            wip_limit: user.wip_limit,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Input for [`User::create`]
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Normalized to lowercase on insert
    pub email: String,

    /// Already hashed, never plaintext
    pub password_hash: String,

    pub name: String,
}

/// Lowercases and trims an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, avatar_url, timezone, wip_limit, created_at, updated_at";

impl User {
    /// Inserts a user with the default timezone and WIP preference.
    ///
    /// # Errors
    ///
    /// A duplicate email surfaces as a unique violation (`23505`).
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.name.trim())
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Looks up a user by email, case-insensitively.
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(executor)
            .await
    }

    pub async fn email_exists<'e, E>(executor: E, email: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(normalize_email(email))
            .fetch_one(executor)
            .await
    }
}
