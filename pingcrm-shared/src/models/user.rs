/// User model and database operations
///
/// Users belong to exactly one account. Email addresses are unique across all
/// users; passwords are stored as Argon2id hashes and never serialized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     account_id BIGINT NOT NULL,
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     owner BOOLEAN NOT NULL DEFAULT FALSE,
///     encrypted_password TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_account_id_fkey FOREIGN KEY (account_id)
///         REFERENCES accounts (id) ON DELETE RESTRICT,
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::jsonapi::serializer::{RelationshipDescriptor, ResourceDescriptor};
use crate::models::{Entity, ForeignKey, ResourceKind, UniqueKey};
use crate::store::postgres::PgModel;

/// Unique constraint on `users.email`
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// Foreign key from `users.account_id` to `accounts.id`
pub const USERS_ACCOUNT_FKEY: &str = "users_account_id_fkey";

/// JSON:API exposure of users
pub const USER_RESOURCE: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Users,
    attributes: &[
        "first_name",
        "last_name",
        "email",
        "owner",
        "created_at",
        "updated_at",
    ],
    relationships: &[RelationshipDescriptor {
        name: "account",
        related: ResourceKind::Accounts,
        foreign_key: "account_id",
    }],
};

/// User model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Store-assigned id
    pub id: i64,

    /// Owning account
    pub account_id: i64,

    pub first_name: String,

    pub last_name: String,

    /// Unique across all users
    pub email: String,

    /// Whether the user owns the account
    pub owner: bool,

    /// Argon2id PHC string
    #[serde(skip_serializing, default)]
    pub encrypted_password: String,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// Writable user attributes
///
/// `encrypted_password` must already be hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFields {
    pub account_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub owner: bool,
    pub encrypted_password: String,
}

impl Entity for User {
    type Fields = UserFields;

    const DESCRIPTOR: &'static ResourceDescriptor = &USER_RESOURCE;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn fields(&self) -> UserFields {
        UserFields {
            account_id: self.account_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            owner: self.owner,
            encrypted_password: self.encrypted_password.clone(),
        }
    }

    fn from_fields(
        id: i64,
        fields: UserFields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id: fields.account_id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            owner: fields.owner,
            encrypted_password: fields.encrypted_password,
            created_at,
            updated_at,
        }
    }

    fn foreign_keys(fields: &UserFields) -> Vec<ForeignKey> {
        vec![ForeignKey {
            constraint: USERS_ACCOUNT_FKEY,
            references: ResourceKind::Accounts,
            id: fields.account_id,
        }]
    }

    fn unique_keys(fields: &UserFields) -> Vec<UniqueKey> {
        vec![UniqueKey {
            constraint: USERS_EMAIL_KEY,
            value: fields.email.clone(),
        }]
    }
}

impl User {
    /// Finds a user by exact email
    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, account_id, first_name, last_name, email, owner,
                   encrypted_password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(conn)
        .await
    }
}

#[async_trait]
impl PgModel for User {
    async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, account_id, first_name, last_name, email, owner,
                   encrypted_password, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    async fn list(
        conn: &mut PgConnection,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, account_id, first_name, last_name, email, owner,
                   encrypted_password, created_at, updated_at
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await
    }

    async fn create(conn: &mut PgConnection, data: UserFields) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (account_id, first_name, last_name, email, owner, encrypted_password)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, first_name, last_name, email, owner,
                      encrypted_password, created_at, updated_at
            "#,
        )
        .bind(data.account_id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.owner)
        .bind(data.encrypted_password)
        .fetch_one(conn)
        .await
    }

    async fn update(
        conn: &mut PgConnection,
        id: i64,
        data: UserFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET account_id = $2, first_name = $3, last_name = $4, email = $5,
                owner = $6, encrypted_password = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING id, account_id, first_name, last_name, email, owner,
                      encrypted_password, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.account_id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.owner)
        .bind(data.encrypted_password)
        .fetch_optional(conn)
        .await
    }

    async fn delete(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, account_id, first_name, last_name, email, owner,
                      encrypted_password, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        let now = Utc::now();
        User::from_fields(
            3,
            UserFields {
                account_id: 1,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                owner: true,
                encrypted_password: "$argon2id$v=19$...".to_string(),
            },
            now,
            now,
        )
    }

    #[test]
    fn test_password_is_never_serialized() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("encrypted_password").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_constraint_keys() {
        let user = sample();
        let fks = User::foreign_keys(&user.fields());
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].references, ResourceKind::Accounts);
        assert_eq!(fks[0].id, 1);

        let keys = User::unique_keys(&user.fields());
        assert_eq!(keys[0].constraint, USERS_EMAIL_KEY);
        assert_eq!(keys[0].value, "ada@example.com");
    }
}
