/// Account model and database operations
///
/// Accounts are the root tenant entity. Users, organizations and contacts all
/// reference exactly one account, and an account cannot be deleted while any
/// of them still exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id BIGSERIAL PRIMARY KEY,
///     name TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::jsonapi::serializer::ResourceDescriptor;
use crate::models::{Entity, ResourceKind};
use crate::store::postgres::PgModel;

/// JSON:API exposure of accounts
pub const ACCOUNT_RESOURCE: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Accounts,
    attributes: &["name", "created_at", "updated_at"],
    relationships: &[],
};

/// Account model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Store-assigned id
    pub id: i64,

    /// Display name
    pub name: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Writable account attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFields {
    pub name: String,
}

impl Entity for Account {
    type Fields = AccountFields;

    const DESCRIPTOR: &'static ResourceDescriptor = &ACCOUNT_RESOURCE;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn fields(&self) -> AccountFields {
        AccountFields {
            name: self.name.clone(),
        }
    }

    fn from_fields(
        id: i64,
        fields: AccountFields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: fields.name,
            created_at,
            updated_at,
        }
    }
}

#[async_trait]
impl PgModel for Account {
    async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM accounts
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
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM accounts
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await
    }

    async fn create(conn: &mut PgConnection, data: AccountFields) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .fetch_one(conn)
        .await
    }

    async fn update(
        conn: &mut PgConnection,
        id: i64,
        data: AccountFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .fetch_optional(conn)
        .await
    }

    async fn delete(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            DELETE FROM accounts
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
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

    #[test]
    fn test_fields_round_trip() {
        let now = Utc::now();
        let account = Account::from_fields(
            7,
            AccountFields {
                name: "Acme Corp".to_string(),
            },
            now,
            now,
        );

        assert_eq!(account.id(), 7);
        assert_eq!(account.fields().name, "Acme Corp");
        assert!(Account::foreign_keys(&account.fields()).is_empty());
    }
}
