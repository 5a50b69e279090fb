/// Organization model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id BIGSERIAL PRIMARY KEY,
///     account_id BIGINT NOT NULL,
///     name TEXT NOT NULL,
///     email TEXT,
///     phone TEXT,
///     address TEXT,
///     city TEXT,
///     region TEXT,
///     country TEXT,
///     postal_code TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT organizations_account_id_fkey FOREIGN KEY (account_id)
///         REFERENCES accounts (id) ON DELETE RESTRICT
/// );
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::jsonapi::serializer::{RelationshipDescriptor, ResourceDescriptor};
use crate::models::{Entity, ForeignKey, ResourceKind};
use crate::store::postgres::PgModel;

/// Foreign key from `organizations.account_id` to `accounts.id`
pub const ORGANIZATIONS_ACCOUNT_FKEY: &str = "organizations_account_id_fkey";

pub const ORGANIZATION_RESOURCE: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Organizations,
    attributes: &[
        "name",
        "email",
        "phone",
        "address",
        "city",
        "region",
        "country",
        "postal_code",
        "created_at",
        "updated_at",
    ],
    relationships: &[RelationshipDescriptor {
        name: "account",
        related: ResourceKind::Accounts,
        foreign_key: "account_id",
    }],
};

/// Organization model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable organization attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationFields {
    pub account_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl Entity for Organization {
    type Fields = OrganizationFields;

    const DESCRIPTOR: &'static ResourceDescriptor = &ORGANIZATION_RESOURCE;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn fields(&self) -> OrganizationFields {
        OrganizationFields {
            account_id: self.account_id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            region: self.region.clone(),
            country: self.country.clone(),
            postal_code: self.postal_code.clone(),
        }
    }

    fn from_fields(
        id: i64,
        fields: OrganizationFields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id: fields.account_id,
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            city: fields.city,
            region: fields.region,
            country: fields.country,
            postal_code: fields.postal_code,
            created_at,
            updated_at,
        }
    }

    fn foreign_keys(fields: &OrganizationFields) -> Vec<ForeignKey> {
        vec![ForeignKey {
            constraint: ORGANIZATIONS_ACCOUNT_FKEY,
            references: ResourceKind::Accounts,
            id: fields.account_id,
        }]
    }
}

#[async_trait]
impl PgModel for Organization {
    async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, account_id, name, email, phone, address, city, region,
                   country, postal_code, created_at, updated_at
            FROM organizations
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
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, account_id, name, email, phone, address, city, region,
                   country, postal_code, created_at, updated_at
            FROM organizations
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await
    }

    async fn create(
        conn: &mut PgConnection,
        data: OrganizationFields,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (account_id, name, email, phone, address,
                                       city, region, country, postal_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, account_id, name, email, phone, address, city, region,
                      country, postal_code, created_at, updated_at
            "#,
        )
        .bind(data.account_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.address)
        .bind(data.city)
        .bind(data.region)
        .bind(data.country)
        .bind(data.postal_code)
        .fetch_one(conn)
        .await
    }

    async fn update(
        conn: &mut PgConnection,
        id: i64,
        data: OrganizationFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET account_id = $2, name = $3, email = $4, phone = $5, address = $6,
                city = $7, region = $8, country = $9, postal_code = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, account_id, name, email, phone, address, city, region,
                      country, postal_code, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.account_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.address)
        .bind(data.city)
        .bind(data.region)
        .bind(data.country)
        .bind(data.postal_code)
        .fetch_optional(conn)
        .await
    }

    async fn delete(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            DELETE FROM organizations
            WHERE id = $1
            RETURNING id, account_id, name, email, phone, address, city, region,
                      country, postal_code, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }
}
