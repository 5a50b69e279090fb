/// Contact model and database operations
///
/// Contacts always belong to an account and may optionally be attached to an
/// organization of any account. Both references are enforced by the store.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE contacts (
///     id BIGSERIAL PRIMARY KEY,
///     account_id BIGINT NOT NULL,
///     organization_id BIGINT,
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     email TEXT,
///     phone TEXT,
///     address TEXT,
///     city TEXT,
///     region TEXT,
///     country TEXT,
///     postal_code TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT contacts_account_id_fkey FOREIGN KEY (account_id)
///         REFERENCES accounts (id) ON DELETE RESTRICT,
///     CONSTRAINT contacts_organization_id_fkey FOREIGN KEY (organization_id)
///         REFERENCES organizations (id) ON DELETE RESTRICT
/// );
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::jsonapi::serializer::{RelationshipDescriptor, ResourceDescriptor};
use crate::models::{Entity, ForeignKey, ResourceKind};
use crate::store::postgres::PgModel;

/// Foreign key from `contacts.account_id` to `accounts.id`
pub const CONTACTS_ACCOUNT_FKEY: &str = "contacts_account_id_fkey";

/// Foreign key from `contacts.organization_id` to `organizations.id`
pub const CONTACTS_ORGANIZATION_FKEY: &str = "contacts_organization_id_fkey";

/// JSON:API exposure of contacts
pub const CONTACT_RESOURCE: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Contacts,
    attributes: &[
        "first_name",
        "last_name",
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
    relationships: &[
        RelationshipDescriptor {
            name: "account",
            related: ResourceKind::Accounts,
            foreign_key: "account_id",
        },
        RelationshipDescriptor {
            name: "organization",
            related: ResourceKind::Organizations,
            foreign_key: "organization_id",
        },
    ],
};

/// Contact model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    /// Store-assigned id
    pub id: i64,

    /// Owning account
    pub account_id: i64,

    /// Employer, if known
    pub organization_id: Option<i64>,

    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,

    /// When the contact was created
    pub created_at: DateTime<Utc>,

    /// When the contact was last updated
    pub updated_at: DateTime<Utc>,
}

/// Writable contact attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactFields {
    pub account_id: i64,
    pub organization_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl Entity for Contact {
    type Fields = ContactFields;

    const DESCRIPTOR: &'static ResourceDescriptor = &CONTACT_RESOURCE;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn fields(&self) -> ContactFields {
        ContactFields {
            account_id: self.account_id,
            organization_id: self.organization_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
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
        fields: ContactFields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id: fields.account_id,
            organization_id: fields.organization_id,
            first_name: fields.first_name,
            last_name: fields.last_name,
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

    fn foreign_keys(fields: &ContactFields) -> Vec<ForeignKey> {
        let mut keys = vec![ForeignKey {
            constraint: CONTACTS_ACCOUNT_FKEY,
            references: ResourceKind::Accounts,
            id: fields.account_id,
        }];

        if let Some(organization_id) = fields.organization_id {
            keys.push(ForeignKey {
                constraint: CONTACTS_ORGANIZATION_FKEY,
                references: ResourceKind::Organizations,
                id: organization_id,
            });
        }

        keys
    }
}

#[async_trait]
impl PgModel for Contact {
    async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, account_id, organization_id, first_name, last_name, email,
                   phone, address, city, region, country, postal_code,
                   created_at, updated_at
            FROM contacts
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
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, account_id, organization_id, first_name, last_name, email,
                   phone, address, city, region, country, postal_code,
                   created_at, updated_at
            FROM contacts
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await
    }

    async fn create(conn: &mut PgConnection, data: ContactFields) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (account_id, organization_id, first_name, last_name,
                                  email, phone, address, city, region, country,
                                  postal_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, account_id, organization_id, first_name, last_name, email,
                      phone, address, city, region, country, postal_code,
                      created_at, updated_at
            "#,
        )
        .bind(data.account_id)
        .bind(data.organization_id)
        .bind(data.first_name)
        .bind(data.last_name)
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
        data: ContactFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET account_id = $2, organization_id = $3, first_name = $4,
                last_name = $5, email = $6, phone = $7, address = $8, city = $9,
                region = $10, country = $11, postal_code = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, account_id, organization_id, first_name, last_name, email,
                      phone, address, city, region, country, postal_code,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.account_id)
        .bind(data.organization_id)
        .bind(data.first_name)
        .bind(data.last_name)
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
        sqlx::query_as::<_, Contact>(
            r#"
            DELETE FROM contacts
            WHERE id = $1
            RETURNING id, account_id, organization_id, first_name, last_name, email,
                      phone, address, city, region, country, postal_code,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }
}
