/// Database models for PingCRM
///
/// This module contains the four persisted CRM entities and the [`Entity`]
/// contract that lets the record store, the JSON:API serializer and the HTTP
/// handlers treat them uniformly.
///
/// # Models
///
/// - `account`: Root tenant entity, owns everything else
/// - `user`: Login-capable people belonging to an account
/// - `organization`: Companies tracked by an account
/// - `contact`: People tracked by an account, optionally within an organization
///
/// # Example
///
/// ```no_run
/// use pingcrm_shared::models::account::{Account, AccountFields};
/// use pingcrm_shared::store::{memory::MemoryStore, RecordStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let mut uow = store.begin().await?;
///
/// let account = uow
///     .accounts()
///     .insert(AccountFields { name: "Acme Corp".to_string() })
///     .await?;
/// uow.commit().await?;
///
/// println!("Created account {}", account.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jsonapi::serializer::ResourceDescriptor;

pub mod account;
pub mod contact;
pub mod organization;
pub mod user;

pub use account::Account;
pub use contact::Contact;
pub use organization::Organization;
pub use user::User;

/// The resource types exposed by the API
///
/// The lowercase plural form doubles as the JSON:API `type`, the URL segment
/// and the table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Accounts,
    Users,
    Organizations,
    Contacts,
}

impl ResourceKind {
    /// JSON:API type name (also the table name)
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "accounts",
            ResourceKind::Users => "users",
            ResourceKind::Organizations => "organizations",
            ResourceKind::Contacts => "contacts",
        }
    }

    /// Human-readable singular name, used in error titles
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "Account",
            ResourceKind::Users => "User",
            ResourceKind::Organizations => "Organization",
            ResourceKind::Contacts => "Contact",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A foreign key held by a set of fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constraint name, identical to the one declared in the migrations
    pub constraint: &'static str,

    /// Referenced resource type
    pub references: ResourceKind,

    /// Referenced id
    pub id: i64,
}

/// A value that must be unique across a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    /// Constraint name, identical to the one declared in the migrations
    pub constraint: &'static str,

    /// The value under the constraint
    pub value: String,
}

/// Contract shared by every persisted CRM record
///
/// `Fields` is the writable part of a record: everything except the
/// store-assigned id and timestamps. Inserts and updates take a complete
/// `Fields` value; partial updates are merged into one before reaching the
/// store.
pub trait Entity: Serialize + Clone + Send + Sync + Unpin + 'static {
    /// Writable attributes of the record
    type Fields: Clone + Send + Sync + 'static;

    /// How the record is exposed as a JSON:API resource
    const DESCRIPTOR: &'static ResourceDescriptor;

    /// Store-assigned primary key
    fn id(&self) -> i64;

    /// When the record was inserted
    fn created_at(&self) -> DateTime<Utc>;

    /// When the record was last written
    fn updated_at(&self) -> DateTime<Utc>;

    /// Copies the writable attributes out of the record
    fn fields(&self) -> Self::Fields;

    /// Assembles a record from its parts
    fn from_fields(
        id: i64,
        fields: Self::Fields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self;

    /// Foreign keys that must reference existing records
    fn foreign_keys(_fields: &Self::Fields) -> Vec<ForeignKey> {
        Vec::new()
    }

    /// Values that must be unique within the table
    fn unique_keys(_fields: &Self::Fields) -> Vec<UniqueKey> {
        Vec::new()
    }
}
