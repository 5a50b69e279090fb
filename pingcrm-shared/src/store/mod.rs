/// Record store abstraction
///
/// Handlers never talk to the database directly. They open a [`UnitOfWork`]
/// from a [`RecordStore`], perform get/list/insert/update/delete calls through
/// the per-entity [`Store`] views it hands out, and commit. A unit of work that
/// is dropped without committing is rolled back.
///
/// Two backends are provided:
///
/// - [`postgres::PgStore`]: one sqlx transaction per unit of work
/// - [`memory::MemoryStore`]: in-process tables with the same constraint
///   semantics, used by tests and by `STORE_BACKEND=memory`
///
/// Both report constraint failures the same way, by constraint name, so the
/// HTTP layer can map them without knowing which backend is active.

use async_trait::async_trait;

use crate::models::{Account, Contact, Entity, Organization, User};

pub mod memory;
pub mod postgres;

/// Errors raised by a record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A foreign key constraint rejected the write or delete
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    return StoreError::UniqueViolation { constraint };
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    return StoreError::ForeignKeyViolation { constraint };
                }
                _ => {}
            }
        }

        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-entity record operations inside a unit of work
#[async_trait]
pub trait Store<E: Entity>: Send {
    /// Fetches one record, `None` when absent
    async fn get(&mut self, id: i64) -> StoreResult<Option<E>>;

    /// Fetches a page of records ordered by id
    async fn list(&mut self, offset: i64, limit: i64) -> StoreResult<Vec<E>>;

    /// Inserts a record and returns it with its assigned id and timestamps
    async fn insert(&mut self, fields: E::Fields) -> StoreResult<E>;

    /// Replaces the writable fields of a record, refreshing `updated_at`
    async fn update(&mut self, id: i64, fields: E::Fields) -> StoreResult<Option<E>>;

    /// Removes a record and returns its last state
    async fn delete(&mut self, id: i64) -> StoreResult<Option<E>>;
}

/// One persistence session
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    fn accounts(&mut self) -> &mut dyn Store<Account>;

    fn users(&mut self) -> &mut dyn Store<User>;

    fn organizations(&mut self) -> &mut dyn Store<Organization>;

    fn contacts(&mut self) -> &mut dyn Store<Contact>;

    /// Looks up a user by exact email
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;

    /// Makes every write of this unit visible to later units
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Factory for units of work, shared across requests
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opens a new unit of work
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Checks that the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Short backend name, reported by the health endpoint
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_stay_opaque() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_error_display_names_constraint() {
        let err = StoreError::UniqueViolation {
            constraint: "users_email_key".to_string(),
        };
        assert_eq!(err.to_string(), "Unique constraint violated: users_email_key");
    }
}
