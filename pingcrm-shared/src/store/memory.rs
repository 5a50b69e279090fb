/// In-memory record store
///
/// Keeps every table in a `BTreeMap` behind a single async mutex. A unit of
/// work holds the lock for its whole lifetime, writes to a private copy of the
/// tables and publishes the copy on commit, so uncommitted work is discarded
/// when the unit is dropped.
///
/// Foreign keys, `ON DELETE RESTRICT` and unique keys are enforced with the
/// same constraint names as the PostgreSQL schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::models::{Account, Contact, Entity, Organization, ResourceKind, User};
use crate::store::{RecordStore, Store, StoreError, StoreResult, UnitOfWork};

/// Rows of one entity type, keyed by id
#[derive(Debug, Clone)]
pub struct Table<E> {
    rows: BTreeMap<i64, E>,
    next_id: i64,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<E: Entity> Table<E> {
    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in id order
    pub fn rows(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    /// First constraint of a row in this table that points at `kind`/`id`
    fn reference_to(&self, kind: ResourceKind, id: i64) -> Option<&'static str> {
        self.rows
            .values()
            .flat_map(|row| E::foreign_keys(&row.fields()))
            .find(|fk| fk.references == kind && fk.id == id)
            .map(|fk| fk.constraint)
    }

    /// Rejects `fields` when another row already holds one of its unique values
    fn check_unique(&self, fields: &E::Fields, exclude: Option<i64>) -> StoreResult<()> {
        for key in E::unique_keys(fields) {
            let taken = self
                .rows
                .values()
                .filter(|row| Some(row.id()) != exclude)
                .any(|row| E::unique_keys(&row.fields()).contains(&key));

            if taken {
                return Err(StoreError::UniqueViolation {
                    constraint: key.constraint.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The full set of tables
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    pub accounts: Table<Account>,
    pub users: Table<User>,
    pub organizations: Table<Organization>,
    pub contacts: Table<Contact>,
}

impl MemoryTables {
    fn exists(&self, kind: ResourceKind, id: i64) -> bool {
        match kind {
            ResourceKind::Accounts => self.accounts.contains(id),
            ResourceKind::Users => self.users.contains(id),
            ResourceKind::Organizations => self.organizations.contains(id),
            ResourceKind::Contacts => self.contacts.contains(id),
        }
    }

    fn referenced_by(&self, kind: ResourceKind, id: i64) -> Option<&'static str> {
        self.accounts
            .reference_to(kind, id)
            .or_else(|| self.users.reference_to(kind, id))
            .or_else(|| self.organizations.reference_to(kind, id))
            .or_else(|| self.contacts.reference_to(kind, id))
    }

    fn check_foreign_keys<E: Entity>(&self, fields: &E::Fields) -> StoreResult<()> {
        for fk in E::foreign_keys(fields) {
            if !self.exists(fk.references, fk.id) {
                return Err(StoreError::ForeignKeyViolation {
                    constraint: fk.constraint.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Table lookup for an entity type
pub trait MemoryModel: Entity {
    fn table(tables: &MemoryTables) -> &Table<Self>;

    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self>;
}

impl MemoryModel for Account {
    fn table(tables: &MemoryTables) -> &Table<Self> {
        &tables.accounts
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self> {
        &mut tables.accounts
    }
}

impl MemoryModel for User {
    fn table(tables: &MemoryTables) -> &Table<Self> {
        &tables.users
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self> {
        &mut tables.users
    }
}

impl MemoryModel for Organization {
    fn table(tables: &MemoryTables) -> &Table<Self> {
        &tables.organizations
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self> {
        &mut tables.organizations
    }
}

impl MemoryModel for Contact {
    fn table(tables: &MemoryTables) -> &Table<Self> {
        &tables.contacts
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self> {
        &mut tables.contacts
    }
}

/// Record store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed tables
    pub async fn snapshot(&self) -> MemoryTables {
        self.tables.lock().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// A unit of work over a private copy of the tables
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryTables>,
    working: MemoryTables,
}

#[async_trait]
impl<E: MemoryModel> Store<E> for MemoryUnitOfWork {
    async fn get(&mut self, id: i64) -> StoreResult<Option<E>> {
        Ok(E::table(&self.working).rows.get(&id).cloned())
    }

    async fn list(&mut self, offset: i64, limit: i64) -> StoreResult<Vec<E>> {
        let offset = usize::try_from(offset).unwrap_or(0);
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(E::table(&self.working)
            .rows
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(&mut self, fields: E::Fields) -> StoreResult<E> {
        self.working.check_foreign_keys::<E>(&fields)?;
        E::table(&self.working).check_unique(&fields, None)?;

        let table = E::table_mut(&mut self.working);
        let id = table.next_id;
        table.next_id += 1;

        let now = Utc::now();
        let record = E::from_fields(id, fields, now, now);
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&mut self, id: i64, fields: E::Fields) -> StoreResult<Option<E>> {
        let Some(created_at) = E::table(&self.working).rows.get(&id).map(|row| row.created_at())
        else {
            return Ok(None);
        };

        self.working.check_foreign_keys::<E>(&fields)?;
        E::table(&self.working).check_unique(&fields, Some(id))?;

        let record = E::from_fields(id, fields, created_at, Utc::now());
        E::table_mut(&mut self.working)
            .rows
            .insert(id, record.clone());
        Ok(Some(record))
    }

    async fn delete(&mut self, id: i64) -> StoreResult<Option<E>> {
        if !E::table(&self.working).contains(id) {
            return Ok(None);
        }

        if let Some(constraint) = self.working.referenced_by(E::DESCRIPTOR.kind, id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: constraint.to_string(),
            });
        }

        Ok(E::table_mut(&mut self.working).rows.remove(&id))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn accounts(&mut self) -> &mut dyn Store<Account> {
        self
    }

    fn users(&mut self) -> &mut dyn Store<User> {
        self
    }

    fn organizations(&mut self) -> &mut dyn Store<Organization> {
        self
    }

    fn contacts(&mut self) -> &mut dyn Store<Contact> {
        self
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .working
            .users
            .rows
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        debug!("Committed in-memory unit of work");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountFields;

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let first = uow
            .accounts()
            .insert(AccountFields { name: "A".to_string() })
            .await
            .unwrap();
        let second = uow
            .accounts()
            .insert(AccountFields { name: "B".to_string() })
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_dropped_unit_is_rolled_back() {
        let store = MemoryStore::new();

        {
            let mut uow = store.begin().await.unwrap();
            uow.accounts()
                .insert(AccountFields { name: "Gone".to_string() })
                .await
                .unwrap();
        }

        assert!(store.snapshot().await.accounts.is_empty());
    }

    #[tokio::test]
    async fn test_list_clamps_negative_bounds() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.accounts()
            .insert(AccountFields { name: "A".to_string() })
            .await
            .unwrap();

        assert!(uow.accounts().list(-5, -1).await.unwrap().is_empty());
        assert_eq!(uow.accounts().list(-5, 10).await.unwrap().len(), 1);
    }
}
