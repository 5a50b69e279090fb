/// PostgreSQL record store
///
/// Each unit of work owns one sqlx transaction checked out of the shared pool.
/// `commit` commits it; dropping the unit rolls it back and returns the
/// connection to the pool.
///
/// # Example
///
/// ```no_run
/// use pingcrm_shared::db::pool::{create_pool, DatabaseConfig};
/// use pingcrm_shared::store::{postgres::PgStore, RecordStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgStore::new(pool);
/// let mut uow = store.begin().await?;
/// let page = uow.accounts().list(0, 10).await?;
/// uow.commit().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use crate::db::pool::health_check;
use crate::models::{Account, Contact, Entity, Organization, User};
use crate::store::{RecordStore, Store, StoreResult, UnitOfWork};

/// SQL operations for one table
///
/// Implemented next to each model. Every method runs on the connection it is
/// given, which inside a unit of work is the open transaction.
#[async_trait]
pub trait PgModel: Entity {
    async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error>;

    async fn list(conn: &mut PgConnection, offset: i64, limit: i64)
        -> Result<Vec<Self>, sqlx::Error>;

    async fn create(conn: &mut PgConnection, data: Self::Fields) -> Result<Self, sqlx::Error>;

    async fn update(
        conn: &mut PgConnection,
        id: i64,
        data: Self::Fields,
    ) -> Result<Option<Self>, sqlx::Error>;

    async fn delete(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error>;
}

/// Record store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        debug!("Opened database transaction");
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// A unit of work holding an open transaction
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl<E: PgModel> Store<E> for PgUnitOfWork {
    async fn get(&mut self, id: i64) -> StoreResult<Option<E>> {
        Ok(E::find_by_id(&mut self.tx, id).await?)
    }

    async fn list(&mut self, offset: i64, limit: i64) -> StoreResult<Vec<E>> {
        Ok(E::list(&mut self.tx, offset, limit).await?)
    }

    async fn insert(&mut self, fields: E::Fields) -> StoreResult<E> {
        Ok(E::create(&mut self.tx, fields).await?)
    }

    async fn update(&mut self, id: i64, fields: E::Fields) -> StoreResult<Option<E>> {
        Ok(E::update(&mut self.tx, id, fields).await?)
    }

    async fn delete(&mut self, id: i64) -> StoreResult<Option<E>> {
        Ok(E::delete(&mut self.tx, id).await?)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
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
        Ok(User::find_by_email(&mut self.tx, email).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await?;
        debug!("Committed database transaction");
        Ok(())
    }
}
