/// Database layer for PingCRM
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Table access lives with the models (`PgModel` impls) and is reached
/// through [`crate::store::postgres::PgStore`].

pub mod migrations;
pub mod pool;
