/// Embedded schema migrations
///
/// The SQL files under `pingcrm-shared/migrations/` are compiled into the
/// binary and applied in order at start-up when `RUN_MIGRATIONS` is enabled.
/// Applied versions are tracked by sqlx in `_sqlx_migrations`.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPool;
use tracing::{info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Applying database migrations"
    );

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Latest applied migration version, `None` on a fresh database
pub async fn latest_version(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT version
        FROM _sqlx_migrations
        WHERE success = TRUE
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(version,)| version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_migration_is_embedded() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![20250101000000]);
    }
}
