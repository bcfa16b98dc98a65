//! Migration code

use anyhow::{anyhow, Context, Result};
use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

/// Embed migrations into binary
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Run pending migrations.
///
/// The migration harness is synchronous, so this runs on the blocking pool
/// with its own short-lived connection.
pub async fn run(database_url: &str) -> Result<()> {
    let url = database_url.to_string();

    let applied = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
        let mut conn =
            PgConnection::establish(&url).context("Failed to connect for migrations")?;
        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("Failed to run migrations: {e}"))?;
        Ok(versions.into_iter().map(|v| v.to_string()).collect())
    })
    .await??;

    tracing::info!(?applied, "Database migrations are up to date");

    Ok(())
}
