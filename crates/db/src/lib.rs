//! SQLite pool factory and schema bootstrap.

use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use libris_kernel::settings::DatabaseSettings;
use libris_kernel::Migration;

/// Open a connection pool for the configured SQLite database.
///
/// File databases are created on first use. An in-memory database lives only
/// as long as its connection, so the pool is pinned to one connection that is
/// never recycled.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true);

    let pool_options = if is_in_memory(&settings.url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database '{}'", settings.url))?;

    tracing::info!(
        target: "libris-db",
        url = %settings.url,
        max_connections = pool.options().get_max_connections(),
        "database pool ready"
    );

    Ok(pool)
}

/// Execute each module's schema statements in order.
///
/// Statements must be idempotent (`CREATE ... IF NOT EXISTS`); they run on
/// every startup and nothing records which ones have been applied.
pub async fn apply_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<()> {
    for (module, migration) in migrations {
        tracing::debug!(
            target: "libris-db",
            module = %module,
            migration = migration.id,
            "applying schema"
        );

        sqlx::raw_sql(migration.up)
            .execute(pool)
            .await
            .with_context(|| format!("schema '{}/{}' failed", module, migration.id))?;
    }

    tracing::info!(
        target: "libris-db",
        count = migrations.len(),
        "schema bootstrap complete"
    );

    Ok(())
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
