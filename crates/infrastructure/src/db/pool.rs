use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use dnswatch_domain::config::DatabaseConfig;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};

fn base_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(database_url).map(|o| {
        o.create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
    })
}

async fn apply_per_connection_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA cache_size = -65536").execute(&mut *conn).await?;
    sqlx::query("PRAGMA temp_store = MEMORY").execute(&mut *conn).await?;
    Ok(())
}

/// Opens the single pool the request store and scheduler share, running
/// migrations against `./migrations` before returning it.
pub async fn create_pool(database_url: &str, cfg: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = base_options(database_url)?.busy_timeout(Duration::from_millis(cfg.pool_acquire_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.pool_connection_limit)
        .min_connections(1)
        .acquire_timeout(Duration::from_millis(cfg.pool_acquire_timeout_ms))
        .after_connect(|conn, _| Box::pin(async move { apply_per_connection_pragmas(conn).await }))
        .connect_with(options)
        .await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;

    sqlx::query("PRAGMA optimize").execute(&pool).await?;

    Ok(pool)
}
