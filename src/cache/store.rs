use anyhow::Context;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;

/// Open (creating if missing) the sqlite store backing the asset cache.
pub(super) async fn open_pool(db_path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {:?}", parent))?;
        }
    }

    let connect_opts = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_opts)
        .await
        .with_context(|| format!("Failed to open asset cache {:?}", db_path))?;

    Ok(pool)
}

/// Create the cache schema if it is not there yet.
///
/// `cache` rows mark completed installs; `asset` rows hold the cached
/// bodies. Both are keyed by the versioned cache name so that stale
/// versions can be enumerated and purged on activation.
pub(super) async fn ensure_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS cache (
            name TEXT PRIMARY KEY,
            installed_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS asset (
            cache_name TEXT NOT NULL,
            url TEXT NOT NULL,
            content_type TEXT,
            body BLOB NOT NULL,
            fetched_at TEXT NOT NULL,
            PRIMARY KEY (cache_name, url),
            FOREIGN KEY (cache_name) REFERENCES cache(name) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
