use std::path::Path;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{GymJournalError, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
pub type SqlitePool = Pool<SqliteAsyncConn>;
pub type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

const CONNECTION_PRAGMAS: [&str; 2] = ["PRAGMA busy_timeout = 5000", "PRAGMA foreign_keys = ON"];

pub fn open_connection_sync(database_url: &str) -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)
        .map_err(|e| GymJournalError::Storage(e.to_string()))?;
    apply_pragmas_sync(&mut conn)?;
    Ok(conn)
}

pub fn apply_pragmas_sync(conn: &mut SqliteConnection) -> Result<()> {
    for pragma in CONNECTION_PRAGMAS {
        diesel::RunQueryDsl::execute(diesel::sql_query(pragma), conn)
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
    }
    Ok(())
}

/// Pragmas are per connection in SQLite, so every checkout from the pool
/// goes through here.
pub async fn apply_pragmas_async(conn: &mut SqliteAsyncConn) -> Result<()> {
    for pragma in CONNECTION_PRAGMAS {
        diesel_async::RunQueryDsl::execute(diesel::sql_query(pragma), conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
    }
    Ok(())
}

pub fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(parent).map_err(|e| GymJournalError::Runtime(e.to_string()))?;
    }
    Ok(())
}

pub async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = open_connection_sync(&database_url)?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
        if !applied.is_empty() {
            tracing::info!(count = applied.len(), "Applied journal migrations");
        }
        Ok::<_, GymJournalError>(())
    })
    .await
    .map_err(|e| GymJournalError::Runtime(e.to_string()))??;
    Ok(())
}
