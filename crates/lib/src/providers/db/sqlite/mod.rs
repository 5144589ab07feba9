use crate::errors::ZygoteError;
use std::{
    fmt::{self, Debug},
    path::Path,
};
use tracing::info;
use turso::Database;

pub mod sql;

/// A provider for interacting with a local SQLite database using Turso.
///
/// This provider holds a `Database` instance. When cloned, it shares the same
/// underlying database, so one provider built at start-up can be handed to every
/// request handler.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Opens (or creates) the database at `db_path`. Use ":memory:" for an
    /// isolated in-memory database.
    pub async fn new(db_path: &str) -> Result<Self, ZygoteError> {
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| ZygoteError::StorageConnection(e.to_string()))?;
                }
            }
        }

        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| ZygoteError::StorageConnection(e.to_string()))?;

        if db_path != ":memory:" {
            let conn = db
                .connect()
                .map_err(|e| ZygoteError::StorageConnection(e.to_string()))?;
            // PRAGMA returns a row, so it goes through `query`.
            conn.query("PRAGMA journal_mode=WAL;", ())
                .await
                .map_err(|e| ZygoteError::StorageConnection(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Ensures that all application tables and indexes exist.
    /// Idempotent; safe to call on every start-up.
    pub async fn initialize_schema(&self) -> Result<(), ZygoteError> {
        let conn = self.db.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL.iter().chain(sql::CREATE_INDEXES) {
            conn.execute(statement, ()).await?;
        }
        info!("Database schema is up to date.");
        Ok(())
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}
