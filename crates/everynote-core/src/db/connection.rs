//! Database connection management

use std::path::Path;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use crate::error::{Error, Result};

use super::migrations;

/// Default file name of the local note database
pub const DEFAULT_DATABASE_FILE: &str = "everynote.db";

/// Database wrapper for a single libSQL connection
pub struct Database {
    // Dropping the database handle closes the connection.
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        tracing::debug!("Opening note database at {}", path_str);
        Self::open_local(&path_str).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_local(":memory:").await
    }

    async fn open_local(location: &str) -> Result<Self> {
        let db = Builder::new_local(location)
            .build()
            .await
            .map_err(|error| Error::StoreUnavailable(error.to_string()))?;
        let conn = db
            .connect()
            .map_err(|error| Error::StoreUnavailable(error.to_string()))?;

        let database = Self { _db: db, conn };
        database.configure().await;
        database
            .initialize()
            .await
            .map_err(|error| Error::StoreUnavailable(error.to_string()))?;
        Ok(database)
    }

    /// Configure `SQLite` pragmas; failures are non-fatal
    async fn configure(&self) {
        // journal_mode answers with the resulting mode as a row, so it is
        // stepped as a query. In-memory databases keep `memory`.
        let journal = match self.conn.query("PRAGMA journal_mode = WAL", ()).await {
            Ok(mut rows) => rows.next().await.map(|_| ()),
            Err(error) => Err(error),
        };
        if let Err(error) = journal {
            tracing::debug!("journal_mode pragma not applied: {}", error);
        }
        if let Err(error) = self.conn.execute("PRAGMA synchronous = NORMAL", ()).await {
            tracing::debug!("synchronous pragma not applied: {}", error);
        }
    }

    /// Ensure the Notes schema exists. Safe to call on every start.
    pub async fn initialize(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
